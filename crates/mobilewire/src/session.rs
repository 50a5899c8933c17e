//! Scoped service activation.

use mobilewire_transport::{ServiceProvider, TransportError};
use tracing::{debug, warn};

/// Runs conversations on freshly activated services.
///
/// Every [`ServiceSession::run`] pairs one `start_service` with exactly one
/// `stop_service`, whether the conversation succeeded or not.
pub struct ServiceSession<'p, P> {
    provider: &'p mut P,
}

impl<'p, P: ServiceProvider> ServiceSession<'p, P> {
    pub fn new(provider: &'p mut P) -> Self {
        Self { provider }
    }

    /// Activate `service`, hand its channel to `f`, then release it.
    ///
    /// An error from `f` takes precedence over a release failure.
    pub fn run<R, E>(
        &mut self,
        service: &str,
        f: impl FnOnce(&mut P::Channel) -> Result<R, E>,
    ) -> Result<R, E>
    where
        E: From<TransportError>,
    {
        let mut channel = self.provider.start_service(service)?;
        debug!(service, "service started");
        let outcome = f(&mut channel);
        let stopped = self.provider.stop_service(channel);
        debug!(service, ok = outcome.is_ok(), "service stopped");
        match (outcome, stopped) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(err.into()),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(stop_err)) => {
                warn!(service, error = %stop_err, "failed to stop service after error");
                Err(err)
            }
        }
    }

    pub fn provider_mut(&mut self) -> &mut P {
        self.provider
    }
}
