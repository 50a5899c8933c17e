//! Device-level operations composed from the individual service clients.
//!
//! Each call activates the service it needs, runs one conversation and
//! releases the channel again.

use std::collections::BTreeMap;
use std::io::Write;

use mobilewire_afc::{AfcClient, AfcError, AfcWire};
use mobilewire_plist::{
    DeveloperImage, Dictionary, ImageMounter, InstallationProxy, MountOutcome, MountedImage,
    PlistService,
};
use mobilewire_rsp::{DebugClient, DebugConfig};
use mobilewire_transport::{
    ServiceProvider, AFC_SERVICE, DEBUG_SERVER_SERVICE, IMAGE_MOUNTER_SERVICE,
    INSTALLATION_PROXY_SERVICE,
};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::session::ServiceSession;

/// High-level access to one device's services.
pub struct DeviceServices<P> {
    provider: P,
}

impl<P: ServiceProvider> DeviceServices<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn into_provider(self) -> P {
        self.provider
    }

    /// Run `f` against a property-list service, ending with `Hangup`.
    fn plist_conversation<R>(
        &mut self,
        service: &str,
        f: impl FnOnce(&mut PlistService<&mut P::Channel>) -> mobilewire_plist::Result<R>,
    ) -> Result<R> {
        ServiceSession::new(&mut self.provider).run(service, |channel| {
            let (_, outcome) = PlistService::converse(channel, f);
            outcome.map_err(Error::from)
        })
    }

    pub fn list_images(&mut self) -> Result<Vec<MountedImage>> {
        self.plist_conversation(IMAGE_MOUNTER_SERVICE, |svc| {
            ImageMounter::new(svc).list_images()
        })
    }

    pub fn lookup_image(&mut self, image_type: &str) -> Result<Option<Vec<u8>>> {
        self.plist_conversation(IMAGE_MOUNTER_SERVICE, |svc| {
            ImageMounter::new(svc).lookup_image(image_type)
        })
    }

    pub fn is_developer_image_mounted(&mut self) -> Result<bool> {
        self.plist_conversation(IMAGE_MOUNTER_SERVICE, |svc| {
            ImageMounter::new(svc).is_developer_image_mounted()
        })
    }

    /// Upload and mount `image` unless the same signature is mounted already.
    pub fn mount_developer_image(&mut self, image: &DeveloperImage) -> Result<MountOutcome> {
        let file = image.open()?;
        let outcome = self.plist_conversation(IMAGE_MOUNTER_SERVICE, |svc| {
            ImageMounter::new(svc).mount_image(file, image.size, &image.signature)
        })?;
        info!(path = %image.path.display(), ?outcome, "mount finished");
        Ok(outcome)
    }

    /// Unmount every mounted developer image, one conversation each.
    ///
    /// Returns how many images were unmounted.
    pub fn unmount_developer_images(&mut self) -> Result<usize> {
        let developer: Vec<_> = self
            .list_images()?
            .into_iter()
            .filter(MountedImage::is_developer)
            .collect();
        for image in &developer {
            self.plist_conversation(IMAGE_MOUNTER_SERVICE, |svc| {
                ImageMounter::new(svc).unmount_image(image)
            })?;
        }
        Ok(developer.len())
    }

    /// Install the package staged at `package_path` on the device.
    pub fn install(
        &mut self,
        package_path: &str,
        on_progress: impl FnMut(&Dictionary),
    ) -> Result<()> {
        self.plist_conversation(INSTALLATION_PROXY_SERVICE, |svc| {
            InstallationProxy::new(svc).install(package_path, on_progress)
        })
    }

    pub fn uninstall(&mut self, bundle_id: &str, on_progress: impl FnMut(&Dictionary)) -> Result<()> {
        self.plist_conversation(INSTALLATION_PROXY_SERVICE, |svc| {
            InstallationProxy::new(svc).uninstall(bundle_id, on_progress)
        })
    }

    /// Installed applications keyed by bundle identifier.
    pub fn lookup_applications(&mut self) -> Result<BTreeMap<String, Dictionary>> {
        self.plist_conversation(INSTALLATION_PROXY_SERVICE, |svc| {
            InstallationProxy::new(svc).lookup()
        })
    }

    pub fn lookup_executable(&mut self, bundle_id: &str) -> Result<String> {
        self.plist_conversation(INSTALLATION_PROXY_SERVICE, |svc| {
            InstallationProxy::new(svc).lookup_executable(bundle_id)
        })
    }

    /// Launch `argv` under the debug server and wait for it to exit.
    ///
    /// Console output is streamed to `output`. Returns the exit status.
    pub fn run_program<S, O>(&mut self, argv: &[S], output: O, config: DebugConfig) -> Result<i32>
    where
        S: AsRef<str>,
        O: Write,
    {
        ServiceSession::new(&mut self.provider).run(DEBUG_SERVER_SERVICE, |channel| {
            let mut client = DebugClient::with_config(channel, output, config);
            Ok(client.launch(argv)?)
        })
    }

    /// Run `f` with a filesystem client; files it leaves open are closed.
    pub fn with_afc<R>(
        &mut self,
        f: impl FnOnce(&mut AfcClient<AfcWire<&mut P::Channel>>) -> std::result::Result<R, AfcError>,
    ) -> Result<R> {
        ServiceSession::new(&mut self.provider).run(AFC_SERVICE, |channel| {
            let mut client = AfcClient::new(AfcWire::new(channel));
            let outcome = f(&mut client);
            let (_, closed) = client.shutdown();
            match (outcome, closed) {
                (Ok(value), Ok(leaked)) => {
                    if !leaked.is_empty() {
                        warn!(count = leaked.len(), "closed files left open");
                    }
                    Ok(value)
                }
                (Ok(_), Err(err)) | (Err(err), _) => Err(Error::from(err)),
            }
        })
    }
}
