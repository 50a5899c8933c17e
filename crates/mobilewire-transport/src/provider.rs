//! Boundary with the device-connection manager.
//!
//! Discovery, pairing, session start/stop and service activation all live on
//! the far side of [`ServiceProvider`]. What comes back is a live byte channel.

use std::io::{Read, Write};

use crate::error::Result;

/// Remote filesystem service.
pub const AFC_SERVICE: &str = "com.apple.afc";
/// Developer disk image mounter service.
pub const IMAGE_MOUNTER_SERVICE: &str = "com.apple.mobile.mobile_image_mounter";
/// Application install/uninstall/lookup service.
pub const INSTALLATION_PROXY_SERVICE: &str = "com.apple.mobile.installation_proxy";
/// Remote debug server service.
pub const DEBUG_SERVER_SERVICE: &str = "com.apple.debugserver.DVTSecureSocketProxy";

/// Hands out activated service channels and takes them back.
pub trait ServiceProvider {
    /// Byte channel type produced for an activated service.
    type Channel: Read + Write;

    /// Activate `service` and return its channel.
    fn start_service(&mut self, service: &str) -> Result<Self::Channel>;

    /// Release a channel previously returned by [`ServiceProvider::start_service`].
    fn stop_service(&mut self, channel: Self::Channel) -> Result<()>;
}

/// Provider for services already forwarded to Unix sockets by a relay.
///
/// Service `name` is expected at `<root>/<name>.sock`. Activation and
/// pairing are the relay's business; stopping a service closes the socket.
#[cfg(unix)]
#[derive(Debug, Clone)]
pub struct SocketDirProvider {
    root: std::path::PathBuf,
}

#[cfg(unix)]
impl SocketDirProvider {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn socket_path(&self, service: &str) -> std::path::PathBuf {
        self.root.join(format!("{service}.sock"))
    }
}

#[cfg(unix)]
impl ServiceProvider for SocketDirProvider {
    type Channel = crate::traits::ServiceStream;

    fn start_service(&mut self, service: &str) -> Result<Self::Channel> {
        let path = self.socket_path(service);
        if !path.exists() {
            return Err(crate::error::TransportError::ServiceUnavailable {
                service: service.to_string(),
                reason: format!("no socket at {}", path.display()),
            });
        }
        crate::connect::connect_unix(&path)
    }

    fn stop_service(&mut self, channel: Self::Channel) -> Result<()> {
        match channel.shutdown() {
            Ok(()) | Err(crate::error::TransportError::Shutdown) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::{Read, Write};
    use std::os::unix::net::UnixListener;

    use super::*;
    use crate::error::TransportError;

    #[test]
    fn socket_dir_provider_connects_by_service_name() {
        let dir = std::env::temp_dir().join(format!("mobilewire-provider-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut provider = SocketDirProvider::new(&dir);
        let path = provider.socket_path(AFC_SERVICE);
        let _ = std::fs::remove_file(&path);
        let listener = UnixListener::bind(&path).unwrap();

        let handle = std::thread::spawn(move || {
            let (mut server, _) = listener.accept().unwrap();
            let mut buf = [0u8; 2];
            server.read_exact(&mut buf).unwrap();
            server.write_all(&buf).unwrap();
        });

        let mut channel = provider.start_service(AFC_SERVICE).unwrap();
        channel.write_all(b"ok").unwrap();
        let mut buf = [0u8; 2];
        channel.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ok");
        provider.stop_service(channel).unwrap();
        handle.join().unwrap();

        let missing = provider.start_service(DEBUG_SERVER_SERVICE).unwrap_err();
        assert!(matches!(missing, TransportError::ServiceUnavailable { .. }));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
