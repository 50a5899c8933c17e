use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::error::{Result, TransportError};

/// A connected device service channel. Implements `Read + Write`.
///
/// This is the concrete byte channel used when the connection manager hands a
/// service over as a socket. Protocol clients accept any `Read + Write`, so
/// in-process channels work just as well.
pub struct ServiceStream {
    inner: ServiceStreamInner,
}

enum ServiceStreamInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
    Tcp(TcpStream),
}

impl Read for ServiceStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            ServiceStreamInner::Unix(stream) => stream.read(buf),
            ServiceStreamInner::Tcp(stream) => stream.read(buf),
        }
    }
}

impl Write for ServiceStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            ServiceStreamInner::Unix(stream) => stream.write(buf),
            ServiceStreamInner::Tcp(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            ServiceStreamInner::Unix(stream) => stream.flush(),
            ServiceStreamInner::Tcp(stream) => stream.flush(),
        }
    }
}

#[cfg(unix)]
impl From<std::os::unix::net::UnixStream> for ServiceStream {
    fn from(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: ServiceStreamInner::Unix(stream),
        }
    }
}

impl From<TcpStream> for ServiceStream {
    fn from(stream: TcpStream) -> Self {
        Self {
            inner: ServiceStreamInner::Tcp(stream),
        }
    }
}

impl ServiceStream {
    /// Set read timeout on the underlying stream.
    ///
    /// A receive that hits this timeout is reported by the framing layers as
    /// [`TransportError::ShortRead`].
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            ServiceStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            ServiceStreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            ServiceStreamInner::Unix(stream) => {
                stream.set_write_timeout(timeout).map_err(Into::into)
            }
            ServiceStreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Shut down both directions. Further reads return EOF.
    pub fn shutdown(&self) -> Result<()> {
        let result = match &self.inner {
            #[cfg(unix)]
            ServiceStreamInner::Unix(stream) => stream.shutdown(std::net::Shutdown::Both),
            ServiceStreamInner::Tcp(stream) => stream.shutdown(std::net::Shutdown::Both),
        };
        match result {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotConnected => {
                Err(TransportError::Shutdown)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            #[cfg(unix)]
            ServiceStreamInner::Unix(_) => "unix-domain-socket",
            ServiceStreamInner::Tcp(_) => "tcp",
        }
    }
}

impl std::fmt::Debug for ServiceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceStream")
            .field("type", &self.transport_name())
            .finish()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::{Read, Write};
    use std::os::unix::net::UnixStream;

    use super::*;

    #[test]
    fn unix_pair_roundtrip() {
        let (left, right) = UnixStream::pair().unwrap();
        let mut left = ServiceStream::from(left);
        let mut right = ServiceStream::from(right);

        left.write_all(b"hello").unwrap();
        let mut buf = [0u8; 5];
        right.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");
        assert_eq!(left.transport_name(), "unix-domain-socket");
    }

    #[test]
    fn read_after_shutdown_is_eof() {
        let (left, right) = UnixStream::pair().unwrap();
        let left = ServiceStream::from(left);
        let mut right = ServiceStream::from(right);

        left.shutdown().unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(right.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn read_timeout_expires() {
        let (left, _right) = UnixStream::pair().unwrap();
        let mut left = ServiceStream::from(left);
        left.set_read_timeout(Some(Duration::from_millis(10)))
            .unwrap();

        let mut buf = [0u8; 4];
        let err = left.read(&mut buf).unwrap_err();
        let err = TransportError::from_read(err, 4, 0);
        assert!(matches!(err, TransportError::ShortRead { .. }));
    }

    #[test]
    fn debug_does_not_expose_descriptor() {
        let (left, _right) = UnixStream::pair().unwrap();
        let stream = ServiceStream::from(left);
        assert_eq!(
            format!("{stream:?}"),
            "ServiceStream { type: \"unix-domain-socket\" }"
        );
    }
}
