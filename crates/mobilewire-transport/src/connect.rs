use std::net::{TcpStream, ToSocketAddrs};
#[cfg(unix)]
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::ServiceStream;

/// Connect to a service channel exposed on a Unix domain socket (blocking).
///
/// Device multiplexers and forwarding daemons usually hand services out this
/// way once activation has succeeded.
#[cfg(unix)]
pub fn connect_unix(path: impl AsRef<Path>) -> Result<ServiceStream> {
    let path = path.as_ref();
    let stream =
        std::os::unix::net::UnixStream::connect(path).map_err(|e| TransportError::Connect {
            target: path.display().to_string(),
            source: e,
        })?;
    debug!(?path, "connected to unix domain socket");
    Ok(ServiceStream::from(stream))
}

/// Connect to a service channel forwarded to a TCP endpoint (blocking).
///
/// `timeout` bounds the connect itself; receive timeouts are configured on the
/// returned stream.
pub fn connect_tcp(addr: impl ToSocketAddrs, timeout: Option<Duration>) -> Result<ServiceStream> {
    let addrs: Vec<_> = addr
        .to_socket_addrs()
        .map_err(|e| TransportError::Connect {
            target: "<unresolved>".to_string(),
            source: e,
        })?
        .collect();

    let mut last_err = None;
    for addr in addrs {
        let attempt = match timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => {
                stream.set_nodelay(true)?;
                debug!(%addr, "connected to tcp endpoint");
                return Ok(ServiceStream::from(stream));
            }
            Err(err) => {
                debug!(%addr, error = %err, "tcp connect attempt failed");
                last_err = Some((addr, err));
            }
        }
    }

    Err(match last_err {
        Some((addr, source)) => TransportError::Connect {
            target: addr.to_string(),
            source,
        },
        None => TransportError::Connect {
            target: "<empty>".to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "address resolved to no endpoints",
            ),
        },
    })
}
