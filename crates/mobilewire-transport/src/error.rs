use std::io;

/// Errors that can occur on a device service channel.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to connect to the channel endpoint.
    #[error("failed to connect to {target}: {source}")]
    Connect { target: String, source: io::Error },

    /// An I/O error occurred on the channel.
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),

    /// The channel delivered fewer bytes than required (closed or timed out).
    #[error("short read ({received} of {expected} bytes)")]
    ShortRead { expected: usize, received: usize },

    /// The channel accepted fewer bytes than submitted.
    #[error("short write ({written} of {expected} bytes)")]
    ShortWrite { expected: usize, written: usize },

    /// The connection manager could not hand over a channel for a service.
    #[error("service {service} unavailable: {reason}")]
    ServiceUnavailable { service: String, reason: String },

    /// The channel has been shut down.
    #[error("transport shut down")]
    Shutdown,
}

impl TransportError {
    /// Classify an I/O error raised while filling a buffer of `expected` bytes.
    ///
    /// Timeouts and premature EOF collapse into [`TransportError::ShortRead`], so a
    /// receive that timed out at the channel looks exactly like a closed channel.
    pub fn from_read(err: io::Error, expected: usize, received: usize) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::UnexpectedEof => {
                Self::ShortRead { expected, received }
            }
            _ => Self::Io(err),
        }
    }

    /// True when the error means the peer is gone (closed, reset, or timed out).
    pub fn is_closed(&self) -> bool {
        match self {
            Self::ShortRead { .. } | Self::ShortWrite { .. } | Self::Shutdown => true,
            Self::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::BrokenPipe
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
            ),
            _ => false,
        }
    }
}

/// Coarse failure classes shared by every protocol crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Short or failed read/write on the byte channel.
    Transport,
    /// Malformed frame, checksum mismatch, or unexpected reply shape.
    Protocol,
    /// The device answered with a nonzero status or an error string.
    DeviceStatus,
    /// The debugged process received a signal or terminated abnormally.
    DebuggerSignal,
}

pub type Result<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_reported_as_short_read() {
        let err = TransportError::from_read(io::Error::from(io::ErrorKind::TimedOut), 4, 1);
        assert!(matches!(
            err,
            TransportError::ShortRead {
                expected: 4,
                received: 1
            }
        ));
        assert!(err.is_closed());
    }

    #[test]
    fn would_block_is_reported_as_short_read() {
        let err = TransportError::from_read(io::Error::from(io::ErrorKind::WouldBlock), 8, 0);
        assert!(matches!(err, TransportError::ShortRead { .. }));
    }

    #[test]
    fn other_io_errors_pass_through() {
        let err =
            TransportError::from_read(io::Error::from(io::ErrorKind::PermissionDenied), 4, 0);
        assert!(matches!(err, TransportError::Io(_)));
        assert!(!err.is_closed());
    }
}
