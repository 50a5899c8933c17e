use std::fmt;

use mobilewire_frame::FrameError;
use mobilewire_transport::ErrorCategory;

/// Signal stop reported by the debug server (`S`/`T` replies).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopSignal {
    pub signal: u8,
    /// `key:value` pairs following the signal in a `T` reply, in order.
    pub details: Vec<(String, String)>,
}

impl fmt::Display for StopSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Program received signal 0x{:02x}.", self.signal)?;
        for (key, value) in &self.details {
            write!(f, "\n{key}:{value}")?;
        }
        Ok(())
    }
}

/// Errors that can occur while driving the debug server.
#[derive(Debug, thiserror::Error)]
pub enum DebugError {
    /// Frame or transport failure on the service channel.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Malformed packet or a reply this client does not understand.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Packet checksum did not match its payload.
    #[error("bad response checksum ({received} vs {computed})")]
    Checksum { received: String, computed: String },

    /// The program stopped on a signal.
    #[error("{0}")]
    Signal(StopSignal),

    /// The program was killed by a signal.
    #[error("Process terminated with signal 0x{signal:02x} ({detail}).")]
    Terminated { signal: u8, detail: String },

    /// The server asked for host file I/O, which is not offered.
    #[error("file I/O request not supported: {0}")]
    FileIoUnsupported(String),

    /// The server could not launch the program.
    #[error("launch failed: {0}")]
    LaunchFailed(String),

    /// Writing program output to the local sink failed.
    #[error("output sink error: {0}")]
    Output(#[from] std::io::Error),
}

impl DebugError {
    /// Failure class of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Frame(err) => err.category(),
            Self::Protocol(_) | Self::Checksum { .. } | Self::FileIoUnsupported(_) => {
                ErrorCategory::Protocol
            }
            Self::Signal(_) | Self::Terminated { .. } => ErrorCategory::DebuggerSignal,
            Self::LaunchFailed(_) => ErrorCategory::DeviceStatus,
            Self::Output(_) => ErrorCategory::Transport,
        }
    }
}

pub type Result<T> = std::result::Result<T, DebugError>;
