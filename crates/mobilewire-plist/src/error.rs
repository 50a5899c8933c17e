use mobilewire_frame::FrameError;
use mobilewire_transport::ErrorCategory;

/// Errors that can occur in property-list conversations.
#[derive(Debug, thiserror::Error)]
pub enum PlistError {
    /// Frame-level error (short read, closed channel, oversized message).
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The payload is not a well-formed property list.
    #[error("plist encoding error: {0}")]
    Encoding(#[from] plist::Error),

    /// The peer sent something this client does not understand.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The device reported a failure for a command.
    #[error("{command} failed: {message}")]
    DeviceStatus {
        command: String,
        code: Option<i64>,
        message: String,
    },

    /// Local file I/O error (disk image, signature).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A looked-up item does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl PlistError {
    /// Failure class of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Frame(err) => err.category(),
            Self::Encoding(_) | Self::Protocol(_) => ErrorCategory::Protocol,
            Self::DeviceStatus { .. } | Self::NotFound(_) => ErrorCategory::DeviceStatus,
            Self::Io(_) => ErrorCategory::Transport,
        }
    }
}

pub type Result<T> = std::result::Result<T, PlistError>;
