use mobilewire_transport::{ErrorCategory, TransportError};

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The channel failed or delivered a short read/write.
    #[error("frame transport error: {0}")]
    Transport(#[from] TransportError),
}

impl From<std::io::Error> for FrameError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(TransportError::Io(err))
    }
}

impl FrameError {
    /// Failure class of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::PayloadTooLarge { .. } => ErrorCategory::Protocol,
            Self::Transport(_) => ErrorCategory::Transport,
        }
    }

    /// True when the channel closed or timed out mid-frame.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Transport(err) if err.is_closed())
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
