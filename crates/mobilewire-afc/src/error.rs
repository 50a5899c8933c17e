use mobilewire_frame::FrameError;
use mobilewire_transport::{ErrorCategory, TransportError};

use crate::status::AfcStatus;

/// Errors that can occur while using the remote filesystem.
#[derive(Debug, thiserror::Error)]
pub enum AfcError {
    /// Channel failure (short read/write, closed, timed out).
    #[error("transport error: {0}")]
    Transport(#[from] FrameError),

    /// Malformed or unexpected packet.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The device refused to open a file, or returned no handle.
    #[error("open {path} failed: {status}")]
    Open { path: String, status: AfcStatus },

    #[error("read failed: {status}")]
    Read { status: AfcStatus },

    #[error("write failed: {status}")]
    Write { status: AfcStatus },

    #[error("close failed: {status}")]
    Close { status: AfcStatus },

    #[error("create directory {path} failed: {status}")]
    DirectoryCreate { path: String, status: AfcStatus },

    #[error("open directory {path} failed: {status}")]
    DirectoryOpen { path: String, status: AfcStatus },

    /// The handle was never issued or is already closed.
    #[error("invalid file handle {0}")]
    InvalidHandle(usize),

    /// Local file I/O during a transfer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TransportError> for AfcError {
    fn from(err: TransportError) -> Self {
        Self::Transport(FrameError::Transport(err))
    }
}

impl AfcError {
    /// Failure class of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport(err) => err.category(),
            Self::Protocol(_) | Self::InvalidHandle(_) => ErrorCategory::Protocol,
            Self::Open { .. }
            | Self::Read { .. }
            | Self::Write { .. }
            | Self::Close { .. }
            | Self::DirectoryCreate { .. }
            | Self::DirectoryOpen { .. } => ErrorCategory::DeviceStatus,
            Self::Io(_) => ErrorCategory::Transport,
        }
    }

    /// Device status code carried by this error, if any.
    pub fn status(&self) -> Option<AfcStatus> {
        match self {
            Self::Open { status, .. }
            | Self::Read { status }
            | Self::Write { status }
            | Self::Close { status }
            | Self::DirectoryCreate { status, .. }
            | Self::DirectoryOpen { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AfcError>;
