use mobilewire_afc::AfcError;
use mobilewire_plist::PlistError;
use mobilewire_rsp::DebugError;
use mobilewire_transport::{ErrorCategory, TransportError};

/// Any failure surfaced by a device service operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Service activation or release failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Property-list service failure (image mounter, installation proxy).
    #[error(transparent)]
    Plist(#[from] PlistError),

    /// Debug server failure or abnormal program stop.
    #[error(transparent)]
    Debug(#[from] DebugError),

    /// Remote filesystem failure.
    #[error(transparent)]
    Afc(#[from] AfcError),
}

impl Error {
    /// Failure class of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport(_) => ErrorCategory::Transport,
            Self::Plist(err) => err.category(),
            Self::Debug(err) => err.category(),
            Self::Afc(err) => err.category(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
