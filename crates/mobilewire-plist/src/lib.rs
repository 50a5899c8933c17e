//! Property-list command protocol for device services.
//!
//! Commands and responses are XML property lists carried one per framed
//! message. On top of [`PlistService`] sit the disk image mounter and the
//! installation proxy, which differ only in command shapes and the keys they
//! inspect.

pub mod disk_image;
pub mod error;
pub mod image_mounter;
pub mod installation;
pub mod progress;
pub mod service;
pub mod value;

pub use disk_image::{signature_path, DeveloperImage, DeviceSupportPaths};
pub use error::{PlistError, Result};
pub use image_mounter::{ImageMounter, MountOutcome, MountedImage, DEVELOPER_IMAGE_TYPE};
pub use installation::{AppRecord, InstallationProxy};
pub use progress::{classify, progress_line, Progress, ProgressReporter, STATUS_COMPLETE};
pub use service::{command, PlistService, COMMAND_KEY};
pub use value::{Dictionary, Value};
