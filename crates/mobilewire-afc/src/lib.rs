//! Remote filesystem client for the device file service.
//!
//! [`AfcClient`] enforces handle discipline on top of any [`AfcDevice`].
//! [`AfcWire`] is the device implementation speaking AFC packets over a
//! byte channel; tests and alternative transports can supply their own.

pub mod client;
pub mod device;
pub mod error;
pub mod protocol;
pub mod status;
pub mod transfer;
pub mod wire;

pub use client::{AfcClient, FileHandle};
pub use device::{AfcDevice, OpenMode};
pub use error::{AfcError, Result};
pub use protocol::{FileMode, Operation};
pub use status::AfcStatus;
pub use transfer::{format_walk, pull, push, walk, TRANSFER_CHUNK_SIZE};
pub use wire::{AfcConfig, AfcWire};
