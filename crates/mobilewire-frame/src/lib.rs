//! Length-prefixed message framing for device service channels.
//!
//! Every message is framed with a 4-byte big-endian payload length. The byte
//! order is fixed by the wire contract.
//!
//! No partial reads surface to callers: a message arrives whole or the read
//! fails with a transport error.

pub mod channel;
pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use channel::FramedChannel;
pub use codec::{
    decode_frame, decode_header, encode_frame, FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use reader::{read_full, read_message};
pub use writer::write_full;
