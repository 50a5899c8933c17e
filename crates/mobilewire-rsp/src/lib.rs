//! GDB remote serial protocol client for a device debug server.
//!
//! Speaks just enough of the protocol to launch a program with arguments,
//! stream its console output and report how it ended. Every outbound packet
//! travels inside one length-prefixed message; inbound bytes are unframed.

pub mod client;
pub mod command;
pub mod error;
pub mod packet;
pub mod stop_reply;

pub use client::{DebugClient, DebugConfig, Reply};
pub use command::{argv_packet, environment_packet};
pub use error::{DebugError, Result, StopSignal};
pub use packet::{checksum, encode_packet, try_parse_frame, PacketParser};
pub use stop_reply::{expects_stop_reply, parse_stop_reply, StopReply};
