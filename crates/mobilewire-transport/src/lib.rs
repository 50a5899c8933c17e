//! Byte channel abstraction for device service connections.
//!
//! Provides a unified interface over the ways an activated service can be
//! handed over:
//! - Unix domain sockets (device multiplexer, forwarding daemons)
//! - TCP (forwarded ports)
//!
//! This is the lowest layer of mobilewire. Every protocol crate builds on top
//! of a `Read + Write` channel, usually the [`ServiceStream`] type provided here.

pub mod connect;
pub mod error;
pub mod provider;
pub mod traits;

#[cfg(unix)]
pub use connect::connect_unix;
pub use connect::connect_tcp;
pub use error::{ErrorCategory, Result, TransportError};
pub use provider::{
    ServiceProvider, AFC_SERVICE, DEBUG_SERVER_SERVICE, IMAGE_MOUNTER_SERVICE,
    INSTALLATION_PROXY_SERVICE,
};
#[cfg(unix)]
pub use provider::SocketDirProvider;
pub use traits::ServiceStream;
