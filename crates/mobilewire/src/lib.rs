//! Host-side protocol layer for talking to mobile-device services.
//!
//! The connection manager that discovers, pairs and activates services lives
//! outside this crate; it hands over byte channels through
//! [`transport::ServiceProvider`]. On top of those channels sit:
//!
//! - [`frame`]: 4-byte big-endian length-prefixed message framing
//! - [`plist`]: property-list command services (image mounter, installation proxy)
//! - [`rsp`]: remote serial protocol client for launching programs under the debug server
//! - [`afc`]: remote filesystem client
//!
//! [`device::DeviceServices`] combines them into one-call operations, each
//! activating and releasing its service through [`session::ServiceSession`].

/// Re-export transport types.
pub mod transport {
    pub use mobilewire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use mobilewire_frame::*;
}

/// Re-export property-list service types.
pub mod plist {
    pub use mobilewire_plist::*;
}

/// Re-export remote serial protocol types.
pub mod rsp {
    pub use mobilewire_rsp::*;
}

/// Re-export remote filesystem types.
pub mod afc {
    pub use mobilewire_afc::*;
}

pub mod device;
pub mod error;
pub mod events;
#[cfg(feature = "logging")]
pub mod logging;
pub mod session;

pub use device::DeviceServices;
pub use error::{Error, Result};
pub use events::{DeviceEvent, EventHub, Subscription};
pub use session::ServiceSession;
