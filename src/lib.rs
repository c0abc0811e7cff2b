//! ## Example
//! Following example demonstrates probing a DHCP server on behalf of a set of
//! client hardware addresses and reporting which of them receive offers.
//! To run this example locally, make sure to specify the network interface
//! (e.g., `eth0` or `wlan0`) and at least one MAC address as parameters.
//! ```no_run
#![doc = include_str!("../demos/probe.rs")]
//! ```
//! Offers stream in as they are correlated; the terminal status tells normal
//! completion apart from hitting the session deadline.

pub mod error;
pub mod frame;
pub mod probe;
pub mod session;

pub(crate) mod capture;
pub(crate) mod constants;
pub(crate) mod response;
pub(crate) mod transmit;

pub use error::{Error, OpaqueError, Result};
pub use frame::FrameTemplate;
pub use probe::{OfferRecord, SessionStatus};
pub use session::{
    ProbeSession, SessionConfig, SessionConfigBuilder, SessionHandle, SESSION_DEADLINE,
};
