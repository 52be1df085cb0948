//! High-level session API.
//!
//! [`SessionBuilder`] picks the transport and login profile;
//! [`DeviceSession`] connects, logs in and holds the authenticated channel.

mod builder;
mod session;

pub use builder::SessionBuilder;
pub use session::{DeviceSession, SessionChannel};
