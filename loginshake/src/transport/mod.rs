//! Transport layer: the byte streams a login runs over.
//!
//! Telnet runs over a plain TCP stream with inline option negotiation;
//! SSH wraps a russh client and a PTY shell. Both end up as a
//! [`Channel`](crate::channel::Channel).

pub mod config;
pub mod negotiation;
mod ssh;
mod telnet;

pub use config::{AuthMethod, HostKeyVerification, SshConfig, TelnetConfig, TransportKind};
pub use negotiation::{TelnetEvent, TelnetParser, respond};
pub use ssh::{SshChannel, SshTransport};
pub use telnet::TelnetChannel;
