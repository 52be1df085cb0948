//! # loginshake
//!
//! Async in-band login handshake for Telnet and SSH CLI appliances.
//!
//! Power distribution units, UPS network cards and similar appliances do
//! not authenticate through a structured protocol. They print free-text
//! prompts ("Login Name:", "Login Password:") between banner noise, may
//! drop the first keystrokes, and may never echo what was typed.
//! loginshake detects those prompts, types the credentials at the right
//! moment, retries within a bounded budget and reports a clear outcome.
//!
//! ## Features
//!
//! - Telnet login with bounded retry rounds and inline option negotiation
//! - SSH login with an idle-backoff poller that nudges quiet shells
//! - Data-driven prompt patterns, loadable with serde
//! - Named login profiles (CyberPower OS built in)
//! - ANSI escape stripping of everything read
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use loginshake::{SessionBuilder, TransportKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), loginshake::Error> {
//!     let mut session = SessionBuilder::new("192.168.1.50")
//!         .transport(TransportKind::Telnet)
//!         .username("cyber")
//!         .password("cyber")
//!         .profile("cyberpower_os")
//!         .build()?;
//!
//!     session.open().await?;
//!     println!("logged in at {:?}", session.base_prompt());
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! The login automaton runs over anything that implements
//! [`Channel`], so it can also drive an existing connection:
//!
//! ```rust,no_run
//! use loginshake::{Credentials, LoginConfig, TransportKind, login};
//! use loginshake::transport::{TelnetChannel, TelnetConfig};
//!
//! # async fn example() -> Result<(), loginshake::Error> {
//! let config = TelnetConfig {
//!     host: "192.168.1.50".into(),
//!     port: 23,
//!     timeout: std::time::Duration::from_secs(10),
//! };
//! let mut channel = TelnetChannel::connect(&config).await?;
//! let transcript = login(
//!     TransportKind::Telnet,
//!     &mut channel,
//!     &Credentials::new("cyber", "cyber"),
//!     &LoginConfig::default(),
//! )
//! .await?;
//! println!("{transcript}");
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod driver;
pub mod error;
pub mod login;
pub mod profile;
pub mod transport;

// Re-export main types for convenience
pub use channel::{Channel, PromptDetector, PromptPatterns, Transcript};
pub use driver::{DeviceSession, SessionBuilder, SessionChannel};
pub use error::Error;
pub use login::{
    Credentials, IdlePoller, Login, LoginConfig, LoginStrategy, TelnetLogin, login,
};
pub use profile::{LoginProfile, ProfileRegistry};
pub use transport::{AuthMethod, SshConfig, TransportKind};
