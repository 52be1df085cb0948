//! Error types for loginshake.

use std::fmt;
use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for loginshake operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level errors (TCP connect, SSH handshake).
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// In-band login handshake errors
    #[error("Login error: {0}")]
    Login(#[from] LoginError),

    /// Session-level errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Login profile errors
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),
}

impl Error {
    /// Whether this error means the byte stream to the device is gone.
    ///
    /// The login automaton treats these as fatal and never retries them.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            Error::Channel(ChannelError::Closed) | Error::Transport(TransportError::Disconnected)
        )
    }
}

/// Transport layer errors (TCP / SSH connection, SSH-level authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// SSH-level authentication was rejected
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host key not present in known_hosts (strict verification)
    #[error("Unknown host key for {host}:{port}")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the one recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Channel layer errors (reading/writing the interactive stream).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Failed to open PTY channel
    #[error("Failed to open PTY channel")]
    PtyOpenFailed,

    /// Failed to request shell
    #[error("Failed to request shell")]
    ShellRequestFailed,

    /// Channel closed by the remote end
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),

    /// I/O error on the underlying stream
    #[error("Channel I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// The budget a login attempt ran out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginBudget {
    /// Telnet-style rounds of read/react steps.
    Steps { rounds: usize, attempts: usize },

    /// SSH-style wall-clock budget.
    Elapsed(Duration),
}

impl fmt::Display for LoginBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginBudget::Steps { rounds, attempts } => {
                write!(f, "{rounds} rounds of {attempts} attempts")
            }
            LoginBudget::Elapsed(d) => write!(f, "{:?}", d),
        }
    }
}

/// In-band login handshake errors.
#[derive(Error, Debug)]
pub enum LoginError {
    /// No login prompt was seen within the budget.
    #[error("Login process timed out: no login prompt within {budget}")]
    Timeout {
        budget: LoginBudget,
        /// Last non-empty chunk read before giving up.
        last_output: String,
    },

    /// The stream closed mid-handshake, or every round failed after credentials were sent.
    #[error("Login failed: {host}")]
    AuthenticationFailed {
        host: String,
        /// Last non-empty chunk read before giving up.
        last_output: String,
    },

    /// The device asked for a credential that was not configured.
    #[error("Device prompted for {field} but none was configured")]
    MissingCredential { field: &'static str },
}

/// Session-level errors.
#[derive(Error, Debug)]
pub enum DriverError {
    /// Session not connected
    #[error("Session not connected - call open() first")]
    NotConnected,

    /// Session already connected
    #[error("Session already connected")]
    AlreadyConnected,

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Login profile errors.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// No profile registered under this name
    #[error("Unknown profile: {name}")]
    UnknownProfile { name: String },

    /// A profile with this name already exists
    #[error("Profile already registered: {name}")]
    AlreadyRegistered { name: String },
}

/// Result type alias using loginshake's Error.
pub type Result<T> = std::result::Result<T, Error>;
