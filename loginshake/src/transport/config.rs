//! Connection configuration for both transports.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Which transport carries the login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Telnet,
    Ssh,
}

impl TransportKind {
    /// Well-known port for this transport.
    pub fn default_port(self) -> u16 {
        match self {
            TransportKind::Telnet => 23,
            TransportKind::Ssh => 22,
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Telnet => f.write_str("telnet"),
            TransportKind::Ssh => f.write_str("ssh"),
        }
    }
}

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Default)]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys.
    Strict,

    /// Learn unknown keys, reject changed ones.
    #[default]
    AcceptNew,

    /// Accept any key. Lab use only.
    Disabled,
}

/// SSH-level authentication.
///
/// Appliances that ask for credentials in-band usually accept `None` (or
/// any password) at the SSH layer and prompt afterwards.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// `none` authentication.
    None,

    /// Password authentication.
    Password(SecretString),

    /// Private key authentication.
    PrivateKey {
        /// Path to the private key file.
        path: PathBuf,
        /// Optional passphrase for encrypted keys.
        passphrase: Option<SecretString>,
    },
}

/// SSH connection configuration.
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// SSH port.
    pub port: u16,

    /// Username for the SSH layer.
    pub username: String,

    /// SSH-level authentication method.
    pub auth: AuthMethod,

    /// Connection timeout.
    pub timeout: Duration,

    /// Terminal width for the PTY.
    pub terminal_width: u32,

    /// Terminal height for the PTY.
    pub terminal_height: u32,

    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// Path to known_hosts file; the user's default when unset.
    pub known_hosts_path: Option<PathBuf>,
}

impl SshConfig {
    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Telnet connection configuration.
#[derive(Debug, Clone)]
pub struct TelnetConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// Telnet port.
    pub port: u16,

    /// TCP connect timeout.
    pub timeout: Duration,
}

impl TelnetConfig {
    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        assert_eq!(TransportKind::Telnet.default_port(), 23);
        assert_eq!(TransportKind::Ssh.default_port(), 22);
    }

    #[test]
    fn test_transport_kind_serde() {
        let kind: TransportKind = serde_json::from_str(r#""telnet""#).unwrap();
        assert_eq!(kind, TransportKind::Telnet);
        assert_eq!(serde_json::to_string(&TransportKind::Ssh).unwrap(), r#""ssh""#);
        assert_eq!(TransportKind::Ssh.to_string(), "ssh");
    }

    #[test]
    fn test_socket_addr() {
        let config = TelnetConfig {
            host: "10.0.0.5".into(),
            port: 2323,
            timeout: Duration::from_secs(5),
        };
        assert_eq!(config.socket_addr(), "10.0.0.5:2323");
    }
}
