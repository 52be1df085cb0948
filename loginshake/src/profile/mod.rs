//! Login profiles: named login configurations per device family.
//!
//! A profile bundles the prompt patterns, pacing and terminators one
//! family of appliances needs. Profiles live in a global registry so
//! callers can pick one by name.

mod registry;
pub mod vendors;

pub use registry::ProfileRegistry;

use crate::channel::PromptPatterns;
use crate::login::LoginConfig;
use crate::transport::TransportKind;

/// A named login configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginProfile {
    /// Profile name (e.g., "cyberpower_os").
    pub name: String,

    /// Login configuration for this device family.
    pub login: LoginConfig,

    /// Transport assumed when the caller does not pick one.
    pub default_transport: TransportKind,
}

impl LoginProfile {
    /// Create a profile with the default login configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            login: LoginConfig::default(),
            default_transport: TransportKind::Ssh,
        }
    }

    /// Set the whole login configuration.
    pub fn with_login_config(mut self, login: LoginConfig) -> Self {
        self.login = login;
        self
    }

    /// Set the prompt patterns.
    pub fn with_patterns(mut self, patterns: PromptPatterns) -> Self {
        self.login.patterns = patterns;
        self
    }

    /// Set the terminator sent after credentials.
    pub fn with_line_terminator(mut self, terminator: impl Into<String>) -> Self {
        self.login.line_terminator = terminator.into();
        self
    }

    /// Set the default transport.
    pub fn with_default_transport(mut self, kind: TransportKind) -> Self {
        self.default_transport = kind;
        self
    }
}
