//! Builder for device sessions.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use super::session::{DeviceSession, Target};
use crate::error::{DriverError, Result};
use crate::login::{Credentials, Login, LoginConfig};
use crate::profile::{LoginProfile, ProfileRegistry};
use crate::transport::{AuthMethod, HostKeyVerification, SshConfig, TelnetConfig, TransportKind};

/// Builder for [`DeviceSession`].
///
/// # Example
///
/// ```rust,no_run
/// use loginshake::{SessionBuilder, TransportKind};
///
/// # async fn example() -> Result<(), loginshake::Error> {
/// let mut session = SessionBuilder::new("192.168.1.50")
///     .transport(TransportKind::Telnet)
///     .username("cyber")
///     .password("cyber")
///     .profile("cyberpower_os")
///     .build()?;
/// session.open().await?;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    host: String,
    transport: Option<TransportKind>,
    port: Option<u16>,
    username: Option<String>,
    password: Option<SecretString>,
    ssh_auth: AuthMethod,
    profile_name: Option<String>,
    custom_profile: Option<LoginProfile>,
    login_config: Option<LoginConfig>,
    timeout: Duration,
    terminal_width: u32,
    terminal_height: u32,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
}

impl SessionBuilder {
    /// Create a new session builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            transport: None,
            port: None,
            username: None,
            password: None,
            ssh_auth: AuthMethod::None,
            profile_name: None,
            custom_profile: None,
            login_config: None,
            timeout: Duration::from_secs(30),
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    /// Set the transport (default: the profile's).
    pub fn transport(mut self, kind: TransportKind) -> Self {
        self.transport = Some(kind);
        self
    }

    /// Set the port (default: 23 for Telnet, 22 for SSH).
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Username typed at the login prompt, also used at the SSH layer.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Password typed at the login prompt.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// SSH-layer authentication (default: `none`).
    pub fn ssh_auth(mut self, auth: AuthMethod) -> Self {
        self.ssh_auth = auth;
        self
    }

    /// Authenticate the SSH layer with a private key.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.ssh_auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: None,
        };
        self
    }

    /// Pick a registered login profile by name.
    pub fn profile(mut self, name: impl Into<String>) -> Self {
        self.profile_name = Some(name.into());
        self
    }

    /// Use a profile that is not in the registry.
    pub fn custom_profile(mut self, profile: LoginProfile) -> Self {
        self.custom_profile = Some(profile);
        self
    }

    /// Override the profile's login configuration.
    pub fn login_config(mut self, config: LoginConfig) -> Self {
        self.login_config = Some(config);
        self
    }

    /// Set the connection timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set terminal dimensions for the SSH PTY.
    pub fn terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    /// Set SSH host key verification.
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Use a specific known_hosts file.
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Build the session.
    ///
    /// This validates the configuration but does not connect. Call
    /// [`DeviceSession::open`] to connect and log in.
    pub fn build(self) -> Result<DeviceSession> {
        let password = self.password.ok_or_else(|| DriverError::InvalidConfig {
            message: "password is required".to_string(),
        })?;

        let mut profile = match (self.custom_profile, self.profile_name) {
            (Some(custom), _) => custom,
            (None, Some(name)) => ProfileRegistry::lookup(&name)?,
            (None, None) => LoginProfile::new("default"),
        };
        if let Some(config) = self.login_config {
            profile.login = config;
        }

        let kind = self.transport.unwrap_or(profile.default_transport);
        let port = self.port.unwrap_or_else(|| kind.default_port());

        let target = match kind {
            TransportKind::Telnet => Target::Telnet(TelnetConfig {
                host: self.host,
                port,
                timeout: self.timeout,
            }),
            TransportKind::Ssh => Target::Ssh(SshConfig {
                host: self.host,
                port,
                username: self.username.clone().unwrap_or_default(),
                auth: self.ssh_auth,
                timeout: self.timeout,
                terminal_width: self.terminal_width,
                terminal_height: self.terminal_height,
                host_key_verification: self.host_key_verification,
                known_hosts_path: self.known_hosts_path,
            }),
        };

        let login = Login::for_transport(kind, profile.login.clone())?;
        let credentials = Credentials::from_parts(self.username, password);

        Ok(DeviceSession::new(target, profile, login, credentials))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::error::ProfileError;

    #[test]
    fn test_password_required() {
        let err = SessionBuilder::new("10.0.0.1").username("cyber").build();
        assert!(matches!(
            err,
            Err(Error::Driver(DriverError::InvalidConfig { .. }))
        ));
    }

    #[test]
    fn test_port_follows_transport() {
        let telnet = SessionBuilder::new("10.0.0.1")
            .transport(TransportKind::Telnet)
            .password("cyber")
            .build()
            .unwrap();
        assert_eq!(telnet.transport(), TransportKind::Telnet);
        assert_eq!(telnet.port(), 23);

        let ssh = SessionBuilder::new("10.0.0.1")
            .password("cyber")
            .port(2222)
            .build()
            .unwrap();
        assert_eq!(ssh.transport(), TransportKind::Ssh);
        assert_eq!(ssh.port(), 2222);
    }

    #[test]
    fn test_profile_lookup() {
        let session = SessionBuilder::new("10.0.0.1")
            .password("cyber")
            .profile("generic")
            .build()
            .unwrap();
        assert_eq!(session.profile().name, "generic");

        let err = SessionBuilder::new("10.0.0.1")
            .password("cyber")
            .profile("no_such_profile")
            .build();
        assert!(matches!(
            err,
            Err(Error::Profile(ProfileError::UnknownProfile { .. }))
        ));
    }

    #[test]
    fn test_custom_profile_sets_default_transport() {
        let profile = LoginProfile::new("console_server")
            .with_default_transport(TransportKind::Telnet)
            .with_line_terminator("\n");
        let session = SessionBuilder::new("10.0.0.1")
            .password("cyber")
            .custom_profile(profile)
            .build()
            .unwrap();
        assert_eq!(session.transport(), TransportKind::Telnet);
        assert_eq!(session.profile().login.line_terminator, "\n");
    }

    #[test]
    fn test_invalid_login_config_rejected() {
        let err = SessionBuilder::new("10.0.0.1")
            .password("cyber")
            .login_config(LoginConfig::default().with_delay_factor(-1.0))
            .build();
        assert!(matches!(
            err,
            Err(Error::Driver(DriverError::InvalidConfig { .. }))
        ));
    }
}
