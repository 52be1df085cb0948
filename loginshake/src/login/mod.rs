//! In-band login handshake.
//!
//! Appliances reached over Telnet or a bare SSH shell ask for credentials
//! with free-text prompts. Two strategies drive that exchange behind one
//! contract, [`LoginStrategy::login`]:
//!
//! - [`TelnetLogin`]: bounded retry rounds, for devices that drop keystrokes
//!   and need the prompt re-triggered.
//! - [`IdlePoller`]: a wall-clock poller that nudges quiet SSH sessions
//!   with a bare line terminator.
//!
//! [`Login`] picks one by transport kind.

mod config;
mod poller;
mod telnet;

pub use config::{LoginConfig, MIN_DELAY_FACTOR, RetryBudget};
pub use poller::IdlePoller;
pub use telnet::{TelnetLogin, read_command_echo};

use std::fmt;
use std::future::Future;

use log::{debug, warn};
use secrecy::{ExposeSecret, SecretString};

use crate::channel::{Channel, Transcript};
use crate::error::{Error, LoginError, Result};
use crate::transport::TransportKind;

/// Credentials typed in at the device's login prompts.
pub struct Credentials {
    username: Option<String>,
    password: SecretString,
}

impl Credentials {
    /// Username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: SecretString::from(password.into()),
        }
    }

    /// Password only, for devices that never ask for a username.
    pub fn password_only(password: impl Into<String>) -> Self {
        Self {
            username: None,
            password: SecretString::from(password.into()),
        }
    }

    /// Build from an optional username and an already-wrapped password.
    pub fn from_parts(username: Option<String>, password: SecretString) -> Self {
        Self { username, password }
    }

    /// The username, if one was configured.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// The password.
    pub fn password(&self) -> &SecretString {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// A login strategy: drive the prompts on `channel` until the device lets
/// us in, returning everything that was read.
pub trait LoginStrategy: Send + Sync {
    fn login<C: Channel>(
        &self,
        channel: &mut C,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Transcript>> + Send;
}

/// Login strategy selected by transport kind.
#[derive(Debug)]
pub enum Login {
    Telnet(TelnetLogin),
    Ssh(IdlePoller),
}

impl Login {
    /// Build the strategy that fits `kind`.
    pub fn for_transport(kind: TransportKind, config: LoginConfig) -> Result<Self> {
        Ok(match kind {
            TransportKind::Telnet => Login::Telnet(TelnetLogin::new(config)?),
            TransportKind::Ssh => Login::Ssh(IdlePoller::new(config)?),
        })
    }
}

impl LoginStrategy for Login {
    async fn login<C: Channel>(
        &self,
        channel: &mut C,
        credentials: &Credentials,
    ) -> Result<Transcript> {
        match self {
            Login::Telnet(telnet) => telnet.login(channel, credentials).await,
            Login::Ssh(poller) => poller.login(channel, credentials).await,
        }
    }
}

/// Run a one-off login over `channel` with the strategy for `kind`.
pub async fn login<C: Channel>(
    kind: TransportKind,
    channel: &mut C,
    credentials: &Credentials,
    config: &LoginConfig,
) -> Result<Transcript> {
    Login::for_transport(kind, config.clone())?
        .login(channel, credentials)
        .await
}

/// State owned by one login call.
pub(crate) struct Handshake<'a, C: Channel> {
    pub channel: &'a mut C,
    credentials: &'a Credentials,
    pub transcript: Transcript,

    /// Whether any credential has been sent.
    pub prompted: bool,
}

impl<'a, C: Channel> Handshake<'a, C> {
    pub fn new(channel: &'a mut C, credentials: &'a Credentials, strip_ansi: bool) -> Self {
        Self {
            channel,
            credentials,
            transcript: Transcript::new(strip_ansi),
            prompted: false,
        }
    }

    /// Read what is pending and record it.
    pub async fn read(&mut self) -> Result<String> {
        let raw = self.channel.read().await?;
        Ok(self.transcript.record(&raw))
    }

    pub async fn send_username(&mut self, terminator: &str) -> Result<()> {
        let credentials = self.credentials;
        let username = credentials
            .username()
            .ok_or(LoginError::MissingCredential { field: "username" })?;
        debug!("{}: username prompt detected, sending username", self.channel.host());
        self.prompted = true;
        self.channel.write(&format!("{username}{terminator}")).await
    }

    pub async fn send_password(&mut self, terminator: &str) -> Result<()> {
        let credentials = self.credentials;
        debug!("{}: password prompt detected, sending password", self.channel.host());
        self.prompted = true;
        self.channel
            .write(&format!(
                "{}{terminator}",
                credentials.password().expose_secret()
            ))
            .await
    }

    pub fn last_output(&self) -> String {
        last_output(&self.transcript)
    }

    /// Turn a failure into the error the caller sees.
    pub async fn abort(self, err: Error) -> Error {
        abort_on_closed(self.channel, err, &self.transcript).await
    }
}

pub(crate) fn last_output(transcript: &Transcript) -> String {
    transcript.last_chunk().unwrap_or_default().to_string()
}

/// A closed stream is fatal: close our side and report an authentication
/// failure for the host. Other errors pass through untouched.
pub(crate) async fn abort_on_closed<C: Channel>(
    channel: &mut C,
    err: Error,
    transcript: &Transcript,
) -> Error {
    if !err.is_closed() {
        return err;
    }
    warn!("{}: stream closed during login", channel.host());
    close_quietly(channel).await;
    LoginError::AuthenticationFailed {
        host: channel.host().to_string(),
        last_output: last_output(transcript),
    }
    .into()
}

/// Close after a failed login; the login error is what gets reported.
pub(crate) async fn close_quietly<C: Channel>(channel: &mut C) {
    if let Err(e) = channel.close().await {
        debug!("{}: close after failed login: {}", channel.host(), e);
    }
}
