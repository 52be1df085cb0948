//! Device session: connect, log in, keep the authenticated channel.

use log::{debug, info};
use regex::Regex;

use crate::channel::Channel;
use crate::error::{ChannelError, DriverError, Result};
use crate::login::{Credentials, Login, LoginStrategy, read_command_echo};
use crate::profile::LoginProfile;
use crate::transport::{
    SshChannel, SshConfig, SshTransport, TelnetChannel, TelnetConfig, TransportKind,
};

/// Where a session connects to.
#[derive(Debug, Clone)]
pub(crate) enum Target {
    Telnet(TelnetConfig),
    Ssh(SshConfig),
}

/// The authenticated channel of an open session.
pub enum SessionChannel {
    Telnet(TelnetChannel),
    Ssh(SshChannel),
}

impl Channel for SessionChannel {
    async fn read(&mut self) -> Result<String> {
        match self {
            SessionChannel::Telnet(channel) => channel.read().await,
            SessionChannel::Ssh(channel) => channel.read().await,
        }
    }

    async fn write(&mut self, data: &str) -> Result<()> {
        match self {
            SessionChannel::Telnet(channel) => channel.write(data).await,
            SessionChannel::Ssh(channel) => channel.write(data).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            SessionChannel::Telnet(channel) => channel.close().await,
            SessionChannel::Ssh(channel) => channel.close().await,
        }
    }

    fn host(&self) -> &str {
        match self {
            SessionChannel::Telnet(channel) => channel.host(),
            SessionChannel::Ssh(channel) => channel.host(),
        }
    }
}

/// A session to one appliance.
///
/// Created by [`SessionBuilder`](super::SessionBuilder). [`open`](Self::open)
/// connects the transport and runs the in-band login; the authenticated
/// channel then stays available for a command layer.
pub struct DeviceSession {
    target: Target,
    profile: LoginProfile,
    login: Login,
    credentials: Credentials,

    /// Authenticated channel (None when closed).
    channel: Option<SessionChannel>,

    /// Operational prompt with its terminator removed.
    base_prompt: Option<String>,

    /// Matches the base prompt and the rest of its line.
    echo_prompt: Option<Regex>,

    /// Everything read during the last successful login.
    login_transcript: String,
}

impl DeviceSession {
    pub(crate) fn new(
        target: Target,
        profile: LoginProfile,
        login: Login,
        credentials: Credentials,
    ) -> Self {
        Self {
            target,
            profile,
            login,
            credentials,
            channel: None,
            base_prompt: None,
            echo_prompt: None,
            login_transcript: String::new(),
        }
    }

    /// Connect and log in.
    pub async fn open(&mut self) -> Result<()> {
        if self.channel.is_some() {
            return Err(DriverError::AlreadyConnected.into());
        }

        let mut channel = match &self.target {
            Target::Telnet(config) => SessionChannel::Telnet(TelnetChannel::connect(config).await?),
            Target::Ssh(config) => {
                let transport = SshTransport::connect(config.clone()).await?;
                SessionChannel::Ssh(transport.open_shell().await?)
            }
        };

        if let Err(e) = self.authenticate(&mut channel).await {
            if let Err(close_err) = channel.close().await {
                debug!("{}: close after failed login: {}", self.host(), close_err);
            }
            return Err(e);
        }

        info!(
            "{}: logged in over {} (profile {})",
            self.host(),
            self.transport(),
            self.profile.name
        );
        self.channel = Some(channel);
        Ok(())
    }

    async fn authenticate(&mut self, channel: &mut SessionChannel) -> Result<()> {
        let mut transcript = self.login.login(channel, &self.credentials).await?;

        // the poller stops once the password is out; the prompt proves it was right
        if let Login::Ssh(poller) = &self.login {
            poller.await_prompt(channel, &mut transcript).await?;
        }

        self.base_prompt = transcript
            .trailing_prompt()
            .map(|prompt| base_prompt(&prompt))
            .filter(|base| !base.is_empty());
        self.echo_prompt = match &self.base_prompt {
            Some(base) => Some(
                Regex::new(&format!("{}[^\\r\\n]*", regex::escape(base)))
                    .map_err(ChannelError::InvalidPattern)?,
            ),
            None => None,
        };
        debug!("{}: base prompt {:?}", self.host(), self.base_prompt);

        self.login_transcript = transcript.into_string();
        Ok(())
    }

    /// Close the session. Closing a closed session is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(mut channel) = self.channel.take() {
            debug!("{}: closing session", self.host());
            channel.close().await?;
        }
        Ok(())
    }

    /// Check if the session is open.
    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    /// The authenticated channel, for a command layer.
    pub fn channel_mut(&mut self) -> Result<&mut SessionChannel> {
        self.channel
            .as_mut()
            .ok_or_else(|| DriverError::NotConnected.into())
    }

    /// Read pending output after sending `command`, collapsing a stale
    /// prompt in front of the echo.
    ///
    /// Only Telnet sessions are normalized; SSH output is returned as read.
    pub async fn read_command_echo(&mut self, command: &str) -> Result<String> {
        let channel = self.channel.as_mut().ok_or(DriverError::NotConnected)?;
        match (channel, &self.echo_prompt) {
            (SessionChannel::Telnet(telnet), Some(prompt)) => {
                read_command_echo(telnet, command, prompt).await
            }
            (channel, _) => channel.read().await,
        }
    }

    /// Target host.
    pub fn host(&self) -> &str {
        match &self.target {
            Target::Telnet(config) => &config.host,
            Target::Ssh(config) => &config.host,
        }
    }

    /// Target port.
    pub fn port(&self) -> u16 {
        match &self.target {
            Target::Telnet(config) => config.port,
            Target::Ssh(config) => config.port,
        }
    }

    /// Transport in use.
    pub fn transport(&self) -> TransportKind {
        match &self.target {
            Target::Telnet(_) => TransportKind::Telnet,
            Target::Ssh(_) => TransportKind::Ssh,
        }
    }

    /// The login profile.
    pub fn profile(&self) -> &LoginProfile {
        &self.profile
    }

    /// Operational prompt seen after login, without its terminator.
    pub fn base_prompt(&self) -> Option<&str> {
        self.base_prompt.as_deref()
    }

    /// Everything read during the last successful login.
    pub fn login_transcript(&self) -> &str {
        &self.login_transcript
    }
}

/// Drop the terminator character (and padding) from an operational prompt.
fn base_prompt(prompt: &str) -> String {
    let mut chars = prompt.trim_end().chars();
    chars.next_back();
    chars.as_str().trim_end().to_string()
}
