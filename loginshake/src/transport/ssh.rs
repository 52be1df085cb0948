//! SSH transport implementation using russh.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use futures_util::FutureExt;
use log::{debug, warn};
use russh::client::{self, Handle, Msg};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use russh::{ChannelMsg, Disconnect};
use secrecy::ExposeSecret;

use super::config::{AuthMethod, HostKeyVerification, SshConfig};
use crate::channel::Channel;
use crate::error::{ChannelError, Result, TransportError};

/// Authenticated SSH connection, before a shell is opened.
pub struct SshTransport {
    /// The russh session handle.
    session: Handle<SshHandler>,

    /// Configuration used for this connection.
    config: SshConfig,
}

impl SshTransport {
    /// Connect to the SSH server and authenticate at the SSH layer.
    pub async fn connect(config: SshConfig) -> Result<Self> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: Some(config.timeout),
            ..Default::default()
        });

        let host_key_error: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            host: config.host.clone(),
            port: config.port,
            host_key_verification: config.host_key_verification.clone(),
            known_hosts_path: config.known_hosts_path.clone(),
            host_key_error: host_key_error.clone(),
        };

        let mut session = tokio::time::timeout(
            config.timeout,
            client::connect(ssh_config, (config.host.as_str(), config.port), handler),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.timeout))?
        .map_err(|e| {
            // check_server_key may have stored a more specific reason
            let stored = host_key_error
                .lock()
                .ok()
                .and_then(|mut slot| slot.take());
            stored.unwrap_or(TransportError::Ssh(e))
        })?;

        Self::authenticate(&mut session, &config).await?;
        debug!("ssh connected to {}", config.socket_addr());

        Ok(Self { session, config })
    }

    /// Open a PTY shell, consuming the transport.
    pub async fn open_shell(self) -> Result<SshChannel> {
        let channel = self
            .session
            .channel_open_session()
            .await
            .map_err(|_| ChannelError::PtyOpenFailed)?;

        channel
            .request_pty(
                true,
                "xterm",
                self.config.terminal_width,
                self.config.terminal_height,
                0,
                0,
                &[],
            )
            .await
            .map_err(|_| ChannelError::PtyOpenFailed)?;

        channel
            .request_shell(true)
            .await
            .map_err(|_| ChannelError::ShellRequestFailed)?;

        Ok(SshChannel {
            session: self.session,
            channel,
            host: self.config.host,
            eof: false,
            closed: false,
        })
    }

    async fn authenticate(session: &mut Handle<SshHandler>, config: &SshConfig) -> Result<()> {
        let success = match &config.auth {
            AuthMethod::None => session
                .authenticate_none(&config.username)
                .await
                .map_err(TransportError::Ssh)?
                .success(),
            AuthMethod::Password(password) => session
                .authenticate_password(&config.username, password.expose_secret())
                .await
                .map_err(TransportError::Ssh)?
                .success(),
            AuthMethod::PrivateKey { path, passphrase } => {
                let passphrase = passphrase.as_ref().map(|p| p.expose_secret());
                let key = load_secret_key(path, passphrase)
                    .map_err(|e| TransportError::Key(e.to_string()))?;

                let hash_alg = session
                    .best_supported_rsa_hash()
                    .await
                    .map_err(TransportError::Ssh)?
                    .flatten();

                session
                    .authenticate_publickey(
                        &config.username,
                        PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                    )
                    .await
                    .map_err(TransportError::Ssh)?
                    .success()
            }
        };

        if !success {
            return Err(TransportError::AuthenticationFailed {
                user: config.username.clone(),
            }
            .into());
        }

        Ok(())
    }
}

/// Interactive shell on an SSH connection.
pub struct SshChannel {
    session: Handle<SshHandler>,
    channel: russh::Channel<Msg>,
    host: String,

    /// Remote end sent EOF or closed the channel.
    eof: bool,

    /// We closed the channel.
    closed: bool,
}

impl SshChannel {
    /// Whether either side has closed the channel.
    pub fn is_closed(&self) -> bool {
        self.eof || self.closed
    }
}

impl Channel for SshChannel {
    async fn read(&mut self) -> Result<String> {
        if self.closed {
            return Err(ChannelError::Closed.into());
        }

        let mut data = Vec::new();
        while !self.eof {
            match self.channel.wait().now_or_never() {
                Some(msg) => {
                    if !absorb(&self.host, msg, &mut data) {
                        self.eof = true;
                    }
                }
                None => break,
            }
        }

        if data.is_empty() && self.eof {
            return Err(ChannelError::Closed.into());
        }
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    async fn write(&mut self, data: &str) -> Result<()> {
        if self.is_closed() {
            return Err(ChannelError::Closed.into());
        }
        self.channel.data(data.as_bytes()).await.map_err(|e| {
            debug!("{}: ssh write failed: {}", self.host, e);
            ChannelError::Closed
        })?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if !self.eof {
            // the peer may already be gone
            let _ = self.channel.eof().await;
            let _ = self.channel.close().await;
        }
        self.session
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }

    fn host(&self) -> &str {
        &self.host
    }
}

/// Fold one channel message into `data`. Returns false once the remote
/// side is gone.
fn absorb(host: &str, msg: Option<ChannelMsg>, data: &mut Vec<u8>) -> bool {
    match msg {
        Some(ChannelMsg::Data { data: bytes })
        | Some(ChannelMsg::ExtendedData { data: bytes, .. }) => {
            data.extend_from_slice(&bytes);
            true
        }
        Some(ChannelMsg::ExitStatus { exit_status }) => {
            debug!("{}: shell exited with status {}", host, exit_status);
            true
        }
        Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
            debug!("{}: ssh channel closed by remote", host);
            false
        }
        Some(_) => true,
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    /// Lets connect() surface the real host-key failure instead of
    /// russh's generic UnknownKey.
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl SshHandler {
    /// `Ok(true)` if matched, `Ok(false)` if the host is unknown.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> std::result::Result<bool, TransportError> {
        let result = match &self.known_hosts_path {
            Some(path) => russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path),
            None => russh::keys::check_known_hosts(&self.host, self.port, pubkey),
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    fn learn_host_key(&self, pubkey: &PublicKey) -> std::result::Result<(), TransportError> {
        let result = match &self.known_hosts_path {
            Some(path) => russh::keys::known_hosts::learn_known_hosts_path(
                &self.host, self.port, pubkey, path,
            ),
            None => russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey),
        };

        result.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }

    fn reject(&self, error: TransportError) -> bool {
        if let Ok(mut slot) = self.host_key_error.lock() {
            *slot = Some(error);
        }
        false
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let accepted = match self.host_key_verification {
            HostKeyVerification::Disabled => true,
            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => true,
                Ok(false) => {
                    if let Err(e) = self.learn_host_key(server_public_key) {
                        warn!("{}: failed to save host key: {}", self.host, e);
                    }
                    true
                }
                Err(e) => self.reject(e),
            },
            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => true,
                Ok(false) => self.reject(TransportError::HostKeyUnknown {
                    host: self.host.clone(),
                    port: self.port,
                }),
                Err(e) => self.reject(e),
            },
        };
        Ok(accepted)
    }
}

#[cfg(test)]
mod tests {
    use russh::CryptoVec;

    use super::*;

    #[test]
    fn test_absorb_collects_output() {
        let mut data = Vec::new();

        assert!(absorb(
            "pdu-1",
            Some(ChannelMsg::Data {
                data: CryptoVec::from_slice(b"Login Password: ")
            }),
            &mut data,
        ));
        assert!(absorb(
            "pdu-1",
            Some(ChannelMsg::ExtendedData {
                data: CryptoVec::from_slice(b"warning\r\n"),
                ext: 1,
            }),
            &mut data,
        ));
        assert!(absorb("pdu-1", Some(ChannelMsg::ExitStatus { exit_status: 0 }), &mut data));
        assert!(absorb("pdu-1", Some(ChannelMsg::Success), &mut data));

        assert_eq!(data, b"Login Password: warning\r\n");
    }

    #[test]
    fn test_absorb_detects_remote_close() {
        let mut data = b"bye".to_vec();

        assert!(!absorb("pdu-2", Some(ChannelMsg::Eof), &mut data));
        assert!(!absorb("pdu-2", Some(ChannelMsg::Close), &mut data));
        assert!(!absorb("pdu-2", None, &mut data));
        assert_eq!(data, b"bye");
    }
}
