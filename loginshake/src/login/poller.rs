//! SSH-style login: a wall-clock poller with idle backoff.
//!
//! Devices behind an SSH shell deliver their prompts reliably but lazily:
//! sometimes nothing shows up until they see a keystroke. The poller reads
//! while there is output, backs off when the stream goes quiet, and nudges
//! the device with a bare line terminator if it stays quiet.
//!
//! Its job ends once the password is sent. Whether the password was right
//! is only known from the operational prompt, see
//! [`IdlePoller::await_prompt`].

use log::{debug, trace};
use tokio::time::{Instant, sleep};

use super::config::LoginConfig;
use super::{Credentials, Handshake, LoginStrategy, abort_on_closed, close_quietly, last_output};
use crate::channel::{Channel, PromptDetector, Transcript};
use crate::error::{LoginBudget, LoginError, Result};

/// Idle-backoff login poller for SSH sessions.
#[derive(Debug, Clone)]
pub struct IdlePoller {
    config: LoginConfig,
    detector: PromptDetector,
}

impl IdlePoller {
    /// Validate `config` and compile its prompt patterns.
    pub fn new(config: LoginConfig) -> Result<Self> {
        config.validate()?;
        let detector = config.patterns.compile()?;
        Ok(Self { config, detector })
    }

    /// The login configuration.
    pub fn config(&self) -> &LoginConfig {
        &self.config
    }

    /// Poll until the password is sent. `Ok(false)` means the budget ran out.
    async fn poll<C: Channel>(&self, hs: &mut Handshake<'_, C>) -> Result<bool> {
        let budget = self.config.login_timeout();
        let active_pause = self.config.active_pause();
        let idle_pause = self.config.idle_pause();
        let terminator = &self.config.line_terminator;

        sleep(active_pause).await;
        let start = Instant::now();
        let mut buffered: Option<String> = None;

        while start.elapsed() < budget {
            let output = match buffered.take() {
                Some(output) => output,
                None => hs.read().await?,
            };

            if !output.is_empty() {
                let detection = self.detector.scan(&output);
                if detection.username {
                    hs.send_username(terminator).await?;
                }
                if detection.password {
                    hs.send_password(terminator).await?;
                    return Ok(true);
                }
                sleep(active_pause).await;
            } else {
                // No new data, sleep longer
                sleep(idle_pause).await;
                let output = hs.read().await?;
                if output.is_empty() {
                    trace!("{}: stream idle, sending return", hs.channel.host());
                    hs.channel.write(terminator).await?;
                } else {
                    buffered = Some(output);
                }
            }
        }

        Ok(false)
    }

    /// Wait for the operational prompt after the poller sent the password.
    ///
    /// Reads into `transcript` until either terminator shows up in the text
    /// read here, or the login budget runs out. A missing prompt is an
    /// authentication failure and closes the channel; so is a fresh
    /// credential prompt, which means the password was rejected.
    pub async fn await_prompt<C: Channel>(
        &self,
        channel: &mut C,
        transcript: &mut Transcript,
    ) -> Result<()> {
        let budget = self.config.login_timeout();
        let active_pause = self.config.active_pause();
        let start = Instant::now();
        let mut seen = String::new();

        loop {
            let raw = match channel.read().await {
                Ok(raw) => raw,
                Err(e) => return Err(abort_on_closed(channel, e, transcript).await),
            };
            seen.push_str(&transcript.record(&raw));

            let detection = self.detector.scan(&seen);
            if detection.logged_in {
                debug!("{}: operational prompt detected", channel.host());
                return Ok(());
            }
            if detection.username || detection.password {
                debug!("{}: device prompted for credentials again", channel.host());
                break;
            }
            if start.elapsed() >= budget {
                break;
            }
            sleep(active_pause).await;
        }

        close_quietly(channel).await;
        Err(LoginError::AuthenticationFailed {
            host: channel.host().to_string(),
            last_output: last_output(transcript),
        }
        .into())
    }
}

impl LoginStrategy for IdlePoller {
    async fn login<C: Channel>(
        &self,
        channel: &mut C,
        credentials: &Credentials,
    ) -> Result<Transcript> {
        let mut hs = Handshake::new(channel, credentials, self.config.strip_ansi);

        match self.poll(&mut hs).await {
            Ok(true) => Ok(hs.transcript),
            Ok(false) => {
                debug!(
                    "{}: login process failed, no password prompt within {:?}",
                    hs.channel.host(),
                    self.config.login_timeout()
                );
                Err(LoginError::Timeout {
                    budget: LoginBudget::Elapsed(self.config.login_timeout()),
                    last_output: hs.last_output(),
                }
                .into())
            }
            Err(e) => Err(hs.abort(e).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::channel::scripted::ScriptedChannel;
    use crate::error::Error;

    fn poller() -> IdlePoller {
        IdlePoller::new(LoginConfig::default()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_username_then_password() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut channel = ScriptedChannel::new("pdu-1")
            .then("Login Name: ")
            .then("admin\r\nLogin Password: ");
        let credentials = Credentials::new("admin", "cyber");

        let transcript = poller().login(&mut channel, &credentials).await.unwrap();

        assert_eq!(channel.writes, vec!["admin\r", "cyber\r"]);
        assert_eq!(transcript.len(), 2);
        assert_eq!(channel.reads, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_stream_times_out_with_budget() {
        let mut channel = ScriptedChannel::new("pdu-2");
        let credentials = Credentials::new("admin", "cyber");

        let start = Instant::now();
        let err = poller().login(&mut channel, &credentials).await.unwrap_err();

        match err {
            Error::Login(LoginError::Timeout { budget, last_output }) => {
                assert_eq!(budget, LoginBudget::Elapsed(Duration::from_secs(20)));
                assert!(last_output.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(start.elapsed() >= Duration::from_secs(20));
        // each idle probe nudges the device once
        assert!(!channel.writes.is_empty());
        assert!(channel.writes.iter().all(|w| w == "\r"));
        assert!(!channel.closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_start_nudged_then_buffered_output_used() {
        let mut channel = ScriptedChannel::new("pdu-3")
            .then("")
            .then("")
            .then("")
            .then("Login Password: ");
        let credentials = Credentials::password_only("cyber");

        poller().login(&mut channel, &credentials).await.unwrap();

        // read, probe (nudge), read, probe picks up the prompt and the
        // next iteration consumes it without a fresh read
        assert_eq!(channel.writes, vec!["\r", "cyber\r"]);
        assert_eq!(channel.reads, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_both_prompts_in_one_chunk() {
        let mut channel = ScriptedChannel::new("pdu-4").then("Login Name: \r\nLogin Password: ");
        let credentials = Credentials::new("admin", "cyber");

        poller().login(&mut channel, &credentials).await.unwrap();

        assert_eq!(channel.writes, vec!["admin\r", "cyber\r"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_closed_is_authentication_failure() {
        let mut channel = ScriptedChannel::new("pdu-5").then_closed();
        let credentials = Credentials::new("admin", "cyber");

        let err = poller().login(&mut channel, &credentials).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Login(LoginError::AuthenticationFailed { ref host, .. }) if host == "pdu-5"
        ));
        assert!(channel.closed);
        assert_eq!(channel.reads, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_prompt_success() {
        let poller = poller();
        let mut channel = ScriptedChannel::new("pdu-6")
            .then("\r\n")
            .then("CyberPower ")
            .then(">");
        let mut transcript = Transcript::new(true);

        poller.await_prompt(&mut channel, &mut transcript).await.unwrap();

        assert_eq!(transcript.trailing_prompt().as_deref(), Some("CyberPower >"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_prompt_wrong_password() {
        let poller = poller();
        let mut channel = ScriptedChannel::new("pdu-7").then("\r\nLogin incorrect\r\nLogin Name: ");
        let mut transcript = Transcript::new(true);

        let start = Instant::now();
        let err = poller
            .await_prompt(&mut channel, &mut transcript)
            .await
            .unwrap_err();

        match err {
            Error::Login(LoginError::AuthenticationFailed { host, last_output }) => {
                assert_eq!(host, "pdu-7");
                assert!(last_output.contains("Login incorrect"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(channel.closed);
        // the re-prompt fails at once instead of waiting out the budget
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(channel.reads, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_prompt_silent_device_fails_after_budget() {
        let poller = poller();
        let mut channel = ScriptedChannel::new("pdu-8");
        let mut transcript = Transcript::new(true);

        let start = Instant::now();
        let err = poller
            .await_prompt(&mut channel, &mut transcript)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Login(LoginError::AuthenticationFailed { ref host, .. }) if host == "pdu-8"
        ));
        assert!(start.elapsed() >= Duration::from_secs(20));
        assert!(channel.closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_factor_stretches_idle_backoff() {
        let config = LoginConfig::default().with_delay_factor(2.0);
        let poller = IdlePoller::new(config).unwrap();
        let mut channel = ScriptedChannel::new("pdu-9")
            .then("")
            .then("")
            .then("Login Password: ");
        let credentials = Credentials::password_only("cyber");

        let start = Instant::now();
        poller.login(&mut channel, &credentials).await.unwrap();

        // active pause (0.1 unit) + one idle re-read (0.5 unit), unit = 2s
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1200), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(1300), "{elapsed:?}");
        assert_eq!(channel.writes, vec!["\r", "cyber\r"]);
        assert_eq!(channel.reads, 3);
    }
}
