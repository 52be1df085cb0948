//! Telnet-style login: bounded retry rounds of read/react steps.
//!
//! Devices reached over Telnet are the unreliable ones: they drop the first
//! keystrokes, skip echo, and print the operational prompt late. Each round
//! gives the device a fixed number of steps to show a prompt; between rounds
//! a bare line terminator re-triggers the login sequence. After the last
//! round one final check catches a success prompt that arrived a beat late.

use std::borrow::Cow;

use log::{debug, trace};
use regex::Regex;
use tokio::time::sleep;

use super::config::{LoginConfig, RetryBudget};
use super::{Credentials, Handshake, LoginStrategy, close_quietly};
use crate::channel::{Channel, Prompt, PromptDetector, Transcript, normalize_echo};
use crate::error::{Error, LoginError, Result};

/// Retry-rounds login for Telnet sessions.
#[derive(Debug, Clone)]
pub struct TelnetLogin {
    config: LoginConfig,
    detector: PromptDetector,
}

impl TelnetLogin {
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

    /// Run every round plus the final check. `Ok(true)` means logged in.
    async fn run_rounds<C: Channel>(
        &self,
        hs: &mut Handshake<'_, C>,
        budget: &RetryBudget,
    ) -> Result<bool> {
        sleep(budget.initial_delay).await;

        for round in 1..=budget.outer_rounds {
            let mut round_text = String::new();

            for attempt in 1..=budget.inner_attempts_per_round {
                trace!(
                    "{}: login round {}/{} attempt {}/{}",
                    hs.channel.host(),
                    round,
                    budget.outer_rounds,
                    attempt,
                    budget.inner_attempts_per_round
                );
                if self.step(hs, budget, &mut round_text).await? {
                    return Ok(true);
                }
                sleep(budget.poll_interval).await;
            }

            // Try sending a return to restart the login sequence
            debug!("{}: no prompt after round {}, sending return", hs.channel.host(), round);
            hs.channel.write(&self.config.telnet_line_terminator).await?;
            sleep(budget.per_step_delay).await;
        }

        // Last try to see if we already logged in
        hs.channel.write(&self.config.telnet_line_terminator).await?;
        sleep(budget.final_delay).await;
        let output = hs.read().await?;
        Ok(self.detector.is_logged_in(&output))
    }

    /// One read/react step. Returns whether the round text now shows an
    /// operational prompt.
    async fn step<C: Channel>(
        &self,
        hs: &mut Handshake<'_, C>,
        budget: &RetryBudget,
        round_text: &mut String,
    ) -> Result<bool> {
        let terminator = &self.config.line_terminator;

        let output = hs.read().await?;
        round_text.push_str(&output);

        // The password scan looks at what follows the username prompt, so a
        // chunk carrying both prompts gets both answers in this step.
        let mut latest = output;
        let username_end = self
            .detector
            .find(Prompt::Username, &latest)
            .map(|m| m.end());
        if let Some(end) = username_end {
            hs.send_username(terminator).await?;
            sleep(budget.per_step_delay).await;
            let echo = hs.read().await?;
            round_text.push_str(&echo);
            latest = format!("{}{}", &latest[end..], echo);
        }

        if self.detector.find(Prompt::Password, &latest).is_some() {
            hs.send_password(terminator).await?;
            // Takes extra time from login to get console
            sleep(budget.escalating_timeout).await;
            let banner = hs.read().await?;
            round_text.push_str(&banner);
        }

        Ok(self.detector.is_logged_in(round_text))
    }

    async fn give_up<C: Channel>(&self, hs: Handshake<'_, C>, budget: &RetryBudget) -> Error {
        let host = hs.channel.host().to_string();
        let last_output = hs.last_output();
        close_quietly(hs.channel).await;

        if hs.prompted {
            LoginError::AuthenticationFailed { host, last_output }.into()
        } else {
            LoginError::Timeout {
                budget: budget.as_login_budget(),
                last_output,
            }
            .into()
        }
    }
}

impl LoginStrategy for TelnetLogin {
    async fn login<C: Channel>(
        &self,
        channel: &mut C,
        credentials: &Credentials,
    ) -> Result<Transcript> {
        let budget = self.config.retry_budget();
        let mut hs = Handshake::new(channel, credentials, self.config.strip_ansi);

        match self.run_rounds(&mut hs, &budget).await {
            Ok(true) => {
                debug!("{}: login succeeded", hs.channel.host());
                Ok(hs.transcript)
            }
            Ok(false) => Err(self.give_up(hs, &budget).await),
            Err(e) => Err(hs.abort(e).await),
        }
    }
}

/// Read pending output after sending `command` and collapse a doubled echo.
///
/// `prompt` is the session's base prompt.
pub async fn read_command_echo<C: Channel>(
    channel: &mut C,
    command: &str,
    prompt: &Regex,
) -> Result<String> {
    let output = channel.read().await?;
    Ok(match normalize_echo(&output, command, prompt) {
        Cow::Borrowed(_) => output,
        Cow::Owned(normalized) => normalized,
    })
}
