//! Login configuration and the retry budget derived from it.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::channel::PromptPatterns;
use crate::error::{DriverError, LoginBudget, Result};

/// Lowest delay factor a login will run with.
///
/// Smaller configured factors are raised to this floor.
pub const MIN_DELAY_FACTOR: f64 = 1.0;

/// Configuration for the in-band login handshake.
///
/// Every field has a default, so a config file only needs to name what it
/// changes:
///
/// ```rust
/// use loginshake::LoginConfig;
///
/// let config: LoginConfig = serde_json::from_str(r#"{"delay_factor": 2.0}"#).unwrap();
/// assert_eq!(config.max_loops, 20);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    /// Prompt patterns for this device family.
    pub patterns: PromptPatterns,

    /// Multiplier applied to every pause. Slow links need more.
    pub delay_factor: f64,

    /// Total read/react steps for the Telnet-style login, split evenly
    /// across `outer_rounds`.
    pub max_loops: usize,

    /// Number of retry rounds for the Telnet-style login.
    pub outer_rounds: usize,

    /// Wall-clock budget for the SSH-style poller, in seconds.
    pub login_timeout_secs: f64,

    /// Sent after credentials (and as the SSH-style nudge).
    pub line_terminator: String,

    /// Sent to re-trigger the prompt between Telnet retry rounds.
    pub telnet_line_terminator: String,

    /// Strip ANSI escape sequences before matching prompts.
    pub strip_ansi: bool,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            patterns: PromptPatterns::default(),
            delay_factor: 1.0,
            max_loops: 20,
            outer_rounds: 3,
            login_timeout_secs: 20.0,
            line_terminator: "\r".to_string(),
            telnet_line_terminator: "\r\n".to_string(),
            strip_ansi: true,
        }
    }
}

impl LoginConfig {
    /// Set the prompt patterns.
    pub fn with_patterns(mut self, patterns: PromptPatterns) -> Self {
        self.patterns = patterns;
        self
    }

    /// Set the delay factor.
    pub fn with_delay_factor(mut self, delay_factor: f64) -> Self {
        self.delay_factor = delay_factor;
        self
    }

    /// Set the Telnet-style step budget.
    pub fn with_max_loops(mut self, max_loops: usize) -> Self {
        self.max_loops = max_loops;
        self
    }

    /// Set the number of Telnet-style retry rounds.
    pub fn with_outer_rounds(mut self, outer_rounds: usize) -> Self {
        self.outer_rounds = outer_rounds;
        self
    }

    /// Set the SSH-style wall-clock budget.
    pub fn with_login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout_secs = timeout.as_secs_f64();
        self
    }

    /// Set the terminator sent after credentials.
    pub fn with_line_terminator(mut self, terminator: impl Into<String>) -> Self {
        self.line_terminator = terminator.into();
        self
    }

    /// Set the terminator sent between Telnet retry rounds.
    pub fn with_telnet_line_terminator(mut self, terminator: impl Into<String>) -> Self {
        self.telnet_line_terminator = terminator.into();
        self
    }

    /// Enable or disable ANSI stripping.
    pub fn with_strip_ansi(mut self, strip_ansi: bool) -> Self {
        self.strip_ansi = strip_ansi;
        self
    }

    /// Check the configuration, including that every pattern compiles.
    pub fn validate(&self) -> Result<()> {
        if !self.delay_factor.is_finite() || self.delay_factor <= 0.0 {
            return Err(invalid(format!(
                "delay_factor must be a positive number, got {}",
                self.delay_factor
            )));
        }
        if self.outer_rounds == 0 {
            return Err(invalid("outer_rounds must be at least 1"));
        }
        if self.max_loops < self.outer_rounds {
            return Err(invalid(format!(
                "max_loops ({}) must be at least outer_rounds ({})",
                self.max_loops, self.outer_rounds
            )));
        }
        if !self.login_timeout_secs.is_finite() || self.login_timeout_secs <= 0.0 {
            return Err(invalid(format!(
                "login_timeout_secs must be a positive number, got {}",
                self.login_timeout_secs
            )));
        }
        if self.line_terminator.is_empty() || self.telnet_line_terminator.is_empty() {
            return Err(invalid("line terminators must not be empty"));
        }
        self.patterns.compile()?;
        Ok(())
    }

    /// The delay factor actually used, never below [`MIN_DELAY_FACTOR`].
    pub fn effective_delay_factor(&self) -> f64 {
        if self.delay_factor.is_finite() {
            self.delay_factor.max(MIN_DELAY_FACTOR)
        } else {
            MIN_DELAY_FACTOR
        }
    }

    /// Wall-clock budget for the SSH-style poller.
    pub fn login_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.login_timeout_secs).unwrap_or(Duration::ZERO)
    }

    /// Pause between checks while the device is talking.
    pub fn active_pause(&self) -> Duration {
        self.scaled(0.1)
    }

    /// Pause before re-reading a quiet stream.
    pub fn idle_pause(&self) -> Duration {
        self.scaled(0.5)
    }

    /// Build a fresh retry budget for one Telnet-style login call.
    pub fn retry_budget(&self) -> RetryBudget {
        let outer_rounds = self.outer_rounds.max(1);
        RetryBudget {
            outer_rounds,
            inner_attempts_per_round: (self.max_loops / outer_rounds).max(1),
            per_step_delay: self.scaled(1.0),
            escalating_timeout: self.scaled(3.0),
            initial_delay: self.scaled(2.0),
            poll_interval: self.scaled(0.1),
            final_delay: self.scaled(0.5),
        }
    }

    fn scaled(&self, seconds: f64) -> Duration {
        Duration::try_from_secs_f64(seconds * self.effective_delay_factor())
            .unwrap_or(Duration::MAX)
    }
}

fn invalid(message: impl Into<String>) -> crate::Error {
    DriverError::InvalidConfig {
        message: message.into(),
    }
    .into()
}

/// Retry budget for one Telnet-style login call.
///
/// All delays are already scaled by the delay factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    /// Number of retry rounds.
    pub outer_rounds: usize,

    /// Read/react steps per round.
    pub inner_attempts_per_round: usize,

    /// Wait after sending the username, and between rounds.
    pub per_step_delay: Duration,

    /// Wait after sending the password; banners after login are slow.
    pub escalating_timeout: Duration,

    /// Wait before the first read.
    pub initial_delay: Duration,

    /// Wait between steps inside a round.
    pub poll_interval: Duration,

    /// Wait before the last-ditch prompt check.
    pub final_delay: Duration,
}

impl RetryBudget {
    /// Upper bound on read/react steps before the last-ditch check.
    pub fn total_steps(&self) -> usize {
        self.outer_rounds * self.inner_attempts_per_round
    }

    /// The budget as reported in a timeout error.
    pub fn as_login_budget(&self) -> LoginBudget {
        LoginBudget::Steps {
            rounds: self.outer_rounds,
            attempts: self.inner_attempts_per_round,
        }
    }
}
