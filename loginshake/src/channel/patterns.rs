//! Pattern matching utilities for login prompt detection.

use regex::{Match, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

/// Regex sources for the prompts a device shows during login.
///
/// This is the serializable form; compile it into a [`PromptDetector`]
/// before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptPatterns {
    /// Username prompt, matched case-insensitively.
    pub username_pattern: String,

    /// Password prompt, matched case-insensitively.
    pub password_pattern: String,

    /// Operational prompt after a successful login, matched per line.
    pub primary_terminator: String,

    /// Alternate operational prompt, matched per line.
    pub alternate_terminator: String,
}

impl Default for PromptPatterns {
    fn default() -> Self {
        Self {
            username_pattern: r"Login Name".to_string(),
            password_pattern: r"Login Password".to_string(),
            primary_terminator: r"#\s*$".to_string(),
            alternate_terminator: r">\s*$".to_string(),
        }
    }
}

impl PromptPatterns {
    /// Create a pattern set from its four regex sources.
    pub fn new(
        username_pattern: impl Into<String>,
        password_pattern: impl Into<String>,
        primary_terminator: impl Into<String>,
        alternate_terminator: impl Into<String>,
    ) -> Self {
        Self {
            username_pattern: username_pattern.into(),
            password_pattern: password_pattern.into(),
            primary_terminator: primary_terminator.into(),
            alternate_terminator: alternate_terminator.into(),
        }
    }

    /// Compile into a detector.
    pub fn compile(&self) -> Result<PromptDetector, ChannelError> {
        PromptDetector::new(self)
    }
}

/// What a piece of device output is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    /// Nothing recognizable.
    None,
    /// The device wants a username.
    Username,
    /// The device wants a password.
    Password,
    /// An operational prompt: the login went through.
    LoginSuccess,
}

/// Result of a non-exclusive scan: every prompt kind is tested independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Detection {
    pub username: bool,
    pub password: bool,
    pub logged_in: bool,
}

/// Compiled login prompt patterns.
#[derive(Debug, Clone)]
pub struct PromptDetector {
    username: Regex,
    password: Regex,
    primary: Regex,
    alternate: Regex,
}

impl PromptDetector {
    /// Compile a pattern set.
    ///
    /// Every pattern runs in multi-line mode so `$` anchors at each line
    /// end; credential prompts are also case-insensitive.
    pub fn new(patterns: &PromptPatterns) -> Result<Self, ChannelError> {
        Ok(Self {
            username: credential_regex(&patterns.username_pattern)?,
            password: credential_regex(&patterns.password_pattern)?,
            primary: terminator_regex(&patterns.primary_terminator)?,
            alternate: terminator_regex(&patterns.alternate_terminator)?,
        })
    }

    /// Find a single prompt kind in `text`.
    ///
    /// For [`Prompt::LoginSuccess`] the primary terminator is tried first.
    pub fn find<'t>(&self, prompt: Prompt, text: &'t str) -> Option<Match<'t>> {
        match prompt {
            Prompt::None => None,
            Prompt::Username => self.username.find(text),
            Prompt::Password => self.password.find(text),
            Prompt::LoginSuccess => self
                .primary
                .find(text)
                .or_else(|| self.alternate.find(text)),
        }
    }

    /// Test every prompt kind against `text`.
    pub fn scan(&self, text: &str) -> Detection {
        Detection {
            username: self.username.is_match(text),
            password: self.password.is_match(text),
            logged_in: self.is_logged_in(text),
        }
    }

    /// Classify `text` as a single prompt.
    ///
    /// An operational prompt wins; otherwise the credential prompt that
    /// appears last is what the device is currently waiting for.
    pub fn detect(&self, text: &str) -> Prompt {
        if self.is_logged_in(text) {
            return Prompt::LoginSuccess;
        }

        let username = self.last_match_start(&self.username, text);
        let password = self.last_match_start(&self.password, text);
        match (username, password) {
            (Some(u), Some(p)) if u > p => Prompt::Username,
            (_, Some(_)) => Prompt::Password,
            (Some(_), None) => Prompt::Username,
            (None, None) => Prompt::None,
        }
    }

    /// Whether either operational prompt terminator matches.
    pub fn is_logged_in(&self, text: &str) -> bool {
        self.primary.is_match(text) || self.alternate.is_match(text)
    }

    fn last_match_start(&self, re: &Regex, text: &str) -> Option<usize> {
        re.find_iter(text).last().map(|m| m.start())
    }
}

fn credential_regex(pattern: &str) -> Result<Regex, ChannelError> {
    Ok(RegexBuilder::new(pattern)
        .case_insensitive(true)
        .multi_line(true)
        .crlf(true)
        .build()?)
}

fn terminator_regex(pattern: &str) -> Result<Regex, ChannelError> {
    Ok(RegexBuilder::new(pattern)
        .multi_line(true)
        .crlf(true)
        .build()?)
}
