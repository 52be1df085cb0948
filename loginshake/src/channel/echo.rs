//! Command echo normalization for echo-less Telnet devices.
//!
//! When echo is forced on through option negotiation, some devices repaint
//! the prompt before echoing the command, so the command shows up next to a
//! stale prompt. Collapsing that keeps the trailing prompt detection in sync.

use std::borrow::Cow;

use regex::Regex;

/// Collapse a redundant echo of `command` in `output`.
///
/// `output` is split on `prompt`. Exactly two segments means a single
/// prompt-then-echo boundary, and the result is `command` followed by the
/// trailing segment. Any other split count is ambiguous and `output` is
/// returned unchanged.
pub fn normalize_echo<'a>(output: &'a str, command: &str, prompt: &Regex) -> Cow<'a, str> {
    let mut segments = prompt.split(output);
    match (segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(trailing), None) => Cow::Owned(format!("{command}{trailing}")),
        _ => Cow::Borrowed(output),
    }
}
