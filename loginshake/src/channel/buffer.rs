//! Transcript of everything read during a login attempt.
//!
//! Devices paint banners and menus with ANSI escape sequences; those are
//! stripped on the way in (vte-based) so prompt patterns see plain text.

use std::fmt;

use vte::{Parser, Perform};

/// Collects printable text from the vte parser.
struct Printable {
    out: String,
}

impl Perform for Printable {
    fn print(&mut self, c: char) {
        self.out.push(c);
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.out.push(byte as char);
        }
    }
}

/// Append-only record of the chunks read during one login call.
pub struct Transcript {
    chunks: Vec<String>,

    /// Whether to strip ANSI escapes from recorded chunks.
    strip_ansi: bool,

    /// Keeps escape sequences split across reads intact.
    parser: Parser,
}

impl Transcript {
    /// Create an empty transcript.
    pub fn new(strip_ansi: bool) -> Self {
        Self {
            chunks: Vec::new(),
            strip_ansi,
            parser: Parser::new(),
        }
    }

    /// Record a raw chunk and return the text that was stored.
    ///
    /// Empty reads are not recorded.
    pub fn record(&mut self, raw: &str) -> String {
        if raw.is_empty() {
            return String::new();
        }

        let text = if self.strip_ansi {
            let mut printable = Printable {
                out: String::with_capacity(raw.len()),
            };
            self.parser.advance(&mut printable, raw.as_bytes());
            printable.out
        } else {
            raw.to_string()
        };

        if !text.is_empty() {
            self.chunks.push(text.clone());
        }
        text
    }

    /// The most recent chunk, if any.
    pub fn last_chunk(&self) -> Option<&str> {
        self.chunks.last().map(String::as_str)
    }

    /// Last non-empty line of the transcript, trimmed.
    ///
    /// After a successful login this is the device's operational prompt.
    pub fn trailing_prompt(&self) -> Option<String> {
        let text = self.chunks.concat();
        text.lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
    }

    /// Number of recorded chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Check if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Concatenate the chunks into one string.
    pub fn into_string(self) -> String {
        self.chunks.concat()
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in &self.chunks {
            f.write_str(chunk)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transcript")
            .field("chunks", &self.chunks)
            .field("strip_ansi", &self.strip_ansi)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_strips_ansi() {
        let mut transcript = Transcript::new(true);
        assert_eq!(transcript.record("\x1b[32mGreen text\x1b[0m"), "Green text");
        assert_eq!(transcript.record("a\r\nb\tc\x07"), "a\r\nb\tc");
        assert_eq!(transcript.to_string(), "Green texta\r\nb\tc");
    }

    #[test]
    fn test_record_skips_empty_reads() {
        let mut transcript = Transcript::new(true);
        assert_eq!(transcript.record(""), "");
        assert!(transcript.is_empty());

        transcript.record("Login Name:");
        transcript.record("");
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.last_chunk(), Some("Login Name:"));
    }

    #[test]
    fn test_escape_split_across_reads() {
        let mut transcript = Transcript::new(true);
        assert_eq!(transcript.record("Login\x1b["), "Login");
        assert_eq!(transcript.record("1m Name:"), " Name:");
        assert_eq!(transcript.to_string(), "Login Name:");
    }

    #[test]
    fn test_raw_mode_keeps_escapes() {
        let mut transcript = Transcript::new(false);
        transcript.record("\x1b[1mups>\x1b[0m");
        assert_eq!(transcript.into_string(), "\x1b[1mups>\x1b[0m");
    }

    #[test]
    fn test_trailing_prompt() {
        let mut transcript = Transcript::new(true);
        assert_eq!(transcript.trailing_prompt(), None);

        transcript.record("Login Password: ****\r\n");
        transcript.record("\r\nCyber");
        transcript.record("Power> \r\n\r\n");
        assert_eq!(transcript.trailing_prompt().as_deref(), Some("CyberPower>"));
    }
}
