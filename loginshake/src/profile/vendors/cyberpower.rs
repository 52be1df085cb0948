//! CyberPower OS login profile.
//!
//! CyberPower PDUs and UPS network cards greet with
//!
//! ```text
//! Login Name:
//! Login Password: ****
//! ```
//!
//! over both Telnet and SSH (the SSH layer itself accepts anything), and
//! land on a `>` or `#` prompt. Credentials must end in a bare `\r`.

use crate::channel::PromptPatterns;
use crate::profile::LoginProfile;

/// Create the CyberPower OS profile.
pub fn profile() -> LoginProfile {
    LoginProfile::new("cyberpower_os")
        .with_patterns(PromptPatterns::new(
            r"Login Name",
            r"Login Password",
            r"#\s*$",
            r">\s*$",
        ))
        .with_line_terminator("\r")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cyberpower_profile() {
        let profile = profile();
        assert_eq!(profile.name, "cyberpower_os");
        assert_eq!(profile.login.line_terminator, "\r");
        assert_eq!(profile.login.telnet_line_terminator, "\r\n");
        assert!(profile.login.validate().is_ok());
    }

    #[test]
    fn test_cyberpower_prompts() {
        let detector = profile().login.patterns.compile().unwrap();
        assert!(detector.scan("\r\nlogin name: ").username);
        assert!(detector.scan("Login Password: ").password);
        assert!(detector.is_logged_in("\r\nCyberPower > "));
        assert!(!detector.is_logged_in("Login Password: ****"));
    }
}
