//! Generic login profile for appliances with conventional prompts
//! ("Username:", "login:", "Password:").

use crate::channel::PromptPatterns;
use crate::profile::LoginProfile;

/// Create the generic profile.
///
/// Credential prompts must end their line, so banners such as
/// "Last login: ..." are not taken for a username prompt.
pub fn profile() -> LoginProfile {
    LoginProfile::new("generic").with_patterns(PromptPatterns::new(
        r"(?:user(?:name)?|user name|login)\s*:\s*$",
        r"assword\s*:\s*$",
        r"#\s*$",
        r"[>$]\s*$",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::scripted::ScriptedChannel;
    use crate::login::{Credentials, LoginStrategy, TelnetLogin};

    #[test]
    fn test_generic_prompts() {
        let detector = profile().login.patterns.compile().unwrap();
        assert!(detector.scan("Username: ").username);
        assert!(detector.scan("switch login: ").username);
        assert!(detector.scan("banner\r\nUser Name:\r\n").username);
        assert!(detector.scan("Password: ").password);
        assert!(detector.is_logged_in("admin@box:~$ "));
        assert!(detector.is_logged_in("router# "));
    }

    #[test]
    fn test_last_login_banner_is_not_a_prompt() {
        let detector = profile().login.patterns.compile().unwrap();
        let detection = detector.scan("Last login: Mon Oct 12 from 10.0.0.9");
        assert!(!detection.username);
        assert!(!detection.password);
    }

    #[tokio::test(start_paused = true)]
    async fn test_password_only_login_past_last_login_banner() {
        let login = TelnetLogin::new(profile().login).unwrap();
        let mut channel = ScriptedChannel::new("router-1")
            .then("Password: ")
            .then("")
            .then("Last login: Mon Oct 12 from 10.0.0.9\r\nrouter# ");
        let credentials = Credentials::password_only("secret");

        let transcript = login.login(&mut channel, &credentials).await.unwrap();

        assert_eq!(channel.writes, vec!["secret\r"]);
        assert!(transcript.to_string().ends_with("router# "));
        assert!(!channel.closed);
    }
}
