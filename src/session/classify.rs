//! Transcript classification.

use regex::{Captures, Regex};
use std::sync::OnceLock;

fn ansi_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // CSI sequences, OSC strings (BEL or ST terminated), then two-byte escapes.
        Regex::new(r"\x1b\[[0-9;?<>=]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-Z\\-_]")
            .expect("Invalid ANSI regex")
    })
}

fn handshake_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:logged in as\s+(?P<user>[^\s!.,]+)|welcome,?\s+(?P<name>[^\s!.,]+))")
            .expect("Invalid handshake regex")
    })
}

/// Remove terminal escape sequences from PTY output.
///
/// Cursor-forward sequences become a space, since TUIs use them in place of
/// blanks between words.
pub fn strip_ansi(text: &str) -> String {
    ansi_re()
        .replace_all(text, |caps: &Captures| {
            if caps[0].starts_with("\x1b[") && caps[0].ends_with('C') {
                " ".to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

/// A logged-in banner found in a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// The matched phrase, e.g. "Welcome Alice".
    pub phrase: String,
    /// The user or name the banner mentions.
    pub who: String,
}

/// Look for a "logged in as <user>" or "welcome <name>" banner,
/// case-insensitively, after stripping escape sequences.
///
/// # Example
///
/// ```rust
/// use cli_provisioner::classify;
///
/// let handshake = classify("\x1b[32mWelcome Alice\x1b[0m").unwrap();
/// assert_eq!(handshake.who, "Alice");
/// assert!(classify("Welcome to the tool! Please sign in.").is_none());
/// ```
pub fn classify(transcript: &str) -> Option<Handshake> {
    let clean = strip_ansi(transcript);
    handshake_re().captures_iter(&clean).find_map(|caps| {
        let who = caps.name("user").or_else(|| caps.name("name"))?.as_str();
        // "Welcome to ..." is a generic greeting, not a logged-in banner.
        if caps.name("name").is_some() && who.eq_ignore_ascii_case("to") {
            return None;
        }
        Some(Handshake {
            phrase: caps[0].to_string(),
            who: who.to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_welcome_name() {
        let handshake = classify("Starting...\r\nWelcome Alice\r\n> ").unwrap();
        assert_eq!(handshake.phrase, "Welcome Alice");
        assert_eq!(handshake.who, "Alice");
    }

    #[test]
    fn test_logged_in_as_case_insensitive() {
        let handshake = classify("LOGGED IN AS ci-bot@example.com\n").unwrap();
        assert_eq!(handshake.who, "ci-bot@example");
    }

    #[test]
    fn test_welcome_with_comma() {
        let handshake = classify("welcome, bob!").unwrap();
        assert_eq!(handshake.who, "bob");
    }

    #[test]
    fn test_welcome_to_is_not_a_handshake() {
        assert!(classify("Welcome to GitHub Copilot CLI\nError: not authenticated").is_none());
    }

    #[test]
    fn test_welcome_to_then_real_banner() {
        let handshake = classify("Welcome to GitHub Copilot CLI\nWelcome Dana").unwrap();
        assert_eq!(handshake.who, "Dana");
    }

    #[test]
    fn test_escape_sequences_between_words() {
        let transcript = "\x1b[2J\x1b[HWelcome\x1b[1CAlice\x1b[0m";
        assert_eq!(classify(transcript).unwrap().who, "Alice");
    }

    #[test]
    fn test_no_match() {
        assert!(classify("").is_none());
        assert!(classify("Invalid API key\r\n").is_none());
        assert!(classify("unwelcome guest").is_none());
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[1;32mok\x1b[0m"), "ok");
        assert_eq!(strip_ansi("\x1b]0;title\x07text"), "text");
        assert_eq!(strip_ansi("\x1b[?25lhidden cursor\x1b[?25h"), "hidden cursor");
        assert_eq!(strip_ansi("plain"), "plain");
    }
}
