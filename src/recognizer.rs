//! Output recognizers
//!
//! Tool presence and login state are read from free-text command output. The
//! matching rules live behind [`OutputRecognizer`] so other tool versions or
//! locales can be supported without touching the state machine.

use regex::Regex;

/// Default version line: `<word> version <major>.<minor>.<patch>`
pub const VERSION_PATTERN: &str = r"(?P<name>\b\w+\b) version (?P<version>\d+\.\d+\.\d+)";

/// Substring `gh auth status` prints for a logged-in account
pub const ACTIVE_ACCOUNT_MARKER: &str = "Active account: true";

/// What a recognizer extracted from matching output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recognized {
    pub name: Option<String>,
    pub version: Option<String>,
}

/// Pattern-in, structured-out matcher over command output
pub trait OutputRecognizer: Send + Sync {
    /// `None` when the output does not match
    fn recognize(&self, output: &str) -> Option<Recognized>;

    fn is_match(&self, output: &str) -> bool {
        self.recognize(output).is_some()
    }
}

/// Finds a version line anywhere in the output
#[derive(Debug, Clone)]
pub struct VersionRecognizer {
    pattern: Regex,
}

impl VersionRecognizer {
    /// Use a custom pattern. Named groups `name` and `version` are captured
    /// when present.
    pub fn with_pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }
}

impl Default for VersionRecognizer {
    fn default() -> Self {
        Self {
            pattern: Regex::new(VERSION_PATTERN).expect("VERSION_PATTERN is a valid regex"),
        }
    }
}

impl OutputRecognizer for VersionRecognizer {
    fn recognize(&self, output: &str) -> Option<Recognized> {
        let captures = self.pattern.captures(output)?;
        Some(Recognized {
            name: captures.name("name").map(|m| m.as_str().to_string()),
            version: captures.name("version").map(|m| m.as_str().to_string()),
        })
    }
}

/// Matches when a fixed marker appears anywhere in the output
#[derive(Debug, Clone)]
pub struct SubstringRecognizer {
    needle: String,
}

impl SubstringRecognizer {
    pub fn new(needle: impl Into<String>) -> Self {
        Self {
            needle: needle.into(),
        }
    }

    /// Recognizer for an authenticated `gh auth status`
    pub fn active_account() -> Self {
        Self::new(ACTIVE_ACCOUNT_MARKER)
    }
}

impl OutputRecognizer for SubstringRecognizer {
    fn recognize(&self, output: &str) -> Option<Recognized> {
        output.contains(&self.needle).then(Recognized::default)
    }
}
