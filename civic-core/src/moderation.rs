//! Spam screening for submitted report text.
//!
//! A cheap local heuristic that flags meaningless text before a report enters
//! the lifecycle. It does not judge relevance; that needs an external
//! classifier.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Junk tokens that mark text as filler.
pub const DEFAULT_JUNK_WORDS: &[&str] = &["asdf", "qwerty", "uyrithjalfy", "sd;ao9fucgq3jbc", "lorem", "dummy"];

/// Why a piece of text was flagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum GibberishReason {
    Empty,
    /// Six or more characters in a row that are neither vowels nor whitespace
    ConsonantRun { run: String },
    /// Three or more capitals running straight into lowercase
    MixedCaseNoise { fragment: String },
    /// Two words or fewer and under ten characters
    TooShort,
    JunkWord { word: String },
}

impl std::fmt::Display for GibberishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "text is empty"),
            Self::ConsonantRun { run } => write!(f, "unpronounceable run '{run}'"),
            Self::MixedCaseNoise { fragment } => write!(f, "random casing '{fragment}'"),
            Self::TooShort => write!(f, "text is too short"),
            Self::JunkWord { word } => write!(f, "contains filler '{word}'"),
        }
    }
}

/// Outcome of screening a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ModerationVerdict {
    Accepted,
    Rejected { field: String, reason: GibberishReason },
}

impl ModerationVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

fn consonant_run() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    // `y` counts as a vowel so words like "rhythm" pass
    RE.get_or_init(|| Regex::new(r"[^aeiouy\s]{6,}").ok())
        .as_ref()
}

fn mixed_case() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Z]{3,}[a-z]{3,}").ok())
        .as_ref()
}

/// Gibberish screen with a configurable junk list.
#[derive(Debug, Clone)]
pub struct ModerationPolicy {
    junk_words: Vec<String>,
}

impl Default for ModerationPolicy {
    fn default() -> Self {
        Self {
            junk_words: DEFAULT_JUNK_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

impl ModerationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add junk words on top of the defaults.
    pub fn with_junk_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.junk_words
            .extend(words.into_iter().map(|w| w.into().to_lowercase()));
        self
    }

    /// Why `text` looks like gibberish, if it does.
    pub fn gibberish_reason(&self, text: &str) -> Option<GibberishReason> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Some(GibberishReason::Empty);
        }

        let lower = trimmed.to_lowercase();
        if let Some(m) = consonant_run().and_then(|re| re.find(&lower)) {
            return Some(GibberishReason::ConsonantRun {
                run: m.as_str().to_string(),
            });
        }
        if let Some(m) = mixed_case().and_then(|re| re.find(trimmed)) {
            return Some(GibberishReason::MixedCaseNoise {
                fragment: m.as_str().to_string(),
            });
        }
        if trimmed.split_whitespace().count() <= 2 && trimmed.chars().count() < 10 {
            return Some(GibberishReason::TooShort);
        }
        self.junk_words
            .iter()
            .find(|w| lower.contains(w.as_str()))
            .map(|w| GibberishReason::JunkWord { word: w.clone() })
    }

    /// Screen a title and description.
    pub fn screen(&self, title: &str, description: &str) -> ModerationVerdict {
        for (field, text) in [("title", title), ("description", description)] {
            if let Some(reason) = self.gibberish_reason(text) {
                tracing::debug!(field, %reason, "Report text flagged");
                return ModerationVerdict::Rejected {
                    field: field.to_string(),
                    reason,
                };
            }
        }
        ModerationVerdict::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_real_reports() {
        let policy = ModerationPolicy::default();
        let verdict = policy.screen(
            "Overflowing Dustbin",
            "Dustbin is overflowing and trash is spreading nearby.",
        );
        assert!(verdict.is_accepted());
        assert!(policy
            .screen("Oil in Lake", "Oil patches floating in the rhythm of the waves")
            .is_accepted());
    }

    #[test]
    fn test_flags_gibberish() {
        let policy = ModerationPolicy::default();
        assert_eq!(policy.gibberish_reason("  "), Some(GibberishReason::Empty));
        assert!(matches!(
            policy.gibberish_reason("garbage near xkcdfgh street"),
            Some(GibberishReason::ConsonantRun { .. })
        ));
        assert!(matches!(
            policy.gibberish_reason("the ABCdef report here"),
            Some(GibberishReason::MixedCaseNoise { .. })
        ));
        assert_eq!(policy.gibberish_reason("trash"), Some(GibberishReason::TooShort));
        assert_eq!(
            policy.gibberish_reason("water is dirty here #%&*!@#% please"),
            Some(GibberishReason::ConsonantRun {
                run: "#%&*!@#%".to_string()
            })
        );
        assert!(matches!(
            policy.gibberish_reason("pipe leaking near 9999999 block"),
            Some(GibberishReason::ConsonantRun { run }) if run == "9999999"
        ));
        assert!(matches!(
            policy.gibberish_reason("lorem ipsum dolor sit amet"),
            Some(GibberishReason::JunkWord { .. })
        ));
    }

    #[test]
    fn test_screen_reports_field() {
        let policy = ModerationPolicy::default();
        let verdict = policy.screen("Garbage Dump near homes", "");
        assert_eq!(
            verdict,
            ModerationVerdict::Rejected {
                field: "description".to_string(),
                reason: GibberishReason::Empty,
            }
        );
    }

    #[test]
    fn test_extra_junk_words() {
        let policy = ModerationPolicy::default().with_junk_words(["Placeholder"]);
        assert!(matches!(
            policy.gibberish_reason("this is a placeholder report"),
            Some(GibberishReason::JunkWord { word }) if word == "placeholder"
        ));
    }
}
