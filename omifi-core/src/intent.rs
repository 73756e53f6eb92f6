//! Mapping recognized utterances to assistant intents.
//!
//! Matching is tiered: exact trigger, trigger substring, bare keyword in a
//! short utterance, then category keywords as a last resort. Earlier tiers
//! always win, and within a tier declaration order decides ties.

use serde::{Deserialize, Serialize};

/// An actionable assistant command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    TakeScreenshot,
    SenseClipboard,
    ReadClipboard,
    OpenLastScreenshot,
    Help,
}

impl Intent {
    /// Short human label, used in spoken acknowledgements and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Intent::TakeScreenshot => "take screenshot",
            Intent::SenseClipboard => "sense clipboard",
            Intent::ReadClipboard => "read clipboard",
            Intent::OpenLastScreenshot => "open last screenshot",
            Intent::Help => "help",
        }
    }
}

/// Trigger phrases in declaration order. More specific phrases come before
/// phrases they could otherwise shadow in the substring tier.
const TRIGGERS: &[(&str, Intent)] = &[
    ("open last screenshot", Intent::OpenLastScreenshot),
    ("open screenshot", Intent::OpenLastScreenshot),
    ("show last screenshot", Intent::OpenLastScreenshot),
    ("take a screenshot", Intent::TakeScreenshot),
    ("capture screen", Intent::TakeScreenshot),
    ("read the clipboard", Intent::ReadClipboard),
    ("read clipboard", Intent::ReadClipboard),
    ("what's in the clipboard", Intent::ReadClipboard),
    ("sense clipboard", Intent::SenseClipboard),
    ("check clipboard", Intent::SenseClipboard),
    ("what can you do", Intent::Help),
    ("help", Intent::Help),
    ("commands", Intent::Help),
];

/// Bare keywords accepted in very short utterances ("screenshot",
/// "clipboard please"). Clipboard is listed first on purpose.
const SHORT_KEYWORDS: &[(&str, Intent)] = &[
    ("clipboard", Intent::SenseClipboard),
    ("screenshot", Intent::TakeScreenshot),
];

/// Loose category keywords for the final fallback tier. Clipboard again
/// takes precedence when both categories match.
const CATEGORIES: &[(&[&str], Intent)] = &[
    (&["clipboard", "paste", "copied"], Intent::SenseClipboard),
    (
        &["screenshot", "capture screen", "snap", "photo"],
        Intent::TakeScreenshot,
    ),
];

const SHORT_UTTERANCE_MAX_WORDS: usize = 2;

/// Lowercase, trim, and drop trailing punctuation so "Take a screenshot."
/// and "take a screenshot" resolve the same way.
pub fn normalize(utterance: &str) -> String {
    utterance
        .trim()
        .trim_end_matches(['.', '!', '?', ','])
        .trim()
        .to_lowercase()
}

/// The intent matcher. Stateless; a single instance is shared by the
/// dispatcher and the dashboard.
#[derive(Debug, Default, Clone)]
pub struct IntentTable;

impl IntentTable {
    pub fn new() -> Self {
        Self
    }

    /// Resolve an utterance to an intent, or `None` when nothing matches.
    pub fn resolve(&self, utterance: &str) -> Option<Intent> {
        let text = normalize(utterance);
        if text.is_empty() {
            return None;
        }

        // Tier 1: exact trigger.
        for (trigger, intent) in TRIGGERS {
            if text == *trigger {
                return Some(*intent);
            }
        }

        // Tier 2: trigger contained in the utterance, declaration order.
        for (trigger, intent) in TRIGGERS {
            if text.contains(trigger) {
                return Some(*intent);
            }
        }

        // Tier 3: short utterances may use a bare keyword.
        if text.split_whitespace().count() <= SHORT_UTTERANCE_MAX_WORDS {
            for (keyword, intent) in SHORT_KEYWORDS {
                if text.contains(keyword) {
                    return Some(*intent);
                }
            }
        }

        // Tier 4: category keywords anywhere in the utterance.
        for (keywords, intent) in CATEGORIES {
            if keywords.iter().any(|k| text.contains(k)) {
                return Some(*intent);
            }
        }

        None
    }

    /// All trigger phrases for an intent, for help output.
    pub fn triggers_for(&self, intent: Intent) -> Vec<&'static str> {
        TRIGGERS
            .iter()
            .filter(|(_, i)| *i == intent)
            .map(|(t, _)| *t)
            .collect()
    }
}
