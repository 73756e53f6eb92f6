//! Wake phrase detection over transcribed text.

/// A wake hit. `trailing_command` carries any text spoken after the
/// phrase in the same utterance ("hey omifi take a screenshot").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WakeHit {
    pub trailing_command: Option<String>,
}

/// Case-insensitive substring matcher for the configured wake phrase.
#[derive(Debug, Clone)]
pub struct WakePhrase {
    phrase: String,
}

impl WakePhrase {
    pub fn new(phrase: impl AsRef<str>) -> Self {
        Self {
            phrase: phrase.as_ref().trim().to_lowercase(),
        }
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// Check a transcript for the wake phrase. Returns `None` when absent.
    pub fn detect(&self, transcript: &str) -> Option<WakeHit> {
        let text = transcript.to_lowercase();
        let idx = text.find(&self.phrase)?;
        let trailing = text[idx + self.phrase.len()..].trim();
        Some(WakeHit {
            trailing_command: if trailing.is_empty() {
                None
            } else {
                Some(trailing.to_string())
            },
        })
    }
}
