use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Settings;

/// A single lyric line together with its optional timing overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LyricEntry {
    /// Intentional empty line that gives the next verse some breathing space.
    Blank,
    Plain(String),
    Timed {
        text: String,
        #[serde(default)]
        char_delay_ms: Option<u64>,
        #[serde(default)]
        line_delay_ms: Option<u64>,
    },
}

impl LyricEntry {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain(text.into())
    }

    pub fn timed(text: impl Into<String>, char_delay_ms: u64, line_delay_ms: u64) -> Self {
        Self::Timed {
            text: text.into(),
            char_delay_ms: Some(char_delay_ms),
            line_delay_ms: Some(line_delay_ms),
        }
    }

    /// Entry that only overrides the char delay.
    pub fn paced(text: impl Into<String>, char_delay_ms: u64) -> Self {
        Self::Timed {
            text: text.into(),
            char_delay_ms: Some(char_delay_ms),
            line_delay_ms: None,
        }
    }

    /// Entry that only overrides the pause after the line.
    pub fn held(text: impl Into<String>, line_delay_ms: u64) -> Self {
        Self::Timed {
            text: text.into(),
            char_delay_ms: None,
            line_delay_ms: Some(line_delay_ms),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Blank => "",
            Self::Plain(text) | Self::Timed { text, .. } => text,
        }
    }

    /// Only the blank marker counts; a timed entry with empty text is a
    /// regular (silent) line with its own pause.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Blank => true,
            Self::Plain(text) => text.is_empty(),
            Self::Timed { .. } => false,
        }
    }

    /// Per-character delay, falling back to the default when the override is
    /// absent or zero.
    pub fn char_delay(&self, settings: &Settings) -> Duration {
        let override_ms = match self {
            Self::Timed { char_delay_ms, .. } => *char_delay_ms,
            _ => None,
        };
        Duration::from_millis(truthy(override_ms).unwrap_or(settings.char_delay_ms))
    }

    /// Pause after the line, falling back to the default when the override is
    /// absent or zero.
    pub fn line_delay(&self, settings: &Settings) -> Duration {
        let override_ms = match self {
            Self::Timed { line_delay_ms, .. } => *line_delay_ms,
            _ => None,
        };
        Duration::from_millis(truthy(override_ms).unwrap_or(settings.line_delay_ms))
    }
}

fn truthy(value: Option<u64>) -> Option<u64> {
    value.filter(|ms| *ms > 0)
}

/// Ordered lyrics of one song, in playback order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LyricSet {
    entries: Vec<LyricEntry>,
}

impl LyricSet {
    pub fn new(entries: Vec<LyricEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[LyricEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LyricEntry> {
        self.entries.iter()
    }
}

impl From<Vec<LyricEntry>> for LyricSet {
    fn from(entries: Vec<LyricEntry>) -> Self {
        Self::new(entries)
    }
}

impl FromIterator<LyricEntry> for LyricSet {
    fn from_iter<I: IntoIterator<Item = LyricEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
