use std::{fs, path::Path, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub settings: Settings,
    pub gate: GateConfig,
    pub display: DisplayConfig,
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing sections fall back to their
    /// defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Typing pace shared by every lyric of a player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub char_delay_ms: u64,
    pub line_delay_ms: u64,
    /// Applied to the char delay after `. ! ? , ; :`.
    pub pause_multiplier: f64,
    /// Pause before the first lyric when no audio is played.
    pub lead_in_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            char_delay_ms: 30,
            line_delay_ms: 800,
            pause_multiplier: 2.5,
            lead_in_ms: 1000,
        }
    }
}

impl Settings {
    pub fn char_delay(&self) -> Duration {
        Duration::from_millis(self.char_delay_ms)
    }

    pub fn line_delay(&self) -> Duration {
        Duration::from_millis(self.line_delay_ms)
    }

    pub fn lead_in(&self) -> Duration {
        Duration::from_millis(self.lead_in_ms)
    }
}

/// What happens to the audio task when it fails to start in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Leave the playback task running on its own.
    #[default]
    Detach,
    /// Stop the device and abort the playback task.
    TearDown,
}

/// Configuration of the playback readiness gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub ready_timeout_ms: u64,
    pub on_timeout: TimeoutPolicy,
    pub fetch_timeout_ms: u64,
    /// How often the device thread checks for drained output or a stop
    /// request.
    pub device_poll_ms: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            ready_timeout_ms: 10_000,
            on_timeout: TimeoutPolicy::Detach,
            fetch_timeout_ms: 60_000,
            device_poll_ms: 50,
        }
    }
}

impl GateConfig {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn device_poll(&self) -> Duration {
        Duration::from_millis(self.device_poll_ms.max(1))
    }
}

/// Terminal presentation options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// FIGlet font file; the built-in standard font is used when unset.
    pub banner_font: Option<PathBuf>,
    pub clear_screen: bool,
    /// Printed at the start of every lyric line.
    pub prefix: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            banner_font: None,
            clear_screen: true,
            prefix: "🎵 ".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_player_constants() {
        let config = AppConfig::default();
        assert_eq!(config.settings.char_delay_ms, 30);
        assert_eq!(config.settings.line_delay_ms, 800);
        assert_eq!(config.settings.pause_multiplier, 2.5);
        assert_eq!(config.gate.ready_timeout(), Duration::from_secs(10));
        assert_eq!(config.gate.on_timeout, TimeoutPolicy::Detach);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = AppConfig::from_json(
            r#"{ "settings": { "line_delay_ms": 500 }, "gate": { "on_timeout": "tear_down" } }"#,
        )
        .unwrap();

        assert_eq!(config.settings.line_delay_ms, 500);
        assert_eq!(config.settings.char_delay_ms, 30);
        assert_eq!(config.gate.on_timeout, TimeoutPolicy::TearDown);
        assert_eq!(config.gate.ready_timeout_ms, 10_000);
        assert!(config.display.clear_screen);
    }

    #[test]
    fn rejects_malformed_json() {
        let err = AppConfig::from_json("{ settings: ").unwrap_err();
        assert_eq!(err.stage(), "config");
    }
}
