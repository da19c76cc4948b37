//! Core library for codesong, a terminal karaoke player.
//!
//! Each module owns one concern: the lyric model, the typing schedule, the
//! audio readiness gate, terminal rendering, the built-in catalog and the
//! player that ties them together for a single song.

pub mod audio;
pub mod catalog;
pub mod config;
pub mod error;
pub mod lyrics;
pub mod player;
pub mod render;
pub mod timeline;

pub use audio::{
    AudioFetcher, CpalOutput, DetachedPlayback, HttpFetcher, OutputDevice, PcmFormat,
    PlaybackReport, PlaybackSession, Readiness,
};
pub use catalog::{builtin_songs, find_song, Song, Theme};
pub use config::{AppConfig, DisplayConfig, GateConfig, Settings, TimeoutPolicy};
pub use error::{CodesongError, Result};
pub use lyrics::{LyricEntry, LyricSet};
pub use player::{DisplayPhase, DisplayReport, KaraokePlayer};
pub use render::{Banner, DisplaySurface, Palette, Terminal, Tone};
pub use timeline::{LyricSink, TypingStep, TypingSummary, TypistScheduler};
