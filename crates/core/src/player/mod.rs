//! Song display orchestration.
//!
//! One [`KaraokePlayer::display`] call walks the song through
//! `Idle → TitleShown → (AwaitingReady) → Typing → Complete`. With audio, the
//! lyrics do not start until the playback session reports that the device is
//! consuming samples.

use std::{
    mem,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::time;

use crate::{
    AppConfig, AudioFetcher, CodesongError, CpalOutput, DetachedPlayback, DisplaySurface,
    HttpFetcher, OutputDevice, PlaybackReport, PlaybackSession, Result, Song, Tone,
    TypingSummary, TypistScheduler,
};

/// Where a display invocation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayPhase {
    Idle,
    TitleShown,
    AwaitingReady,
    Typing,
    Complete,
    Failed,
}

impl DisplayPhase {
    pub fn can_advance_to(self, next: DisplayPhase) -> bool {
        use DisplayPhase::*;

        matches!(
            (self, next),
            (Idle, TitleShown)
                | (TitleShown, AwaitingReady)
                | (TitleShown, Typing)
                | (AwaitingReady, Typing)
                | (AwaitingReady, Failed)
                | (Typing, Complete)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

#[derive(Debug)]
struct PhaseTracker<'a> {
    song: &'a str,
    phase: DisplayPhase,
}

impl<'a> PhaseTracker<'a> {
    fn new(song: &'a str) -> Self {
        Self {
            song,
            phase: DisplayPhase::Idle,
        }
    }

    fn advance(&mut self, next: DisplayPhase) -> Result<()> {
        if !self.phase.can_advance_to(next) {
            return Err(CodesongError::msg(format!(
                "illegal display transition {:?} -> {next:?}",
                self.phase
            )));
        }
        tracing::debug!(song = self.song, from = ?self.phase, to = ?next, "display phase");
        self.phase = next;
        Ok(())
    }
}

/// What a completed display produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayReport {
    pub phase: DisplayPhase,
    pub typing: TypingSummary,
    pub playback: Option<PlaybackReport>,
}

/// One player for every song; the song supplies title, lyrics, audio and
/// colours.
#[derive(Debug)]
pub struct KaraokePlayer<F = HttpFetcher, D = CpalOutput> {
    config: AppConfig,
    scheduler: TypistScheduler,
    fetcher: Arc<F>,
    device: Arc<D>,
    /// Audio tasks left running by [`crate::TimeoutPolicy::Detach`].
    detached: Mutex<Vec<DetachedPlayback>>,
}

impl KaraokePlayer {
    /// Player wired to HTTP fetching and the default sound device.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(config.gate.fetch_timeout())?;
        let device = CpalOutput::new(config.gate.device_poll());
        Ok(Self::new(config, fetcher, device))
    }
}

impl<F, D> KaraokePlayer<F, D>
where
    F: AudioFetcher,
    D: OutputDevice,
{
    pub fn new(config: AppConfig, fetcher: F, device: D) -> Self {
        Self::with_shared(config, Arc::new(fetcher), Arc::new(device))
    }

    pub fn with_shared(config: AppConfig, fetcher: Arc<F>, device: Arc<D>) -> Self {
        Self {
            scheduler: TypistScheduler::new(config.settings),
            config,
            fetcher,
            device,
            detached: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Raises the stop flag of every audio task this player detached and
    /// returns how many there were.
    ///
    /// Must be called before the runtime shuts down, which otherwise waits on
    /// a device that may never finish.
    pub fn stop_detached(&self) -> usize {
        let mut guard = self.detached.lock().unwrap_or_else(PoisonError::into_inner);
        let detached = mem::take(&mut *guard);
        drop(guard);
        for playback in &detached {
            playback.stop();
        }
        detached.len()
    }

    /// Shows the song, streaming its audio when it has any.
    pub async fn display<S>(&self, song: &Song, surface: &mut S) -> Result<DisplayReport>
    where
        S: DisplaySurface + ?Sized,
    {
        self.perform(song, song.audio_url.as_deref(), surface).await
    }

    /// Shows the song without touching the sound device.
    pub async fn display_muted<S>(&self, song: &Song, surface: &mut S) -> Result<DisplayReport>
    where
        S: DisplaySurface + ?Sized,
    {
        self.perform(song, None, surface).await
    }

    async fn perform<S>(
        &self,
        song: &Song,
        audio_url: Option<&str>,
        surface: &mut S,
    ) -> Result<DisplayReport>
    where
        S: DisplaySurface + ?Sized,
    {
        let mut tracker = PhaseTracker::new(&song.slug);
        tracing::info!(song = %song.slug, audio = audio_url.is_some(), "displaying song");

        surface.clear()?;
        surface.title(&song.title, song.theme.title)?;
        surface.separator()?;
        tracker.advance(DisplayPhase::TitleShown)?;

        let session = match audio_url {
            Some(url) => Some(self.open_gate(url, surface, &mut tracker).await?),
            None => None,
        };

        surface.status(Tone::Magenta, "🎶 Lyrics start ~\n")?;
        if session.is_none() {
            time::sleep(self.config.settings.lead_in()).await;
        }

        tracker.advance(DisplayPhase::Typing)?;
        let typing = self.scheduler.run(&song.lyrics, surface).await?;
        tracker.advance(DisplayPhase::Complete)?;

        let playback = match session {
            Some(session) => match session.finish().await {
                Ok(report) => Some(report),
                Err(err) => {
                    surface.status(Tone::Red, &format!("❌ Speaker error: {err}"))?;
                    return Err(err);
                }
            },
            None => None,
        };

        surface.status(Tone::Green, &format!("\n{}\n", song.theme.farewell))?;
        Ok(DisplayReport {
            phase: tracker.phase,
            typing,
            playback,
        })
    }

    async fn open_gate<S>(
        &self,
        url: &str,
        surface: &mut S,
        tracker: &mut PhaseTracker<'_>,
    ) -> Result<PlaybackSession>
    where
        S: DisplaySurface + ?Sized,
    {
        surface.status(Tone::Cyan, "🎧 Streaming song...")?;
        let mut session =
            PlaybackSession::start(url, Arc::clone(&self.fetcher), Arc::clone(&self.device));

        surface.status(Tone::Magenta, "🎶 Waiting for audio to start...")?;
        tracker.advance(DisplayPhase::AwaitingReady)?;

        match session
            .wait_until_started(self.config.gate.ready_timeout())
            .await
        {
            Ok(format) => {
                surface.status(
                    Tone::Yellow,
                    &format!(
                        "Audio Info: {}Hz, {} channels",
                        format.sample_rate, format.channels
                    ),
                )?;
                surface.status(Tone::Green, "✅ Music started playing...")?;
                Ok(session)
            }
            Err(err) => {
                tracker.advance(DisplayPhase::Failed)?;
                if let Some(playback) = session.abandon(self.config.gate.on_timeout) {
                    self.detached
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(playback);
                }
                surface.status(Tone::Red, &format!("❌ Audio error: {err}"))?;
                Err(err)
            }
        }
    }
}
