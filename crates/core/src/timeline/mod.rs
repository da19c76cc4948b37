//! Lyric typing schedule.
//!
//! A [`LyricSet`] is first flattened into a list of [`TypingStep`]s and then
//! executed against a [`LyricSink`]. Planning is pure, so the emitted sequence
//! and every pause can be inspected without waiting for them.

use std::time::Duration;

use tokio::time::{self, Instant};

use crate::{LyricEntry, LyricSet, Result, Settings};

/// Characters that hold the cursor for `pause_multiplier` times longer.
pub const PUNCTUATION: [char; 6] = ['.', '!', '?', ',', ';', ':'];

/// Receives the typed output one character at a time.
pub trait LyricSink {
    fn begin_line(&mut self) -> Result<()>;
    fn emit(&mut self, ch: char) -> Result<()>;
    fn end_line(&mut self) -> Result<()>;
}

/// One unit of the typing animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingStep {
    LineStart,
    /// Write `ch`, then hold for `hold` before the next step.
    Char { ch: char, hold: Duration },
    LineEnd,
    Pause(Duration),
}

impl TypingStep {
    pub fn duration(&self) -> Duration {
        match self {
            Self::Char { hold, .. } => *hold,
            Self::Pause(pause) => *pause,
            Self::LineStart | Self::LineEnd => Duration::ZERO,
        }
    }
}

/// Counters reported once a lyric set has been fully typed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypingSummary {
    pub lines: usize,
    pub chars: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct TypistScheduler {
    settings: Settings,
}

impl TypistScheduler {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// How long the cursor stays on `ch` when typed with `char_delay`.
    pub fn char_hold(&self, ch: char, char_delay: Duration) -> Duration {
        if PUNCTUATION.contains(&ch) {
            let nanos = char_delay.as_nanos() as f64 * self.settings.pause_multiplier;
            Duration::from_nanos(nanos.round() as u64)
        } else {
            char_delay
        }
    }

    /// Flattens the lyric set into the exact sequence of writes and pauses.
    pub fn plan(&self, lyrics: &LyricSet) -> Vec<TypingStep> {
        let entries = lyrics.entries();
        let mut steps = Vec::new();

        for (index, entry) in entries.iter().enumerate() {
            let next = entries.get(index + 1);
            self.plan_entry(entry, next, &mut steps);
        }

        steps
    }

    fn plan_entry(
        &self,
        entry: &LyricEntry,
        next: Option<&LyricEntry>,
        steps: &mut Vec<TypingStep>,
    ) {
        let char_delay = entry.char_delay(&self.settings);

        steps.push(TypingStep::LineStart);
        for ch in entry.text().chars() {
            steps.push(TypingStep::Char {
                ch,
                hold: self.char_hold(ch, char_delay),
            });
        }
        steps.push(TypingStep::LineEnd);

        // The last line ends the song; nothing follows it.
        let Some(next) = next else {
            return;
        };

        steps.push(TypingStep::Pause(entry.line_delay(&self.settings)));
        if entry.is_blank() && !next.is_blank() {
            steps.push(TypingStep::Pause(self.settings.line_delay() * 2));
        }
    }

    /// Total time the plan for `lyrics` takes to play out.
    pub fn planned_duration(&self, lyrics: &LyricSet) -> Duration {
        self.plan(lyrics).iter().map(TypingStep::duration).sum()
    }

    /// Types every entry into `sink`, returning after the last character's
    /// hold has elapsed.
    pub async fn run<S: LyricSink + ?Sized>(
        &self,
        lyrics: &LyricSet,
        sink: &mut S,
    ) -> Result<TypingSummary> {
        let started = Instant::now();
        let mut summary = TypingSummary::default();

        for step in self.plan(lyrics) {
            match step {
                TypingStep::LineStart => sink.begin_line()?,
                TypingStep::Char { ch, hold } => {
                    sink.emit(ch)?;
                    summary.chars += 1;
                    pause(hold).await;
                }
                TypingStep::LineEnd => {
                    sink.end_line()?;
                    summary.lines += 1;
                }
                TypingStep::Pause(duration) => pause(duration).await,
            }
        }

        summary.elapsed = started.elapsed();
        tracing::debug!(lines = summary.lines, chars = summary.chars, "lyrics typed");
        Ok(summary)
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        time::sleep(duration).await;
    }
}
