//! Playback readiness gate.
//!
//! A [`PlaybackSession`] fetches, decodes and plays one audio resource on its
//! own task. The display side only observes it through the session's
//! readiness flag and, at the very end, through [`PlaybackSession::finish`].

mod decode;
mod device;
mod fetch;
mod readiness;
#[cfg(test)]
pub(crate) mod testing;

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::task::{self, JoinHandle};

use crate::{CodesongError, Result, TimeoutPolicy};

pub use decode::{decode_audio, interleave_pcm16, quantize, PlanarAudio};
pub use device::{CpalOutput, OutputDevice, StartHook};
pub use fetch::{extension_hint, AudioFetcher, HttpFetcher};
pub use readiness::{readiness_channel, PcmFormat, Readiness, ReadinessSignal, ReadinessWatch};

/// Outcome of a playback that ran to the end of its buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackReport {
    pub format: PcmFormat,
    pub frames: usize,
}

/// Audio task left running after its session was abandoned.
///
/// Whoever holds it is responsible for stopping the device before the
/// runtime shuts down.
#[derive(Debug, Clone)]
pub struct DetachedPlayback {
    url: String,
    stop: Arc<AtomicBool>,
}

impl DetachedPlayback {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Asks the device to stop; the task then winds down on its own.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
        tracing::info!(url = %self.url, "detached audio task stopped");
    }
}

/// Per-invocation handle over the audio task.
#[derive(Debug)]
pub struct PlaybackSession {
    url: String,
    readiness: ReadinessWatch,
    stop: Arc<AtomicBool>,
    task: Option<JoinHandle<Result<PlaybackReport>>>,
}

impl PlaybackSession {
    /// Spawns the fetch → decode → play pipeline without waiting for it.
    pub fn start<F, D>(url: impl Into<String>, fetcher: Arc<F>, device: Arc<D>) -> Self
    where
        F: AudioFetcher,
        D: OutputDevice,
    {
        let url = url.into();
        let (signal, readiness) = readiness_channel();
        let stop = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(run_pipeline(
            url.clone(),
            fetcher,
            device,
            signal,
            Arc::clone(&stop),
        ));

        Self {
            url,
            readiness,
            stop,
            task: Some(task),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness.current()
    }

    /// Suspends until the device reports that sound is playing.
    ///
    /// When the pipeline fails first, the pipeline's own error is returned
    /// instead of the generic readiness failure.
    pub async fn wait_until_started(&mut self, bound: Duration) -> Result<PcmFormat> {
        match self.readiness.wait(bound).await {
            Ok(format) => Ok(format),
            Err(CodesongError::Timeout(bound)) => Err(CodesongError::Timeout(bound)),
            Err(readiness_err) => match self.task.take() {
                Some(handle) => match join(handle).await {
                    Err(err) => Err(err),
                    Ok(_) => Err(readiness_err),
                },
                None => Err(readiness_err),
            },
        }
    }

    /// Awaits the end of playback.
    pub async fn finish(mut self) -> Result<PlaybackReport> {
        match self.task.take() {
            Some(handle) => join(handle).await,
            None => Err(CodesongError::msg("playback task already consumed")),
        }
    }

    /// Gives up on the session after its wait failed.
    ///
    /// Under [`TimeoutPolicy::Detach`] the still-running task is handed back
    /// so the caller can stop it later.
    pub fn abandon(mut self, policy: TimeoutPolicy) -> Option<DetachedPlayback> {
        let handle = self.task.take()?;
        match policy {
            TimeoutPolicy::Detach => {
                tracing::warn!(url = %self.url, "leaving audio task running in the background");
                Some(DetachedPlayback {
                    url: self.url,
                    stop: self.stop,
                })
            }
            TimeoutPolicy::TearDown => {
                self.stop.store(true, Ordering::Relaxed);
                handle.abort();
                tracing::info!(url = %self.url, "audio task torn down");
                None
            }
        }
    }
}

async fn join(handle: JoinHandle<Result<PlaybackReport>>) -> Result<PlaybackReport> {
    match handle.await {
        Ok(result) => result,
        Err(err) if err.is_cancelled() => Err(CodesongError::msg("playback task was cancelled")),
        Err(err) => Err(CodesongError::msg(format!("playback task panicked: {err}"))),
    }
}

async fn run_pipeline<F, D>(
    url: String,
    fetcher: Arc<F>,
    device: Arc<D>,
    signal: ReadinessSignal,
    stop: Arc<AtomicBool>,
) -> Result<PlaybackReport>
where
    F: AudioFetcher,
    D: OutputDevice,
{
    let result = play_url(&url, fetcher.as_ref(), device, &signal, stop).await;

    if let Err(err) = &result {
        if signal.mark_failed(err.to_string()) {
            tracing::warn!(%url, stage = err.stage(), error = %err, "audio failed before starting");
        } else {
            tracing::warn!(%url, stage = err.stage(), error = %err, "audio failed during playback");
        }
    }
    result
}

async fn play_url<F, D>(
    url: &str,
    fetcher: &F,
    device: Arc<D>,
    signal: &ReadinessSignal,
    stop: Arc<AtomicBool>,
) -> Result<PlaybackReport>
where
    F: AudioFetcher,
    D: OutputDevice,
{
    let bytes = fetcher.fetch(url).await?;

    let hint = extension_hint(url);
    let audio = task::spawn_blocking(move || decode_audio(bytes, hint.as_deref()))
        .await
        .map_err(|err| CodesongError::Decode(format!("decoder task failed: {err}")))??;

    let format = audio.format();
    let frames = audio.frames();
    let samples = interleave_pcm16(&audio);
    drop(audio);
    tracing::info!(
        sample_rate = format.sample_rate,
        channels = format.channels,
        frames,
        "audio decoded, opening device"
    );

    let on_start = {
        let signal = signal.clone();
        Box::new(move || {
            signal.mark_ready(format);
        }) as StartHook
    };
    task::spawn_blocking(move || device.play(format, samples, on_start, stop))
        .await
        .map_err(|err| CodesongError::Device(format!("device task failed: {err}")))??;

    Ok(PlaybackReport { format, frames })
}
