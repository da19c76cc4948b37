use std::{sync::Arc, time::Duration};

use tokio::{sync::watch, time};

use crate::{CodesongError, Result};

/// Interleaved 16-bit signed PCM layout handed to the output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub channels: u16,
    pub sample_rate: u32,
}

impl PcmFormat {
    pub const BITS_PER_SAMPLE: u16 = 16;
}

/// Whether audio output has begun.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Pending,
    Ready(PcmFormat),
    Failed(String),
}

impl Readiness {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Creates the write-once readiness flag of a single playback session.
pub fn readiness_channel() -> (ReadinessSignal, ReadinessWatch) {
    let (tx, rx) = watch::channel(Readiness::Pending);
    (ReadinessSignal { tx: Arc::new(tx) }, ReadinessWatch { rx })
}

/// Writer side of the readiness flag. Only the first terminal transition
/// sticks.
#[derive(Debug, Clone)]
pub struct ReadinessSignal {
    tx: Arc<watch::Sender<Readiness>>,
}

impl ReadinessSignal {
    pub fn mark_ready(&self, format: PcmFormat) -> bool {
        self.transition(Readiness::Ready(format))
    }

    pub fn mark_failed(&self, reason: impl Into<String>) -> bool {
        self.transition(Readiness::Failed(reason.into()))
    }

    pub fn current(&self) -> Readiness {
        self.tx.borrow().clone()
    }

    fn transition(&self, next: Readiness) -> bool {
        let changed = self.tx.send_if_modified(|state| {
            if state.is_terminal() {
                return false;
            }
            *state = next;
            true
        });
        if changed {
            tracing::debug!(state = ?self.current(), "readiness transitioned");
        }
        changed
    }
}

/// Reader side of the readiness flag.
#[derive(Debug, Clone)]
pub struct ReadinessWatch {
    rx: watch::Receiver<Readiness>,
}

impl ReadinessWatch {
    pub fn current(&self) -> Readiness {
        self.rx.borrow().clone()
    }

    /// Suspends until the flag reaches a terminal state or `bound` elapses.
    ///
    /// A signal dropped while still pending counts as a failure.
    pub async fn wait(&mut self, bound: Duration) -> Result<PcmFormat> {
        let outcome = time::timeout(bound, self.rx.wait_for(Readiness::is_terminal)).await;

        let state = match outcome {
            Err(_) => return Err(CodesongError::Timeout(bound)),
            Ok(Err(_)) => Readiness::Failed("playback pipeline closed before audio started".into()),
            Ok(Ok(state)) => state.clone(),
        };

        match state {
            Readiness::Ready(format) => Ok(format),
            Readiness::Failed(reason) => Err(CodesongError::Device(reason)),
            Readiness::Pending => unreachable!("wait_for only yields terminal states"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEREO: PcmFormat = PcmFormat {
        channels: 2,
        sample_rate: 44_100,
    };

    #[test]
    fn first_terminal_state_wins() {
        let (signal, watch) = readiness_channel();

        assert_eq!(watch.current(), Readiness::Pending);
        assert!(signal.mark_ready(STEREO));
        assert!(!signal.mark_failed("speaker unplugged"));
        assert!(!signal.mark_ready(STEREO));
        assert_eq!(watch.current(), Readiness::Ready(STEREO));
    }

    #[test]
    fn failure_is_also_final() {
        let (signal, watch) = readiness_channel();

        assert!(signal.mark_failed("HTTP 500"));
        assert!(!signal.mark_ready(STEREO));
        assert_eq!(watch.current(), Readiness::Failed("HTTP 500".into()));
    }

    #[tokio::test]
    async fn wait_returns_format_once_ready() {
        let (signal, mut watch) = readiness_channel();
        let waiter = tokio::spawn(async move { watch.wait(Duration::from_secs(1)).await });

        signal.mark_ready(STEREO);
        assert_eq!(waiter.await.unwrap().unwrap(), STEREO);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_times_out_within_bound() {
        let (_signal, mut watch) = readiness_channel();
        let bound = Duration::from_secs(10);

        let started = time::Instant::now();
        let err = watch.wait(bound).await.unwrap_err();

        assert!(matches!(err, CodesongError::Timeout(b) if b == bound));
        assert!(started.elapsed() <= bound + Duration::from_millis(100));
    }

    #[tokio::test]
    async fn dropped_signal_counts_as_failure() {
        let (signal, mut watch) = readiness_channel();
        drop(signal);

        let err = watch.wait(Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err.stage(), "device");
    }
}
