//! Audio device integration using cpal.
//!
//! The stream is opened with the decoded channel count and sample rate. The
//! device reports "started" from the audio callback the first time it asks for
//! data, and stream errors raised by the backend are returned from
//! [`OutputDevice::play`].

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
        Arc,
    },
    thread,
    time::Duration,
};

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    FromSample, Sample, SampleFormat, SampleRate, SizedSample, StreamConfig,
    SupportedStreamConfig,
};

use crate::{CodesongError, Result};

use super::PcmFormat;

/// Callback fired once when the device begins consuming samples.
pub type StartHook = Box<dyn FnOnce() + Send + 'static>;

/// Sound output that plays an interleaved 16-bit buffer to completion.
pub trait OutputDevice: Send + Sync + 'static {
    /// Blocks until every sample has been played, the stream fails, or `stop`
    /// is raised.
    ///
    /// `on_start` must be called at most once, when the device starts pulling
    /// data. Errors raised before that point mean the device never opened.
    fn play(
        &self,
        format: PcmFormat,
        samples: Vec<i16>,
        on_start: StartHook,
        stop: Arc<AtomicBool>,
    ) -> Result<()>;
}

/// Default system output through cpal.
#[derive(Debug, Clone)]
pub struct CpalOutput {
    poll_interval: Duration,
}

impl CpalOutput {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

impl Default for CpalOutput {
    fn default() -> Self {
        Self::new(Duration::from_millis(50))
    }
}

impl OutputDevice for CpalOutput {
    fn play(
        &self,
        format: PcmFormat,
        samples: Vec<i16>,
        on_start: StartHook,
        stop: Arc<AtomicBool>,
    ) -> Result<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| CodesongError::Device("no default output device".to_string()))?;
        let config = select_config(&device, format)?;
        let sample_format = config.sample_format();
        let stream_config: StreamConfig = config.into();

        let (events, outcome) = mpsc::channel();
        let feeder = SampleFeeder::new(samples, on_start, events.clone());

        // cpal streams are not Send; this one lives and dies on this thread.
        let stream = match sample_format {
            SampleFormat::I16 => open_stream::<i16>(&device, &stream_config, feeder, events)?,
            SampleFormat::F32 => open_stream::<f32>(&device, &stream_config, feeder, events)?,
            SampleFormat::U16 => open_stream::<u16>(&device, &stream_config, feeder, events)?,
            other => {
                return Err(CodesongError::Device(format!(
                    "unsupported output sample format: {other:?}"
                )))
            }
        };
        stream
            .play()
            .map_err(|err| CodesongError::Device(format!("failed to start output stream: {err}")))?;
        tracing::debug!(?sample_format, "output stream playing");

        await_output(&outcome, &stop, self.poll_interval)?;
        if !stop.load(Ordering::Relaxed) {
            // Let the last device buffer drain before the stream is dropped.
            thread::sleep(self.poll_interval);
        }
        Ok(())
    }
}

/// Picks a stream config with exactly the decoded layout, preferring 16-bit
/// samples.
fn select_config(device: &cpal::Device, format: PcmFormat) -> Result<SupportedStreamConfig> {
    let rate = SampleRate(format.sample_rate);
    let ranges = device
        .supported_output_configs()
        .map_err(|err| CodesongError::Device(format!("failed to query output configs: {err}")))?;

    let mut fallback = None;
    for range in ranges {
        if range.channels() != format.channels
            || rate < range.min_sample_rate()
            || rate > range.max_sample_rate()
        {
            continue;
        }
        let config = range.with_sample_rate(rate);
        if config.sample_format() == SampleFormat::I16 {
            return Ok(config);
        }
        if fallback.is_none() {
            fallback = Some(config);
        }
    }

    fallback.ok_or_else(|| {
        CodesongError::Device(format!(
            "output device does not support {} channels at {} Hz",
            format.channels, format.sample_rate
        ))
    })
}

fn open_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut feeder: SampleFeeder,
    errors: Sender<OutputEvent>,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<i16>,
{
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| feeder.fill(data),
            move |err| {
                let _ = errors.send(OutputEvent::Failed(err.to_string()));
            },
            None,
        )
        .map_err(|err| CodesongError::Device(format!("failed to open output stream: {err}")))
}

/// Reported from the audio callbacks to the playing thread.
#[derive(Debug, Clone, PartialEq, Eq)]
enum OutputEvent {
    /// The last sample has been handed to the device.
    Drained,
    Failed(String),
}

/// Blocks until the stream drains, fails, or `stop` is raised.
fn await_output(
    events: &Receiver<OutputEvent>,
    stop: &AtomicBool,
    poll: Duration,
) -> Result<()> {
    loop {
        if stop.load(Ordering::Relaxed) {
            tracing::debug!("playback stopped on request");
            return Ok(());
        }
        match events.recv_timeout(poll) {
            Ok(OutputEvent::Drained) => return Ok(()),
            Ok(OutputEvent::Failed(reason)) => {
                return Err(CodesongError::Device(format!("output stream failed: {reason}")))
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                return Err(CodesongError::Device(
                    "output stream closed unexpectedly".to_string(),
                ))
            }
        }
    }
}

/// State owned by the data callback: the interleaved buffer and its cursor.
struct SampleFeeder {
    samples: Vec<i16>,
    cursor: usize,
    on_start: Option<StartHook>,
    events: Sender<OutputEvent>,
    drained: bool,
}

impl SampleFeeder {
    fn new(samples: Vec<i16>, on_start: StartHook, events: Sender<OutputEvent>) -> Self {
        Self {
            samples,
            cursor: 0,
            on_start: Some(on_start),
            events,
            drained: false,
        }
    }

    fn fill<T>(&mut self, out: &mut [T])
    where
        T: Sample + FromSample<i16>,
    {
        if let Some(hook) = self.on_start.take() {
            hook();
        }

        let pending = &self.samples[self.cursor..];
        let count = pending.len().min(out.len());
        for (slot, sample) in out.iter_mut().zip(&pending[..count]) {
            *slot = T::from_sample(*sample);
        }
        for slot in &mut out[count..] {
            *slot = T::EQUILIBRIUM;
        }
        self.cursor += count;

        if self.cursor == self.samples.len() && !self.drained {
            self.drained = true;
            let _ = self.events.send(OutputEvent::Drained);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_hook(counter: &Arc<AtomicUsize>) -> StartHook {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn feeder_fires_hook_once_and_pads_with_silence() {
        let fired = Arc::new(AtomicUsize::new(0));
        let (events, outcome) = mpsc::channel();
        let mut feeder = SampleFeeder::new(vec![1, 2, 3, 4, 5], counting_hook(&fired), events);

        let mut first = [9i16; 4];
        feeder.fill(&mut first);
        assert_eq!(first, [1, 2, 3, 4]);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(outcome.try_recv().is_err());

        let mut second = [9i16; 4];
        feeder.fill(&mut second);
        assert_eq!(second, [5, 0, 0, 0]);
        assert_eq!(outcome.try_recv(), Ok(OutputEvent::Drained));

        let mut third = [9i16; 2];
        feeder.fill(&mut third);
        assert_eq!(third, [0, 0]);
        assert!(outcome.try_recv().is_err());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn feeder_converts_for_float_devices() {
        let fired = Arc::new(AtomicUsize::new(0));
        let (events, _outcome) = mpsc::channel();
        let mut feeder =
            SampleFeeder::new(vec![i16::MIN, 0, i16::MAX], counting_hook(&fired), events);

        let mut out = [1.0f32; 4];
        feeder.fill(&mut out);

        assert_eq!(out[0], -1.0);
        assert_eq!(out[1], 0.0);
        assert!(out[2] > 0.99);
        assert_eq!(out[3], 0.0);
    }

    #[test]
    fn stream_error_after_start_is_returned() {
        let (events, outcome) = mpsc::channel();
        let stop = AtomicBool::new(false);
        events
            .send(OutputEvent::Failed("device unplugged".to_string()))
            .unwrap();

        let err = await_output(&outcome, &stop, Duration::from_millis(1)).unwrap_err();

        assert_eq!(err.stage(), "device");
        assert!(err.to_string().contains("device unplugged"));
    }

    #[test]
    fn drained_stream_finishes_cleanly() {
        let (events, outcome) = mpsc::channel();
        let stop = AtomicBool::new(false);
        events.send(OutputEvent::Drained).unwrap();

        assert!(await_output(&outcome, &stop, Duration::from_millis(1)).is_ok());
    }

    #[test]
    fn stop_flag_ends_the_wait() {
        let (_events, outcome) = mpsc::channel::<OutputEvent>();
        let stop = Arc::new(AtomicBool::new(false));

        let raiser = {
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                stop.store(true, Ordering::SeqCst);
            })
        };

        assert!(await_output(&outcome, &stop, Duration::from_millis(5)).is_ok());
        raiser.join().unwrap();
    }

    #[test]
    fn closed_stream_is_a_device_error() {
        let (events, outcome) = mpsc::channel::<OutputEvent>();
        drop(events);
        let stop = AtomicBool::new(false);

        let err = await_output(&outcome, &stop, Duration::from_millis(1)).unwrap_err();
        assert_eq!(err.stage(), "device");
    }
}
