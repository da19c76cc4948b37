//! Test doubles for the playback pipeline.

use std::{
    future,
    io::Cursor,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

use crate::{CodesongError, Result};

use super::{AudioFetcher, OutputDevice, PcmFormat, StartHook};

pub struct StaticFetcher(pub Result<Vec<u8>>);

impl AudioFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        match &self.0 {
            Ok(bytes) => Ok(bytes.clone()),
            Err(err) => Err(CodesongError::Fetch {
                url: url.to_string(),
                reason: err.to_string(),
            }),
        }
    }
}

pub struct NeverFetcher;

impl AudioFetcher for NeverFetcher {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
        future::pending().await
    }
}

/// Device double: optionally starts, then returns the scripted outcome.
pub struct FakeDevice {
    starts: bool,
    outcome: fn() -> Result<()>,
    pub played: Mutex<Vec<(PcmFormat, usize)>>,
}

impl FakeDevice {
    pub fn new(starts: bool, outcome: fn() -> Result<()>) -> Arc<Self> {
        Arc::new(Self {
            starts,
            outcome,
            played: Mutex::new(Vec::new()),
        })
    }
}

impl OutputDevice for FakeDevice {
    fn play(
        &self,
        format: PcmFormat,
        samples: Vec<i16>,
        on_start: StartHook,
        _stop: Arc<AtomicBool>,
    ) -> Result<()> {
        if self.starts {
            on_start();
        }
        self.played.lock().unwrap().push((format, samples.len()));
        (self.outcome)()
    }
}

/// Device that opens but never pulls a sample, spinning until stopped.
#[derive(Default)]
pub struct StallingDevice {
    entered: AtomicBool,
    exited: AtomicBool,
    stop: Mutex<Option<Arc<AtomicBool>>>,
}

impl StallingDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn entered(&self) -> bool {
        self.entered.load(Ordering::SeqCst)
    }

    pub fn exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }

    pub fn stop_raised(&self) -> bool {
        self.stop
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|stop| stop.load(Ordering::SeqCst))
    }
}

impl OutputDevice for StallingDevice {
    fn play(
        &self,
        _format: PcmFormat,
        _samples: Vec<i16>,
        _on_start: StartHook,
        stop: Arc<AtomicBool>,
    ) -> Result<()> {
        *self.stop.lock().unwrap() = Some(Arc::clone(&stop));
        self.entered.store(true, Ordering::SeqCst);
        while !stop.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(1));
        }
        self.exited.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Polls `condition` in real time until it holds, failing after two seconds.
pub async fn eventually(what: &str, condition: impl Fn() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}

pub fn wav_bytes() -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..400i16 {
            writer.write_sample(i).unwrap();
            writer.write_sample(-i).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}
