use std::io::{Cursor, ErrorKind};

use symphonia::core::{
    audio::SampleBuffer,
    codecs::DecoderOptions,
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::{MediaSourceStream, MediaSourceStreamOptions},
    meta::MetadataOptions,
    probe::Hint,
};

use crate::{CodesongError, Result};

use super::PcmFormat;

/// Decoded audio with one sample vector per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarAudio {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl PlanarAudio {
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames, bounded by the shortest channel.
    pub fn frames(&self) -> usize {
        self.channels.iter().map(Vec::len).min().unwrap_or(0)
    }

    pub fn format(&self) -> PcmFormat {
        PcmFormat {
            channels: self.channels.len() as u16,
            sample_rate: self.sample_rate,
        }
    }
}

/// Decodes an in-memory audio file into planar float samples.
pub fn decode_audio(bytes: Vec<u8>, extension: Option<&str>) -> Result<PlanarAudio> {
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let source = MediaSourceStream::new(
        Box::new(Cursor::new(bytes)),
        MediaSourceStreamOptions::default(),
    );
    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|err| decode_error("unrecognised container", err))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| CodesongError::Decode("missing default audio track".to_string()))?;
    let track_id = track.id;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|err| decode_error("unsupported codec", err))?;

    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels: Vec<Vec<f32>> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err)) if err.kind() == ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(err) => return Err(decode_error("failed to read packet", err)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(reason)) => {
                tracing::debug!(reason, "skipping corrupt packet");
                continue;
            }
            Err(err) => return Err(decode_error("failed to decode packet", err)),
        };

        let spec = *decoded.spec();
        let frames = decoded.frames();
        if frames == 0 {
            continue;
        }

        sample_rate = spec.rate;
        let channel_count = spec.channels.count();
        if channels.is_empty() {
            channels = vec![Vec::new(); channel_count];
        }

        if sample_buf
            .as_ref()
            .map_or(true, |buf| buf.capacity() < frames * channel_count)
        {
            sample_buf = None;
        }
        let buf = sample_buf
            .get_or_insert_with(|| SampleBuffer::new(decoded.capacity() as u64, spec));
        buf.copy_planar_ref(decoded);

        for (index, channel) in buf.samples().chunks(frames).enumerate() {
            if let Some(out) = channels.get_mut(index) {
                out.extend_from_slice(channel);
            }
        }
    }

    let audio = PlanarAudio {
        sample_rate,
        channels,
    };
    if audio.frames() == 0 || audio.sample_rate == 0 {
        return Err(CodesongError::Decode(
            "stream contains no audio frames".to_string(),
        ));
    }

    tracing::debug!(
        sample_rate = audio.sample_rate,
        channels = audio.channel_count(),
        frames = audio.frames(),
        "audio decoded"
    );
    Ok(audio)
}

fn decode_error(context: &str, err: SymphoniaError) -> CodesongError {
    CodesongError::Decode(format!("{context}: {err}"))
}

/// Converts one float sample to signed 16-bit PCM.
pub fn quantize(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Interleaves planar samples frame by frame, keeping channel order.
pub fn interleave_pcm16(audio: &PlanarAudio) -> Vec<i16> {
    let frames = audio.frames();
    let mut out = Vec::with_capacity(frames * audio.channel_count());
    for frame in 0..frames {
        for channel in &audio.channels {
            out.push(quantize(channel[frame]));
        }
    }
    out
}
