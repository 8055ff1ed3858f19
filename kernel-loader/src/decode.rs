use std::error::Error;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::KernelSet;

#[derive(Debug)]
pub enum KernelLoadError {
    Io(PathBuf, std::io::Error),
    UnsupportedFormat(PathBuf),
    NoTrackFound(PathBuf),
    NoChannelsFound(PathBuf),
    DecoderUnavailable(PathBuf),
    ChannelOutOfRange(PathBuf, usize),
}

impl Error for KernelLoadError {}

impl fmt::Display for KernelLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelLoadError::Io(p, e) => write!(f, "could not open kernel file {:?}: {}", p, e),
            KernelLoadError::UnsupportedFormat(p) => {
                write!(f, "could not probe kernel file format: {:?}", p)
            }
            KernelLoadError::NoTrackFound(p) => {
                write!(f, "kernel file {:?} has no audio track", p)
            }
            KernelLoadError::NoChannelsFound(p) => {
                write!(f, "kernel file {:?} has no channels", p)
            }
            KernelLoadError::DecoderUnavailable(p) => {
                write!(f, "no decoder available for kernel file {:?}", p)
            }
            KernelLoadError::ChannelOutOfRange(p, ch) => {
                write!(f, "kernel file {:?} has no channel {}", p, ch)
            }
        }
    }
}

/// Decode every channel of a sound file into separate `Vec<f32>` buffers, at
/// its native sample rate (no resampling: the engine never changes sample
/// rate internally).
pub(crate) fn decode_file(path: &Path) -> Result<KernelSet, KernelLoadError> {
    let file = File::open(path).map_err(|e| KernelLoadError::Io(path.to_path_buf(), e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|_| KernelLoadError::UnsupportedFormat(path.to_path_buf()))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| KernelLoadError::NoTrackFound(path.to_path_buf()))?
        .clone();
    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.unwrap_or(44_100);
    let n_channels = track
        .codec_params
        .channels
        .ok_or_else(|| KernelLoadError::NoChannelsFound(path.to_path_buf()))?
        .count();

    if n_channels == 0 {
        return Err(KernelLoadError::NoChannelsFound(path.to_path_buf()));
    }

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|_| KernelLoadError::DecoderUnavailable(path.to_path_buf()))?;

    let mut channels: Vec<Vec<f32>> = (0..n_channels).map(|_| Vec::new()).collect();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(_)) => break,
            Err(e) => {
                log::warn!("stopped decoding kernel file {:?}: {}", path, e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => push_planar_samples(&decoded, &mut channels),
            Err(symphonia::core::errors::Error::DecodeError(err)) => {
                log::warn!("kernel decode warning for {:?}: {}", path, err);
            }
            Err(e) => {
                log::warn!("stopped decoding kernel file {:?}: {}", path, e);
                break;
            }
        }
    }

    Ok(KernelSet { channels, sample_rate })
}

fn push_planar_samples(decoded: &AudioBufferRef, channels: &mut [Vec<f32>]) {
    macro_rules! push_from {
        ($buf:expr) => {{
            let n = channels.len().min($buf.spec().channels.count());
            for ch in 0..n {
                channels[ch].extend_from_slice($buf.chan(ch));
            }
        }};
    }

    match decoded {
        AudioBufferRef::F32(buf) => push_from!(buf),
        AudioBufferRef::U8(buf) => push_converted(buf, channels),
        AudioBufferRef::U16(buf) => push_converted(buf, channels),
        AudioBufferRef::U24(buf) => push_converted(buf, channels),
        AudioBufferRef::U32(buf) => push_converted(buf, channels),
        AudioBufferRef::S8(buf) => push_converted(buf, channels),
        AudioBufferRef::S16(buf) => push_converted(buf, channels),
        AudioBufferRef::S24(buf) => push_converted(buf, channels),
        AudioBufferRef::S32(buf) => push_converted(buf, channels),
        AudioBufferRef::F64(buf) => push_converted(buf, channels),
    }
}

fn push_converted<S>(
    buf: &symphonia::core::audio::AudioBuffer<S>,
    channels: &mut [Vec<f32>],
) where
    S: symphonia::core::sample::Sample + symphonia::core::conv::IntoSample<f32>,
{
    let n = channels.len().min(buf.spec().channels.count());
    for ch in 0..n {
        channels[ch].extend(buf.chan(ch).iter().map(|s| (*s).into_sample()));
    }
}
