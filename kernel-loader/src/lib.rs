//! Loads impulse-response kernels for the `convolver` built-in filter, either
//! by decoding a sound file on disk or by synthesizing one of the supported
//! synthetic kernels (Dirac, Hilbert).
//!
//! Ported down from a full PCM resource-loader: the convolver only ever
//! needs a single non-streaming `Vec<f32>` per channel, so there is no
//! resource pool, no RAM cache, and (per the engine's sample-rate-conversion
//! non-goal) no resampling: the kernel is used at whatever rate it was
//! recorded at.

use std::path::{Path, PathBuf};

mod decode;

pub use decode::KernelLoadError;

/// One channel of impulse-response samples.
pub type Kernel = Vec<f32>;

/// A decoded or synthesized kernel, one `Vec<f32>` per channel.
#[derive(Debug, Clone)]
pub struct KernelSet {
    pub channels: Vec<Kernel>,
    pub sample_rate: u32,
}

impl KernelSet {
    pub fn channel(&self, index: usize) -> &[f32] {
        self.channels.get(index).map(|c| c.as_slice()).unwrap_or(&[])
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }
}

/// Decode a kernel from a sound file on disk.
///
/// `offset` and `length` (in frames) trim the decoded audio before it is
/// returned; `length = 0` means "to the end of the file". `channel` selects
/// a single channel to extract (`None` keeps every decoded channel).
pub fn load_file_kernel(
    path: &Path,
    offset: usize,
    length: usize,
    channel: Option<usize>,
) -> Result<KernelSet, KernelLoadError> {
    let mut set = decode::decode_file(path)?;

    for ch in set.channels.iter_mut() {
        let end = if length == 0 { ch.len() } else { (offset + length).min(ch.len()) };
        let start = offset.min(end);
        *ch = ch[start..end].to_vec();
    }

    if let Some(channel) = channel {
        let selected = set
            .channels
            .get(channel)
            .cloned()
            .ok_or_else(|| KernelLoadError::ChannelOutOfRange(path.to_path_buf(), channel))?;
        set.channels = vec![selected];
    }

    Ok(set)
}

/// A single-sample unit impulse: `convolver` with this kernel is equivalent
/// to `copy` (delayed by `offset` samples).
pub fn dirac_kernel(sample_rate: u32, length: usize) -> KernelSet {
    let length = length.max(1);
    let mut kernel = vec![0.0f32; length];
    kernel[0] = 1.0;
    KernelSet { channels: vec![kernel], sample_rate }
}

/// A windowed discrete Hilbert transform kernel (odd length, antisymmetric),
/// used for building a quadrature (90 degree phase-shifted) filter.
pub fn hilbert_kernel(sample_rate: u32, length: usize) -> KernelSet {
    let length = if length % 2 == 0 { length + 1 } else { length.max(1) };
    let half = (length / 2) as isize;

    let mut kernel = vec![0.0f32; length];
    for (i, sample) in kernel.iter_mut().enumerate() {
        let n = i as isize - half;
        if n == 0 {
            *sample = 0.0;
            continue;
        }
        if n % 2 == 0 {
            *sample = 0.0;
            continue;
        }
        let ideal = 2.0 / (std::f64::consts::PI * n as f64);
        // Hann window to taper the truncated infinite response.
        let w = 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / (length - 1) as f64).cos();
        *sample = (ideal * w) as f32;
    }

    KernelSet { channels: vec![kernel], sample_rate }
}
