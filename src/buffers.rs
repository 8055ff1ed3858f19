//! The two process-wide scratch buffers unbound audio ports are pre-wired
//! to at compile time (`spec.md` §3, §4.2 P3, §9): `SILENCE` so an
//! unconnected input reads all-zero samples, `DISCARD` so an unconnected
//! output has somewhere harmless to write. Neither is ever resized on the
//! audio thread; both are sized once, up front, to the engine's maximum
//! block length.

pub(crate) struct ScratchBuffers {
    silence: Vec<f32>,
    discard: Vec<f32>,
}

impl ScratchBuffers {
    pub(crate) fn new(max_block_frames: usize) -> Self {
        Self { silence: vec![0.0; max_block_frames], discard: vec![0.0; max_block_frames] }
    }

    /// Read-only pointer to `max_block_frames` zeroed samples. Never mutated.
    pub(crate) fn silence_ptr(&self) -> *const f32 {
        self.silence.as_ptr()
    }

    /// Write-only pointer to `max_block_frames` samples. Never read.
    pub(crate) fn discard_ptr(&mut self) -> *mut f32 {
        self.discard.as_mut_ptr()
    }

    pub(crate) fn len(&self) -> usize {
        self.silence.len()
    }
}
