use std::collections::VecDeque;
use std::sync::Arc;

use realfft::num_complex::Complex32;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};

use crate::plugin::descriptor::{
    InstanceHandle, NewDescriptor, PluginVTable, PortHint, PortInfo, PortKind,
};

const DEFAULT_LENGTH: usize = 256;

/// Lazily built once the runtime's block size is known from the first `run`
/// call; `instantiate` only knows the sample rate, not the frame count.
struct FftState {
    block_size: usize,
    fft_size: usize,
    forward: Arc<dyn RealToComplex<f32>>,
    inverse: Arc<dyn ComplexToReal<f32>>,
    /// Frequency-domain kernel partitions, one per `block_size`-sized chunk
    /// of the (possibly tail-truncated) impulse response.
    partitions: Vec<Vec<Complex32>>,
    /// Ring of FFT'd overlap-save input windows, one slot per partition.
    input_ring: Vec<Vec<Complex32>>,
    write_idx: usize,
    prev_block: Vec<f32>,
    accum: Vec<Complex32>,
    window: Vec<f32>,
    time_scratch: Vec<f32>,
}

impl FftState {
    fn new(block_size: usize, kernel: &[f32]) -> Self {
        let fft_size = block_size * 2;
        let mut planner = RealFftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(fft_size);
        let inverse = planner.plan_fft_inverse(fft_size);

        let num_partitions = (kernel.len() + block_size - 1) / block_size.max(1);
        let num_partitions = num_partitions.max(1);

        let mut partitions = Vec::with_capacity(num_partitions);
        for p in 0..num_partitions {
            let start = p * block_size;
            let end = (start + block_size).min(kernel.len());
            let mut padded = forward.make_input_vec();
            if start < kernel.len() {
                padded[..end - start].copy_from_slice(&kernel[start..end]);
            }
            let mut spectrum = forward.make_output_vec();
            let mut scratch = forward.make_scratch_vec();
            forward.process_with_scratch(&mut padded, &mut spectrum, &mut scratch).ok();
            partitions.push(spectrum);
        }

        let input_ring = (0..num_partitions).map(|_| forward.make_output_vec()).collect();
        let accum = forward.make_output_vec();

        FftState {
            block_size,
            fft_size,
            forward,
            inverse,
            partitions,
            input_ring,
            write_idx: 0,
            prev_block: vec![0.0; block_size],
            accum,
            window: vec![0.0; fft_size],
            time_scratch: vec![0.0; fft_size],
        }
    }

    fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
        let b = self.block_size;
        self.window[..b].copy_from_slice(&self.prev_block);
        self.window[b..].copy_from_slice(input);

        let mut scratch = self.forward.make_scratch_vec();
        let slot = self.write_idx;
        {
            let mut window = self.window.clone();
            self.forward
                .process_with_scratch(&mut window, &mut self.input_ring[slot], &mut scratch)
                .ok();
        }

        let num_partitions = self.partitions.len();
        for bin in self.accum.iter_mut() {
            *bin = Complex32::new(0.0, 0.0);
        }
        for k in 0..num_partitions {
            let idx = (slot + num_partitions - k) % num_partitions;
            let x = &self.input_ring[idx];
            let h = &self.partitions[k];
            for (acc, (xi, hi)) in self.accum.iter_mut().zip(x.iter().zip(h.iter())) {
                *acc += xi * hi;
            }
        }

        let mut spectrum = self.accum.clone();
        let mut inv_scratch = self.inverse.make_scratch_vec();
        self.inverse
            .process_with_scratch(&mut spectrum, &mut self.time_scratch, &mut inv_scratch)
            .ok();

        let norm = 1.0 / self.fft_size as f32;
        for (o, s) in output.iter_mut().zip(self.time_scratch[b..].iter()) {
            *o = s * norm;
        }

        self.prev_block.copy_from_slice(input);
        self.write_idx = (slot + 1) % num_partitions;
    }
}

struct State {
    sample_rate: f64,
    gain: f32,
    kernel: Vec<f32>,
    delay_ring: Vec<f32>,
    delay_pos: usize,
    fft: Option<FftState>,
    /// Partition size from the node's `blocksize` config, independent of
    /// whatever frame count the host's `run` calls happen to use.
    configured_block_size: Option<usize>,
    in_fifo: VecDeque<f32>,
    out_fifo: VecDeque<f32>,
    input: *const f32,
    output: *mut f32,
}

fn build_kernel(sample_rate: f64, config: Option<&serde_json::Value>) -> Vec<f32> {
    let config = match config {
        Some(c) => c,
        None => return filterchain_kernel_loader::dirac_kernel(sample_rate as u32, 1).channel(0).to_vec(),
    };

    let length = config.get("length").and_then(|v| v.as_u64()).unwrap_or(DEFAULT_LENGTH as u64) as usize;
    let channel = config.get("channel").and_then(|v| v.as_u64()).map(|c| c as usize);
    let offset = config.get("offset").and_then(|v| v.as_u64()).unwrap_or(0) as usize;

    let mut kernel = if let Some(filename) = config.get("filename").and_then(|v| v.as_str()) {
        match filterchain_kernel_loader::load_file_kernel(
            std::path::Path::new(filename),
            offset,
            length,
            channel,
        ) {
            Ok(set) => set.channel(0).to_vec(),
            Err(e) => {
                log::warn!("filterchain: convolver kernel {:?} failed to load: {}", filename, e);
                filterchain_kernel_loader::dirac_kernel(sample_rate as u32, 1).channel(0).to_vec()
            }
        }
    } else {
        match config.get("dsp").and_then(|v| v.as_str()) {
            Some("hilbert") => {
                filterchain_kernel_loader::hilbert_kernel(sample_rate as u32, length).channel(0).to_vec()
            }
            _ => filterchain_kernel_loader::dirac_kernel(sample_rate as u32, 1).channel(0).to_vec(),
        }
    };

    if let Some(tailsize) = config.get("tailsize").and_then(|v| v.as_u64()) {
        kernel.truncate((tailsize as usize).max(1));
    }

    kernel
}

pub(super) fn descriptor() -> NewDescriptor {
    let ports = vec![
        PortInfo {
            name: "In".to_string(),
            kind: PortKind::AudioIn,
            descriptor_port_index: 0,
            default: 0.0,
            min: 0.0,
            max: 0.0,
            hint: PortHint::empty(),
        },
        PortInfo {
            name: "Out".to_string(),
            kind: PortKind::AudioOut,
            descriptor_port_index: 1,
            default: 0.0,
            min: 0.0,
            max: 0.0,
            hint: PortHint::empty(),
        },
    ];

    NewDescriptor { ports, vtable: vtable(), supports_null_data: true }
}

fn vtable() -> PluginVTable {
    PluginVTable {
        instantiate: Arc::new(|_desc, sample_rate, config| {
            let kernel = build_kernel(sample_rate, config);
            let gain = config
                .and_then(|c| c.get("gain"))
                .and_then(|v| v.as_f64())
                .unwrap_or(1.0) as f32;
            let delay_secs =
                config.and_then(|c| c.get("delay")).and_then(|v| v.as_f64()).unwrap_or(0.0);
            let delay_samples = ((delay_secs * sample_rate).round() as usize).max(1);
            let configured_block_size = config
                .and_then(|c| c.get("blocksize"))
                .and_then(|v| v.as_u64())
                .map(|v| (v as usize).max(1));

            let state = Box::new(State {
                sample_rate,
                gain,
                kernel,
                delay_ring: vec![0.0; delay_samples],
                delay_pos: 0,
                fft: None,
                configured_block_size,
                in_fifo: VecDeque::new(),
                out_fifo: VecDeque::new(),
                input: std::ptr::null(),
                output: std::ptr::null_mut(),
            });
            Ok(Box::into_raw(state) as InstanceHandle)
        }),
        activate: Arc::new(|_handle| {}),
        deactivate: Arc::new(|_handle| {}),
        cleanup: Arc::new(|handle| unsafe {
            drop(Box::from_raw(handle as *mut State));
        }),
        connect_port: Arc::new(|handle, port, data| unsafe {
            let state = &mut *(handle as *mut State);
            match port {
                0 => state.input = data as *const f32,
                _ => state.output = data,
            }
        }),
        run: Arc::new(|handle, n_samples| unsafe {
            let state = &mut *(handle as *mut State);
            if state.input.is_null() || state.output.is_null() {
                return;
            }
            let n = n_samples as usize;
            let input = std::slice::from_raw_parts(state.input, n);
            let output = std::slice::from_raw_parts_mut(state.output, n);

            let block_size = state.configured_block_size.unwrap_or(n);
            if state.fft.as_ref().map(|f| f.block_size) != Some(block_size) {
                state.fft = Some(FftState::new(block_size, &state.kernel));
            }

            state.in_fifo.extend(input.iter().copied());
            while state.in_fifo.len() >= block_size {
                let block: Vec<f32> = state.in_fifo.drain(..block_size).collect();
                let mut wet = vec![0.0f32; block_size];
                state.fft.as_mut().unwrap().process_block(&block, &mut wet);
                state.out_fifo.extend(wet);
            }

            let len = state.delay_ring.len();
            for sample in output.iter_mut() {
                // Partitions may lag a full host block behind when `blocksize`
                // exceeds the host's own frame count; silence until ready.
                let wet = state.out_fifo.pop_front().unwrap_or(0.0) * state.gain;
                let delayed = state.delay_ring[state.delay_pos];
                state.delay_ring[state.delay_pos] = wet;
                state.delay_pos = (state.delay_pos + 1) % len;
                *sample = delayed;
            }
            let _ = state.sample_rate;
        }),
    }
}
