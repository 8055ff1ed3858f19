use std::f32::consts::PI;
use std::sync::Arc;

use crate::plugin::descriptor::{
    InstanceHandle, NewDescriptor, PluginVTable, PortHint, PortInfo, PortKind,
};

/// The eight biquad flavors `spec.md` §4.5 names, each sharing the same
/// three control ports (Freq, Q, Gain) and differing only in the coefficient
/// formula (Audio EQ Cookbook, direct form II transposed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Shape {
    LowPass,
    HighPass,
    BandPass,
    LowShelf,
    HighShelf,
    Peaking,
    Notch,
    AllPass,
}

impl Shape {
    pub(super) fn from_label(label: &str) -> Self {
        match label {
            "lowpass" => Shape::LowPass,
            "highpass" => Shape::HighPass,
            "bandpass" => Shape::BandPass,
            "lowshelf" => Shape::LowShelf,
            "highshelf" => Shape::HighShelf,
            "peaking" => Shape::Peaking,
            "notch" => Shape::Notch,
            "allpass" => Shape::AllPass,
            _ => unreachable!("BuiltinLoader only dispatches known biquad labels"),
        }
    }
}

#[derive(Clone, Copy)]
struct Coeffs {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl Coeffs {
    fn compute(shape: Shape, sample_rate: f64, freq: f32, q: f32, gain_db: f32) -> Self {
        let freq = freq.clamp(1.0, (sample_rate as f32) * 0.5 - 1.0);
        let q = q.max(0.01);
        let omega = 2.0 * PI * freq / sample_rate as f32;
        let sn = omega.sin();
        let cs = omega.cos();
        let alpha = sn / (2.0 * q);
        let a = 10f32.powf(gain_db / 40.0);

        let (b0, b1, b2, a0, a1, a2) = match shape {
            Shape::LowPass => {
                let b1 = 1.0 - cs;
                let b0 = b1 / 2.0;
                let b2 = b0;
                (b0, b1, b2, 1.0 + alpha, -2.0 * cs, 1.0 - alpha)
            }
            Shape::HighPass => {
                let b0 = (1.0 + cs) / 2.0;
                let b1 = -(1.0 + cs);
                let b2 = b0;
                (b0, b1, b2, 1.0 + alpha, -2.0 * cs, 1.0 - alpha)
            }
            Shape::BandPass => {
                let b0 = alpha;
                let b1 = 0.0;
                let b2 = -alpha;
                (b0, b1, b2, 1.0 + alpha, -2.0 * cs, 1.0 - alpha)
            }
            Shape::Notch => {
                let b0 = 1.0;
                let b1 = -2.0 * cs;
                let b2 = 1.0;
                (b0, b1, b2, 1.0 + alpha, -2.0 * cs, 1.0 - alpha)
            }
            Shape::AllPass => {
                let b0 = 1.0 - alpha;
                let b1 = -2.0 * cs;
                let b2 = 1.0 + alpha;
                (b0, b1, b2, 1.0 + alpha, -2.0 * cs, 1.0 - alpha)
            }
            Shape::Peaking => {
                let b0 = 1.0 + alpha * a;
                let b1 = -2.0 * cs;
                let b2 = 1.0 - alpha * a;
                let a0 = 1.0 + alpha / a;
                let a2 = 1.0 - alpha / a;
                (b0, b1, b2, a0, -2.0 * cs, a2)
            }
            Shape::LowShelf => {
                let sq = (2.0 * a.sqrt() * alpha).max(0.0);
                let ap1 = a + 1.0;
                let am1 = a - 1.0;
                let b0 = a * (ap1 - am1 * cs + sq);
                let b1 = 2.0 * a * (am1 - ap1 * cs);
                let b2 = a * (ap1 - am1 * cs - sq);
                let a0 = ap1 + am1 * cs + sq;
                let a1 = -2.0 * (am1 + ap1 * cs);
                let a2 = ap1 + am1 * cs - sq;
                (b0, b1, b2, a0, a1, a2)
            }
            Shape::HighShelf => {
                let sq = (2.0 * a.sqrt() * alpha).max(0.0);
                let ap1 = a + 1.0;
                let am1 = a - 1.0;
                let b0 = a * (ap1 + am1 * cs + sq);
                let b1 = -2.0 * a * (am1 + ap1 * cs);
                let b2 = a * (ap1 + am1 * cs - sq);
                let a0 = ap1 - am1 * cs + sq;
                let a1 = 2.0 * (am1 - ap1 * cs);
                let a2 = ap1 - am1 * cs - sq;
                (b0, b1, b2, a0, a1, a2)
            }
        };

        Coeffs { b0: b0 / a0, b1: b1 / a0, b2: b2 / a0, a1: a1 / a0, a2: a2 / a0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // H(z=1) is the filter's DC gain regardless of cutoff/Q; the RBJ
    // cookbook formulas normalize lowpass to unity and highpass to zero
    // there independent of the chosen cutoff.
    fn dc_gain(c: Coeffs) -> f32 {
        (c.b0 + c.b1 + c.b2) / (1.0 + c.a1 + c.a2)
    }

    #[test]
    fn lowpass_passes_dc() {
        let c = Coeffs::compute(Shape::LowPass, 48_000.0, 1_000.0, DEFAULT_Q, 0.0);
        assert!((dc_gain(c) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn highpass_blocks_dc() {
        let c = Coeffs::compute(Shape::HighPass, 48_000.0, 1_000.0, DEFAULT_Q, 0.0);
        assert!(dc_gain(c).abs() < 1e-5);
    }

    #[test]
    fn zero_gain_peaking_is_flat() {
        // At 0 dB the peaking numerator and denominator are identical, so
        // the transfer function is 1 at every frequency.
        let c = Coeffs::compute(Shape::Peaking, 48_000.0, 1_000.0, DEFAULT_Q, 0.0);
        assert!((c.b0 - 1.0).abs() < 1e-5);
        assert!((c.b1 - c.a1).abs() < 1e-5);
        assert!((c.b2 - c.a2).abs() < 1e-5);
    }
}

struct State {
    shape: Shape,
    sample_rate: f64,
    input: *const f32,
    output: *mut f32,
    freq_cell: *const f32,
    q_cell: *const f32,
    gain_cell: *const f32,
    last_freq: f32,
    last_q: f32,
    last_gain: f32,
    coeffs: Coeffs,
    z1: f32,
    z2: f32,
}

const DEFAULT_FREQ_FRACTION: f32 = 0.1;
const DEFAULT_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;

pub(super) fn descriptor(shape: Shape) -> NewDescriptor {
    let ports = vec![
        PortInfo {
            name: "Freq".to_string(),
            kind: PortKind::ControlIn,
            descriptor_port_index: 0,
            default: DEFAULT_FREQ_FRACTION,
            min: 20.0,
            max: 20_000.0,
            hint: PortHint::SAMPLE_RATE,
        },
        PortInfo {
            name: "Q".to_string(),
            kind: PortKind::ControlIn,
            descriptor_port_index: 1,
            default: DEFAULT_Q,
            min: 0.1,
            max: 20.0,
            hint: PortHint::empty(),
        },
        PortInfo {
            name: "Gain".to_string(),
            kind: PortKind::ControlIn,
            descriptor_port_index: 2,
            default: 0.0,
            min: -24.0,
            max: 24.0,
            hint: PortHint::empty(),
        },
        PortInfo {
            name: "In".to_string(),
            kind: PortKind::AudioIn,
            descriptor_port_index: 3,
            default: 0.0,
            min: 0.0,
            max: 0.0,
            hint: PortHint::empty(),
        },
        PortInfo {
            name: "Out".to_string(),
            kind: PortKind::AudioOut,
            descriptor_port_index: 4,
            default: 0.0,
            min: 0.0,
            max: 0.0,
            hint: PortHint::empty(),
        },
    ];

    NewDescriptor { ports, vtable: vtable(shape), supports_null_data: true }
}

fn vtable(shape: Shape) -> PluginVTable {
    PluginVTable {
        instantiate: Arc::new(move |_desc, sample_rate, _config| {
            let freq = DEFAULT_FREQ_FRACTION * sample_rate as f32;
            let coeffs = Coeffs::compute(shape, sample_rate, freq, DEFAULT_Q, 0.0);
            let state = Box::new(State {
                shape,
                sample_rate,
                input: std::ptr::null(),
                output: std::ptr::null_mut(),
                freq_cell: std::ptr::null(),
                q_cell: std::ptr::null(),
                gain_cell: std::ptr::null(),
                last_freq: freq,
                last_q: DEFAULT_Q,
                last_gain: 0.0,
                coeffs,
                z1: 0.0,
                z2: 0.0,
            });
            Ok(Box::into_raw(state) as InstanceHandle)
        }),
        activate: Arc::new(|handle| unsafe {
            let state = &mut *(handle as *mut State);
            state.z1 = 0.0;
            state.z2 = 0.0;
        }),
        deactivate: Arc::new(|_handle| {}),
        cleanup: Arc::new(|handle| unsafe {
            drop(Box::from_raw(handle as *mut State));
        }),
        connect_port: Arc::new(|handle, port, data| unsafe {
            let state = &mut *(handle as *mut State);
            match port {
                0 => state.freq_cell = data as *const f32,
                1 => state.q_cell = data as *const f32,
                2 => state.gain_cell = data as *const f32,
                3 => state.input = data as *const f32,
                _ => state.output = data,
            }
        }),
        run: Arc::new(|handle, n_samples| unsafe {
            let state = &mut *(handle as *mut State);
            if state.input.is_null() || state.output.is_null() {
                return;
            }

            let freq = if state.freq_cell.is_null() { state.last_freq } else { *state.freq_cell };
            let q = if state.q_cell.is_null() { state.last_q } else { *state.q_cell };
            let gain = if state.gain_cell.is_null() { state.last_gain } else { *state.gain_cell };

            if freq != state.last_freq || q != state.last_q || gain != state.last_gain {
                state.coeffs = Coeffs::compute(state.shape, state.sample_rate, freq, q, gain);
                state.last_freq = freq;
                state.last_q = q;
                state.last_gain = gain;
            }

            let n = n_samples as usize;
            let input = std::slice::from_raw_parts(state.input, n);
            let output = std::slice::from_raw_parts_mut(state.output, n);
            let c = state.coeffs;

            for i in 0..n {
                let x = *input.get_unchecked(i);
                let y = c.b0 * x + state.z1;
                state.z1 = c.b1 * x - c.a1 * y + state.z2;
                state.z2 = c.b2 * x - c.a2 * y;
                *output.get_unchecked_mut(i) = y;
            }
        }),
    }
}
