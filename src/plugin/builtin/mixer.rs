use std::sync::Arc;

use crate::plugin::descriptor::{
    InstanceHandle, NewDescriptor, PluginVTable, PortHint, PortInfo, PortKind,
};

const N_INPUTS: usize = 8;

struct State {
    inputs: [*const f32; N_INPUTS],
    gains: [*const f32; N_INPUTS],
    out: *mut f32,
}

pub(super) fn descriptor() -> NewDescriptor {
    let mut ports = Vec::with_capacity(N_INPUTS * 2 + 1);

    for i in 0..N_INPUTS {
        ports.push(PortInfo {
            name: format!("In {}", i + 1),
            kind: PortKind::AudioIn,
            descriptor_port_index: i as u32,
            default: 0.0,
            min: 0.0,
            max: 0.0,
            hint: PortHint::empty(),
        });
    }
    for i in 0..N_INPUTS {
        ports.push(PortInfo {
            name: format!("Gain {}", i + 1),
            kind: PortKind::ControlIn,
            descriptor_port_index: (N_INPUTS + i) as u32,
            default: 1.0,
            min: 0.0,
            max: 4.0,
            hint: PortHint::empty(),
        });
    }
    ports.push(PortInfo {
        name: "Out".to_string(),
        kind: PortKind::AudioOut,
        descriptor_port_index: (2 * N_INPUTS) as u32,
        default: 0.0,
        min: 0.0,
        max: 0.0,
        hint: PortHint::empty(),
    });

    NewDescriptor { ports, vtable: vtable(), supports_null_data: true }
}

fn vtable() -> PluginVTable {
    PluginVTable {
        instantiate: Arc::new(|_desc, _sample_rate, _config| {
            let state = Box::new(State {
                inputs: [std::ptr::null(); N_INPUTS],
                gains: [std::ptr::null(); N_INPUTS],
                out: std::ptr::null_mut(),
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
            let idx = port as usize;
            if idx < N_INPUTS {
                state.inputs[idx] = data as *const f32;
            } else if idx < 2 * N_INPUTS {
                state.gains[idx - N_INPUTS] = data as *const f32;
            } else {
                state.out = data;
            }
        }),
        run: Arc::new(|handle, n_samples| unsafe {
            let state = &mut *(handle as *mut State);
            if state.out.is_null() {
                return;
            }
            let n = n_samples as usize;
            let out = std::slice::from_raw_parts_mut(state.out, n);
            out.fill(0.0);

            for k in 0..N_INPUTS {
                if state.inputs[k].is_null() {
                    continue;
                }
                let gain = if state.gains[k].is_null() { 1.0 } else { *state.gains[k] };
                if gain == 0.0 {
                    continue;
                }
                let input = std::slice::from_raw_parts(state.inputs[k], n);
                for i in 0..n {
                    *out.get_unchecked_mut(i) += *input.get_unchecked(i) * gain;
                }
            }
        }),
    }
}
