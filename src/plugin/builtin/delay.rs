use std::sync::Arc;

use crate::plugin::descriptor::{
    InstanceHandle, NewDescriptor, PluginVTable, PortHint, PortInfo, PortKind,
};

const DEFAULT_MAX_DELAY_SECS: f64 = 1.0;

struct State {
    sample_rate: f64,
    max_delay_secs: f64,
    ring: Vec<f32>,
    write_pos: usize,
    input: *const f32,
    delay_cell: *const f32,
    output: *mut f32,
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
            name: "Delay (s)".to_string(),
            kind: PortKind::ControlIn,
            descriptor_port_index: 1,
            default: 0.0,
            min: 0.0,
            max: DEFAULT_MAX_DELAY_SECS as f32,
            hint: PortHint::empty(),
        },
        PortInfo {
            name: "Out".to_string(),
            kind: PortKind::AudioOut,
            descriptor_port_index: 2,
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
            let max_delay_secs = config
                .and_then(|c| c.get("max-delay"))
                .and_then(|v| v.as_f64())
                .unwrap_or(DEFAULT_MAX_DELAY_SECS);
            let capacity = ((max_delay_secs * sample_rate).ceil() as usize).max(1) + 1;

            let state = Box::new(State {
                sample_rate,
                max_delay_secs,
                ring: vec![0.0; capacity],
                write_pos: 0,
                input: std::ptr::null(),
                delay_cell: std::ptr::null(),
                output: std::ptr::null_mut(),
            });
            Ok(Box::into_raw(state) as InstanceHandle)
        }),
        activate: Arc::new(|handle| unsafe {
            let state = &mut *(handle as *mut State);
            state.ring.iter_mut().for_each(|s| *s = 0.0);
            state.write_pos = 0;
        }),
        deactivate: Arc::new(|_handle| {}),
        cleanup: Arc::new(|handle| unsafe {
            drop(Box::from_raw(handle as *mut State));
        }),
        connect_port: Arc::new(|handle, port, data| unsafe {
            let state = &mut *(handle as *mut State);
            match port {
                0 => state.input = data as *const f32,
                1 => state.delay_cell = data as *const f32,
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

            let delay_secs = if state.delay_cell.is_null() { 0.0 } else { *state.delay_cell as f64 }
                .clamp(0.0, state.max_delay_secs);
            let delay_samples = (delay_secs * state.sample_rate).round() as usize;
            let len = state.ring.len();
            let delay_samples = delay_samples.min(len - 1);

            for i in 0..n {
                state.ring[state.write_pos] = input[i];
                let read_pos = (state.write_pos + len - delay_samples) % len;
                output[i] = state.ring[read_pos];
                state.write_pos = (state.write_pos + 1) % len;
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use crate::plugin::{PluginRegistry, PluginType};

    #[test]
    fn shifts_the_signal_by_n_samples() {
        let mut registry = PluginRegistry::new(8.0);
        let plugin = registry.load(PluginType::Builtin, "builtin").unwrap();
        let descriptor = registry.descriptor(&plugin, "delay").unwrap();

        let handle = descriptor.instantiate(8.0, None).unwrap();
        let mut delay_secs = 0.25f32; // 2 samples at 8 Hz
        let mut input = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut output = [0.0f32; 6];

        descriptor.connect_port(handle, 0, input.as_mut_ptr());
        descriptor.connect_port(handle, 1, &mut delay_secs as *mut f32);
        descriptor.connect_port(handle, 2, output.as_mut_ptr());
        descriptor.run(handle, input.len() as u32);
        descriptor.cleanup(handle);

        assert_eq!(output, [0.0, 0.0, 1.0, 2.0, 3.0, 4.0]);
    }
}
