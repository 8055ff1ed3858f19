use std::sync::Arc;

use crate::plugin::descriptor::{
    InstanceHandle, NewDescriptor, PluginVTable, PortHint, PortInfo, PortKind,
};

struct State {
    input: *const f32,
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
        instantiate: Arc::new(|_desc, _sample_rate, _config| {
            let state = Box::new(State { input: std::ptr::null(), output: std::ptr::null_mut() });
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
            output.copy_from_slice(input);
        }),
    }
}
