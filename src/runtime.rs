//! Per-block execution (`spec.md` §4.3), invoked once per block by the
//! audio thread. No allocation, no blocking syscalls, no descriptor
//! construction happens on this path.

use crate::graph::Graph;

/// One capture or playback channel: the `{data, maxsize, offset, size,
/// stride}` shape `spec.md` §6 describes for the host's opaque buffer
/// handles. `data` is `&mut` even for capture channels because the plugin
/// ABI's `connect_port` takes `*mut f32` regardless of direction (LADSPA/LV2
/// make no const/mut distinction at the port level).
pub struct Channel<'a> {
    pub data: &'a mut [f32],
    pub maxsize: usize,
    pub offset: usize,
    pub size: usize,
    pub stride: usize,
}

impl<'a> Channel<'a> {
    pub fn new(data: &'a mut [f32]) -> Self {
        let maxsize = data.len();
        Channel { data, maxsize, offset: 0, size: maxsize, stride: 1 }
    }
}

/// The audio-thread side of the engine. Stateless: all state the runtime
/// touches lives in the [`Graph`] it's handed each call.
pub struct GraphRuntime;

impl GraphRuntime {
    pub fn new() -> Self {
        GraphRuntime
    }

    /// Runs one block. Returns `false` (a `RuntimeSkip`, `spec.md` §7) if
    /// the channel counts don't match the graph's mux tables, in which case
    /// the block is left entirely untouched: no connect_port calls, no run
    /// calls, no writes.
    pub fn process_block(&self, graph: &Graph, inputs: &mut [Channel<'_>], outputs: &mut [Channel<'_>]) -> bool {
        if inputs.len() != graph.input_mux.len() || outputs.len() != graph.output_mux.len() {
            return false;
        }

        // With no external inputs at all (a source-only graph, `spec.md`
        // §9 open question), the block length is bounded by the output
        // channels' capacity instead.
        let mut out_size =
            if inputs.is_empty() { outputs.iter().map(|c| c.maxsize).min().unwrap_or(0) } else { usize::MAX };
        let mut max_stride = 0usize;
        for channel in inputs.iter() {
            out_size = out_size.min(channel.size);
            max_stride = max_stride.max(channel.stride);
        }

        for (i, channel) in inputs.iter_mut().enumerate() {
            if let Some(slot) = &graph.input_mux[i] {
                let ptr = channel.data[channel.offset..].as_mut_ptr();
                slot.descriptor.connect_port(slot.instance, slot.port_index, ptr);
            }
        }

        for (j, channel) in outputs.iter_mut().enumerate() {
            match &graph.output_mux[j] {
                Some(slot) => {
                    let ptr = channel.data[channel.offset..].as_mut_ptr();
                    slot.descriptor.connect_port(slot.instance, slot.port_index, ptr);
                }
                None => {
                    for sample in channel.data[channel.offset..channel.offset + out_size].iter_mut() {
                        *sample = 0.0;
                    }
                }
            }
            channel.offset = 0;
            channel.size = out_size;
            channel.stride = max_stride;
        }

        for entry in graph.schedule.iter() {
            entry.descriptor.run(entry.instance, out_size as u32);
        }

        true
    }
}

impl Default for GraphRuntime {
    fn default() -> Self {
        Self::new()
    }
}
