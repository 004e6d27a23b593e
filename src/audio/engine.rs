use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::audio_api::AudioCommand;

use super::backend::{NodeKind, Sink};
use super::frame::StereoFrame;
use super::ids::{NodeHandle, SampleId};
use super::sample_buffer::SampleBuffer;
use super::voice::Voice;

const MAX_VOICES: usize = 64; // voice pool is preallocated, scheduling never grows it
const MAX_BLOCK: usize = 4096; // larger device buffers are rendered in chunks
const MAX_DEPTH: usize = 8; // longest node chain a voice can pass through
const NODE_CAPACITY: usize = 256; // two per track; more tracks than this grows the map
const SAMPLE_CAPACITY: usize = 128;
const OUTPUTS_PER_NODE: usize = 2;

impl NodeKind {
    fn process(self, f: StereoFrame) -> StereoFrame {
        match self {
            NodeKind::Gain(g) => f.scaled(g),
            NodeKind::Pan(p) => f.panned(p),
        }
    }
}

#[derive(Clone, Debug)]
struct EngineNode {
    kind: NodeKind,
    outputs: Vec<Sink>,
}

/// Lives on the audio thread. Owns the registered samples, the node graph
/// mirror, and every pending or sounding voice.
///
/// Scheduling and rendering never allocate. Sample and routing commands
/// insert into maps that are presized for a normal kit; they only allocate
/// past those sizes, and only arrive on load and on track add/remove.
pub struct Engine {
    samples: HashMap<SampleId, SampleBuffer>,
    nodes: HashMap<NodeHandle, EngineNode>,
    voices: Vec<Voice>,
    frames_rendered: u64,
    clock: Arc<AtomicU64>,
    scratch: Vec<Vec<StereoFrame>>, // one buffer per chain depth
}

impl Engine {
    pub fn new(clock: Arc<AtomicU64>) -> Self {
        Self {
            samples: HashMap::with_capacity(SAMPLE_CAPACITY),
            nodes: HashMap::with_capacity(NODE_CAPACITY),
            voices: Vec::with_capacity(MAX_VOICES),
            frames_rendered: 0,
            clock,
            scratch: (0..MAX_DEPTH).map(|_| vec![StereoFrame::zero(); MAX_BLOCK]).collect(),
        }
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::RegisterSample { id, buffer } => {
                self.samples.insert(id, buffer);
            }
            AudioCommand::CreateNode { node, kind } => {
                self.nodes.insert(node, EngineNode { kind, outputs: Vec::with_capacity(OUTPUTS_PER_NODE) });
            }
            AudioCommand::SetNode { node, kind } => {
                if let Some(n) = self.nodes.get_mut(&node) {
                    n.kind = kind;
                }
            }
            AudioCommand::Connect { from, to } => {
                if let Some(n) = self.nodes.get_mut(&from) {
                    n.outputs.push(to);
                }
            }
            AudioCommand::Disconnect { node } => {
                if let Some(n) = self.nodes.get_mut(&node) {
                    n.outputs.clear();
                }
            }
            AudioCommand::ReleaseNode { node } => {
                self.nodes.remove(&node);
                self.voices.retain(|v| v.dest != node);
            }
            AudioCommand::Schedule { voice, sample, dest, start_frame } => {
                let v = Voice::new(voice, sample, dest, start_frame);
                if self.voices.len() < MAX_VOICES {
                    self.voices.push(v);
                } else if let Some(oldest) = self.voices.iter_mut().min_by_key(|v| v.start_frame) {
                    *oldest = v; // steal the voice that has been sounding longest
                }
            }
            AudioCommand::Cancel { voice } => {
                let now = self.frames_rendered;
                self.voices.retain(|v| v.id != voice || v.has_started(now));
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    #[cfg(test)]
    pub(crate) fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn render_block(&mut self, frames: &mut [StereoFrame]) {
        for chunk in frames.chunks_mut(MAX_BLOCK) {
            self.render_chunk(chunk);
        }
        self.clock.store(self.frames_rendered, Ordering::Release);
    }

    fn render_chunk(&mut self, out: &mut [StereoFrame]) {
        out.fill(StereoFrame::zero());
        let block_start = self.frames_rendered;
        let len = out.len();

        for voice in self.voices.iter_mut() {
            let Some(buffer) = self.samples.get(&voice.sample) else {
                voice.active = false;
                continue;
            };
            let Some(range) = voice.render_into(buffer, block_start, &mut self.scratch[0][..len]) else {
                continue;
            };
            route(&self.nodes, voice.dest, &mut self.scratch, range, out);
        }

        self.voices.retain(|v| v.active);
        self.frames_rendered += len as u64;
    }
}

// Pushes scratch[0][range] through `node` and everything downstream of it,
// mixing whatever reaches the output sink into `out`.
fn route(
    nodes: &HashMap<NodeHandle, EngineNode>,
    node: NodeHandle,
    scratch: &mut [Vec<StereoFrame>],
    range: Range<usize>,
    out: &mut [StereoFrame],
) {
    let Some(n) = nodes.get(&node) else { return };
    let Some((current, deeper)) = scratch.split_first_mut() else {
        return; // chain deeper than MAX_DEPTH
    };
    for f in &mut current[range.clone()] {
        *f = n.kind.process(*f);
    }
    for sink in &n.outputs {
        match sink {
            Sink::Output => {
                for (o, f) in out[range.clone()].iter_mut().zip(&current[range.clone()]) {
                    o.add(*f);
                }
            }
            Sink::Node(next) => {
                if let Some(next_buf) = deeper.first_mut() {
                    next_buf[range.clone()].copy_from_slice(&current[range.clone()]);
                }
                route(nodes, *next, deeper, range.clone(), out);
            }
        }
    }
}
