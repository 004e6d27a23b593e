// Per-track channel strips: gain -> pan -> output. Each track owns its strip,
// so changing one track only touches that track's two nodes.

use std::collections::HashMap;

use crate::audio::routing::{Destination, NodeId, RoutingGraph};
use crate::audio::{AudioBackend, NodeHandle, NodeKind};

use super::model::{SequencerState, TrackId};

#[derive(Clone, Copy, Debug)]
struct Strip {
    gain: NodeId,
    pan: NodeId,
    volume: f32,
    pan_value: f32,
}

#[derive(Debug, Default)]
pub struct TrackMixer {
    graph: RoutingGraph,
    strips: HashMap<TrackId, Strip>,
}

impl TrackMixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Brings the strips in line with the current tracks: creates strips for
    /// new tracks, pushes changed volume/pan, tears down strips of removed tracks.
    pub fn sync<B: AudioBackend>(&mut self, state: &SequencerState, backend: &mut B) {
        let stale: Vec<TrackId> = self
            .strips
            .keys()
            .filter(|id| state.track(id).is_err())
            .cloned()
            .collect();
        for id in stale {
            self.remove_strip(&id, backend);
        }

        for track in state.tracks() {
            match self.strips.get_mut(&track.id) {
                Some(strip) => {
                    if strip.volume != track.volume {
                        strip.volume = track.volume;
                        if let Some(h) = self.graph.handle(strip.gain) {
                            backend.set_node(h, NodeKind::Gain(track.volume));
                        }
                    }
                    if strip.pan_value != track.pan {
                        strip.pan_value = track.pan;
                        if let Some(h) = self.graph.handle(strip.pan) {
                            backend.set_node(h, NodeKind::Pan(track.pan));
                        }
                    }
                }
                None => {
                    let gain = self.graph.create(backend, NodeKind::Gain(track.volume));
                    let pan = self.graph.create(backend, NodeKind::Pan(track.pan));
                    self.graph.connect_to(backend, gain, Destination::Node(pan));
                    self.graph.connect_to(backend, pan, Destination::Output);
                    log::debug!(target: "mixer", "strip created for track {}", track.id);
                    self.strips.insert(
                        track.id.clone(),
                        Strip { gain, pan, volume: track.volume, pan_value: track.pan },
                    );
                }
            }
        }
    }

    /// Engine node a track's voices should be played into.
    pub fn input(&self, id: &TrackId) -> Option<NodeHandle> {
        self.strips.get(id).and_then(|s| self.graph.handle(s.gain))
    }

    pub fn strip_count(&self) -> usize {
        self.strips.len()
    }

    fn remove_strip<B: AudioBackend>(&mut self, id: &TrackId, backend: &mut B) {
        if let Some(strip) = self.strips.remove(id) {
            // pan is the tail; removing it takes the gain node with it
            self.graph.remove(backend, strip.pan);
            log::debug!(target: "mixer", "strip removed for track {}", id);
        }
    }

    #[cfg(test)]
    pub(crate) fn graph(&self) -> &RoutingGraph {
        &self.graph
    }
}
