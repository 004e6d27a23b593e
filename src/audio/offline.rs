// A backend with no device behind it: the engine runs on the caller's thread
// and time only moves when the caller renders. Used for deterministic runs
// of the scheduler (tests, dry runs) against the real render engine.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::audio_api::AudioCommand;

use super::backend::{AudioBackend, NodeKind, Sink};
use super::engine::Engine;
use super::frame::StereoFrame;
use super::ids::{NodeHandle, SampleId, VoiceId, next_node_handle, next_voice_id};
use super::sample_buffer::SampleBuffer;
use super::seconds_to_frame;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduledPlayback {
    pub voice: VoiceId,
    pub sample: SampleId,
    pub at: f64,
    pub dest: NodeHandle,
}

pub struct OfflineBackend {
    engine: Engine,
    clock: Arc<AtomicU64>,
    sample_rate: u32,
    scheduled: Vec<ScheduledPlayback>,
    cancelled: Vec<VoiceId>,
}

impl OfflineBackend {
    pub fn new(sample_rate: u32) -> Self {
        let clock = Arc::new(AtomicU64::new(0));
        Self {
            engine: Engine::new(clock.clone()),
            clock,
            sample_rate,
            scheduled: Vec::new(),
            cancelled: Vec::new(),
        }
    }

    pub fn register_sample(&mut self, id: SampleId, buffer: SampleBuffer) {
        self.engine.handle_cmd(AudioCommand::RegisterSample { id, buffer });
    }

    /// Renders until the clock reads `t` and returns the audio produced.
    /// Asking for a time already passed renders nothing.
    pub fn advance_to(&mut self, t: f64) -> Vec<StereoFrame> {
        let target = seconds_to_frame(t, self.sample_rate);
        let now = self.clock.load(Ordering::Acquire);
        let mut out = vec![StereoFrame::zero(); target.saturating_sub(now) as usize];
        self.engine.render_block(&mut out);
        out
    }

    pub fn advance_by(&mut self, secs: f64) -> Vec<StereoFrame> {
        let t = self.current_time() + secs;
        self.advance_to(t)
    }

    /// Every playback ever requested, in request order.
    pub fn scheduled(&self) -> &[ScheduledPlayback] {
        &self.scheduled
    }

    pub fn cancelled(&self) -> &[VoiceId] {
        &self.cancelled
    }
}

impl AudioBackend for OfflineBackend {
    fn current_time(&self) -> f64 {
        self.clock.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }

    fn create_node(&mut self, kind: NodeKind) -> NodeHandle {
        let node = next_node_handle();
        self.engine.handle_cmd(AudioCommand::CreateNode { node, kind });
        node
    }

    fn set_node(&mut self, node: NodeHandle, kind: NodeKind) {
        self.engine.handle_cmd(AudioCommand::SetNode { node, kind });
    }

    fn connect(&mut self, from: NodeHandle, to: Sink) {
        self.engine.handle_cmd(AudioCommand::Connect { from, to });
    }

    fn disconnect(&mut self, node: NodeHandle) {
        self.engine.handle_cmd(AudioCommand::Disconnect { node });
    }

    fn release_node(&mut self, node: NodeHandle) {
        self.engine.handle_cmd(AudioCommand::ReleaseNode { node });
    }

    fn schedule_playback(&mut self, sample: SampleId, at: f64, dest: NodeHandle) -> VoiceId {
        let voice = next_voice_id();
        let start_frame = seconds_to_frame(at, self.sample_rate);
        self.engine.handle_cmd(AudioCommand::Schedule { voice, sample, dest, start_frame });
        self.scheduled.push(ScheduledPlayback { voice, sample, at, dest });
        voice
    }

    fn cancel_playback(&mut self, voice: VoiceId) {
        self.engine.handle_cmd(AudioCommand::Cancel { voice });
        self.cancelled.push(voice);
    }
}
