use super::ids::{NodeHandle, SampleId, VoiceId};

/// What an engine-side node does to the signal passing through it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeKind {
    Gain(f32),
    Pan(f32),
}

/// Where a node's output goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sink {
    Node(NodeHandle),
    Output,
}

/// The audio subsystem as seen by the sequencer: a sample-accurate clock,
/// processing nodes that can be wired together, and playback that can only
/// be requested at an absolute clock time.
///
/// `current_time` is the only clock the scheduler trusts. Wall-clock time and
/// tick arrival times are never assumed to match it.
pub trait AudioBackend {
    /// Seconds of audio rendered since the engine started.
    fn current_time(&self) -> f64;

    fn create_node(&mut self, kind: NodeKind) -> NodeHandle;

    fn set_node(&mut self, node: NodeHandle, kind: NodeKind);

    fn connect(&mut self, from: NodeHandle, to: Sink);

    /// Drops every outgoing connection of `node`.
    fn disconnect(&mut self, node: NodeHandle);

    fn release_node(&mut self, node: NodeHandle);

    /// Plays `sample` into `dest` starting at absolute time `at`.
    fn schedule_playback(&mut self, sample: SampleId, at: f64, dest: NodeHandle) -> VoiceId;

    /// Silences a voice that has not started yet.
    fn cancel_playback(&mut self, voice: VoiceId);
}
