pub use crate::audio::{NodeHandle, NodeKind, SampleBuffer, SampleId, Sink, VoiceId};

#[derive(Clone, Debug)]
pub enum AudioCommand {
    // The engine can't load files (interrupts thread), so you must first
    // register a preloaded buffer (see sample_loader.rs), then send that to
    // the engine
    RegisterSample { id: SampleId, buffer: SampleBuffer },

    // Routing: nodes are created on the control side (handles come from an
    // atomic counter) and mirrored here
    CreateNode { node: NodeHandle, kind: NodeKind },
    SetNode { node: NodeHandle, kind: NodeKind },
    Connect { from: NodeHandle, to: Sink },
    Disconnect { node: NodeHandle },
    ReleaseNode { node: NodeHandle },

    // The engine then uses the sample id to play the sound at an absolute frame
    Schedule { voice: VoiceId, sample: SampleId, dest: NodeHandle, start_frame: u64 },
    Cancel { voice: VoiceId },
}
