use std::sync::atomic::{AtomicU64, Ordering};

// fancy atomic counters let us hand out unique ids from any thread
static NEXT_SAMPLE: AtomicU64 = AtomicU64::new(0);
static NEXT_NODE: AtomicU64 = AtomicU64::new(0);
static NEXT_VOICE: AtomicU64 = AtomicU64::new(0);

/// A decoded buffer registered with the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SampleId(pub u64);

/// A processing node living on the engine side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeHandle(pub u64);

/// One scheduled playback of a sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VoiceId(pub u64);

pub fn next_sample_id() -> SampleId {
    SampleId(NEXT_SAMPLE.fetch_add(1, Ordering::Relaxed))
}

pub fn next_node_handle() -> NodeHandle {
    NodeHandle(NEXT_NODE.fetch_add(1, Ordering::Relaxed))
}

pub fn next_voice_id() -> VoiceId {
    VoiceId(NEXT_VOICE.fetch_add(1, Ordering::Relaxed))
}
