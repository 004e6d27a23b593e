// the sequencer's data: global transport/meter parameters plus the tracks

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_TEMPO: f64 = 100.0;
pub const DEFAULT_BEATS_PER_MEASURE: u32 = 4;
pub const DEFAULT_BEAT_UNIT: u32 = 4; // quarter note gets the beat
pub const DEFAULT_SWING: f64 = 0.0;
pub const DEFAULT_STEP_PRECISION: u32 = 1;

/// Largest step count either grid may have in one measure.
pub const MAX_STEPS_PER_MEASURE: usize = 4096;

/// (binary, triplet) step counts for a meter, or None when either exceeds
/// MAX_STEPS_PER_MEASURE.
pub fn meter_step_counts(beats_per_measure: u32, beat_unit: u32, step_precision: u32) -> Option<(usize, usize)> {
    let beats = beats_per_measure as usize;
    let precision = step_precision as usize;
    let binary = beats.checked_mul(beat_unit as usize)?.checked_mul(precision)?;
    let triplet = beats.checked_mul(3)?.checked_mul(precision)?;
    (binary <= MAX_STEPS_PER_MEASURE && triplet <= MAX_STEPS_PER_MEASURE).then_some((binary, triplet))
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub String);

impl TrackId {
    // fresh opaque id for a track created from the UI
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl From<&str> for TrackId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the pattern: a single sample fired at a set of step positions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    pub sample_id: String, // key into the sample registry
    pub volume: f32,       // 0.0 to 1.0
    pub pan: f32,          // -1.0 (left) to 1.0 (right)
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub triplet_enabled: bool, // positions index the triplet grid instead of the binary one
    #[serde(default)]
    pub positions: BTreeSet<usize>,
}

impl Track {
    pub fn new(id: TrackId, name: impl Into<String>, sample_id: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            sample_id: sample_id.into(),
            volume: 1.0,
            pan: 0.0,
            muted: false,
            triplet_enabled: false,
            positions: BTreeSet::new(),
        }
    }

    pub fn with_positions(mut self, positions: impl IntoIterator<Item = usize>) -> Self {
        self.positions = positions.into_iter().collect();
        self
    }

    pub fn fires_at(&self, step: usize) -> bool {
        !self.muted && self.positions.contains(&step)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SequencerState {
    pub(super) tempo: f64,
    pub(super) beats_per_measure: u32,
    pub(super) beat_unit: u32,
    pub(super) swing: f64,
    pub(super) step_precision: u32,
    pub(super) is_playing: bool,
    pub(super) tracks: Vec<Track>,
}

impl Default for SequencerState {
    fn default() -> Self {
        Self {
            tempo: DEFAULT_TEMPO,
            beats_per_measure: DEFAULT_BEATS_PER_MEASURE,
            beat_unit: DEFAULT_BEAT_UNIT,
            swing: DEFAULT_SWING,
            step_precision: DEFAULT_STEP_PRECISION,
            is_playing: false,
            tracks: Vec::new(),
        }
    }
}

// Read side. Everything that mutates lives in state.rs and goes through validation.
impl SequencerState {
    pub fn tempo(&self) -> f64 { self.tempo }
    pub fn beats_per_measure(&self) -> u32 { self.beats_per_measure }
    pub fn beat_unit(&self) -> u32 { self.beat_unit }
    pub fn swing(&self) -> f64 { self.swing }
    pub fn step_precision(&self) -> u32 { self.step_precision }
    pub fn is_playing(&self) -> bool { self.is_playing }
    pub fn tracks(&self) -> &[Track] { &self.tracks }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn track_ids(&self) -> Vec<TrackId> {
        self.tracks.iter().map(|t| t.id.clone()).collect()
    }

    // the command layer keeps the meter within meter_step_counts, so these
    // products stay under MAX_STEPS_PER_MEASURE
    pub fn base_step_count(&self) -> usize {
        self.beats_per_measure as usize * self.beat_unit as usize
    }

    pub fn step_count(&self) -> usize {
        self.base_step_count() * self.step_precision as usize
    }

    pub fn triplet_step_count(&self) -> usize {
        self.beats_per_measure as usize * 3 * self.step_precision as usize
    }

    /// Seconds per measure.
    pub fn measure_duration(&self) -> f64 {
        (60.0 / self.tempo) * self.beats_per_measure as f64
    }

    pub fn step_duration(&self) -> f64 {
        self.measure_duration() / self.step_count() as f64
    }

}
