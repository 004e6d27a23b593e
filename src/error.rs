use thiserror::Error;

/// Rejections from the sequencer command layer. A rejected command never
/// changes state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid tempo value: {0}")]
    InvalidTempo(f64),

    #[error("invalid beatsPerMeasure: {0}")]
    InvalidBeatsPerMeasure(u32),

    #[error("invalid beatUnit: {0}")]
    InvalidBeatUnit(u32),

    #[error("invalid swing value: {0}")]
    InvalidSwing(f64),

    #[error("invalid step precision: {0}")]
    InvalidStepPrecision(u32),

    #[error("meter {beats_per_measure}/{beat_unit} x{step_precision} has too many steps per measure")]
    TooManySteps { beats_per_measure: u32, beat_unit: u32, step_precision: u32 },

    #[error("invalid volume value: {0}")]
    InvalidVolume(f32),

    #[error("invalid pan value: {0}")]
    InvalidPan(f32),

    #[error("trackId not found: {0}")]
    UnknownTrack(String),

    #[error("trackId already exists: {0}")]
    DuplicateTrack(String),

    #[error("loop sample already exists: trackId {track} position {position}")]
    DuplicatePosition { track: String, position: usize },

    #[error("loop sample does not exist: trackId {track} position {position}")]
    MissingPosition { track: String, position: usize },
}
