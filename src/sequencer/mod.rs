pub mod grid;
pub mod mixer;
pub mod model;
pub mod scheduler;
pub mod state;

pub use grid::{expected_positions, expected_triplet_positions, step_time, Grid, MeasureTiming};
pub use model::{SequencerState, Track, TrackId};
pub use scheduler::{Hit, Phase, Scheduler};
pub use state::CommandResult;
