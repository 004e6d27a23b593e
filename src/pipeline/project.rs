// What gets written to disk between sessions

use serde::{Deserialize, Serialize};

use crate::sequencer::Track;

// Every field is optional so older or hand-edited files still load; whatever
// is missing falls back to the defaults in SequencerState::load_app_state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tempo: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beats_per_measure: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beat_unit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swing: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracks: Option<Vec<Track>>,
}
