// Types shared between the TUI and the middle layer.
//
// The TUI never touches the sequencer directly: it resolves keys into
// semantic InputEvents, hands them to the middle layer, and each frame draws
// whatever DisplayState the middle layer returns.

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    Quit,
    PlayPress,

    // grid cursor
    CursorUp,
    CursorDown,
    CursorLeft,
    CursorRight,
    ToggleStep, // at the cursor

    // track management (acts on the cursor row)
    AddTrack,
    RemoveTrack,
    ClearTrack,
    ToggleMute,
    ToggleTriplet,

    // semantic knob events, resolved by the tui from the current page
    AdjustTempo(f64),
    AdjustSwing(f64),
    AdjustBeatsPerMeasure(i32),
    AdjustBeatUnit(i32), // +1 doubles, -1 halves
    AdjustVolume(f32),
    AdjustPan(f32),
    AdjustStepPrecision(i32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamPage {
    Transport,
    Meter,
    Mix,
}

impl ParamPage {
    pub fn next(self) -> Self {
        match self {
            ParamPage::Transport => ParamPage::Meter,
            ParamPage::Meter => ParamPage::Mix,
            ParamPage::Mix => ParamPage::Transport,
        }
    }

    pub fn knob_labels(self) -> (&'static str, &'static str) {
        match self {
            ParamPage::Transport => ("TEMPO", "SWING"),
            ParamPage::Meter => ("BEATS", "UNIT"),
            ParamPage::Mix => ("VOLUME", "PAN"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrackRow {
    pub name: String,
    pub sample: String,
    pub volume: f32,
    pub pan: f32,
    pub muted: bool,
    pub triplet: bool,
    pub cells: Vec<bool>, // one per step of the row's grid
}

#[derive(Clone, Debug, PartialEq)]
pub struct DisplayState {
    pub playing: bool,
    pub tempo: f64,
    pub swing: f64,
    pub beats_per_measure: u32,
    pub beat_unit: u32,
    pub step_precision: u32,
    pub step_count: usize,
    pub triplet_step_count: usize,
    pub rows: Vec<TrackRow>,
    pub cursor_row: usize,
    pub cursor_step: usize,
    pub playhead: Option<f64>, // fraction of the measure, if playing
    pub status: String, // last rejection or notice
}
