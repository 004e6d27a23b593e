// Command layer and project persistence through the public API.

use loopbox::pipeline::persistence::{load_project, save_project};
use loopbox::pipeline::project::SavedState;
use loopbox::sequencer::{SequencerState, Track, TrackId};
use loopbox::ValidationError;

fn populated() -> SequencerState {
    let mut state = SequencerState::default();
    state.add_track(Track::new(TrackId::from("kick"), "Kick", "kick").with_positions([0, 8])).unwrap();
    state.add_track(Track::new(TrackId::from("hat"), "Hat", "hat")).unwrap();
    state
}

#[test]
fn every_rejected_command_leaves_state_untouched() {
    let mut state = populated();
    let before = state.clone();
    let kick = TrackId::from("kick");
    let ghost = TrackId::from("ghost");

    let rejected = [
        state.tempo_change(-4.0),
        state.beats_per_measure_change(0),
        state.beat_unit_change(3),
        state.swing_change(101.0),
        state.step_precision_change(0),
        state.volume_change(&kick, 1.5),
        state.pan_change(&kick, -1.01),
        state.volume_change(&ghost, 0.5),
        state.add_loop_sample(&kick, 8),
        state.remove_loop_sample(&kick, 3),
        state.add_track(Track::new(TrackId::from("hat"), "Hat again", "hat")),
        state.remove_track(&ghost),
    ];
    assert!(rejected.iter().all(|r| r.is_err()));
    assert_eq!(state, before);
}

#[test]
fn duplicate_position_zero_is_caught() {
    let mut state = populated();
    let kick = TrackId::from("kick");
    assert_eq!(
        state.add_loop_sample(&kick, 0),
        Err(ValidationError::DuplicatePosition { track: "kick".to_string(), position: 0 })
    );
}

#[test]
fn project_survives_a_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let mut state = populated();
    state.tempo_change(132.0).unwrap();
    state.swing_change(25.0).unwrap();
    state.triplet_enabled_change(&TrackId::from("hat"), true).unwrap();
    state.mute_change(&TrackId::from("kick"), true).unwrap();

    assert!(load_project(dir.path()).unwrap().is_none());
    save_project(dir.path(), &state.to_saved()).unwrap();
    let saved = load_project(dir.path()).unwrap().unwrap();

    let mut restored = SequencerState::default();
    restored.load_app_state(saved).unwrap();
    assert_eq!(restored, state);
}

#[test]
fn partial_snapshot_falls_back_to_defaults() {
    let saved: SavedState = serde_json::from_str(r#"{ "tempo": 90 }"#).unwrap();
    let mut state = populated();
    state.load_app_state(saved).unwrap();
    assert_eq!(state.tempo(), 90.0);
    assert_eq!(state.beats_per_measure(), 4);
    assert_eq!(state.track_count(), 0);
}

#[test]
fn one_bad_field_rejects_the_whole_snapshot() {
    let saved: SavedState =
        serde_json::from_str(r#"{ "tempo": 90, "beatUnit": 6, "tracks": [] }"#).unwrap();
    let mut state = populated();
    let before = state.clone();
    assert_eq!(state.load_app_state(saved), Err(ValidationError::InvalidBeatUnit(6)));
    assert_eq!(state, before);
}
