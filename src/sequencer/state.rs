// Validated command layer over SequencerState. Every command checks its input
// first and only then writes, so a rejected command leaves the state untouched.

use crate::error::ValidationError;
use crate::pipeline::project::SavedState;

use super::model::{self, SequencerState, Track, TrackId};

pub type CommandResult = Result<(), ValidationError>;

fn check_tempo(value: f64) -> CommandResult {
    if !value.is_finite() || value < 1.0 {
        return Err(ValidationError::InvalidTempo(value));
    }
    Ok(())
}

fn check_beats_per_measure(value: u32) -> CommandResult {
    if value < 2 {
        return Err(ValidationError::InvalidBeatsPerMeasure(value));
    }
    Ok(())
}

fn check_beat_unit(value: u32) -> CommandResult {
    // u32::is_power_of_two is false for 0
    if !value.is_power_of_two() {
        return Err(ValidationError::InvalidBeatUnit(value));
    }
    Ok(())
}

fn check_swing(value: f64) -> CommandResult {
    if !(0.0..=100.0).contains(&value) {
        return Err(ValidationError::InvalidSwing(value));
    }
    Ok(())
}

fn check_step_precision(value: u32) -> CommandResult {
    if value < 1 {
        return Err(ValidationError::InvalidStepPrecision(value));
    }
    Ok(())
}

fn check_meter(beats_per_measure: u32, beat_unit: u32, step_precision: u32) -> CommandResult {
    if model::meter_step_counts(beats_per_measure, beat_unit, step_precision).is_none() {
        return Err(ValidationError::TooManySteps { beats_per_measure, beat_unit, step_precision });
    }
    Ok(())
}

fn check_volume(value: f32) -> CommandResult {
    if !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::InvalidVolume(value));
    }
    Ok(())
}

fn check_pan(value: f32) -> CommandResult {
    if !(-1.0..=1.0).contains(&value) {
        return Err(ValidationError::InvalidPan(value));
    }
    Ok(())
}

fn check_track(track: &Track) -> CommandResult {
    check_volume(track.volume)?;
    check_pan(track.pan)
}

impl SequencerState {
    pub fn track(&self, id: &TrackId) -> Result<&Track, ValidationError> {
        self.tracks
            .iter()
            .find(|t| &t.id == id)
            .ok_or_else(|| ValidationError::UnknownTrack(id.to_string()))
    }

    fn track_mut(&mut self, id: &TrackId) -> Result<&mut Track, ValidationError> {
        self.tracks
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| ValidationError::UnknownTrack(id.to_string()))
    }

    pub fn tempo_change(&mut self, value: f64) -> CommandResult {
        check_tempo(value)?;
        self.tempo = value;
        Ok(())
    }

    pub fn beats_per_measure_change(&mut self, value: u32) -> CommandResult {
        check_beats_per_measure(value)?;
        check_meter(value, self.beat_unit, self.step_precision)?;
        self.beats_per_measure = value;
        Ok(())
    }

    pub fn beat_unit_change(&mut self, value: u32) -> CommandResult {
        check_beat_unit(value)?;
        check_meter(self.beats_per_measure, value, self.step_precision)?;
        self.beat_unit = value;
        Ok(())
    }

    pub fn swing_change(&mut self, value: f64) -> CommandResult {
        check_swing(value)?;
        self.swing = value;
        Ok(())
    }

    pub fn step_precision_change(&mut self, value: u32) -> CommandResult {
        check_step_precision(value)?;
        check_meter(self.beats_per_measure, self.beat_unit, value)?;
        self.step_precision = value;
        Ok(())
    }

    pub fn playing_change(&mut self, value: bool) {
        self.is_playing = value;
    }

    pub fn volume_change(&mut self, id: &TrackId, value: f32) -> CommandResult {
        check_volume(value)?;
        self.track_mut(id)?.volume = value;
        Ok(())
    }

    pub fn pan_change(&mut self, id: &TrackId, value: f32) -> CommandResult {
        check_pan(value)?;
        self.track_mut(id)?.pan = value;
        Ok(())
    }

    pub fn triplet_enabled_change(&mut self, id: &TrackId, enabled: bool) -> CommandResult {
        self.track_mut(id)?.triplet_enabled = enabled;
        Ok(())
    }

    pub fn mute_change(&mut self, id: &TrackId, muted: bool) -> CommandResult {
        self.track_mut(id)?.muted = muted;
        Ok(())
    }

    pub fn add_loop_sample(&mut self, id: &TrackId, position: usize) -> CommandResult {
        let track = self.track_mut(id)?;
        if !track.positions.insert(position) {
            return Err(ValidationError::DuplicatePosition {
                track: id.to_string(),
                position,
            });
        }
        Ok(())
    }

    pub fn remove_loop_sample(&mut self, id: &TrackId, position: usize) -> CommandResult {
        let track = self.track_mut(id)?;
        if !track.positions.remove(&position) {
            return Err(ValidationError::MissingPosition {
                track: id.to_string(),
                position,
            });
        }
        Ok(())
    }

    /// Adds the position if absent, removes it otherwise. Returns whether the
    /// track now fires at `position`.
    pub fn toggle_loop_sample(&mut self, id: &TrackId, position: usize) -> Result<bool, ValidationError> {
        let track = self.track_mut(id)?;
        if track.positions.remove(&position) {
            Ok(false)
        } else {
            track.positions.insert(position);
            Ok(true)
        }
    }

    pub fn add_track(&mut self, track: Track) -> CommandResult {
        if self.tracks.iter().any(|t| t.id == track.id) {
            return Err(ValidationError::DuplicateTrack(track.id.to_string()));
        }
        check_track(&track)?;
        self.tracks.push(track);
        Ok(())
    }

    pub fn remove_track(&mut self, id: &TrackId) -> CommandResult {
        let idx = self
            .tracks
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| ValidationError::UnknownTrack(id.to_string()))?;
        self.tracks.remove(idx);
        Ok(())
    }

    /// Replaces the session parameters and tracks with a saved snapshot.
    /// Missing fields fall back to defaults; one invalid field rejects the
    /// whole load. The transport flag is not part of a snapshot.
    pub fn load_app_state(&mut self, saved: SavedState) -> CommandResult {
        let tempo = saved.tempo.unwrap_or(model::DEFAULT_TEMPO);
        let beats_per_measure = saved.beats_per_measure.unwrap_or(model::DEFAULT_BEATS_PER_MEASURE);
        let beat_unit = saved.beat_unit.unwrap_or(model::DEFAULT_BEAT_UNIT);
        let swing = saved.swing.unwrap_or(model::DEFAULT_SWING);
        let step_precision = saved.step_precision.unwrap_or(model::DEFAULT_STEP_PRECISION);
        let tracks = saved.tracks.unwrap_or_default();

        check_tempo(tempo)?;
        check_beats_per_measure(beats_per_measure)?;
        check_beat_unit(beat_unit)?;
        check_swing(swing)?;
        check_step_precision(step_precision)?;
        check_meter(beats_per_measure, beat_unit, step_precision)?;
        for (i, track) in tracks.iter().enumerate() {
            check_track(track)?;
            if tracks[..i].iter().any(|t| t.id == track.id) {
                return Err(ValidationError::DuplicateTrack(track.id.to_string()));
            }
        }

        self.tempo = tempo;
        self.beats_per_measure = beats_per_measure;
        self.beat_unit = beat_unit;
        self.swing = swing;
        self.step_precision = step_precision;
        self.tracks = tracks;
        Ok(())
    }

    pub fn to_saved(&self) -> SavedState {
        SavedState {
            tempo: Some(self.tempo),
            beats_per_measure: Some(self.beats_per_measure),
            beat_unit: Some(self.beat_unit),
            swing: Some(self.swing),
            step_precision: Some(self.step_precision),
            tracks: Some(self.tracks.clone()),
        }
    }
}
