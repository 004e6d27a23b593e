// The middle layer: the only place that owns the sequencer state, the
// scheduler, and the sample registry. The TUI sends InputEvents in and reads
// a DisplayState out; the timing source's events come in here too.

use crate::audio::AudioBackend;
use crate::config::EngineConfig;
use crate::error::ValidationError;
use crate::loader::SampleRegistry;
use crate::sequencer::{Grid, Scheduler, SequencerState, Track, TrackId};
use crate::shared::{DisplayState, InputEvent, TrackRow};
use crate::ticker::{TickControl, TimerEvent};

// UI nudges never push the meter past these; the model itself only bounds from below
const MAX_BEATS_PER_MEASURE: u32 = 16;
const MAX_BEAT_UNIT: u32 = 32;
const MAX_STEP_PRECISION: u32 = 4;

pub struct Middle {
    pub state: SequencerState,
    samples: SampleRegistry,
    scheduler: Scheduler,
    cursor_row: usize,
    cursor_step: usize,
    status: String,
}

fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}

impl Middle {
    pub fn new(state: SequencerState, samples: SampleRegistry, config: &EngineConfig) -> Self {
        Self {
            state,
            samples,
            scheduler: Scheduler::new(config),
            cursor_row: 0,
            cursor_step: 0,
            status: String::new(),
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Gives every loaded sample without a track a track of its own.
    pub fn ensure_tracks_for_samples(&mut self) {
        for name in self.samples.names().to_vec() {
            if self.state.tracks().iter().any(|t| t.sample_id == name) {
                continue;
            }
            let track = Track::new(TrackId::generate(), name.clone(), name);
            let result = self.state.add_track(track);
            self.report(result);
        }
    }

    pub fn on_timer_event<B: AudioBackend>(&mut self, event: TimerEvent, backend: &mut B) {
        match event {
            TimerEvent::IntervalElapsed => {
                let hits = self.scheduler.on_tick(&self.state, &self.samples, backend);
                if !hits.is_empty() {
                    log::trace!(target: "middle", "{} hits scheduled", hits.len());
                }
            }
            TimerEvent::Debug { log } => log::debug!(target: "ticker", "{}", log),
        }
    }

    fn selected_track(&self) -> Option<&Track> {
        self.state.tracks().get(self.cursor_row)
    }

    fn selected_id(&self) -> Option<TrackId> {
        self.selected_track().map(|t| t.id.clone())
    }

    fn row_len(&self) -> usize {
        match self.selected_track() {
            Some(t) => Grid::of_track(t.triplet_enabled).step_count(&self.state),
            None => self.state.step_count(),
        }
    }

    fn clamp_cursor(&mut self) {
        self.cursor_row = self.cursor_row.min(self.state.track_count().saturating_sub(1));
        self.cursor_step = self.cursor_step.min(self.row_len().saturating_sub(1));
    }

    // rejected commands change nothing; the reason goes to the status line
    fn report<T>(&mut self, result: Result<T, ValidationError>) {
        match result {
            Ok(_) => self.status.clear(),
            Err(e) => {
                log::debug!(target: "middle", "rejected: {}", e);
                self.status = e.to_string();
            }
        }
    }

    fn with_selected(&mut self, f: impl FnOnce(&mut SequencerState, &TrackId) -> Result<(), ValidationError>) {
        match self.selected_id() {
            Some(id) => {
                let result = f(&mut self.state, &id);
                self.report(result);
            }
            None => self.status = "no track selected".to_string(),
        }
    }

    pub fn toggle_transport<B: AudioBackend, T: TickControl>(&mut self, backend: &mut B, ticker: &T) {
        if self.scheduler.is_running() {
            self.scheduler.stop(backend, ticker);
            self.state.playing_change(false);
        } else {
            self.scheduler.start(&self.state, backend, ticker);
            self.state.playing_change(true);
        }
    }

    /// Applies one input event. Returns false when the app should quit.
    pub fn handle_input<B: AudioBackend, T: TickControl>(
        &mut self,
        event: InputEvent,
        backend: &mut B,
        ticker: &T,
    ) -> bool {
        match event {
            InputEvent::Quit => {
                if self.scheduler.is_running() {
                    self.toggle_transport(backend, ticker);
                }
                return false;
            }
            InputEvent::PlayPress => self.toggle_transport(backend, ticker),

            InputEvent::CursorUp => self.cursor_row = self.cursor_row.saturating_sub(1),
            InputEvent::CursorDown => self.cursor_row += 1,
            InputEvent::CursorLeft => self.cursor_step = self.cursor_step.saturating_sub(1),
            InputEvent::CursorRight => self.cursor_step += 1,
            InputEvent::ToggleStep => {
                let step = self.cursor_step;
                self.with_selected(|s, id| s.toggle_loop_sample(id, step).map(|_| ()));
            }

            InputEvent::AddTrack => self.add_next_track(),
            InputEvent::RemoveTrack => self.with_selected(|s, id| s.remove_track(id)),
            InputEvent::ClearTrack => self.with_selected(|s, id| {
                let positions: Vec<usize> = s.track(id)?.positions.iter().copied().collect();
                for p in positions {
                    s.remove_loop_sample(id, p)?;
                }
                Ok(())
            }),
            InputEvent::ToggleMute => self.with_selected(|s, id| {
                let muted = s.track(id)?.muted;
                s.mute_change(id, !muted)
            }),
            InputEvent::ToggleTriplet => self.with_selected(|s, id| {
                let enabled = s.track(id)?.triplet_enabled;
                s.triplet_enabled_change(id, !enabled)
            }),

            InputEvent::AdjustTempo(delta) => {
                let result = self.state.tempo_change(self.state.tempo() + delta);
                self.report(result);
            }
            InputEvent::AdjustSwing(delta) => {
                let result = self.state.swing_change(self.state.swing() + delta);
                self.report(result);
            }
            InputEvent::AdjustBeatsPerMeasure(delta) => {
                let value = self.state.beats_per_measure().saturating_add_signed(delta).min(MAX_BEATS_PER_MEASURE);
                let result = self.state.beats_per_measure_change(value);
                self.report(result);
            }
            InputEvent::AdjustBeatUnit(delta) => {
                let unit = self.state.beat_unit();
                let value = if delta >= 0 { (unit * 2).min(MAX_BEAT_UNIT) } else { unit / 2 };
                let result = self.state.beat_unit_change(value);
                self.report(result);
            }
            InputEvent::AdjustStepPrecision(delta) => {
                let value = self.state.step_precision().saturating_add_signed(delta).min(MAX_STEP_PRECISION);
                let result = self.state.step_precision_change(value);
                self.report(result);
            }
            InputEvent::AdjustVolume(delta) => self.with_selected(|s, id| {
                let v = round2(s.track(id)?.volume + delta);
                s.volume_change(id, v)
            }),
            InputEvent::AdjustPan(delta) => self.with_selected(|s, id| {
                let p = round2(s.track(id)?.pan + delta);
                s.pan_change(id, p)
            }),
        }
        self.clamp_cursor();
        true
    }

    // next sample in load order, wrapping, so repeated adds layer the kit
    fn add_next_track(&mut self) {
        let names = self.samples.names();
        if names.is_empty() {
            self.status = "no samples loaded".to_string();
            return;
        }
        let name = names[self.state.track_count() % names.len()].clone();
        let track = Track::new(TrackId::generate(), name.clone(), name);
        let result = self.state.add_track(track);
        self.report(result);
        self.cursor_row = self.state.track_count().saturating_sub(1);
    }

    pub fn display_state<B: AudioBackend>(&mut self, backend: &B) -> DisplayState {
        let step_count = self.state.step_count();
        let playhead = self
            .scheduler
            .playhead(backend.current_time())
            .map(|step| step as f64 / step_count as f64);
        let rows = self
            .state
            .tracks()
            .iter()
            .map(|t| {
                let len = Grid::of_track(t.triplet_enabled).step_count(&self.state);
                TrackRow {
                    name: t.name.clone(),
                    sample: t.sample_id.clone(),
                    volume: t.volume,
                    pan: t.pan,
                    muted: t.muted,
                    triplet: t.triplet_enabled,
                    cells: (0..len).map(|i| t.positions.contains(&i)).collect(),
                }
            })
            .collect();
        DisplayState {
            playing: self.state.is_playing(),
            tempo: self.state.tempo(),
            swing: self.state.swing(),
            beats_per_measure: self.state.beats_per_measure(),
            beat_unit: self.state.beat_unit(),
            step_precision: self.state.step_precision(),
            step_count,
            triplet_step_count: self.state.triplet_step_count(),
            rows,
            cursor_row: self.cursor_row,
            cursor_step: self.cursor_step,
            playhead,
            status: self.status.clone(),
        }
    }
}
