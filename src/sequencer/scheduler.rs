// Look-ahead scheduler.
//
// Ticks from the timing source only say "look again". On each one the
// scheduler reads the audio clock and commits every step that starts before
// `now + lookahead` to the engine at its exact clock time. The window is
// wider than the tick interval, so a late or lost tick shifts nothing; a step
// whose time already passed is played at `now` instead of being dropped.

use std::collections::VecDeque;

use crate::audio::{AudioBackend, VoiceId};
use crate::config::EngineConfig;
use crate::loader::SampleRegistry;
use crate::ticker::TickControl;

use super::grid::{Grid, MeasureTiming};
use super::mixer::TrackMixer;
use super::model::{SequencerState, TrackId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Stopped,
    Running,
}

/// One measure of the loop: where it starts on the audio clock and its
/// geometry, frozen when the first grid reaches it.
#[derive(Clone, Copy, Debug)]
struct Measure {
    origin: f64,
    timing: MeasureTiming,
}

impl Measure {
    fn first(state: &SequencerState, origin: f64) -> Self {
        Self { origin, timing: MeasureTiming::snapshot(state) }
    }

    // measure boundary: pick up tempo/meter edits from here on
    fn following(&self, state: &SequencerState) -> Self {
        Self {
            origin: self.origin + self.timing.measure_duration,
            timing: MeasureTiming::snapshot(state),
        }
    }
}

/// Position of one grid in the loop.
#[derive(Clone, Copy, Debug, Default)]
struct GridCursor {
    measure: u64, // index of the measure being scheduled
    next: usize,  // first step not yet scheduled in it
}

#[derive(Clone, Debug)]
struct Pending {
    voice: VoiceId,
    at: f64,
}

/// One committed hit, reported back so callers (and tests) can see exactly
/// what went to the engine.
#[derive(Clone, Debug, PartialEq)]
pub struct Hit {
    pub track: TrackId,
    pub grid: Grid,
    pub step: usize,
    pub at: f64,
    pub late: bool,
}

pub struct Scheduler {
    tick_interval: f64,
    lookahead: f64,
    phase: Phase,
    cursors: [GridCursor; 2], // binary, triplet
    base: Measure,            // earliest measure a cursor is still in
    base_index: u64,
    ahead: VecDeque<Measure>, // measures base_index + 1 onwards, already frozen
    mixer: TrackMixer,
    pending: VecDeque<Pending>,
    marks: VecDeque<(f64, usize)>, // binary step start times, for the playhead
}

impl Scheduler {
    pub fn new(config: &EngineConfig) -> Self {
        let state = SequencerState::default();
        Self {
            tick_interval: config.tick_interval(),
            lookahead: config.lookahead(),
            phase: Phase::Stopped,
            cursors: [GridCursor::default(); 2],
            base: Measure::first(&state, 0.0),
            base_index: 0,
            ahead: VecDeque::new(),
            mixer: TrackMixer::new(),
            pending: VecDeque::new(),
            marks: VecDeque::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn tick_interval(&self) -> f64 {
        self.tick_interval
    }

    pub fn lookahead(&self) -> f64 {
        self.lookahead
    }

    pub fn mixer(&self) -> &TrackMixer {
        &self.mixer
    }

    /// Stopped -> Running. The current audio time becomes the start of
    /// measure zero; nothing is scheduled until the first tick.
    pub fn start<B: AudioBackend, T: TickControl>(
        &mut self,
        state: &SequencerState,
        backend: &mut B,
        ticker: &T,
    ) {
        if self.phase == Phase::Running {
            return;
        }
        let now = backend.current_time();
        self.cursors = [GridCursor::default(); 2];
        self.base = Measure::first(state, now);
        self.base_index = 0;
        self.ahead.clear();
        self.pending.clear();
        self.marks.clear();
        self.mixer.sync(state, backend);
        self.phase = Phase::Running;
        ticker.start(self.tick_interval);
        log::info!(target: "scheduler", "transport started at {:.3}s", now);
    }

    /// Running -> Stopped. Disarms the ticker and cancels every hit that has
    /// not started sounding yet.
    pub fn stop<B: AudioBackend, T: TickControl>(&mut self, backend: &mut B, ticker: &T) {
        ticker.stop();
        if self.phase == Phase::Stopped {
            return;
        }
        let now = backend.current_time();
        let mut cancelled = 0;
        for p in self.pending.drain(..) {
            if p.at > now {
                backend.cancel_playback(p.voice);
                cancelled += 1;
            }
        }
        self.marks.clear();
        self.phase = Phase::Stopped;
        log::info!(target: "scheduler", "transport stopped at {:.3}s, {} pending hits cancelled", now, cancelled);
    }

    /// One scheduling pass. Ticks that arrive while stopped are ignored.
    pub fn on_tick<B: AudioBackend>(
        &mut self,
        state: &SequencerState,
        samples: &SampleRegistry,
        backend: &mut B,
    ) -> Vec<Hit> {
        if self.phase != Phase::Running {
            return Vec::new();
        }
        let now = backend.current_time();
        let horizon = now + self.lookahead;
        self.mixer.sync(state, backend);
        self.pending.retain(|p| p.at > now);
        self.prune_marks(now);

        let mut hits = Vec::new();
        for (i, grid) in Grid::ALL.into_iter().enumerate() {
            loop {
                let cursor = self.cursors[i];
                let measure = self.measure(cursor.measure, state);
                if cursor.next >= measure.timing.step_count(grid) {
                    self.cursors[i] = GridCursor { measure: cursor.measure + 1, next: 0 };
                    continue;
                }
                let step = cursor.next;
                let t = measure.timing.step_time(grid, step, measure.origin, state.swing());
                if t >= horizon {
                    break;
                }
                let late = t < now;
                if now - t > self.tick_interval {
                    log::trace!(target: "scheduler", "step {} on {:?} grid {:.1} ms late", step, grid, (now - t) * 1000.0);
                }
                let at = t.max(now);

                for track in state.tracks() {
                    if Grid::of_track(track.triplet_enabled) != grid || !track.fires_at(step) {
                        continue;
                    }
                    let Some(sample) = samples.get(&track.sample_id) else {
                        log::trace!(target: "scheduler", "no sample '{}' for track {}", track.sample_id, track.id);
                        continue;
                    };
                    let Some(dest) = self.mixer.input(&track.id) else {
                        continue;
                    };
                    let voice = backend.schedule_playback(sample, at, dest);
                    self.pending.push_back(Pending { voice, at });
                    hits.push(Hit { track: track.id.clone(), grid, step, at, late });
                }

                if grid == Grid::Binary {
                    self.marks.push_back((at, step));
                }
                self.cursors[i].next += 1;
            }
        }
        self.prune_measures();
        hits
    }

    // Measure `index`, freezing any measures up to it that no grid has
    // reached yet. Both grids share these, so they always agree on where a
    // measure starts and how long it is.
    fn measure(&mut self, index: u64, state: &SequencerState) -> Measure {
        let offset = index.saturating_sub(self.base_index) as usize;
        if offset == 0 {
            return self.base;
        }
        while self.ahead.len() < offset {
            let prev = self.ahead.back().copied().unwrap_or(self.base);
            self.ahead.push_back(prev.following(state));
        }
        self.ahead[offset - 1]
    }

    // drop measures both grids have moved past
    fn prune_measures(&mut self) {
        let oldest = self.cursors.iter().map(|c| c.measure).min().unwrap_or(self.base_index);
        while self.base_index < oldest {
            let Some(next) = self.ahead.pop_front() else {
                break;
            };
            self.base = next;
            self.base_index += 1;
        }
    }

    /// Binary step sounding at `now`, if the transport is running.
    pub fn playhead(&mut self, now: f64) -> Option<usize> {
        if self.phase != Phase::Running {
            return None;
        }
        self.prune_marks(now);
        self.marks.front().filter(|(at, _)| *at <= now).map(|(_, step)| *step)
    }

    // keep the latest mark at or before `now` and everything after it
    fn prune_marks(&mut self, now: f64) {
        while self.marks.len() > 1 && self.marks[1].0 <= now {
            self.marks.pop_front();
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{OfflineBackend, SampleBuffer, SampleId, StereoFrame};
    use crate::sequencer::model::Track;
    use approx::assert_relative_eq;
    use std::cell::RefCell;

    const RATE: u32 = 48000;

    #[derive(Default)]
    struct FakeTicker {
        log: RefCell<Vec<Option<f64>>>, // Some(interval) = start, None = stop
    }

    impl TickControl for FakeTicker {
        fn start(&self, interval: f64) {
            self.log.borrow_mut().push(Some(interval));
        }
        fn stop(&self) {
            self.log.borrow_mut().push(None);
        }
    }

    struct Rig {
        state: SequencerState,
        samples: SampleRegistry,
        backend: OfflineBackend,
        ticker: FakeTicker,
        scheduler: Scheduler,
    }

    impl Rig {
        fn new(tracks: Vec<Track>) -> Self {
            let mut state = SequencerState::default();
            state.tempo_change(120.0).unwrap();
            for t in tracks {
                state.add_track(t).unwrap();
            }
            let mut backend = OfflineBackend::new(RATE);
            let mut samples = SampleRegistry::new();
            for (i, name) in ["kick", "snare", "hat"].into_iter().enumerate() {
                let id = SampleId(1000 + i as u64);
                backend.register_sample(
                    id,
                    SampleBuffer { data: vec![StereoFrame { left: 1.0, right: 1.0 }; 32] },
                );
                samples.insert(name, id);
            }
            Self {
                state,
                samples,
                backend,
                ticker: FakeTicker::default(),
                scheduler: Scheduler::new(&EngineConfig::default()),
            }
        }

        fn start(&mut self) {
            self.scheduler.start(&self.state, &mut self.backend, &self.ticker);
        }

        fn tick(&mut self) -> Vec<Hit> {
            self.scheduler.on_tick(&self.state, &self.samples, &mut self.backend)
        }

        // advance the audio clock, ticking every `every` seconds
        fn run(&mut self, secs: f64, every: f64) -> Vec<Hit> {
            let mut hits = Vec::new();
            let end = self.backend.current_time() + secs;
            while self.backend.current_time() + every <= end + 1e-9 {
                self.backend.advance_by(every);
                hits.extend(self.tick());
            }
            hits
        }
    }

    fn kick_on_beats() -> Track {
        Track::new(TrackId::from("k"), "Kick", "kick").with_positions([0, 4, 8, 12])
    }

    #[test]
    fn start_then_stop_schedules_nothing() {
        let mut rig = Rig::new(vec![kick_on_beats()]);
        rig.start();
        rig.scheduler.stop(&mut rig.backend, &rig.ticker);
        assert!(rig.backend.scheduled().is_empty());
        assert_eq!(*rig.ticker.log.borrow(), vec![Some(0.025), None]);
        // a tick already in flight when stop happened does nothing
        assert!(rig.tick().is_empty());
    }

    #[test]
    fn quarter_notes_at_120_land_every_half_second() {
        let mut rig = Rig::new(vec![kick_on_beats()]);
        rig.start();
        let hits = rig.run(4.0, 0.025);
        let times: Vec<f64> = hits.iter().map(|h| h.at).collect();
        assert!(times.len() >= 8);
        for (i, t) in times.iter().enumerate().skip(1) {
            // step 0 of measure 0 is clamped to the first tick
            assert_relative_eq!(*t, i as f64 * 0.5, epsilon = 1e-9);
        }
        assert!(hits[0].late);
        assert_eq!(hits.iter().map(|h| h.step).take(5).collect::<Vec<_>>(), vec![0, 4, 8, 12, 0]);
    }

    #[test]
    fn nothing_is_committed_beyond_the_window() {
        let mut rig = Rig::new(vec![kick_on_beats()]);
        rig.start();
        rig.run(1.0, 0.025);
        let now = rig.backend.current_time();
        for s in rig.backend.scheduled() {
            assert!(s.at < now + rig.scheduler.lookahead());
        }
    }

    #[test]
    fn stalled_ticks_lose_no_steps() {
        let every_step = Track::new(TrackId::from("h"), "Hat", "hat").with_positions(0..16);
        let mut rig = Rig::new(vec![every_step]);
        rig.start();
        let mut hits = Vec::new();
        // irregular gaps, some far longer than a step, none longer than the window
        for gap in [0.025, 0.09, 0.01, 0.099, 0.025, 0.06, 0.095, 0.002, 0.08].iter().cycle().take(60) {
            rig.backend.advance_by(*gap);
            hits.extend(rig.tick());
        }
        let steps: Vec<usize> = hits.iter().map(|h| h.step).collect();
        for (i, step) in steps.iter().enumerate() {
            assert_eq!(*step, i % 16, "step {} out of order", i);
        }
        let times: Vec<f64> = hits.iter().map(|h| h.at).collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn a_long_stall_plays_late_steps_at_now() {
        let every_step = Track::new(TrackId::from("h"), "Hat", "hat").with_positions(0..16);
        let mut rig = Rig::new(vec![every_step]);
        rig.start();
        rig.backend.advance_to(0.6);
        let hits = rig.tick();
        // steps 0..=4 are already past and play at now; step 5 (0.625) is on time
        let late: Vec<&Hit> = hits.iter().filter(|h| h.late).collect();
        assert_eq!(late.len(), 5);
        assert!(late.iter().all(|h| (h.at - 0.6).abs() < 1e-9));
        assert_eq!(hits.iter().map(|h| h.step).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn stop_cancels_only_future_hits() {
        let mut rig = Rig::new(vec![kick_on_beats()]);
        rig.start();
        rig.run(0.45, 0.025); // the step at 0.5 is inside the window now
        let scheduled = rig.backend.scheduled().len();
        assert_eq!(scheduled, 2);
        rig.scheduler.stop(&mut rig.backend, &rig.ticker);
        assert_eq!(rig.backend.cancelled().len(), 1);
        assert_eq!(rig.scheduler.pending_count(), 0);
        assert_eq!(rig.scheduler.phase(), Phase::Stopped);
    }

    #[test]
    fn triplet_tracks_follow_the_triplet_grid() {
        let mut trip = Track::new(TrackId::from("t"), "Trip", "snare").with_positions([0, 1, 2]);
        trip.triplet_enabled = true;
        let mut rig = Rig::new(vec![trip, kick_on_beats()]);
        rig.state.swing_change(100.0).unwrap();
        rig.start();
        let hits = rig.run(0.5, 0.025);
        let trip_times: Vec<f64> = hits.iter().filter(|h| h.grid == Grid::Triplet).map(|h| h.at).collect();
        // 12 triplet steps per 2 s measure, swing not applied
        assert_eq!(trip_times.len(), 3);
        assert_relative_eq!(trip_times[1], 2.0 / 12.0, epsilon = 1e-9);
        assert_relative_eq!(trip_times[2], 4.0 / 12.0, epsilon = 1e-9);
    }

    #[test]
    fn coinciding_grids_fire_independently() {
        let mut trip = Track::new(TrackId::from("t"), "Trip", "snare").with_positions([3]);
        trip.triplet_enabled = true;
        let kick = Track::new(TrackId::from("k"), "Kick", "kick").with_positions([4]);
        let mut rig = Rig::new(vec![trip, kick]);
        rig.start();
        let hits = rig.run(0.6, 0.025);
        assert_eq!(hits.len(), 2);
        assert_relative_eq!(hits[0].at, hits[1].at, epsilon = 1e-9);
    }

    #[test]
    fn muted_tracks_and_unknown_samples_stay_silent() {
        let mut muted = kick_on_beats();
        muted.muted = true;
        let ghost = Track::new(TrackId::from("g"), "Ghost", "missing").with_positions([0, 8]);
        let mut rig = Rig::new(vec![muted, ghost]);
        rig.start();
        assert!(rig.run(2.0, 0.025).is_empty());
    }

    #[test]
    fn tempo_change_applies_from_next_measure() {
        let mut rig = Rig::new(vec![kick_on_beats()]);
        rig.start();
        rig.run(1.0, 0.025);
        rig.state.tempo_change(60.0).unwrap(); // measure becomes 4 s
        let hits = rig.run(6.0, 0.025);
        let times: Vec<f64> = hits.iter().map(|h| h.at).collect();
        // rest of measure 0 keeps the old grid, measure 1 starts at 2.0 on the new one
        assert_relative_eq!(times[0], 1.5, epsilon = 1e-9);
        assert_relative_eq!(times[1], 2.0, epsilon = 1e-9);
        assert_relative_eq!(times[2], 3.0, epsilon = 1e-9);
        assert_relative_eq!(times[3], 4.0, epsilon = 1e-9);
    }

    fn downbeats_per_grid(hits: &[Hit]) -> (Vec<f64>, Vec<f64>) {
        let on = |grid| hits.iter().filter(|h| h.grid == grid && h.step == 0).map(|h| h.at).collect();
        (on(Grid::Binary), on(Grid::Triplet))
    }

    fn both_grids_on_the_downbeat() -> Vec<Track> {
        let mut trip = Track::new(TrackId::from("t"), "Trip", "snare").with_positions([0]);
        trip.triplet_enabled = true;
        vec![Track::new(TrackId::from("k"), "Kick", "kick").with_positions([0]), trip]
    }

    // At 1.75 s the triplet grid has already entered measure 1 (its last
    // step sits at 1.833 s) while the binary grid is still on step 15.
    #[test]
    fn tempo_change_between_grid_wraps_keeps_grids_together() {
        let mut rig = Rig::new(both_grids_on_the_downbeat());
        rig.start();
        let mut hits = rig.run(1.75, 0.025);
        rig.state.tempo_change(60.0).unwrap();
        hits.extend(rig.run(6.75, 0.025));

        let (binary, triplet) = downbeats_per_grid(&hits);
        assert_eq!(binary, triplet);
        // measure 1 was frozen before the change, so 60 BPM starts at measure 2
        let expected = [0.025, 2.0, 4.0, 8.0];
        assert_eq!(binary.len(), expected.len());
        for (t, e) in binary.iter().zip(expected) {
            assert_relative_eq!(*t, e, epsilon = 1e-9);
        }
    }

    #[test]
    fn meter_change_between_grid_wraps_keeps_grids_together() {
        let mut rig = Rig::new(both_grids_on_the_downbeat());
        rig.start();
        let mut hits = rig.run(1.75, 0.025);
        rig.state.beats_per_measure_change(3).unwrap();
        hits.extend(rig.run(5.75, 0.025));

        let (binary, triplet) = downbeats_per_grid(&hits);
        assert_eq!(binary, triplet);
        let expected = [0.025, 2.0, 4.0, 5.5, 7.0];
        assert_eq!(binary.len(), expected.len());
        for (t, e) in binary.iter().zip(expected) {
            assert_relative_eq!(*t, e, epsilon = 1e-9);
        }
    }

    #[test]
    fn removed_track_loses_its_strip() {
        let mut rig = Rig::new(vec![kick_on_beats()]);
        rig.start();
        rig.run(0.1, 0.025);
        assert_eq!(rig.scheduler.mixer().strip_count(), 1);
        rig.state.remove_track(&TrackId::from("k")).unwrap();
        rig.run(0.1, 0.025);
        assert_eq!(rig.scheduler.mixer().strip_count(), 0);
        assert!(rig.scheduler.mixer().graph().is_empty());
    }

    #[test]
    fn playhead_follows_audio_clock() {
        let every_step = Track::new(TrackId::from("h"), "Hat", "hat").with_positions(0..16);
        let mut rig = Rig::new(vec![every_step]);
        assert_eq!(rig.scheduler.playhead(0.0), None);
        rig.start();
        rig.run(0.3, 0.025);
        assert_eq!(rig.scheduler.playhead(0.26), Some(2));
        assert_eq!(rig.scheduler.playhead(0.3), Some(2));
    }

    #[test]
    fn scheduled_hits_are_audible() {
        let mut rig = Rig::new(vec![kick_on_beats()]);
        rig.start();
        rig.run(0.45, 0.025);
        let audio = rig.backend.advance_to(0.6);
        // the hit at 0.5 s starts exactly 0.05 s into this render
        let first_loud = audio.iter().position(|f| f.left.abs() > 0.0).unwrap();
        assert_eq!(first_loud, (0.05 * RATE as f64) as usize);
    }
}
