// Step/position math: musical time -> seconds on the audio clock.

use super::model::SequencerState;

/// Which subdivision a track's positions index into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Grid {
    Binary,
    Triplet,
}

impl Grid {
    pub const ALL: [Grid; 2] = [Grid::Binary, Grid::Triplet];

    pub fn of_track(triplet_enabled: bool) -> Self {
        if triplet_enabled { Grid::Triplet } else { Grid::Binary }
    }

    pub fn step_count(self, state: &SequencerState) -> usize {
        match self {
            Grid::Binary => state.step_count(),
            Grid::Triplet => state.triplet_step_count(),
        }
    }
}

fn positions(count: usize) -> Vec<f64> {
    (0..count).map(|i| i as f64 / count as f64).collect()
}

/// Fraction of the measure at which each binary step starts.
pub fn expected_positions(state: &SequencerState) -> Vec<f64> {
    positions(state.step_count())
}

pub fn expected_triplet_positions(state: &SequencerState) -> Vec<f64> {
    positions(state.triplet_step_count())
}

/// Delay applied to odd binary steps: at 100% swing an odd step lands half
/// a step late.
pub fn swing_offset(swing: f64, step_duration: f64) -> f64 {
    (swing / 100.0) * step_duration / 2.0
}

/// Geometry of one measure for both grids. The scheduler freezes one per
/// measure, when the first grid reaches it, and both grids read the same one,
/// so tempo/meter edits never bend a measure that is already being scheduled
/// and never pull the grids apart.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeasureTiming {
    pub measure_duration: f64,
    pub binary_steps: usize,
    pub triplet_steps: usize,
}

impl MeasureTiming {
    pub fn snapshot(state: &SequencerState) -> Self {
        Self {
            measure_duration: state.measure_duration(),
            binary_steps: state.step_count(),
            triplet_steps: state.triplet_step_count(),
        }
    }

    pub fn step_count(&self, grid: Grid) -> usize {
        match grid {
            Grid::Binary => self.binary_steps,
            Grid::Triplet => self.triplet_steps,
        }
    }

    pub fn step_duration(&self, grid: Grid) -> f64 {
        self.measure_duration / self.step_count(grid) as f64
    }

    /// Absolute audio-clock time of step `index` on `grid` in the measure
    /// starting at `measure_start`. Swing only bends the binary grid.
    pub fn step_time(&self, grid: Grid, index: usize, measure_start: f64, swing: f64) -> f64 {
        let t = measure_start + index as f64 / self.step_count(grid) as f64 * self.measure_duration;
        if grid == Grid::Binary && index % 2 == 1 {
            t + swing_offset(swing, self.step_duration(grid))
        } else {
            t
        }
    }
}

/// Convenience over the live parameters: time of `index` on `grid` for a
/// measure starting at `measure_start`.
pub fn step_time(state: &SequencerState, grid: Grid, index: usize, measure_start: f64) -> f64 {
    MeasureTiming::snapshot(state).step_time(grid, index, measure_start, state.swing())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn state(tempo: f64, beats: u32, unit: u32, precision: u32) -> SequencerState {
        let mut s = SequencerState::default();
        s.tempo_change(tempo).unwrap();
        s.beats_per_measure_change(beats).unwrap();
        s.beat_unit_change(unit).unwrap();
        s.step_precision_change(precision).unwrap();
        s
    }

    #[test]
    fn positions_cover_measure() {
        for (beats, unit, precision) in [(2, 1, 1), (3, 4, 2), (4, 4, 1), (7, 8, 3), (4, 16, 4)] {
            let s = state(120.0, beats, unit, precision);
            let expected = (beats * unit * precision) as usize;
            assert_eq!(s.step_count(), expected);
            let pos = expected_positions(&s);
            assert_eq!(pos.len(), expected);
            assert_eq!(pos[0], 0.0);
            assert!(pos.windows(2).all(|w| w[0] < w[1]));
            assert!(pos.iter().all(|p| (0.0..1.0).contains(p)));
        }
    }

    #[test]
    fn triplet_positions_use_triplet_count() {
        let s = state(120.0, 4, 4, 2);
        assert_eq!(s.triplet_step_count(), 24);
        let pos = expected_triplet_positions(&s);
        assert_eq!(pos.len(), 24);
        assert_relative_eq!(pos[1], 1.0 / 24.0);
    }

    #[test]
    fn halving_tempo_doubles_measure() {
        let fast = state(150.0, 4, 4, 1);
        let slow = state(75.0, 4, 4, 1);
        assert_relative_eq!(fast.measure_duration(), 1.6);
        assert_relative_eq!(slow.measure_duration(), 2.0 * fast.measure_duration());
    }

    #[test]
    fn reference_timing_at_120() {
        let s = state(120.0, 4, 4, 1);
        assert_eq!(s.step_count(), 16);
        assert_relative_eq!(s.measure_duration(), 2.0);
        assert_relative_eq!(s.step_duration(), 0.125);
        assert_relative_eq!(step_time(&s, Grid::Binary, 4, 10.0), 10.5);
    }

    #[test]
    fn zero_swing_is_straight() {
        let s = state(120.0, 4, 4, 1);
        for i in 0..16 {
            assert_relative_eq!(step_time(&s, Grid::Binary, i, 0.0), i as f64 * 0.125);
        }
    }

    #[test]
    fn full_swing_delays_odd_steps_by_half_a_step() {
        let mut s = state(120.0, 4, 4, 1);
        s.swing_change(100.0).unwrap();
        for i in 0..16 {
            let straight = i as f64 * 0.125;
            let expected = if i % 2 == 1 { straight + 0.0625 } else { straight };
            assert_relative_eq!(step_time(&s, Grid::Binary, i, 0.0), expected);
        }
    }

    #[test]
    fn one_snapshot_covers_both_grids() {
        let s = state(90.0, 3, 8, 2);
        let timing = MeasureTiming::snapshot(&s);
        assert_eq!(timing.step_count(Grid::Binary), 48);
        assert_eq!(timing.step_count(Grid::Triplet), 18);
        assert_relative_eq!(timing.measure_duration, 2.0);
        assert_relative_eq!(timing.step_time(Grid::Triplet, 9, 4.0, 0.0), 5.0);
        assert_relative_eq!(timing.step_time(Grid::Binary, 24, 4.0, 100.0), 5.0);
    }

    #[test]
    fn swing_leaves_triplets_alone() {
        let mut s = state(120.0, 4, 4, 1);
        s.swing_change(100.0).unwrap();
        assert_relative_eq!(step_time(&s, Grid::Triplet, 1, 0.0), 2.0 / 12.0);
    }
}
