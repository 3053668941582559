//! Tempo, meter and beat position.
//!
//! The clock folds host position updates in, advances the fractional beat once
//! per block and reports where in the block the next beat lands.

pub const MIN_BPM: f32 = 1.0;
pub const MIN_BEATS_PER_BAR: f32 = 1.0;

// Sub-sample slack so accumulated float error never moves a beat by a whole sample.
const OFFSET_TOLERANCE: f64 = 1e-3;

/// One host transport message. Absent fields leave the clock untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PositionUpdate {
    pub bar_beat: Option<f32>,
    pub bpm: Option<f32>,
    pub beats_per_bar: Option<f32>,
    pub speed: Option<f32>,
}

impl PositionUpdate {
    pub fn with_bar_beat(mut self, beat: f32) -> Self {
        self.bar_beat = Some(beat);
        self
    }

    pub fn with_bpm(mut self, bpm: f32) -> Self {
        self.bpm = Some(bpm);
        self
    }

    pub fn with_beats_per_bar(mut self, beats: f32) -> Self {
        self.beats_per_bar = Some(beats);
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = Some(speed);
        self
    }
}

/// Where a beat boundary fell inside the block just advanced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BeatCrossing {
    pub offset: usize,
    pub bar_start: bool,
}

#[derive(Clone, Debug)]
pub struct TransportClock {
    sample_rate: f64,
    bpm: f32,
    beats_per_bar: f32,
    speed: f32,
    beat_position: f64, // fractional, wraps at beats_per_bar
    bar_beat: u32,
    loop_beat: u32,  // 1-based beat within the loop, 0 before the first beat
    loop_beats: u32, // cached floor(beats_per_bar) * bars
    // the host already counted the beat the clock now sits on
    host_stepped: bool,
}

impl TransportClock {
    pub fn new(sample_rate: f64, bpm: f32, beats_per_bar: f32) -> Self {
        Self {
            sample_rate,
            bpm: clamp_bpm(bpm),
            beats_per_bar: clamp_beats_per_bar(beats_per_bar),
            speed: 0.0,
            beat_position: 0.0,
            bar_beat: 0,
            loop_beat: 0,
            loop_beats: 0,
            host_stepped: false,
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    pub fn beats_per_bar(&self) -> f32 {
        self.beats_per_bar
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn beat_position(&self) -> f64 {
        self.beat_position
    }

    pub fn bar_beat(&self) -> u32 {
        self.bar_beat
    }

    pub fn loop_beat(&self) -> u32 {
        self.loop_beat
    }

    pub fn loop_beats(&self) -> u32 {
        self.loop_beats
    }

    pub fn is_rolling(&self) -> bool {
        self.speed != 0.0
    }

    /// Folds one update in. Returns true when tempo, meter or speed actually changed,
    /// which invalidates the loop geometry.
    pub fn apply(&mut self, update: &PositionUpdate) -> bool {
        let mut changed = false;

        if let Some(beats) = update.beats_per_bar.filter(|v| v.is_finite()) {
            let beats = clamp_beats_per_bar(beats);
            if beats != self.beats_per_bar {
                self.beats_per_bar = beats;
                changed = true;
            }
        }

        // tempo is compared to the nearest whole bpm so host jitter doesn't wipe the loops
        if let Some(bpm) = update.bpm.filter(|v| v.is_finite()) {
            let bpm = clamp_bpm(bpm);
            if bpm.round() != self.bpm.round() {
                self.bpm = bpm;
                changed = true;
            }
        }

        if let Some(speed) = update.speed.filter(|v| v.is_finite()) {
            if speed != self.speed {
                self.speed = speed;
                changed = true;
            }
        }

        if let Some(beat) = update.bar_beat.filter(|v| v.is_finite()) {
            self.beat_position = f64::from(beat).rem_euclid(f64::from(self.beats_per_bar));
            let whole = self.beat_position.floor() as u32;
            if whole != self.bar_beat {
                self.bar_beat = whole;
                self.step_loop_beat();
                self.host_stepped = true;
            }
        }

        changed
    }

    /// Loop length in beats for the given bar count.
    pub fn loop_beats_for(&self, bars: u32) -> u32 {
        (self.beats_per_bar.floor() as u32).saturating_mul(bars)
    }

    /// True when the cached loop beat count no longer matches meter x bars.
    pub fn geometry_stale(&self, bars: u32) -> bool {
        self.loop_beats_for(bars) != self.loop_beats
    }

    /// Re-caches the loop beat count and returns the loop length in frames.
    ///
    /// Falls back to the full capacity when the loop would not fit or the
    /// transport is stopped (free-running mode).
    pub fn recompute_loop(&mut self, bars: u32, capacity: usize) -> usize {
        self.loop_beats = self.loop_beats_for(bars);
        self.loop_beat = 0;
        self.host_stepped = false;
        if !self.is_rolling() {
            return capacity;
        }
        self.tempo_loop_samples(capacity)
    }

    /// Loop length in frames from the cached beat count and tempo alone, clamped to capacity.
    pub fn tempo_loop_samples(&self, capacity: usize) -> usize {
        let samples = f64::from(self.loop_beats) * self.sample_rate * 60.0 / f64::from(self.bpm);
        if !samples.is_finite() || samples > capacity as f64 {
            return capacity;
        }
        samples as usize
    }

    #[inline]
    fn beats_per_sample(&self) -> f64 {
        f64::from(self.bpm) / 60.0 / self.sample_rate
    }

    /// Moves the beat position forward by `n` frames.
    ///
    /// Reports the first frame in `[0, n)` whose beat position reaches a new
    /// integer beat. A beat that lands exactly on a block boundary belongs to
    /// the following block, at offset 0.
    pub fn advance(&mut self, n: usize) -> Option<BeatCrossing> {
        if n == 0 {
            return None;
        }
        let inc = self.beats_per_sample();
        let bpb = f64::from(self.beats_per_bar);
        let start = self.beat_position;

        let next_beat = (start - inc + OFFSET_TOLERANCE * inc).floor() + 1.0;
        let offset = ((next_beat - start) / inc - OFFSET_TOLERANCE).ceil().max(0.0);
        let crossing = (offset < n as f64).then(|| BeatCrossing {
            offset: offset as usize,
            bar_start: next_beat.rem_euclid(bpb).floor() == 0.0,
        });

        self.beat_position = (start + n as f64 * inc).rem_euclid(bpb);
        self.bar_beat = self.beat_position.floor() as u32;
        // a crossing at offset 0 right after a host jump is the beat the host already counted
        let counted = self.host_stepped && crossing.is_some_and(|c| c.offset == 0);
        if crossing.is_some() && !counted {
            self.step_loop_beat();
        }
        self.host_stepped = false;
        crossing
    }

    fn step_loop_beat(&mut self) {
        if self.loop_beat >= self.loop_beats {
            self.loop_beat = 0;
        }
        self.loop_beat += 1;
    }
}

fn clamp_bpm(bpm: f32) -> f32 {
    bpm.max(MIN_BPM)
}

fn clamp_beats_per_bar(beats: f32) -> f32 {
    beats.max(MIN_BEATS_PER_BAR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rolling_clock() -> TransportClock {
        let mut clock = TransportClock::new(48_000.0, 120.0, 4.0);
        clock.apply(&PositionUpdate::default().with_speed(1.0));
        clock
    }

    #[test]
    fn loop_length_from_tempo() {
        let mut clock = rolling_clock();
        assert_eq!(clock.recompute_loop(4, 2_880_000), 384_000);
        assert_eq!(clock.loop_beats(), 16);
        assert!(!clock.geometry_stale(4));
        assert!(clock.geometry_stale(2));
    }

    #[test]
    fn loop_length_clamps_to_capacity() {
        let mut clock = rolling_clock();
        assert_eq!(clock.recompute_loop(4, 100_000), 100_000);

        let mut stopped = TransportClock::new(48_000.0, 120.0, 4.0);
        assert_eq!(stopped.recompute_loop(4, 2_880_000), 2_880_000);
    }

    #[test]
    fn only_present_fields_change() {
        let mut clock = rolling_clock();
        assert!(!clock.apply(&PositionUpdate::default()));
        assert!(clock.apply(&PositionUpdate::default().with_beats_per_bar(3.0)));
        assert_relative_eq!(clock.beats_per_bar(), 3.0);
        assert_relative_eq!(clock.bpm(), 120.0);
        assert!(!clock.apply(&PositionUpdate::default().with_beats_per_bar(3.0)));
    }

    #[test]
    fn bpm_compares_by_rounding() {
        let mut clock = rolling_clock();
        assert!(!clock.apply(&PositionUpdate::default().with_bpm(120.3)));
        assert_relative_eq!(clock.bpm(), 120.0);
        assert!(clock.apply(&PositionUpdate::default().with_bpm(121.0)));
        assert_relative_eq!(clock.bpm(), 121.0);
    }

    #[test]
    fn degenerate_tempo_is_clamped() {
        let mut clock = rolling_clock();
        clock.apply(&PositionUpdate::default().with_bpm(0.0).with_beats_per_bar(-2.0));
        assert!(clock.bpm() >= MIN_BPM);
        assert!(clock.beats_per_bar() >= MIN_BEATS_PER_BAR);
        assert!(!clock.apply(&PositionUpdate::default().with_bpm(f32::NAN)));
        assert!(!clock.apply(&PositionUpdate::default().with_bpm(f32::INFINITY)));
    }

    #[test]
    fn first_beat_is_reported_at_offset_zero() {
        let mut clock = rolling_clock();
        let crossing = clock.advance(512).unwrap();
        assert_eq!(crossing, BeatCrossing { offset: 0, bar_start: true });
        assert!(clock.advance(512).is_none());
    }

    #[test]
    fn crossing_offset_is_sample_exact() {
        // 120 bpm at 48 kHz is 24000 frames per beat
        let mut clock = rolling_clock();
        clock.advance(500);
        let mut seen = None;
        for block in 0..24 {
            if let Some(c) = clock.advance(1000) {
                seen = Some((block, c));
                break;
            }
        }
        let (block, crossing) = seen.unwrap();
        assert_eq!(block, 23);
        assert_eq!(crossing, BeatCrossing { offset: 500, bar_start: false });
        assert_eq!(clock.bar_beat(), 1);
    }

    #[test]
    fn beat_on_block_boundary_is_not_lost() {
        let mut clock = rolling_clock();
        clock.advance(1000);
        let mut hits = 0;
        for _ in 0..24 {
            if let Some(c) = clock.advance(1000) {
                assert_eq!(c.offset, 0);
                hits += 1;
            }
        }
        // 24 more blocks end at frame 25000; beat 1 at 24000 opens block 23
        assert_eq!(hits, 1);
    }

    #[test]
    fn position_wraps_at_bar_and_flags_bar_start() {
        let mut clock = rolling_clock();
        clock.apply(&PositionUpdate::default().with_bar_beat(3.99));
        let crossing = clock.advance(1000).unwrap();
        assert!(crossing.bar_start);
        assert_eq!(crossing.offset, 240);
        assert!(clock.beat_position() < 1.0);
    }

    #[test]
    fn host_position_wraps_into_bar() {
        let mut clock = rolling_clock();
        clock.apply(&PositionUpdate::default().with_bar_beat(6.5));
        assert_relative_eq!(clock.beat_position(), 2.5);
        assert_eq!(clock.bar_beat(), 2);
    }

    #[test]
    fn host_jump_to_a_beat_counts_once() {
        let mut clock = rolling_clock();
        clock.recompute_loop(4, 2_880_000);
        clock.apply(&PositionUpdate::default().with_bar_beat(2.0));
        assert_eq!(clock.loop_beat(), 1);

        let crossing = clock.advance(512).unwrap();
        assert_eq!(crossing.offset, 0);
        assert_eq!(clock.loop_beat(), 1);

        // the next beat is counted as usual, 24000 frames on
        let mut next = None;
        for _ in 0..47 {
            next = next.or(clock.advance(512));
        }
        assert!(next.is_some());
        assert_eq!(clock.loop_beat(), 2);
    }

    #[test]
    fn host_jump_between_beats_still_counts_the_next_one() {
        let mut clock = rolling_clock();
        clock.recompute_loop(4, 2_880_000);
        clock.apply(&PositionUpdate::default().with_bar_beat(1.5));
        assert_eq!(clock.loop_beat(), 1);
        assert_eq!(clock.advance(12_000), None);
        let crossing = clock.advance(1).unwrap();
        assert_eq!(crossing.offset, 0);
        assert_eq!(clock.loop_beat(), 2);
    }

    #[test]
    fn loop_beat_wraps_after_loop() {
        let mut clock = rolling_clock();
        clock.recompute_loop(1, 2_880_000);
        let mut beats = Vec::new();
        for _ in 0..(6 * 24) {
            if clock.advance(1000).is_some() {
                beats.push(clock.loop_beat());
            }
        }
        assert_eq!(beats, vec![1, 2, 3, 4, 1, 2]);
    }
}
