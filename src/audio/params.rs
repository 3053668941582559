//! Per-block control values delivered by the host.

use super::loop_store::NUM_TRACKS;

pub const MIN_BARS: f32 = 1.0;

/// Everything the host binds to control ports. Constant for the duration of a block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Parameters {
    pub track_levels: [f32; NUM_TRACKS], // footswitch levels, > 0 = pressed
    pub threshold_db: f32,
    pub bars: f32,
    pub click_volume: f32,
    pub mix: f32,           // 0..100 crossfade, 50 = both at unity
    pub midi_base: f32,     // note that maps to track 0
    pub instant_loops: f32, // stored only
    pub reset_mode: f32,    // stored only
    pub enabled: bool,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            track_levels: [0.0; NUM_TRACKS],
            threshold_db: -40.0,
            bars: 4.0,
            click_volume: 0.0,
            mix: 50.0,
            midi_base: 60.0,
            instant_loops: 0.0,
            reset_mode: 0.0,
            enabled: true,
        }
    }
}

impl Parameters {
    #[inline]
    pub fn button_down(&self, track: usize) -> bool {
        self.track_levels[track] > 0.0
    }

    /// Whole bars, never below one.
    pub fn whole_bars(&self) -> u32 {
        self.bars.max(MIN_BARS).floor() as u32
    }

    pub fn midi_base_note(&self) -> i32 {
        if self.midi_base.is_finite() {
            self.midi_base.floor() as i32
        } else {
            0
        }
    }

    pub fn gains(&self) -> MixGains {
        MixGains::from_mix(self.mix)
    }

    pub fn threshold(&self) -> f32 {
        db_to_linear(self.threshold_db)
    }
}

/// Crossfade between live input and what gets written into recording tracks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MixGains {
    pub input: f32,
    pub loop_write: f32,
}

impl MixGains {
    pub fn from_mix(mix: f32) -> Self {
        let mix = if mix.is_finite() { mix } else { 50.0 };
        Self {
            input: ((100.0 - mix) / 50.0).clamp(0.0, 1.0),
            loop_write: (mix / 50.0).clamp(0.0, 1.0),
        }
    }
}

/// Anything at or below -90 dB is treated as silence.
pub fn db_to_linear(db: f32) -> f32 {
    if db.is_nan() || db <= -90.0 {
        return 0.0;
    }
    10.0f32.powf(db * 0.05)
}
