//! Metronome click: two precomputed sine pulses retriggered on beat boundaries.

use super::error::{EngineError, Result};
use super::transport::BeatCrossing;

pub const HIGH_BEAT_FREQ: f64 = 880.0; // bar start
pub const LOW_BEAT_FREQ: f64 = 440.0;

const PULSE_SECONDS: f64 = 0.02;
const PULSE_PEAK: f32 = 0.5;
const CLICK_GAIN: f32 = 0.1;

pub struct ClickGenerator {
    high: Vec<f32>,
    low: Vec<f32>,
    // playback cursors, >= pulse length means silent
    high_offset: usize,
    low_offset: usize,
}

impl ClickGenerator {
    pub fn new(sample_rate: f64) -> Result<Self> {
        let len = (PULSE_SECONDS * sample_rate) as usize;
        Ok(Self {
            high: sine_pulse(HIGH_BEAT_FREQ, sample_rate, len)?,
            low: sine_pulse(LOW_BEAT_FREQ, sample_rate, len)?,
            high_offset: len,
            low_offset: len,
        })
    }

    pub fn pulse_len(&self) -> usize {
        self.high.len()
    }

    pub fn high_pulse(&self) -> &[f32] {
        &self.high
    }

    pub fn low_pulse(&self) -> &[f32] {
        &self.low
    }

    pub fn is_silent(&self) -> bool {
        self.high_offset >= self.high.len() && self.low_offset >= self.low.len()
    }

    pub fn trigger(&mut self, bar_start: bool) {
        if bar_start {
            self.high_offset = 0;
        } else {
            self.low_offset = 0;
        }
    }

    /// Adds the click to a block, retriggering at the crossing's exact offset.
    pub fn overlay(
        &mut self,
        left: &mut [f32],
        right: &mut [f32],
        crossing: Option<BeatCrossing>,
        volume: f32,
    ) {
        let n = left.len().min(right.len());
        let (left, right) = (&mut left[..n], &mut right[..n]);
        match crossing {
            Some(c) => {
                let split = c.offset.min(n);
                let (l_head, l_tail) = left.split_at_mut(split);
                let (r_head, r_tail) = right.split_at_mut(split);
                self.render(l_head, r_head, volume);
                self.trigger(c.bar_start);
                self.render(l_tail, r_tail, volume);
            }
            None => self.render(left, right, volume),
        }
    }

    fn render(&mut self, left: &mut [f32], right: &mut [f32], volume: f32) {
        let gain = CLICK_GAIN * volume;
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            if let Some(&s) = self.high.get(self.high_offset) {
                *l += gain * s;
                *r += gain * s;
                self.high_offset += 1;
            }
            if let Some(&s) = self.low.get(self.low_offset) {
                *l += gain * s;
                *r += gain * s;
                self.low_offset += 1;
            }
        }
    }
}

// linear ramp up over the first half, down over the second
fn sine_pulse(frequency: f64, sample_rate: f64, len: usize) -> Result<Vec<f32>> {
    let mut pulse = Vec::new();
    pulse
        .try_reserve_exact(len)
        .map_err(|_| EngineError::Allocation { what: "click pulse", frames: len })?;

    let half = len / 2;
    let step = if half > 0 { 1.0 / half as f32 } else { 1.0 };
    let phase_inc = std::f64::consts::TAU * frequency / sample_rate;
    let mut amplitude = 0.0f32;

    for i in 0..len {
        amplitude = if i < half {
            (amplitude + step).min(1.0)
        } else {
            (amplitude - step).max(0.0)
        };
        pulse.push(PULSE_PEAK * amplitude * (i as f64 * phase_inc).sin() as f32);
    }
    Ok(pulse)
}
