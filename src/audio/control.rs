//! Record / undo gestures.
//!
//! Two logical buttons drive everything: button 0 records and commits tracks,
//! button 1 undoes, rearms and (with a quick tap on track 0) resets. Levels come
//! either from footswitch parameters or from mapped notes; the first note seen
//! hands control to notes for good.

use super::loop_store::NUM_TRACKS;

pub const RECORD_BUTTON: usize = 0;
pub const STOP_BUTTON: usize = 1;

/// A stop press released sooner than this on track 0 resets the whole engine.
pub const TAP_RESET_MS: u64 = 500;

/// Track-level effect of a button edge. The engine applies it against the loop state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gesture {
    /// Record released: the track starts looping.
    Commit { track: usize },
    /// Stop pressed above track 0: the track is marked at the cursor and recorded again.
    Undo { track: usize },
    /// Stop pressed on track 0.
    Rearm,
    TapReset,
}

#[derive(Clone, Debug, Default)]
pub struct ControlState {
    current_track: usize,
    pressed: [bool; NUM_TRACKS],
    // edge history, one per logical button
    record_down: bool,
    stop_down: bool,
    record_pressed_at_ms: u64,
    stop_pressed_at_ms: u64,
    note_control: bool,
}

impl ControlState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_track(&self) -> usize {
        self.current_track
    }

    pub fn pressed(&self) -> &[bool; NUM_TRACKS] {
        &self.pressed
    }

    pub fn using_note_control(&self) -> bool {
        self.note_control
    }

    pub fn record_pressed_at_ms(&self) -> u64 {
        self.record_pressed_at_ms
    }

    pub fn stop_pressed_at_ms(&self) -> u64 {
        self.stop_pressed_at_ms
    }

    /// Re-reads every track's pressed flag from its current control input (done on reset).
    pub fn latch_levels(&mut self, levels: [bool; NUM_TRACKS]) {
        self.pressed = levels;
    }

    /// Maps a note onto a button. Notes outside the six-track window are dropped.
    pub fn note(&mut self, number: u8, on: bool, midi_base: i32, now_ms: u64) -> Option<Gesture> {
        let index = i32::from(number).checked_sub(midi_base)?;
        if !(0..NUM_TRACKS as i32).contains(&index) {
            return None;
        }
        self.note_control = true;
        self.button(index as usize, on, now_ms)
    }

    /// Feeds one level sample for a button and returns what its edge (if any) means.
    pub fn button(&mut self, button: usize, down: bool, now_ms: u64) -> Option<Gesture> {
        let gesture = match button {
            RECORD_BUTTON => self.record_edge(down, now_ms),
            STOP_BUTTON => self.stop_edge(down, now_ms),
            _ => None,
        };
        self.current_track = self.current_track.min(NUM_TRACKS - 1);
        gesture
    }

    fn record_edge(&mut self, down: bool, now_ms: u64) -> Option<Gesture> {
        if down && !self.record_down {
            self.record_down = true;
            self.pressed[self.current_track] = true;
            self.record_pressed_at_ms = now_ms;
            None
        } else if !down && self.record_down {
            self.record_down = false;
            let track = self.current_track;
            self.current_track = (track + 1).min(NUM_TRACKS - 1);
            Some(Gesture::Commit { track })
        } else {
            None
        }
    }

    fn stop_edge(&mut self, down: bool, now_ms: u64) -> Option<Gesture> {
        if down && !self.stop_down {
            self.stop_down = true;
            self.stop_pressed_at_ms = now_ms;
            let track = self.current_track;
            self.pressed[track] = false;
            if track > 0 {
                self.current_track -= 1;
                Some(Gesture::Undo { track })
            } else {
                Some(Gesture::Rearm)
            }
        } else if !down && self.stop_down {
            self.stop_down = false;
            let held = now_ms.saturating_sub(self.stop_pressed_at_ms);
            (held < TAP_RESET_MS && self.current_track == 0).then_some(Gesture::TapReset)
        } else {
            None
        }
    }
}
