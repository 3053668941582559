// Key plan (see tui/input.rs):
//
// Footswitches, lowercase = down, shifted = up (terminals without release events):
//   r / R         //  RecordDown / RecordUp
//   u / U         //  UndoDown / UndoUp
//
// Note control, one key per track:
//   1 .. 6        //  NoteDown(0..5) / NoteUp(0..5)
//
// Transport and parameters:
//   Space         //  TogglePlay
//   + / -         //  BpmStep(+1 / -1)
//   [ / ]         //  BarsStep(-1 / +1)
//   , / .         //  MixStep(-5 / +5)
//   c             //  ToggleClick
//   e             //  ToggleEnabled
//   0             //  Reset
//   Esc           //  Quit
//
// The middle layer owns parameter and transport state; the TUI only renders
// the DisplayState it gets back each frame.

use looptty::TrackState;
use looptty::audio::NUM_TRACKS;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    RecordDown,
    RecordUp,
    UndoDown,
    UndoUp,

    // offset from the base note, 0..NUM_TRACKS
    NoteDown(u8),
    NoteUp(u8),

    TogglePlay,
    BpmStep(f32),
    BarsStep(f32),
    MixStep(f32),
    ToggleClick,
    ToggleEnabled,
    Reset,

    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackCell {
    pub state: TrackState,
    pub has_phrase: bool,
    pub current: bool,
    pub pressed: bool,
}

impl Default for TrackCell {
    fn default() -> Self {
        Self { state: TrackState::Recording, has_phrase: false, current: false, pressed: false }
    }
}

#[derive(Clone, Debug)]
pub struct DisplayState {
    pub tracks: [TrackCell; NUM_TRACKS],
    pub playing: bool,
    pub enabled: bool,
    pub click_on: bool,
    pub note_control: bool,
    pub bpm: f32,
    pub beats_per_bar: f32,
    pub bars: f32,
    pub mix: f32,
    pub bar_beat: u32,
    pub loop_beat: u32,
    pub loop_beats: u32,
    pub loop_progress: f64, // 0..1 through the current loop window
    pub loop_seconds: f64,
    pub free_running: bool,
    pub display_text: String, // last notice, shown in the footer
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            tracks: [TrackCell::default(); NUM_TRACKS],
            playing: false,
            enabled: true,
            click_on: false,
            note_control: false,
            bpm: 120.0,
            beats_per_bar: 4.0,
            bars: 4.0,
            mix: 50.0,
            bar_beat: 0,
            loop_beat: 0,
            loop_beats: 0,
            loop_progress: 0.0,
            loop_seconds: 0.0,
            free_running: false,
            display_text: String::new(),
        }
    }
}
