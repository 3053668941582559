use looptty::audio::{MIN_BPM, NUM_TRACKS, Notice, RECORD_BUTTON, STOP_BUTTON};
use looptty::{EngineSnapshot, HostEvent, LooperConfig, Parameters, PositionUpdate};

use crate::audio_api::AudioCommand;
use crate::shared::{DisplayState, InputEvent};

const MAX_BPM: f32 = 300.0;
const MAX_BARS: f32 = 64.0;

// The host side of the looper: owns the control-port values and the tempo,
// turns key events into audio commands and engine snapshots into a display.
pub struct Middle {
    params: Parameters,
    switches_down: [bool; NUM_TRACKS], // last edge sent per footswitch
    click_level: f32, // restored when the click is toggled back on
    bpm: f32,
    beats_per_bar: f32,
    playing: bool,
    sample_rate: f64,
    display: DisplayState,
}

impl Middle {
    pub fn new(config: &LooperConfig, sample_rate: u32) -> Self {
        let params = config.parameters();
        let click_level = if params.click_volume > 0.0 { params.click_volume } else { 1.0 };
        let mut middle = Self {
            params,
            switches_down: [false; NUM_TRACKS],
            click_level,
            bpm: config.bpm.max(MIN_BPM).min(MAX_BPM),
            beats_per_bar: config.beats_per_bar.max(1.0),
            playing: false,
            sample_rate: f64::from(sample_rate),
            display: DisplayState::default(),
        };
        middle.sync_display();
        middle
    }

    /// Commands that bring a fresh engine in line with this host.
    pub fn initial_commands(&self) -> Vec<AudioCommand> {
        vec![
            AudioCommand::SetParams(self.params),
            AudioCommand::Event(HostEvent::Position(
                PositionUpdate::default()
                    .with_bpm(self.bpm)
                    .with_beats_per_bar(self.beats_per_bar),
            )),
        ]
    }

    pub fn handle_input(&mut self, event: InputEvent) -> Vec<AudioCommand> {
        let cmds = match event {
            InputEvent::RecordDown => self.footswitch(RECORD_BUTTON, true),
            InputEvent::RecordUp => self.footswitch(RECORD_BUTTON, false),
            InputEvent::UndoDown => self.footswitch(STOP_BUTTON, true),
            InputEvent::UndoUp => self.footswitch(STOP_BUTTON, false),

            InputEvent::NoteDown(offset) => self.note(offset, true),
            InputEvent::NoteUp(offset) => self.note(offset, false),

            InputEvent::TogglePlay => {
                self.playing = !self.playing;
                let speed = if self.playing { 1.0 } else { 0.0 };
                let mut update = PositionUpdate::default().with_speed(speed);
                if self.playing {
                    update = update.with_bar_beat(0.0); // start from the top of the bar
                }
                vec![AudioCommand::Event(HostEvent::Position(update))]
            }
            InputEvent::BpmStep(delta) => {
                self.bpm = (self.bpm + delta).clamp(MIN_BPM, MAX_BPM);
                let update = PositionUpdate::default().with_bpm(self.bpm);
                vec![AudioCommand::Event(HostEvent::Position(update))]
            }
            InputEvent::BarsStep(delta) => {
                self.params.bars = (self.params.bars + delta).clamp(1.0, MAX_BARS);
                self.params_changed()
            }
            InputEvent::MixStep(delta) => {
                self.params.mix = (self.params.mix + delta).clamp(0.0, 100.0);
                self.params_changed()
            }
            InputEvent::ToggleClick => {
                let on = self.params.click_volume > 0.0;
                self.params.click_volume = if on { 0.0 } else { self.click_level };
                self.params_changed()
            }
            InputEvent::ToggleEnabled => {
                self.params.enabled = !self.params.enabled;
                self.params_changed()
            }
            InputEvent::Reset => vec![AudioCommand::Reset],
            InputEvent::Quit => vec![],
        };
        self.sync_display();
        cmds
    }

    pub fn set_snapshot(&mut self, snap: &EngineSnapshot) {
        for (cell, track) in self.display.tracks.iter_mut().zip(snap.tracks.iter()) {
            cell.state = track.state;
            cell.has_phrase = track.phrase_start.is_some();
            cell.pressed = track.pressed;
        }
        for (i, cell) in self.display.tracks.iter_mut().enumerate() {
            cell.current = i == snap.current_track;
        }
        self.display.note_control = snap.note_control;
        self.display.bar_beat = snap.bar_beat;
        self.display.loop_beat = snap.loop_beat;
        self.display.loop_beats = snap.loop_beats;
        self.display.free_running = snap.loop_samples == snap.capacity;

        let len = snap.loop_samples.max(1) as f64;
        let into_loop = snap.loop_index.saturating_sub(snap.loop_start) as f64;
        self.display.loop_progress = (into_loop / len).clamp(0.0, 1.0);
        self.display.loop_seconds = snap.loop_samples as f64 / self.sample_rate;
    }

    pub fn on_notice(&mut self, notice: &Notice) {
        self.display.display_text = match *notice {
            Notice::PhraseDetected { track, .. } => format!("track {} recording", track + 1),
            Notice::Committed { track, .. } => format!("track {} looping", track + 1),
            Notice::Undone { track, .. } => format!("track {} undone", track + 1),
            Notice::Rearmed { track } => format!("track {} armed", track + 1),
            Notice::FreeRunning { loop_samples, .. } => {
                format!("free loop {:.2}s", loop_samples as f64 / self.sample_rate)
            }
            Notice::Reset { loop_beats, .. } => format!("reset, {loop_beats} beats"),
        };
    }

    pub fn display_state(&self) -> &DisplayState {
        &self.display
    }

    fn footswitch(&mut self, button: usize, down: bool) -> Vec<AudioCommand> {
        if self.switches_down[button] == down {
            return vec![]; // key repeat
        }
        self.switches_down[button] = down;
        vec![AudioCommand::Footswitch { button, down }]
    }

    fn note(&self, offset: u8, on: bool) -> Vec<AudioCommand> {
        if usize::from(offset) >= NUM_TRACKS {
            return vec![];
        }
        let number = self.params.midi_base_note() + i32::from(offset);
        match u8::try_from(number) {
            Ok(n) if n <= 127 => vec![AudioCommand::Event(HostEvent::Note { number: n, on })],
            _ => vec![],
        }
    }

    fn params_changed(&self) -> Vec<AudioCommand> {
        vec![AudioCommand::SetParams(self.params)]
    }

    fn sync_display(&mut self) {
        self.display.playing = self.playing;
        self.display.enabled = self.params.enabled;
        self.display.click_on = self.params.click_volume > 0.0;
        self.display.bpm = self.bpm;
        self.display.beats_per_bar = self.beats_per_bar;
        self.display.bars = self.params.bars;
        self.display.mix = self.params.mix;
    }
}
