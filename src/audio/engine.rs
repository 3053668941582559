use super::click::ClickGenerator;
use super::control::{ControlState, Gesture};
use super::error::{EngineError, Result};
use super::event::HostEvent;
use super::frame::AudioBlock;
use super::loop_store::{DEFAULT_CAPACITY, LoopCursor, NUM_TRACKS, TrackState};
use super::mixer::TrackEngine;
use super::notice::{Notice, Notifier};
use super::params::{MIN_BARS, Parameters};
use super::transport::TransportClock;

use crossbeam_channel::Sender;

/// Fixed at creation; nothing here changes while the engine runs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineSettings {
    pub sample_rate: f64,
    pub capacity: usize, // frames per loop buffer
    pub bpm: f32,
    pub beats_per_bar: f32,
    pub bars: f32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            capacity: DEFAULT_CAPACITY,
            bpm: 120.0,
            beats_per_bar: 4.0,
            bars: 4.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackSnapshot {
    pub state: TrackState,
    pub phrase_start: Option<usize>,
    pub pressed: bool,
}

/// Read-only view for hosts, cheap to copy across threads.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineSnapshot {
    pub tracks: [TrackSnapshot; NUM_TRACKS],
    pub current_track: usize,
    pub loop_start: usize,
    pub loop_samples: usize,
    pub loop_index: usize,
    pub capacity: usize,
    pub bpm: f32,
    pub beats_per_bar: f32,
    pub speed: f32,
    pub bar_beat: u32,
    pub loop_beat: u32,
    pub loop_beats: u32,
    pub note_control: bool,
    pub frames_elapsed: u64,
}

/// The looper. One instance owns every buffer and all of its state.
///
/// [`Engine::process`] is real-time safe: no allocation, no locks, no syscalls.
pub struct Engine {
    sample_rate: f64,
    transport: TransportClock,
    control: ControlState,
    tracks: TrackEngine,
    click: ClickGenerator,
    // last values seen from the host, used by reset()
    bars: u32,
    levels: [bool; NUM_TRACKS],
    instant_loops: u32,
    reset_mode: f32,
    frames_elapsed: u64,
    notifier: Notifier,
}

impl Engine {
    pub fn new(settings: EngineSettings) -> Result<Self> {
        if !settings.sample_rate.is_finite() || settings.sample_rate <= 0.0 {
            return Err(EngineError::InvalidSettings("sample rate must be positive"));
        }
        if settings.capacity == 0 {
            return Err(EngineError::InvalidSettings("loop capacity must be non-zero"));
        }

        let bars = settings.bars.max(MIN_BARS).floor() as u32;
        let mut transport =
            TransportClock::new(settings.sample_rate, settings.bpm, settings.beats_per_bar);
        transport.recompute_loop(bars, settings.capacity);
        // the first geometry follows the tempo even though the transport is not rolling yet
        let loop_samples = transport.tempo_loop_samples(settings.capacity);

        let tracks = TrackEngine::new(settings.capacity, loop_samples)?;
        let click = ClickGenerator::new(settings.sample_rate)?;

        log::debug!(
            "engine ready: {} Hz, {} frame loops, {} beats ({} frames)",
            settings.sample_rate,
            settings.capacity,
            transport.loop_beats(),
            loop_samples
        );

        Ok(Self {
            sample_rate: settings.sample_rate,
            transport,
            control: ControlState::new(),
            tracks,
            click,
            bars,
            levels: [false; NUM_TRACKS],
            instant_loops: 0,
            reset_mode: 0.0,
            frames_elapsed: 0,
            notifier: Notifier::default(),
        })
    }

    pub fn set_notifier(&mut self, tx: Sender<Notice>) {
        self.notifier = Notifier::new(tx);
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn transport(&self) -> &TransportClock {
        &self.transport
    }

    pub fn control(&self) -> &ControlState {
        &self.control
    }

    pub fn tracks(&self) -> &TrackEngine {
        &self.tracks
    }

    pub fn cursor(&self) -> &LoopCursor {
        self.tracks.cursor()
    }

    pub fn current_track(&self) -> usize {
        self.control.current_track()
    }

    pub fn instant_loops(&self) -> u32 {
        self.instant_loops
    }

    pub fn reset_mode(&self) -> f32 {
        self.reset_mode
    }

    pub fn track_state(&self, track: usize) -> TrackState {
        self.tracks.track(track).state
    }

    pub fn phrase_start(&self, track: usize) -> Option<usize> {
        self.tracks.track(track).phrase_start()
    }

    /// Processes one block: events, then transport and loops, then click, then the enable gate.
    pub fn process(
        &mut self,
        mut block: AudioBlock<'_>,
        params: &Parameters,
        events: &[HostEvent],
    ) {
        let n = block.len();
        self.latch_params(params);

        self.apply_events(params, events);

        let crossing = self.transport.advance(n);
        {
            let mut window = AudioBlock {
                input_left: &block.input_left[..n],
                input_right: &block.input_right[..n],
                output_left: &mut block.output_left[..n],
                output_right: &mut block.output_right[..n],
            };
            self.tracks.mix_block(&mut window, params.gains(), params.threshold(), &self.notifier);
        }
        // anything past the shortest slice is still ours to overwrite
        block.output_left[n..].fill(0.0);
        block.output_right[n..].fill(0.0);

        let volume = if params.click_volume.is_finite() { params.click_volume } else { 0.0 };
        let click_on = volume != 0.0
            && self.transport.is_rolling()
            && !self.tracks.store().any_playing();
        if click_on {
            self.click.overlay(
                &mut block.output_left[..n],
                &mut block.output_right[..n],
                crossing,
                volume,
            );
        }

        if !params.enabled {
            self.reset();
        }
        self.frames_elapsed += n as u64;
    }

    fn latch_params(&mut self, params: &Parameters) {
        self.bars = params.whole_bars();
        self.levels = std::array::from_fn(|i| params.button_down(i));
        self.instant_loops = if params.instant_loops.is_finite() {
            params.instant_loops.max(0.0).floor() as u32
        } else {
            0
        };
        self.reset_mode = params.reset_mode;
    }

    fn apply_events(&mut self, params: &Parameters, events: &[HostEvent]) {
        let now_ms = self.now_ms();
        let midi_base = params.midi_base_note();

        for event in events {
            if let HostEvent::Note { number, on } = *event {
                if let Some(gesture) = self.control.note(number, on, midi_base, now_ms) {
                    self.apply_gesture(gesture);
                }
            }
        }

        if !self.control.using_note_control() {
            for button in 0..NUM_TRACKS {
                if let Some(gesture) = self.control.button(button, self.levels[button], now_ms) {
                    self.apply_gesture(gesture);
                }
            }
        }

        let mut changed = false;
        for event in events {
            if let HostEvent::Position(update) = event {
                changed |= self.transport.apply(update);
            }
        }
        if changed || self.transport.geometry_stale(self.bars) {
            self.reset();
        }
    }

    fn apply_gesture(&mut self, gesture: Gesture) {
        match gesture {
            Gesture::Commit { track } => {
                self.tracks.commit(track);
                self.notifier.post(Notice::Committed {
                    track,
                    next: self.control.current_track(),
                });
            }
            Gesture::Undo { track } => {
                let frame = self.tracks.undo(track);
                self.notifier.post(Notice::Undone { track, frame });
            }
            Gesture::Rearm => {
                self.tracks.rearm(0);
                self.notifier.post(Notice::Rearmed { track: 0 });
            }
            Gesture::TapReset => self.reset(),
        }
    }

    /// Recomputes the loop geometry from the current tempo and bar count and rearms every track.
    pub fn reset(&mut self) {
        let loop_samples = self.transport.recompute_loop(self.bars, self.tracks.capacity());
        self.tracks.rewind(loop_samples);
        self.control.latch_levels(self.levels);
        self.notifier.post(Notice::Reset {
            loop_beats: self.transport.loop_beats(),
            loop_samples: self.tracks.cursor().len(),
            bpm: self.transport.bpm(),
        });
    }

    // gesture timing runs on processed frames, not the wall clock
    fn now_ms(&self) -> u64 {
        (self.frames_elapsed as f64 * 1000.0 / self.sample_rate) as u64
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let cursor = self.tracks.cursor();
        let pressed = self.control.pressed();
        EngineSnapshot {
            tracks: std::array::from_fn(|i| {
                let track = self.tracks.track(i);
                TrackSnapshot {
                    state: track.state,
                    phrase_start: track.phrase_start(),
                    pressed: pressed[i],
                }
            }),
            current_track: self.control.current_track(),
            loop_start: cursor.start(),
            loop_samples: cursor.len(),
            loop_index: cursor.index(),
            capacity: self.tracks.capacity(),
            bpm: self.transport.bpm(),
            beats_per_bar: self.transport.beats_per_bar(),
            speed: self.transport.speed(),
            bar_beat: self.transport.bar_beat(),
            loop_beat: self.transport.loop_beat(),
            loop_beats: self.transport.loop_beats(),
            note_control: self.control.using_note_control(),
            frames_elapsed: self.frames_elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::transport::PositionUpdate;

    fn small_settings() -> EngineSettings {
        EngineSettings {
            sample_rate: 1_000.0,
            capacity: 20_000,
            ..EngineSettings::default()
        }
    }

    fn process_silence(engine: &mut Engine, n: usize, params: &Parameters, events: &[HostEvent]) {
        let input = vec![0.0f32; n];
        let mut out_l = vec![0.0f32; n];
        let mut out_r = vec![0.0f32; n];
        engine.process(
            AudioBlock {
                input_left: &input,
                input_right: &input,
                output_left: &mut out_l,
                output_right: &mut out_r,
            },
            params,
            events,
        );
    }

    #[test]
    fn rejects_bad_settings() {
        let bad_rate = EngineSettings { sample_rate: 0.0, ..small_settings() };
        assert!(matches!(Engine::new(bad_rate), Err(EngineError::InvalidSettings(_))));
        let bad_capacity = EngineSettings { capacity: 0, ..small_settings() };
        assert!(matches!(Engine::new(bad_capacity), Err(EngineError::InvalidSettings(_))));
    }

    #[test]
    fn initial_geometry_follows_tempo() {
        let engine = Engine::new(small_settings()).unwrap();
        // 16 beats at 120 bpm, 1 kHz
        assert_eq!(engine.cursor().len(), 8_000);
        assert_eq!(engine.transport().loop_beats(), 16);
        assert_eq!(engine.current_track(), 0);
        assert!((0..NUM_TRACKS).all(|i| engine.track_state(i) == TrackState::Recording));
    }

    #[test]
    fn tempo_change_resets_once() {
        let mut engine = Engine::new(small_settings()).unwrap();
        let (tx, rx) = crossbeam_channel::bounded(64);
        engine.set_notifier(tx);

        let update = PositionUpdate::default().with_speed(1.0).with_bpm(60.0);
        process_silence(&mut engine, 10, &Parameters::default(), &[update.into()]);
        let resets = rx.try_iter().filter(|n| matches!(n, Notice::Reset { .. })).count();
        assert_eq!(resets, 1);
        assert_eq!(engine.cursor().len(), 16_000);

        // same values again: nothing to do
        process_silence(&mut engine, 10, &Parameters::default(), &[update.into()]);
        assert_eq!(rx.try_iter().filter(|n| matches!(n, Notice::Reset { .. })).count(), 0);
    }

    #[test]
    fn bar_count_change_recomputes_geometry() {
        let mut engine = Engine::new(small_settings()).unwrap();
        let roll = PositionUpdate::default().with_speed(1.0);
        process_silence(&mut engine, 10, &Parameters::default(), &[roll.into()]);
        assert_eq!(engine.cursor().len(), 8_000);

        let params = Parameters { bars: 2.0, ..Parameters::default() };
        process_silence(&mut engine, 10, &params, &[]);
        assert_eq!(engine.cursor().len(), 4_000);
        assert_eq!(engine.cursor().index(), 10);
    }

    #[test]
    fn disabled_engine_resets_every_block() {
        let mut engine = Engine::new(small_settings()).unwrap();
        let params = Parameters { enabled: false, ..Parameters::default() };
        process_silence(&mut engine, 100, &params, &[]);
        assert_eq!(engine.cursor().index(), 0);
        // stopped transport: reset falls back to the whole buffer
        assert_eq!(engine.cursor().len(), 20_000);
    }

    #[test]
    fn stored_only_parameters_are_kept() {
        let mut engine = Engine::new(small_settings()).unwrap();
        let params = Parameters { instant_loops: 3.7, reset_mode: 1.0, ..Parameters::default() };
        process_silence(&mut engine, 4, &params, &[]);
        assert_eq!(engine.instant_loops(), 3);
        assert_eq!(engine.reset_mode(), 1.0);
    }

    #[test]
    fn note_control_takes_over_from_footswitch() {
        let mut engine = Engine::new(small_settings()).unwrap();
        let base = Parameters::default();
        process_silence(&mut engine, 10, &base, &[HostEvent::note_on(60)]);
        process_silence(&mut engine, 10, &base, &[HostEvent::note_off(60)]);
        assert_eq!(engine.track_state(0), TrackState::LoopOn);
        assert_eq!(engine.current_track(), 1);

        // footswitch levels are ignored from now on
        let pressed = Parameters { track_levels: [1.0, 0.0, 0.0, 0.0, 0.0, 0.0], ..base };
        process_silence(&mut engine, 10, &pressed, &[]);
        process_silence(&mut engine, 10, &base, &[]);
        assert_eq!(engine.current_track(), 1);
        assert!(engine.snapshot().note_control);
    }

    #[test]
    fn out_of_range_notes_are_dropped() {
        let mut engine = Engine::new(small_settings()).unwrap();
        let notes = [HostEvent::note_on(20), HostEvent::note_on(90)];
        process_silence(&mut engine, 10, &Parameters::default(), &notes);
        assert!(!engine.control().using_note_control());
    }

    #[test]
    fn mismatched_slices_zero_the_output_tail() {
        let mut engine = Engine::new(small_settings()).unwrap();
        let input = [0.5f32; 4];
        let mut out_l = [9.0f32; 8];
        let mut out_r = [9.0f32; 8];
        engine.process(
            AudioBlock {
                input_left: &input,
                input_right: &input,
                output_left: &mut out_l,
                output_right: &mut out_r,
            },
            &Parameters::default(),
            &[],
        );
        assert_eq!(&out_l[..4], &[0.5; 4]);
        assert_eq!(&out_l[4..], &[0.0; 4]);
        assert_eq!(engine.snapshot().frames_elapsed, 4);
    }
}
