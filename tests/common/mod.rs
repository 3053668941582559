#![allow(dead_code)]

use looptty::audio::{RECORD_BUTTON, STOP_BUTTON};
use looptty::{AudioBlock, Engine, EngineSettings, HostEvent, Parameters, PositionUpdate};

/// Drives an engine block by block the way a host would.
pub struct Rig {
    pub engine: Engine,
    pub params: Parameters,
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl Rig {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            engine: Engine::new(settings).expect("engine"),
            params: Parameters::default(),
            left: Vec::new(),
            right: Vec::new(),
        }
    }

    /// 48 kHz, 120 bpm, 4/4, four bars, ten seconds of loop memory.
    pub fn studio() -> Self {
        Self::new(EngineSettings {
            sample_rate: 48_000.0,
            capacity: 480_000,
            ..EngineSettings::default()
        })
    }

    /// 1 kHz so frames read as milliseconds.
    pub fn small(capacity: usize) -> Self {
        Self::new(EngineSettings {
            sample_rate: 1_000.0,
            capacity,
            ..EngineSettings::default()
        })
    }

    pub fn process(&mut self, input: &[f32], events: &[HostEvent]) -> &[f32] {
        self.left.clear();
        self.left.resize(input.len(), f32::NAN);
        self.right.clear();
        self.right.resize(input.len(), f32::NAN);
        self.engine.process(
            AudioBlock {
                input_left: input,
                input_right: input,
                output_left: &mut self.left,
                output_right: &mut self.right,
            },
            &self.params,
            events,
        );
        &self.left
    }

    pub fn silence(&mut self, frames: usize, block: usize) {
        let zeros = vec![0.0; block];
        let mut left = frames;
        while left > 0 {
            let n = left.min(block);
            self.process(&zeros[..n], &[]);
            left -= n;
        }
    }

    pub fn start_transport(&mut self) {
        let update = PositionUpdate::default().with_speed(1.0).with_bar_beat(0.0);
        let start = HostEvent::Position(update);
        self.process(&[], &[start]);
    }

    pub fn record(&mut self, down: bool) {
        self.params.track_levels[RECORD_BUTTON] = if down { 1.0 } else { 0.0 };
    }

    pub fn stop(&mut self, down: bool) {
        self.params.track_levels[STOP_BUTTON] = if down { 1.0 } else { 0.0 };
    }
}
