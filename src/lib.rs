//! A six-track live looper core with tempo sync and a metronome click.

pub mod audio;
pub mod config;

pub use audio::{
    AudioBlock, Engine, EngineError, EngineSettings, EngineSnapshot, HostEvent, Parameters,
    PositionUpdate, TrackState,
};
pub use config::{ConfigError, LooperConfig};
