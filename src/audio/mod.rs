//! The real-time looper core.
//!
//! Hosts build an [`Engine`] once, then call [`Engine::process`] once per audio
//! block with that block's [`Parameters`] and [`HostEvent`]s.

mod click;
mod control;
mod engine;
mod error;
mod event;
mod frame;
mod loop_store;
mod mixer;
mod notice;
mod params;
mod transport;

pub use click::{ClickGenerator, HIGH_BEAT_FREQ, LOW_BEAT_FREQ};
pub use control::{ControlState, Gesture, RECORD_BUTTON, STOP_BUTTON, TAP_RESET_MS};
pub use engine::{Engine, EngineSettings, EngineSnapshot, TrackSnapshot};
pub use error::{EngineError, Result};
pub use event::HostEvent;
pub use frame::{AudioBlock, StereoFrame};
pub use loop_store::{
    DEFAULT_CAPACITY, LoopCursor, LoopStore, NUM_TRACKS, StereoLoop, Track, TrackState,
};
pub use mixer::TrackEngine;
pub use notice::{Notice, Notifier, channel as notice_channel};
pub use params::{MixGains, Parameters, db_to_linear};
pub use transport::{BeatCrossing, MIN_BEATS_PER_BAR, MIN_BPM, PositionUpdate, TransportClock};
