// settings for the standalone host; read once at startup, never from the audio thread
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio::{EngineSettings, NUM_TRACKS, Parameters};

const LOOPTTY_DIR: &str = ".looptty";
const CONFIG_FILE: &str = "config.json";

// seven ten-minute buffers at 48 kHz already come to well over a gigabyte
const MAX_CAPACITY_SECONDS: f32 = 600.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LooperConfig {
    pub bpm: f32,
    pub beats_per_bar: f32,
    pub bars: f32,
    pub threshold_db: f32,
    pub mix: f32,
    pub click_volume: f32,
    pub midi_base: u8,
    pub instant_loops: u32,
    pub reset_mode: bool,
    pub capacity_seconds: f32,
    pub log_file: PathBuf,
}

impl Default for LooperConfig {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            beats_per_bar: 4.0,
            bars: 4.0,
            threshold_db: -40.0,
            mix: 50.0,
            click_volume: 1.0,
            midi_base: 60,
            instant_loops: 0,
            reset_mode: false,
            capacity_seconds: 60.0,
            log_file: PathBuf::from("looptty.log"),
        }
    }
}

// <project_dir>/.looptty/config.json
pub fn default_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(LOOPTTY_DIR).join(CONFIG_FILE)
}

impl LooperConfig {
    /// An explicit path must exist. Without one, the default location is tried and
    /// silently skipped when absent.
    pub fn load(explicit: Option<&Path>, project_dir: &Path) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let fallback = default_config_path(project_dir);
                if !fallback.exists() {
                    return Ok(Self::default());
                }
                fallback
            }
        };
        let data = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_json(&data).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }

    pub fn engine_settings(&self, sample_rate: f64) -> EngineSettings {
        let seconds = if self.capacity_seconds.is_finite() {
            self.capacity_seconds.clamp(1.0, MAX_CAPACITY_SECONDS)
        } else {
            LooperConfig::default().capacity_seconds
        };
        EngineSettings {
            sample_rate,
            capacity: (f64::from(seconds) * sample_rate) as usize,
            bpm: self.bpm,
            beats_per_bar: self.beats_per_bar,
            bars: self.bars,
        }
    }

    pub fn parameters(&self) -> Parameters {
        Parameters {
            track_levels: [0.0; NUM_TRACKS],
            threshold_db: self.threshold_db,
            bars: self.bars.max(1.0),
            click_volume: self.click_volume.max(0.0),
            mix: self.mix.clamp(0.0, 100.0),
            midi_base: f32::from(self.midi_base),
            instant_loops: self.instant_loops as f32,
            reset_mode: if self.reset_mode { 1.0 } else { 0.0 },
            enabled: true,
        }
    }
}
