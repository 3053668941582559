//! Fixed-capacity stereo loop memory.
//!
//! Everything here is allocated once when the engine is built. After that the
//! buffers are only read and written by frame index, wrapping at capacity, so
//! the audio thread never touches the allocator.

use std::num::NonZeroUsize;

use super::error::{EngineError, Result};
use super::frame::StereoFrame;

pub const NUM_TRACKS: usize = 6;

/// 60 seconds at 48 kHz.
pub const DEFAULT_CAPACITY: usize = 2_880_000;

#[derive(Clone, Debug)]
pub struct StereoLoop {
    data: Vec<StereoFrame>, // the audio data array, never resized after allocation
}

impl StereoLoop {
    pub fn allocate(capacity: usize, what: &'static str) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)
            .map_err(|_| EngineError::Allocation { what, frames: capacity })?;
        data.resize(capacity, StereoFrame::zero());
        Ok(Self { data })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn read(&self, index: usize) -> StereoFrame {
        self.data[index % self.data.len()]
    }

    #[inline]
    pub fn write(&mut self, index: usize, frame: StereoFrame) {
        let len = self.data.len();
        self.data[index % len] = frame;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackState {
    Recording, // no loop is set, the track only captures input
    LoopOn,    // the loop is playing
    LoopOff,   // the loop is kept but silent
}

#[derive(Clone, Debug)]
pub struct Track {
    pub state: TrackState,
    // 0 is "unset", so a phrase can never start at frame 0
    phrase_start: Option<NonZeroUsize>,
    buffer: StereoLoop,
}

impl Track {
    fn new(buffer: StereoLoop) -> Self {
        Self {
            state: TrackState::Recording,
            phrase_start: None,
            buffer,
        }
    }

    pub fn phrase_start(&self) -> Option<usize> {
        self.phrase_start.map(NonZeroUsize::get)
    }

    /// Latches the phrase start. Only the first call after a rearm has any effect.
    pub fn latch_phrase_start(&mut self, frame: usize) -> bool {
        if self.phrase_start.is_some() {
            return false;
        }
        self.phrase_start = NonZeroUsize::new(frame);
        self.phrase_start.is_some()
    }

    /// Overwrites the phrase start unconditionally (undo marks its shrink point this way).
    pub fn mark_phrase_start(&mut self, frame: usize) {
        self.phrase_start = NonZeroUsize::new(frame);
    }

    pub fn rearm(&mut self) {
        self.state = TrackState::Recording;
        self.phrase_start = None;
    }

    pub fn buffer(&self) -> &StereoLoop {
        &self.buffer
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut StereoLoop {
        &mut self.buffer
    }
}

/// Shared rolling recording buffer plus the per-track loop buffers.
pub struct LoopStore {
    recording: StereoLoop,
    tracks: [Track; NUM_TRACKS],
}

impl LoopStore {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(EngineError::InvalidSettings("loop capacity must be non-zero"));
        }
        let recording = StereoLoop::allocate(capacity, "recording buffer")?;

        let mut tracks = Vec::with_capacity(NUM_TRACKS);
        for _ in 0..NUM_TRACKS {
            tracks.push(Track::new(StereoLoop::allocate(capacity, "track buffer")?));
        }
        let tracks: [Track; NUM_TRACKS] = tracks
            .try_into()
            .map_err(|_| EngineError::InvalidSettings("track count mismatch"))?;

        Ok(Self { recording, tracks })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.recording.capacity()
    }

    pub fn recording(&self) -> &StereoLoop {
        &self.recording
    }

    pub fn recording_mut(&mut self) -> &mut StereoLoop {
        &mut self.recording
    }

    pub fn tracks(&self) -> &[Track; NUM_TRACKS] {
        &self.tracks
    }

    pub fn tracks_mut(&mut self) -> &mut [Track; NUM_TRACKS] {
        &mut self.tracks
    }

    pub fn track(&self, i: usize) -> &Track {
        &self.tracks[i]
    }

    pub fn track_mut(&mut self, i: usize) -> &mut Track {
        &mut self.tracks[i]
    }

    pub fn any_playing(&self) -> bool {
        self.tracks.iter().any(|t| t.state == TrackState::LoopOn)
    }

    /// Splits into the recording buffer and the tracks so both can be borrowed at once.
    pub fn split_mut(&mut self) -> (&mut StereoLoop, &mut [Track; NUM_TRACKS]) {
        (&mut self.recording, &mut self.tracks)
    }
}

/// Play/record position shared by every track.
///
/// `index` always stays in `[start, start + len)`; buffer access wraps at capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopCursor {
    index: usize,
    start: usize,
    len: usize,
}

impl LoopCursor {
    pub fn new(len: usize) -> Self {
        Self {
            index: 0,
            start: 0,
            len: len.max(1),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Back to frame 0 with a new loop length.
    pub fn rewind(&mut self, len: usize) {
        self.index = 0;
        self.start = 0;
        self.len = len.max(1);
    }

    /// Moves the wrap window. If the current index falls outside it, the loop just closed.
    pub fn set_window(&mut self, start: usize, len: usize) {
        self.start = start;
        self.len = len.max(1);
        if self.index < self.start || self.index >= self.start + self.len {
            self.index = self.start;
        }
    }

    #[inline]
    pub fn advance(&mut self) {
        self.index += 1;
        if self.index >= self.start + self.len {
            self.index = self.start;
        }
    }
}
