//! Per-sample loop mixing.
//!
//! Every frame: the live input goes into the rolling recording buffer, playing
//! tracks are summed into the output, recording tracks capture the input at the
//! loop gain and latch their phrase start on the first frame above threshold.

use super::error::Result;
use super::frame::{AudioBlock, StereoFrame};
use super::loop_store::{LoopCursor, LoopStore, NUM_TRACKS, Track, TrackState};
use super::notice::{Notice, Notifier};
use super::params::MixGains;

pub struct TrackEngine {
    store: LoopStore,
    cursor: LoopCursor,
}

impl TrackEngine {
    pub fn new(capacity: usize, loop_samples: usize) -> Result<Self> {
        let store = LoopStore::new(capacity)?;
        Ok(Self {
            store,
            cursor: LoopCursor::new(loop_samples.min(capacity)),
        })
    }

    pub fn store(&self) -> &LoopStore {
        &self.store
    }

    pub fn cursor(&self) -> &LoopCursor {
        &self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    pub fn track(&self, i: usize) -> &Track {
        self.store.track(i)
    }

    /// No tempo-derived length is in effect; the loop length comes from the performance.
    pub fn free_running(&self) -> bool {
        self.cursor.len() == self.store.capacity()
    }

    /// Cursor back to frame 0 with a new length, every track rearmed.
    pub fn rewind(&mut self, loop_samples: usize) {
        self.cursor.rewind(loop_samples.min(self.store.capacity()));
        for track in self.store.tracks_mut() {
            track.rearm();
        }
    }

    pub fn commit(&mut self, track: usize) {
        self.store.track_mut(track).state = TrackState::LoopOn;
    }

    /// Marks the track's shrink point at the cursor and records it again.
    pub fn undo(&mut self, track: usize) -> usize {
        let frame = self.cursor.index() % self.store.capacity();
        let t = self.store.track_mut(track);
        t.mark_phrase_start(frame);
        t.state = TrackState::Recording;
        frame
    }

    pub fn rearm(&mut self, track: usize) {
        self.store.track_mut(track).rearm();
    }

    /// Mixes one block. Outputs are overwritten, never accumulated into.
    pub fn mix_block(
        &mut self,
        block: &mut AudioBlock<'_>,
        gains: MixGains,
        threshold: f32,
        notifier: &Notifier,
    ) {
        let frames = block
            .input_left
            .iter()
            .zip(block.input_right)
            .zip(block.output_left.iter_mut().zip(block.output_right.iter_mut()));

        for ((&l, &r), (out_l, out_r)) in frames {
            let out = self.mix_frame(StereoFrame::new(l, r), gains, threshold, notifier);
            *out_l = out.left;
            *out_r = out.right;

            self.cursor.advance();
            if self.free_running() {
                self.detect_loop_length(notifier);
            }
        }
    }

    #[inline]
    fn mix_frame(
        &mut self,
        input: StereoFrame,
        gains: MixGains,
        threshold: f32,
        notifier: &Notifier,
    ) -> StereoFrame {
        let index = self.cursor.index();
        let frame = index % self.store.capacity();
        let (recording, tracks) = self.store.split_mut();
        recording.write(index, input);

        let mut out = input * gains.input;
        for (i, track) in tracks.iter_mut().enumerate() {
            match track.state {
                TrackState::LoopOn => out += track.buffer().read(index),
                TrackState::Recording => {
                    track.buffer_mut().write(index, input * gains.loop_write);
                    if input.exceeds(threshold) && track.latch_phrase_start(frame) {
                        notifier.post(Notice::PhraseDetected { track: i, frame });
                    }
                }
                TrackState::LoopOff => {}
            }
        }
        out
    }

    // the highest-numbered track with a phrase start decides (last one scanned wins)
    fn detect_loop_length(&mut self, notifier: &Notifier) {
        let capacity = self.store.capacity();
        let Some(start) = self
            .store
            .tracks()
            .iter()
            .rev()
            .find_map(Track::phrase_start)
        else {
            return;
        };
        let frame = self.cursor.index() % capacity;
        let loop_samples = (capacity + frame - start) % capacity;
        if loop_samples == 0 {
            return;
        }
        self.cursor.set_window(start, loop_samples);
        notifier.post(Notice::FreeRunning { loop_start: start, loop_samples });
    }

    pub fn track_states(&self) -> [TrackState; NUM_TRACKS] {
        std::array::from_fn(|i| self.store.track(i).state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const UNITY: MixGains = MixGains { input: 1.0, loop_write: 1.0 };

    fn run(engine: &mut TrackEngine, input: &[f32], gains: MixGains, threshold: f32) -> Vec<f32> {
        let mut out_l = vec![0.0; input.len()];
        let mut out_r = vec![0.0; input.len()];
        let mut block = AudioBlock {
            input_left: input,
            input_right: input,
            output_left: &mut out_l,
            output_right: &mut out_r,
        };
        engine.mix_block(&mut block, gains, threshold, &Notifier::default());
        out_l
    }

    #[test]
    fn input_always_lands_in_recording_buffer() {
        let mut engine = TrackEngine::new(32, 8).unwrap();
        for i in 0..NUM_TRACKS {
            engine.commit(i);
        }
        run(&mut engine, &[0.1, 0.2, 0.3], UNITY, 1.0);
        assert_relative_eq!(engine.store().recording().read(2).left, 0.3);
    }

    #[test]
    fn recording_tracks_capture_at_loop_gain() {
        let mut engine = TrackEngine::new(32, 4).unwrap();
        let gains = MixGains::from_mix(25.0);
        run(&mut engine, &[0.4, 0.8, 0.0, 0.0], gains, 1.0);
        assert_relative_eq!(engine.track(0).buffer().read(1).left, 0.4);
        assert_relative_eq!(engine.track(5).buffer().read(0).right, 0.2);
    }

    #[test]
    fn playing_track_is_summed_with_input() {
        let mut engine = TrackEngine::new(32, 4).unwrap();
        run(&mut engine, &[0.25, 0.5, 0.0, 0.0], UNITY, 1.0);
        engine.commit(0);
        let out = run(&mut engine, &[0.1, 0.1, 0.1, 0.1], UNITY, 1.0);
        assert_relative_eq!(out[0], 0.35);
        assert_relative_eq!(out[1], 0.6);
        assert_relative_eq!(out[2], 0.1);
    }

    #[test]
    fn stopped_track_is_silent_and_untouched() {
        let mut engine = TrackEngine::new(32, 2).unwrap();
        run(&mut engine, &[0.5, 0.5], UNITY, 1.0);
        engine.store.track_mut(0).state = TrackState::LoopOff;
        let out = run(&mut engine, &[0.0, 0.0], UNITY, 1.0);
        assert_eq!(out, vec![0.0, 0.0]);
        assert_relative_eq!(engine.track(0).buffer().read(0).left, 0.5);
    }

    #[test]
    fn phrase_start_latches_on_first_loud_frame() {
        let mut engine = TrackEngine::new(64, 16).unwrap();
        let mut input = vec![0.0; 16];
        input[5] = 0.2;
        input[9] = 0.9;
        run(&mut engine, &input, UNITY, 0.1);
        assert_eq!(engine.track(0).phrase_start(), Some(5));
        run(&mut engine, &input, UNITY, 0.1);
        assert_eq!(engine.track(0).phrase_start(), Some(5));
    }

    #[test]
    fn cursor_wraps_at_loop_length() {
        let mut engine = TrackEngine::new(64, 10).unwrap();
        run(&mut engine, &[0.0; 25], UNITY, 1.0);
        assert_eq!(engine.cursor().index(), 5);
    }

    #[test]
    fn free_running_length_comes_from_phrase() {
        let mut engine = TrackEngine::new(100, 100).unwrap();
        assert!(engine.free_running());
        run(&mut engine, &[0.0; 20], UNITY, 0.5);
        engine.undo(3); // marks frame 20 on track 3
        run(&mut engine, &[0.0; 30], UNITY, 0.5);
        let cursor = engine.cursor();
        assert_eq!(cursor.start(), 20);
        assert_eq!(cursor.len(), 1);
        assert!(!engine.free_running());
    }

    #[test]
    fn free_running_prefers_highest_track() {
        let mut engine = TrackEngine::new(100, 100).unwrap();
        engine.store.track_mut(1).mark_phrase_start(40);
        engine.store.track_mut(4).mark_phrase_start(10);
        run(&mut engine, &[0.0; 50], UNITY, 1.0);
        // first frame advances the cursor to 1: (100 + 1 - 10) % 100
        assert_eq!(engine.cursor().start(), 10);
        assert_eq!(engine.cursor().len(), 91);
    }

    #[test]
    fn rewind_rearms_everything() {
        let mut engine = TrackEngine::new(32, 8).unwrap();
        run(&mut engine, &[0.9; 3], UNITY, 0.1);
        engine.commit(0);
        engine.rewind(16);
        assert_eq!(engine.cursor().index(), 0);
        assert_eq!(engine.cursor().len(), 16);
        assert!(engine.track_states().iter().all(|s| *s == TrackState::Recording));
        assert!(engine.store().tracks().iter().all(|t| t.phrase_start().is_none()));
    }
}
