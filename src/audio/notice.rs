//! Diagnostics out of the audio thread.
//!
//! The block path may not log, so it posts small `Copy` notices into a bounded
//! channel instead. A full channel drops the notice; nothing ever blocks.

use crossbeam_channel::{Receiver, Sender};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Notice {
    PhraseDetected { track: usize, frame: usize },
    Committed { track: usize, next: usize },
    Undone { track: usize, frame: usize },
    Rearmed { track: usize },
    FreeRunning { loop_start: usize, loop_samples: usize },
    Reset { loop_beats: u32, loop_samples: usize, bpm: f32 },
}

impl Notice {
    /// Writes the notice through the `log` facade. Call this off the audio thread.
    pub fn log(&self) {
        match *self {
            Notice::PhraseDetected { track, frame } => {
                log::debug!("track {track}: phrase start detected at frame {frame}")
            }
            Notice::Committed { track, next } => {
                log::info!("track {track} looping, moving to track {next}")
            }
            Notice::Undone { track, frame } => {
                log::info!("track {track} undone at frame {frame}")
            }
            Notice::Rearmed { track } => log::info!("track {track} rearmed for recording"),
            Notice::FreeRunning { loop_start, loop_samples } => {
                log::info!("free-running loop set: start {loop_start}, {loop_samples} frames")
            }
            Notice::Reset { loop_beats, loop_samples, bpm } => {
                log::info!("reset: {loop_beats} beats at {bpm} bpm, {loop_samples} frames")
            }
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Notifier {
    tx: Option<Sender<Notice>>,
}

impl Notifier {
    pub fn new(tx: Sender<Notice>) -> Self {
        Self { tx: Some(tx) }
    }

    #[inline]
    pub fn post(&self, notice: Notice) {
        if let Some(tx) = &self.tx {
            let _ = tx.try_send(notice);
        }
    }
}

/// Bounded notice channel.
///
/// The sender side goes to [`Engine::set_notifier`](super::Engine::set_notifier).
pub fn channel(capacity: usize) -> (Sender<Notice>, Receiver<Notice>) {
    crossbeam_channel::bounded(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_channel_drops_instead_of_blocking() {
        let (tx, rx) = channel(1);
        let notifier = Notifier::new(tx);
        notifier.post(Notice::Rearmed { track: 0 });
        notifier.post(Notice::Rearmed { track: 1 });
        assert_eq!(rx.try_recv(), Ok(Notice::Rearmed { track: 0 }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn posting_without_a_channel_is_a_no_op() {
        Notifier::default().post(Notice::Rearmed { track: 0 });
    }
}
