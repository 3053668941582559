use std::path::Path;

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};

use looptty::audio::{NUM_TRACKS, Notice, StereoFrame, notice_channel};
use looptty::{AudioBlock, Engine, EngineSnapshot, HostEvent, LooperConfig, Parameters};

use crate::audio_api::AudioCommand;
use crate::loader::backing::BackingTrack;

const MAX_BLOCK: usize = 4096; // callbacks larger than this are processed in chunks
const MAX_EVENTS: usize = 64; // per block; extra events are dropped
const MAX_SWITCHES: usize = 32; // queued footswitch edges; extra edges are dropped
const SWITCH_BLOCK: usize = 32; // frames per engine block while edges are queued
const INPUT_FIFO_FRAMES: usize = 1 << 15;

pub struct AudioHandle {
    tx: Sender<AudioCommand>,
    snapshot_rx: Receiver<EngineSnapshot>,
    notice_rx: Receiver<Notice>,
    sample_rate: u32,
    _output_stream: cpal::Stream,
    _input_stream: Option<cpal::Stream>, // None when no mic available or a backing track is used
}

impl AudioHandle {
    pub fn send(&self, cmd: AudioCommand) {
        let _ = self.tx.try_send(cmd);
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Most recent engine state, if any block ran since the last call.
    pub fn latest_snapshot(&self) -> Option<EngineSnapshot> {
        self.snapshot_rx.try_iter().last()
    }

    pub fn drain_notices(&self) -> impl Iterator<Item = Notice> + '_ {
        self.notice_rx.try_iter()
    }
}

// Where the live input comes from
enum InputSource {
    Device(rtrb::Consumer<StereoFrame>),
    Backing(BackingTrack),
    Silence,
}

impl InputSource {
    #[inline]
    fn next_frame(&mut self) -> StereoFrame {
        match self {
            InputSource::Device(rx) => rx.pop().unwrap_or_default(), // underrun reads as silence
            InputSource::Backing(track) => track.next_frame(),
            InputSource::Silence => StereoFrame::zero(),
        }
    }
}

// Lives inside the output callback; owns the engine and every buffer it needs.
struct AudioHost {
    engine: Engine,
    params: Parameters,
    events: [HostEvent; MAX_EVENTS],
    event_count: usize,
    switches: [(usize, f32); MAX_SWITCHES],
    switch_count: usize,
    input: InputSource,
    in_l: Vec<f32>,
    in_r: Vec<f32>,
    out_l: Vec<f32>,
    out_r: Vec<f32>,
}

impl AudioHost {
    fn new(engine: Engine, params: Parameters, input: InputSource) -> Self {
        Self {
            engine,
            params,
            events: [HostEvent::Note { number: 0, on: false }; MAX_EVENTS],
            event_count: 0,
            switches: [(0, 0.0); MAX_SWITCHES],
            switch_count: 0,
            input,
            in_l: vec![0.0; MAX_BLOCK],
            in_r: vec![0.0; MAX_BLOCK],
            out_l: vec![0.0; MAX_BLOCK],
            out_r: vec![0.0; MAX_BLOCK],
        }
    }

    fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::SetParams(params) => {
                // footswitch levels belong to the queue, not the UI's copy
                let levels = self.params.track_levels;
                self.params = params;
                self.params.track_levels = levels;
            }
            AudioCommand::Footswitch { button, down } => {
                if button < NUM_TRACKS && self.switch_count < MAX_SWITCHES {
                    self.switches[self.switch_count] = (button, if down { 1.0 } else { 0.0 });
                    self.switch_count += 1;
                }
            }
            AudioCommand::Event(event) => {
                if self.event_count < MAX_EVENTS {
                    self.events[self.event_count] = event;
                    self.event_count += 1;
                }
            }
            AudioCommand::Reset => self.engine.reset(),
        }
    }

    // Moves queued edges into the levels, at most one per button, in arrival order.
    fn apply_switches(&mut self) {
        let mut touched = [false; NUM_TRACKS];
        let mut taken = 0;
        while taken < self.switch_count {
            let (button, level) = self.switches[taken];
            if touched[button] {
                break;
            }
            touched[button] = true;
            self.params.track_levels[button] = level;
            taken += 1;
        }
        self.switches.copy_within(taken..self.switch_count, 0);
        self.switch_count -= taken;
    }

    // deinterleave, run the engine, interleave back
    fn render(&mut self, data: &mut [f32], channels: usize) {
        if channels == 0 {
            return;
        }
        for chunk in data.chunks_mut(MAX_BLOCK * channels) {
            let n = chunk.len() / channels;
            for i in 0..n {
                let frame = self.input.next_frame();
                self.in_l[i] = frame.left;
                self.in_r[i] = frame.right;
            }

            let mut done = 0;
            while done < n {
                self.apply_switches();
                let len = if self.switch_count > 0 {
                    SWITCH_BLOCK.min(n - done)
                } else {
                    n - done
                };
                let end = done + len;
                self.engine.process(
                    AudioBlock {
                        input_left: &self.in_l[done..end],
                        input_right: &self.in_r[done..end],
                        output_left: &mut self.out_l[done..end],
                        output_right: &mut self.out_r[done..end],
                    },
                    &self.params,
                    &self.events[..self.event_count],
                );
                self.event_count = 0; // events belong to the first block only
                done = end;
            }

            for (i, out) in chunk.chunks_mut(channels).enumerate() {
                match out {
                    [mono] => *mono = 0.5 * (self.out_l[i] + self.out_r[i]),
                    [l, r, rest @ ..] => {
                        *l = self.out_l[i];
                        *r = self.out_r[i];
                        rest.fill(0.0);
                    }
                    [] => {}
                }
            }
        }
    }
}

pub fn start_audio(config: &LooperConfig, backing: Option<&Path>) -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(1024);
    let (snapshot_tx, snapshot_rx) = crossbeam_channel::bounded::<EngineSnapshot>(64);
    let (notice_tx, notice_rx) = notice_channel(256);

    let host = cpal::default_host();
    let device = host.default_output_device().context("no default output device")?;
    let supported = device.default_output_config().context("no default output config")?;

    let sample_rate = supported.sample_rate();
    let channels = supported.channels() as usize;
    log::info!("output: {} Hz, {} channels", sample_rate, channels);

    let mut engine = Engine::new(config.engine_settings(f64::from(sample_rate)))
        .context("could not allocate loop memory")?;
    engine.set_notifier(notice_tx);

    let (input, input_stream) = match backing {
        Some(path) => {
            let track = BackingTrack::load_wav(path, sample_rate)?;
            log::info!("live input replaced by backing track ({} frames)", track.len());
            (InputSource::Backing(track), None)
        }
        None => match try_build_input_stream(&host, sample_rate) {
            Some((stream, rx)) => (InputSource::Device(rx), Some(stream)),
            None => (InputSource::Silence, None),
        },
    };

    match supported.sample_format() {
        cpal::SampleFormat::F32 => {
            let audio_host = AudioHost::new(engine, config.parameters(), input);
            let output_stream = build_output_stream_f32(
                &device, &supported.into(), rx, snapshot_tx, audio_host, channels,
            )?;
            output_stream.play().context("failed to play output stream")?;

            Ok(AudioHandle {
                tx,
                snapshot_rx,
                notice_rx,
                sample_rate,
                _output_stream: output_stream,
                _input_stream: input_stream,
            })
        }
        other => anyhow::bail!("unsupported sample format {other:?} (only f32 supported for now)"),
    }
}

// ── Output stream ─────────────────────────────────────────────────

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<AudioCommand>,
    snapshot_tx: Sender<EngineSnapshot>,
    mut host: AudioHost,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    let err_fn = |err| log::error!("audio output stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info| {
            while let Ok(cmd) = rx.try_recv() { // set up command handling
                host.handle_cmd(cmd);
            }
            host.render(data, channels);
            let _ = snapshot_tx.try_send(host.engine.snapshot());
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

// ── Input stream ──────────────────────────────────────────────────

fn try_build_input_stream(
    host: &cpal::Host,
    target_sample_rate: cpal::SampleRate,
) -> Option<(cpal::Stream, rtrb::Consumer<StereoFrame>)> {
    let device = match host.default_input_device() {
        Some(d) => d,
        None => {
            log::warn!("no default input device, live input disabled");
            return None;
        }
    };

    let supported = device.default_input_config().ok()?;
    let mut stream_config: cpal::StreamConfig = supported.into();
    stream_config.sample_rate = target_sample_rate;

    let in_channels = stream_config.channels as usize;
    let (mut producer, consumer) = rtrb::RingBuffer::<StereoFrame>::new(INPUT_FIFO_FRAMES);

    let err_fn = |err| log::error!("audio input stream error: {err}");

    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                for c in data.chunks_exact(in_channels) {
                    let frame = match c {
                        [mono] => StereoFrame::new(*mono, *mono),
                        [l, r, ..] => StereoFrame::new(*l, *r),
                        [] => StereoFrame::zero(),
                    };
                    if producer.push(frame).is_err() {
                        break; // output side stalled; drop the rest
                    }
                }
            },
            err_fn,
            None,
        )
        .ok()?;

    if let Err(e) = stream.play() {
        log::warn!("could not start input stream: {e}");
        return None;
    }

    Some((stream, consumer))
}
