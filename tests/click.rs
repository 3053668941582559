mod common;

use approx::assert_relative_eq;
use common::Rig;
use looptty::audio::ClickGenerator;

const CLICK_GAIN: f32 = 0.1;

fn clicking_rig(volume: f32) -> Rig {
    let mut rig = Rig::studio();
    rig.params.click_volume = volume;
    rig.start_transport();
    rig
}

#[test]
fn first_beat_of_the_bar_is_the_high_pulse() {
    let mut rig = clicking_rig(1.0);
    let reference = ClickGenerator::new(48_000.0).unwrap();
    let out = rig.process(&[0.0; 512], &[]).to_vec();
    for (i, s) in out.iter().enumerate() {
        assert_relative_eq!(*s, CLICK_GAIN * reference.high_pulse()[i], epsilon = 1e-6);
    }
}

#[test]
fn low_pulse_starts_on_the_crossing_sample() {
    // 120 bpm at 48 kHz: the second beat is 24000 frames in, 448 frames into the 47th block
    let mut rig = clicking_rig(0.5);
    rig.silence(46 * 512, 512);

    let reference = ClickGenerator::new(48_000.0).unwrap();
    let low = reference.low_pulse();
    let out = rig.process(&[0.0; 512], &[]).to_vec();

    assert!(out[..448].iter().all(|&s| s == 0.0));
    for (i, s) in out[448..].iter().enumerate() {
        assert_relative_eq!(*s, CLICK_GAIN * 0.5 * low[i], epsilon = 1e-6);
    }
    assert!(out[449].abs() > 0.0);
    assert_eq!(rig.engine.snapshot().loop_beat, 2);
}

#[test]
fn click_is_silent_when_stopped() {
    let mut rig = Rig::studio();
    rig.params.click_volume = 1.0;
    let out = rig.process(&[0.0; 2048], &[]).to_vec();
    assert!(out.iter().all(|&s| s == 0.0));
}

#[test]
fn click_is_silent_while_a_loop_plays() {
    let mut rig = clicking_rig(1.0);
    rig.record(true);
    rig.silence(512, 512);
    rig.record(false);
    rig.silence(512, 512); // track 0 looping silence from here

    rig.silence(23_000, 512);
    let out = rig.process(&[0.0; 1024], &[]).to_vec();
    assert!(out.iter().all(|&s| s == 0.0));
}

#[test]
fn zero_volume_mutes_the_click() {
    let mut rig = clicking_rig(0.0);
    let out = rig.process(&[0.0; 512], &[]).to_vec();
    assert!(out.iter().all(|&s| s == 0.0));
}
