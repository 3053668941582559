use std::time::Duration;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use looptty::audio::NUM_TRACKS;
use crate::shared::InputEvent;
use super::mode::TuiState;

const BPM_STEP: f32 = 1.0;
const BARS_STEP: f32 = 1.0;
const MIX_STEP: f32 = 5.0;

// poll for input from tui, tracks held keys in tuistate,
// resolves presses and releases into input events for the middle layer
pub fn poll_input(timeout: Duration, ts: &mut TuiState) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    let mut events = Vec::new();
    // drain everything already queued so held keys don't lag a frame behind
    loop {
        if let Event::Key(key) = event::read()? {
            match key.kind {
                KeyEventKind::Press => events.extend(handle_press(key.code, ts)),
                KeyEventKind::Release => {
                    ts.release_events = true;
                    events.extend(handle_release(key.code, ts));
                }
                KeyEventKind::Repeat => {}
            }
        }
        if !event::poll(Duration::ZERO)? {
            break;
        }
    }
    Ok(events)
}

fn handle_press(code: KeyCode, ts: &mut TuiState) -> Vec<InputEvent> {
    match code {
        KeyCode::Esc => vec![InputEvent::Quit],
        KeyCode::Char(' ') => vec![InputEvent::TogglePlay],

        // footswitches, lowercase = down and shifted = up
        KeyCode::Char('r') => press(&mut ts.record_held, InputEvent::RecordDown),
        KeyCode::Char('R') => release(&mut ts.record_held, InputEvent::RecordUp),
        KeyCode::Char('u') => press(&mut ts.undo_held, InputEvent::UndoDown),
        KeyCode::Char('U') => release(&mut ts.undo_held, InputEvent::UndoUp),

        KeyCode::Char(c @ '1'..='6') => {
            let n = note_offset(c);
            let mut events = Vec::new();
            if !ts.release_events && ts.notes_held[n as usize] {
                // no release events: a second press lets go
                events.push(InputEvent::NoteUp(n));
                ts.notes_held[n as usize] = false;
            } else if !ts.notes_held[n as usize] {
                events.push(InputEvent::NoteDown(n));
                ts.notes_held[n as usize] = true;
            }
            events
        }

        KeyCode::Char('+' | '=') => vec![InputEvent::BpmStep(BPM_STEP)],
        KeyCode::Char('-') => vec![InputEvent::BpmStep(-BPM_STEP)],
        KeyCode::Char('[') => vec![InputEvent::BarsStep(-BARS_STEP)],
        KeyCode::Char(']') => vec![InputEvent::BarsStep(BARS_STEP)],
        KeyCode::Char(',') => vec![InputEvent::MixStep(-MIX_STEP)],
        KeyCode::Char('.') => vec![InputEvent::MixStep(MIX_STEP)],
        KeyCode::Char('c') => vec![InputEvent::ToggleClick],
        KeyCode::Char('e') => vec![InputEvent::ToggleEnabled],
        KeyCode::Char('0') => vec![InputEvent::Reset],

        _ => vec![],
    }
}

fn handle_release(code: KeyCode, ts: &mut TuiState) -> Vec<InputEvent> {
    match code {
        KeyCode::Char('r' | 'R') => release(&mut ts.record_held, InputEvent::RecordUp),
        KeyCode::Char('u' | 'U') => release(&mut ts.undo_held, InputEvent::UndoUp),
        KeyCode::Char(c @ '1'..='6') => {
            let n = note_offset(c);
            release(&mut ts.notes_held[n as usize], InputEvent::NoteUp(n))
        }
        _ => vec![],
    }
}

fn press(held: &mut bool, event: InputEvent) -> Vec<InputEvent> {
    if *held {
        return vec![];
    }
    *held = true;
    vec![event]
}

fn release(held: &mut bool, event: InputEvent) -> Vec<InputEvent> {
    if !*held {
        return vec![];
    }
    *held = false;
    vec![event]
}

fn note_offset(c: char) -> u8 {
    let n = c as u8 - b'1';
    debug_assert!((n as usize) < NUM_TRACKS);
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn footswitch_press_is_not_repeated() {
        let mut ts = TuiState::default();
        assert_eq!(handle_press(KeyCode::Char('r'), &mut ts), vec![InputEvent::RecordDown]);
        assert!(handle_press(KeyCode::Char('r'), &mut ts).is_empty());
        assert_eq!(handle_press(KeyCode::Char('R'), &mut ts), vec![InputEvent::RecordUp]);
        assert!(handle_press(KeyCode::Char('R'), &mut ts).is_empty());
    }

    #[test]
    fn release_event_lets_go_of_footswitch() {
        let mut ts = TuiState::default();
        handle_press(KeyCode::Char('u'), &mut ts);
        assert_eq!(handle_release(KeyCode::Char('u'), &mut ts), vec![InputEvent::UndoUp]);
    }

    #[test]
    fn notes_toggle_without_release_events() {
        let mut ts = TuiState::default();
        assert_eq!(handle_press(KeyCode::Char('3'), &mut ts), vec![InputEvent::NoteDown(2)]);
        assert_eq!(handle_press(KeyCode::Char('3'), &mut ts), vec![InputEvent::NoteUp(2)]);
    }

    #[test]
    fn notes_hold_with_release_events() {
        let mut ts = TuiState { release_events: true, ..TuiState::default() };
        assert_eq!(handle_press(KeyCode::Char('1'), &mut ts), vec![InputEvent::NoteDown(0)]);
        assert!(handle_press(KeyCode::Char('1'), &mut ts).is_empty());
        assert_eq!(handle_release(KeyCode::Char('1'), &mut ts), vec![InputEvent::NoteUp(0)]);
    }
}
