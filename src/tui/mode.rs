use looptty::audio::NUM_TRACKS;

// state local to tui, mirrors which keys are physically held
// so repeats don't re-send presses and shifted keys can release
#[derive(Clone, Debug, Default)]
pub struct TuiState {
    pub record_held: bool,
    pub undo_held: bool,
    pub notes_held: [bool; NUM_TRACKS],
    // true once the terminal has delivered a real release event
    pub release_events: bool,
}
