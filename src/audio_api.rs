use looptty::{HostEvent, Parameters};

// Everything the UI thread can ask of the audio thread. All variants are Copy
// so sending never moves heap memory into the callback.
#[derive(Clone, Copy, Debug)]
pub enum AudioCommand {
    // The whole parameter set, as the control ports would hold it for the next blocks
    SetParams(Parameters),

    // One footswitch edge. Edges are queued so a press and release that
    // arrive together still reach the engine in separate blocks.
    Footswitch { button: usize, down: bool },

    // Queued and handed to the engine with the next block
    Event(HostEvent),

    Reset,
}
