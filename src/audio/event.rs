use super::transport::PositionUpdate;

/// Events a host delivers for one block, in arrival order.
///
/// Hosts decode their own wire format into this; the engine never sees raw type tags.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HostEvent {
    Position(PositionUpdate),
    Note { number: u8, on: bool },
}

impl HostEvent {
    pub fn note_on(number: u8) -> Self {
        HostEvent::Note { number, on: true }
    }

    pub fn note_off(number: u8) -> Self {
        HostEvent::Note { number, on: false }
    }
}

impl From<PositionUpdate> for HostEvent {
    fn from(update: PositionUpdate) -> Self {
        HostEvent::Position(update)
    }
}
