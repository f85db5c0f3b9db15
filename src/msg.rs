use crossterm::event::KeyEvent;
use treeshelf::preview::DecodeOutcome;

/// All possible messages that drive state transitions.
#[derive(Debug)]
pub enum Msg {
    // -- Input events (raw)
    Key(KeyEvent),
    Resize(u16, u16),

    // -- Background work
    PreviewDecoded(DecodeOutcome),

    // -- System
    Quit,
}
