/// Typed commands from the input layer.
///
/// The presentation side never mutates simulation state directly: it
/// enqueues commands, and the state machine drains the queue at the
/// start of each tick. Commands that do not apply to the current phase
/// are dropped silently.

use crate::domain::entity::Dir;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
    /// Buffer an intended direction; committed at the next tile center.
    SetDirection(Dir),
    /// Edge-triggered accusation attempt.
    Accuse,
    /// Skip the round intro.
    BeginRound,
    /// Start over from round 1 after a loss.
    Restart,
}
