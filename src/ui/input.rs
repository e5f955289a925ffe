/// Keyboard state tracker.
///
/// Terminals mostly report key repeats instead of press/release pairs,
/// so held state is inferred: a key counts as held until it goes
/// `HOLD_TIMEOUT` without a Press/Repeat event. Explicit Release
/// events (kitty-protocol terminals) are honored when they arrive.
///
/// Held keys drive continuous steering; fresh presses drive the
/// edge-triggered actions (accuse, confirm, pause).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEventKind, KeyModifiers};

/// After this long without a Press/Repeat event the key reads as
/// released. Fallback for terminals that never send Release.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

pub struct InputState {
    /// Timestamp of the last Press/Repeat event per key.
    last_active: HashMap<KeyCode, Instant>,
    /// Keys that went from released to held during the latest drain.
    fresh: Vec<KeyCode>,
    ctrl_c: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh: Vec::with_capacity(8),
            ctrl_c: false,
        }
    }

    /// Drain all pending terminal events. Call once per frame, before
    /// translating input into simulation commands.
    pub fn drain_events(&mut self) {
        self.fresh.clear();
        self.ctrl_c = false;

        while poll(Duration::ZERO).unwrap_or(false) {
            let Ok(Event::Key(key)) = event::read() else {
                continue;
            };
            if key.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
            {
                self.ctrl_c = true;
            }
            match key.kind {
                KeyEventKind::Release => {
                    self.last_active.remove(&key.code);
                }
                _ => {
                    let was_held = self.held_inner(key.code);
                    self.last_active.insert(key.code, Instant::now());
                    if !was_held {
                        self.fresh.push(key.code);
                    }
                }
            }
        }

        // Expire keys that have gone quiet.
        let now = Instant::now();
        self.last_active
            .retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    /// Is the key currently held? Used for steering.
    pub fn is_held(&self, code: KeyCode) -> bool {
        self.held_inner(code)
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    /// Did the key go down this frame? Used for one-shot actions.
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.ctrl_c
    }

    fn held_inner(&self, code: KeyCode) -> bool {
        self.last_active
            .get(&code)
            .map(|t| t.elapsed() < HOLD_TIMEOUT)
            .unwrap_or(false)
    }
}
