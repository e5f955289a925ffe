/// WorldState: the complete snapshot of a running game.
///
/// One aggregate owns every counter and collection; the movement and
/// AI layers receive read views (`NavView`) and never touch round
/// bookkeeping. All mutation happens inside `step::step`, one tick at
/// a time, in a fixed order.
///
/// Coordinates: tiles are `(i32, i32)` pairs and double as set keys
/// (`shop_blocks`, `clues`), entity positions are continuous sub-tile
/// units (see `domain::entity`).

use std::collections::{HashSet, VecDeque};

use rand_chacha::ChaCha8Rng;

use crate::config::{RuleConfig, SpeedConfig};
use crate::domain::entity::{Enemy, Player, Shop};
use crate::domain::grid::Grid;
use crate::sim::command::Command;

/// Bad shops per round; exposing all of them wins the round.
pub const BAD_SHOPS: u32 = 3;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Title,
    RoundIntro,
    Playing,
    RoundWin,
    RoundLose,
}

pub struct WorldState {
    // ── Static terrain ──
    pub grid: Grid,

    // ── Per-round collections ──
    pub shops: Vec<Shop>,
    /// Tiles occupied by a shop this round. Shops always block,
    /// exposed or not.
    pub shop_blocks: HashSet<(i32, i32)>,
    /// Remaining clue pickups; each tile is consumed at most once.
    pub clues: HashSet<(i32, i32)>,
    pub enemies: Vec<Enemy>,
    pub player: Player,

    // ── Round counters ──
    pub round_index: u32,
    pub clue_meter: u32,
    pub clue_target: u32,
    pub exposed_bad_count: u32,
    pub penalty_stacks: u32,
    pub freeze_timer: u32,
    pub hit_cooldown: u32,

    // ── State machine ──
    pub phase: Phase,
    /// Countdown driving the Intro and Win transitions.
    pub phase_timer: u32,
    pub tick: u64,
    pub paused: bool,

    // ── UI ──
    pub message: String,
    pub message_timer: u32,

    // ── Config ──
    pub speed: SpeedConfig,
    pub rules: RuleConfig,

    // ── Shared random source ──
    pub rng: ChaCha8Rng,

    // ── Input queue, drained once per tick ──
    pub commands: VecDeque<Command>,
}

impl WorldState {
    pub fn new(grid: Grid, speed: SpeedConfig, rules: RuleConfig, rng: ChaCha8Rng) -> Self {
        let player = Player::new(grid.player_spawn, speed.player_speed);
        WorldState {
            grid,
            shops: vec![],
            shop_blocks: HashSet::new(),
            clues: HashSet::new(),
            enemies: vec![],
            player,
            round_index: 1,
            clue_meter: 0,
            clue_target: 0,
            exposed_bad_count: 0,
            penalty_stacks: 0,
            freeze_timer: 0,
            hit_cooldown: 0,
            phase: Phase::Title,
            phase_timer: 0,
            tick: 0,
            paused: false,
            message: String::new(),
            message_timer: 0,
            speed,
            rules,
            rng,
            commands: VecDeque::new(),
        }
    }

    /// Heat: each penalty stack speeds enemies up by 20%.
    pub fn heat_multiplier(&self) -> f32 {
        1.0 + self.penalty_stacks as f32 * 0.2
    }

    /// Nearest unexposed shop within the accusation radius of the
    /// player's tile (Euclidean on tile coordinates), if any.
    pub fn nearest_shop_in_range(&self) -> Option<usize> {
        let (px, py) = self.player.tile();
        let r2 = self.rules.accuse_radius * self.rules.accuse_radius;
        let mut best: Option<(usize, f32)> = None;
        for (i, shop) in self.shops.iter().enumerate() {
            if shop.exposed {
                continue;
            }
            let dx = (shop.tile_x - px) as f32;
            let dy = (shop.tile_y - py) as f32;
            let d2 = dx * dx + dy * dy;
            if d2 <= r2 && best.map_or(true, |(_, bd2)| d2 < bd2) {
                best = Some((i, d2));
            }
        }
        best.map(|(i, _)| i)
    }

    pub fn push_command(&mut self, cmd: Command) {
        self.commands.push_back(cmd);
    }

    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RuleConfig, SpeedConfig};
    use crate::domain::entity::tile_center;
    use rand::SeedableRng;

    fn test_world(rows: &[&str]) -> WorldState {
        let grid = Grid::parse(rows).unwrap();
        WorldState::new(
            grid,
            SpeedConfig::default(),
            RuleConfig::default(),
            ChaCha8Rng::seed_from_u64(1),
        )
    }

    #[test]
    fn heat_multiplier_scales_with_stacks() {
        let mut w = test_world(&["#####", "#P..#", "#####"]);
        assert!((w.heat_multiplier() - 1.0).abs() < 1e-6);
        w.penalty_stacks = 2;
        assert!((w.heat_multiplier() - 1.4).abs() < 1e-6);
        w.penalty_stacks = 5;
        assert!((w.heat_multiplier() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn nearest_shop_skips_exposed_and_honors_radius() {
        let mut w = test_world(&[
            "##########",
            "#P.......#",
            "##########",
        ]);
        w.rules.accuse_radius = 2.0;
        w.shops.push(Shop::new((2, 1)));
        w.shops.push(Shop::new((3, 1)));
        // Both in range; (2,1) is nearer.
        assert_eq!(w.nearest_shop_in_range(), Some(0));
        w.shops[0].exposed = true;
        assert_eq!(w.nearest_shop_in_range(), Some(1));
        // Move the player out of range of the remaining shop.
        let (cx, cy) = tile_center((8, 1));
        w.player.x = cx;
        w.player.y = cy;
        assert_eq!(w.nearest_shop_in_range(), None);
    }
}
