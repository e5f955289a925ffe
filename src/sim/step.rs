/// The step function: advances the world by one tick.
///
/// Processing order within a Playing tick:
///   1. Command drain (input queue)
///   2. Player movement
///   3. Clue pickup
///   4. Enemy AI + movement (skipped while the freeze window is open)
///   5. Hit detection
///   6. Timer updates
///   7. Loss check
///
/// Phase transitions are driven either by drained commands or by the
/// countdown in `phase_timer`; nothing in the simulation runs off
/// wall-clock time.

use crate::config::HitPenalty;
use crate::domain::ai;
use crate::domain::entity::{Player, TILE_UNITS};
use crate::domain::grid::NavView;
use crate::domain::motion;
use crate::sim::command::Command;
use crate::sim::event::GameEvent;
use crate::sim::level;
use crate::sim::world::{Phase, WorldState, BAD_SHOPS};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState) -> Vec<GameEvent> {
    let mut events: Vec<GameEvent> = Vec::new();
    world.tick = world.tick.wrapping_add(1);

    drain_commands(world, &mut events);

    if world.message_timer > 0 {
        world.message_timer -= 1;
        if world.message_timer == 0 {
            world.message.clear();
        }
    }

    match world.phase {
        Phase::Playing => playing_tick(world, &mut events),
        Phase::RoundIntro => {
            if world.phase_timer > 0 {
                world.phase_timer -= 1;
            }
            if world.phase_timer == 0 {
                begin_playing(world);
            }
        }
        Phase::RoundWin => {
            if world.phase_timer > 0 {
                world.phase_timer -= 1;
            }
            if world.phase_timer == 0 {
                world.round_index += 1;
                level::start_round(world);
                events.push(GameEvent::RoundStarted { round: world.round_index });
            }
        }
        // Title waits for BeginRound; a lost round waits for Restart.
        Phase::Title | Phase::RoundLose => {}
    }

    events
}

// ══════════════════════════════════════════════════════════════
// Command drain
// ══════════════════════════════════════════════════════════════

/// Apply queued input commands. Commands that do not fit the current
/// phase are dropped without effect.
fn drain_commands(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    while let Some(cmd) = world.commands.pop_front() {
        match cmd {
            Command::SetDirection(dir) => {
                if world.phase == Phase::Playing {
                    world.player.next_dir = dir;
                }
            }
            Command::Accuse => {
                if world.phase == Phase::Playing {
                    attempt_accuse(world, events);
                }
            }
            Command::BeginRound => match world.phase {
                Phase::Title => {
                    world.round_index = 1;
                    level::start_round(world);
                    events.push(GameEvent::RoundStarted { round: 1 });
                }
                Phase::RoundIntro => begin_playing(world),
                _ => {}
            },
            Command::Restart => {
                if world.phase == Phase::RoundLose {
                    world.round_index = 1;
                    level::start_round(world);
                    events.push(GameEvent::RoundStarted { round: 1 });
                }
            }
        }
    }
}

fn begin_playing(world: &mut WorldState) {
    world.phase = Phase::Playing;
    world.phase_timer = 0;
    world.set_message("Expose the laundering fronts!", world.rules.message_ticks);
}

// ══════════════════════════════════════════════════════════════
// Accusation
// ══════════════════════════════════════════════════════════════

fn attempt_accuse(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let idx = match world.nearest_shop_in_range() {
        Some(i) => i,
        None => {
            world.set_message("No storefront within reach.", world.rules.message_ticks);
            return;
        }
    };

    if world.clue_meter < world.clue_target {
        world.set_message(
            &format!(
                "Not enough evidence ({}/{}).",
                world.clue_meter, world.clue_target
            ),
            world.rules.message_ticks,
        );
        events.push(GameEvent::AccusationRejected);
        return;
    }

    // The meter is spent on the attempt, right or wrong.
    world.clue_meter = 0;
    let (sx, sy) = world.shops[idx].tile();

    if world.shops[idx].is_bad {
        world.shops[idx].exposed = true;
        world.exposed_bad_count += 1;
        world.penalty_stacks = world.penalty_stacks.saturating_sub(1);
        world.freeze_timer = world.rules.freeze_ticks;
        events.push(GameEvent::ShopExposed { x: sx, y: sy });

        if world.exposed_bad_count >= BAD_SHOPS {
            world.phase = Phase::RoundWin;
            world.phase_timer = world.rules.win_ticks;
            world.set_message("All three fronts exposed!", world.rules.message_ticks);
            events.push(GameEvent::RoundWon { round: world.round_index });
        } else {
            world.set_message(
                &format!("Front exposed! {}/{}", world.exposed_bad_count, BAD_SHOPS),
                world.rules.message_ticks,
            );
        }
    } else {
        world.penalty_stacks += 1;
        world.set_message(
            "A legitimate business. The streets get hotter.",
            world.rules.message_ticks,
        );
        events.push(GameEvent::AccusedInnocent { x: sx, y: sy });
    }
}

// ══════════════════════════════════════════════════════════════
// Playing tick
// ══════════════════════════════════════════════════════════════

fn playing_tick(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    resolve_player_motion(world);
    resolve_clue_pickup(world, events);
    resolve_enemies(world);
    resolve_hits(world, events);
    resolve_timers(world);
    resolve_loss(world, events);
}

fn resolve_player_motion(world: &mut WorldState) {
    let nav = NavView { grid: &world.grid, blocks: &world.shop_blocks };
    motion::step_player(&mut world.player, &nav);
}

fn resolve_clue_pickup(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let tile = world.player.tile();
    if world.clues.remove(&tile) {
        world.clue_meter = (world.clue_meter + 1).min(world.clue_target);
        events.push(GameEvent::CluePicked { x: tile.0, y: tile.1 });
    }
}

fn resolve_enemies(world: &mut WorldState) {
    if world.freeze_timer > 0 {
        return;
    }
    let player_tile = world.player.tile();
    let heat = world.heat_multiplier();
    let nav = NavView { grid: &world.grid, blocks: &world.shop_blocks };

    for enemy in &mut world.enemies {
        if motion::near_center(enemy.x, enemy.y) {
            motion::snap_to_center(&mut enemy.x, &mut enemy.y);
            enemy.dir =
                ai::choose_direction(&nav, enemy.tile(), enemy.dir, player_tile, &mut world.rng);
            // Boxed in on every side: the forced reversal has nowhere
            // to go either, so stay put.
            if !motion::can_head(&nav, enemy.tile(), enemy.dir) {
                continue;
            }
        }
        motion::advance(&mut enemy.x, &mut enemy.y, enemy.dir, enemy.speed * heat);
    }
}

fn resolve_hits(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if world.hit_cooldown > 0 {
        world.hit_cooldown -= 1;
        return;
    }

    let reach = world.rules.hit_radius * TILE_UNITS;
    let caught = world.enemies.iter().any(|e| {
        let dx = e.x - world.player.x;
        let dy = e.y - world.player.y;
        dx * dx + dy * dy <= reach * reach
    });
    if !caught {
        return;
    }

    // One reset per tick, however many enemies are stacked on the player.
    world.player = Player::new(world.grid.player_spawn, world.speed.player_speed);
    world.clue_meter = match world.rules.hit_penalty {
        HitPenalty::Zero => 0,
        HitPenalty::Halve => world.clue_meter / 2,
    };
    world.hit_cooldown = world.rules.hit_cooldown_ticks;
    world.set_message("They made you! Back to the office.", world.rules.message_ticks);
    events.push(GameEvent::PlayerCaught);
}

fn resolve_timers(world: &mut WorldState) {
    if world.freeze_timer > 0 {
        world.freeze_timer -= 1;
    }
}

/// The round is unwinnable once the evidence still on the board cannot
/// cover the remaining accusations.
fn resolve_loss(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let remaining_bad = BAD_SHOPS - world.exposed_bad_count;
    let achievable = world.clue_meter + world.clues.len() as u32;
    if achievable < world.clue_target * remaining_bad {
        world.phase = Phase::RoundLose;
        world.phase_timer = 0;
        world.set_message("The trail has gone cold.", 0);
        events.push(GameEvent::RoundLost);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RuleConfig, SpeedConfig};
    use crate::domain::entity::{tile_center, Dir, Enemy, Shop};
    use crate::domain::grid::Grid;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const ARENA: [&str; 7] = [
        "#########",
        "#P......#",
        "#.#.#.#.#",
        "#.......#",
        "#.#.#.#.#",
        "#......E#",
        "#########",
    ];

    /// A world already in the Playing phase, evidence target 8, every
    /// open tile except the spawn carrying a clue.
    fn playing_world() -> WorldState {
        let grid = Grid::parse(&ARENA).unwrap();
        let mut w = WorldState::new(
            grid,
            SpeedConfig::default(),
            RuleConfig::default(),
            ChaCha8Rng::seed_from_u64(7),
        );
        w.phase = Phase::Playing;
        w.clue_target = 8;
        let spawn = w.grid.player_spawn;
        for t in w.grid.open_tiles() {
            if t != spawn {
                w.clues.insert(t);
            }
        }
        w
    }

    fn add_shop(w: &mut WorldState, tile: (i32, i32), bad: bool) -> usize {
        let mut shop = Shop::new(tile);
        shop.is_bad = bad;
        w.shops.push(shop);
        w.shop_blocks.insert(tile);
        w.clues.remove(&tile);
        w.shops.len() - 1
    }

    fn place_player(w: &mut WorldState, tile: (i32, i32)) {
        let (x, y) = tile_center(tile);
        w.player.x = x;
        w.player.y = y;
    }

    fn has<F: Fn(&GameEvent) -> bool>(events: &[GameEvent], f: F) -> bool {
        events.iter().any(f)
    }

    #[test]
    fn insufficient_evidence_leaves_everything_untouched() {
        let mut w = playing_world();
        add_shop(&mut w, (2, 1), true);
        w.clue_meter = 3;
        w.push_command(Command::Accuse);
        let events = step(&mut w);
        assert!(!w.shops[0].exposed);
        assert_eq!(w.exposed_bad_count, 0);
        assert_eq!(w.penalty_stacks, 0);
        assert_eq!(w.clue_meter, 3);
        assert!(has(&events, |e| matches!(e, GameEvent::AccusationRejected)));
    }

    #[test]
    fn full_meter_exposes_a_bad_shop() {
        let mut w = playing_world();
        add_shop(&mut w, (2, 1), true);
        w.clue_meter = 8;
        w.push_command(Command::Accuse);
        let events = step(&mut w);
        assert!(w.shops[0].exposed);
        assert_eq!(w.exposed_bad_count, 1);
        assert_eq!(w.clue_meter, 0);
        assert_eq!(w.freeze_timer, w.rules.freeze_ticks - 1); // one tick already elapsed
        assert!(has(&events, |e| matches!(e, GameEvent::ShopExposed { .. })));
    }

    #[test]
    fn accusing_an_innocent_shop_raises_heat() {
        let mut w = playing_world();
        add_shop(&mut w, (2, 1), false);
        w.clue_meter = 8;
        w.push_command(Command::Accuse);
        let events = step(&mut w);
        assert!(!w.shops[0].exposed);
        assert_eq!(w.exposed_bad_count, 0);
        assert_eq!(w.penalty_stacks, 1);
        assert_eq!(w.clue_meter, 0);
        assert!((w.heat_multiplier() - 1.2).abs() < 1e-6);
        assert!(has(&events, |e| matches!(e, GameEvent::AccusedInnocent { .. })));
    }

    #[test]
    fn correct_accusation_softens_heat() {
        let mut w = playing_world();
        add_shop(&mut w, (2, 1), true);
        w.penalty_stacks = 2;
        w.clue_meter = 8;
        w.push_command(Command::Accuse);
        step(&mut w);
        assert_eq!(w.penalty_stacks, 1);
    }

    #[test]
    fn nearest_unexposed_shop_takes_the_accusation() {
        let mut w = playing_world();
        add_shop(&mut w, (2, 1), false); // nearer, innocent
        add_shop(&mut w, (3, 1), true);
        w.clue_meter = 8;
        w.push_command(Command::Accuse);
        step(&mut w);
        assert_eq!(w.penalty_stacks, 1);
        assert!(!w.shops[1].exposed);
    }

    #[test]
    fn accusation_out_of_reach_is_a_no_op() {
        let mut w = playing_world();
        add_shop(&mut w, (6, 3), true);
        w.clue_meter = 8;
        w.push_command(Command::Accuse);
        step(&mut w);
        assert!(!w.shops[0].exposed);
        assert_eq!(w.clue_meter, 8); // the meter is not spent
        assert_eq!(w.penalty_stacks, 0);
    }

    #[test]
    fn third_exposure_wins_the_round() {
        let mut w = playing_world();
        let a = add_shop(&mut w, (5, 3), true);
        let b = add_shop(&mut w, (3, 3), true);
        add_shop(&mut w, (2, 1), true);
        w.shops[a].exposed = true;
        w.shops[b].exposed = true;
        w.exposed_bad_count = 2;
        w.clue_meter = 8;
        w.push_command(Command::Accuse);
        let events = step(&mut w);
        assert_eq!(w.exposed_bad_count, 3);
        assert_eq!(w.phase, Phase::RoundWin);
        assert!(has(&events, |e| matches!(e, GameEvent::RoundWon { .. })));

        // The win countdown rolls into the next round's intro.
        for _ in 0..w.rules.win_ticks {
            step(&mut w);
        }
        assert_eq!(w.phase, Phase::RoundIntro);
        assert_eq!(w.round_index, 2);
        assert_eq!(w.shops.iter().filter(|s| s.is_bad).count(), 3);
        assert!(w.shops.iter().all(|s| !s.exposed));
    }

    #[test]
    fn clue_is_consumed_once_and_meter_clamps() {
        let mut w = playing_world();
        w.clues.insert((1, 1)); // under the (halted) player
        let events = step(&mut w);
        assert_eq!(w.clue_meter, 1);
        assert!(!w.clues.contains(&(1, 1)));
        assert!(has(&events, |e| matches!(e, GameEvent::CluePicked { .. })));

        // Still standing on the same tile: nothing left to consume.
        let events = step(&mut w);
        assert_eq!(w.clue_meter, 1);
        assert!(!has(&events, |e| matches!(e, GameEvent::CluePicked { .. })));

        // A pickup at a full meter does not push past the target.
        w.clue_meter = w.clue_target;
        w.clues.insert((1, 1));
        step(&mut w);
        assert_eq!(w.clue_meter, w.clue_target);
    }

    #[test]
    fn hit_teleports_player_and_zeroes_the_meter() {
        let mut w = playing_world();
        place_player(&mut w, (3, 3));
        let (ex, ey) = tile_center((3, 3));
        w.enemies.push(Enemy::new((3, 3), 1.6));
        w.enemies[0].x = ex;
        w.enemies[0].y = ey;
        w.clue_meter = 5;
        let events = step(&mut w);
        assert_eq!(w.player.tile(), w.grid.player_spawn);
        assert_eq!(w.clue_meter, 0);
        assert_eq!(w.hit_cooldown, w.rules.hit_cooldown_ticks);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, GameEvent::PlayerCaught))
                .count(),
            1
        );
    }

    #[test]
    fn halve_penalty_keeps_half_the_meter() {
        let mut w = playing_world();
        w.rules.hit_penalty = HitPenalty::Halve;
        w.clue_meter = 7;
        place_player(&mut w, (3, 3));
        w.clues.remove(&(3, 3));
        w.enemies.push(Enemy::new((3, 3), 1.6));
        step(&mut w);
        assert_eq!(w.clue_meter, 3);
    }

    #[test]
    fn stacked_enemies_penalize_once() {
        let mut w = playing_world();
        place_player(&mut w, (3, 3));
        w.enemies.push(Enemy::new((3, 3), 1.6));
        w.enemies.push(Enemy::new((3, 3), 1.6));
        w.clue_meter = 5;
        let events = step(&mut w);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, GameEvent::PlayerCaught))
                .count(),
            1
        );
        assert_eq!(w.clue_meter, 0);
    }

    #[test]
    fn cooldown_grants_invulnerability_frames() {
        let mut w = playing_world();
        place_player(&mut w, (3, 3));
        w.enemies.push(Enemy::new((3, 3), 1.6));
        step(&mut w); // first hit
        assert_eq!(w.hit_cooldown, w.rules.hit_cooldown_ticks);

        // Park an enemy on the spawn: the cooldown absorbs the contact,
        // and a pickup under the player still lands unharmed.
        let (sx, sy) = tile_center(w.grid.player_spawn);
        w.enemies[0].x = sx;
        w.enemies[0].y = sy;
        w.clue_meter = 4;
        w.clues.insert(w.grid.player_spawn);
        let events = step(&mut w);
        assert!(!has(&events, |e| matches!(e, GameEvent::PlayerCaught)));
        assert_eq!(w.clue_meter, 5);
        assert_eq!(w.hit_cooldown, w.rules.hit_cooldown_ticks - 1);
    }

    #[test]
    fn freeze_window_stops_enemies_but_not_the_player() {
        let mut w = playing_world();
        w.freeze_timer = 10;
        w.enemies.push(Enemy::new((5, 3), 1.6));
        let (ex, ey) = (w.enemies[0].x, w.enemies[0].y);
        w.player.dir = Dir::Right;
        w.player.next_dir = Dir::Right;
        let px = w.player.x;
        step(&mut w);
        assert_eq!((w.enemies[0].x, w.enemies[0].y), (ex, ey));
        assert!(w.player.x > px);
        assert_eq!(w.freeze_timer, 9);
    }

    #[test]
    fn round_is_lost_when_the_evidence_cannot_cover_remaining_fronts() {
        // exposed=1, target=8, meter=2, 10 pickups left:
        // required 8*2=16 > 2+10=12.
        let mut w = playing_world();
        w.exposed_bad_count = 1;
        w.clue_meter = 2;
        w.clues.clear();
        let open = w.grid.open_tiles();
        for t in open.iter().filter(|&&t| t != (1, 1)).take(10) {
            w.clues.insert(*t);
        }
        assert_eq!(w.clues.len(), 10);
        let events = step(&mut w);
        assert_eq!(w.phase, Phase::RoundLose);
        assert!(has(&events, |e| matches!(e, GameEvent::RoundLost)));
    }

    #[test]
    fn solvent_board_does_not_lose() {
        let mut w = playing_world();
        w.exposed_bad_count = 2;
        w.clue_meter = 8;
        w.clues.clear();
        step(&mut w);
        assert_eq!(w.phase, Phase::Playing); // 8 + 0 >= 8 * 1
    }

    #[test]
    fn commands_outside_playing_are_dropped() {
        let mut w = playing_world();
        w.phase = Phase::RoundIntro;
        w.phase_timer = 5;
        add_shop(&mut w, (2, 1), true);
        w.clue_meter = 8;
        w.push_command(Command::SetDirection(Dir::Down));
        w.push_command(Command::Accuse);
        step(&mut w);
        assert_eq!(w.player.next_dir, Dir::Left); // spawn default
        assert!(!w.shops[0].exposed);
        assert_eq!(w.clue_meter, 8);
        assert_eq!(w.phase_timer, 4);
    }

    #[test]
    fn intro_countdown_elapses_into_play() {
        let mut w = playing_world();
        w.phase = Phase::RoundIntro;
        w.phase_timer = 2;
        step(&mut w);
        assert_eq!(w.phase, Phase::RoundIntro);
        step(&mut w);
        assert_eq!(w.phase, Phase::Playing);
    }

    #[test]
    fn begin_round_skips_the_intro() {
        let mut w = playing_world();
        w.phase = Phase::RoundIntro;
        w.phase_timer = 96;
        w.push_command(Command::BeginRound);
        step(&mut w);
        assert_eq!(w.phase, Phase::Playing);
    }

    #[test]
    fn title_confirm_starts_a_fresh_round_one() {
        let grid = Grid::parse(&ARENA).unwrap();
        let mut w = WorldState::new(
            grid,
            SpeedConfig::default(),
            RuleConfig::default(),
            ChaCha8Rng::seed_from_u64(3),
        );
        w.round_index = 9; // stale from an abandoned run
        w.push_command(Command::BeginRound);
        let events = step(&mut w);
        assert_eq!(w.phase, Phase::RoundIntro);
        assert_eq!(w.round_index, 1);
        assert_eq!(w.shops.iter().filter(|s| s.is_bad).count(), 3);
        assert!(has(&events, |e| matches!(e, GameEvent::RoundStarted { round: 1 })));
    }

    #[test]
    fn restart_after_loss_returns_to_round_one() {
        let mut w = playing_world();
        w.phase = Phase::RoundLose;
        w.round_index = 4;
        w.penalty_stacks = 3;
        w.push_command(Command::Restart);
        step(&mut w);
        assert_eq!(w.phase, Phase::RoundIntro);
        assert_eq!(w.round_index, 1);
        assert_eq!(w.penalty_stacks, 0);
    }

    #[test]
    fn enemies_sampled_at_centers_stay_on_open_tiles() {
        let mut w = playing_world();
        w.enemies.push(Enemy::new((7, 5), 1.6));
        w.enemies.push(Enemy::new((5, 3), 2.0));
        w.penalty_stacks = 3; // heat-accelerated, still under a tile per tick
        for _ in 0..600 {
            step(&mut w);
            if w.phase != Phase::Playing {
                break;
            }
            let nav = NavView { grid: &w.grid, blocks: &w.shop_blocks };
            for e in &w.enemies {
                if motion::near_center(e.x, e.y) {
                    let t = e.tile();
                    assert!(!nav.is_blocked(t.0, t.1), "enemy centered on {:?}", t);
                }
            }
        }
    }
}
