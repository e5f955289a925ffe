/// Round generation.
///
/// Each round re-rolls the same static grid: a subset of the shop
/// slots is occupied (three secretly bad), clue pickups scatter over
/// the remaining open tiles, and enemies spawn at shuffled spawn
/// tiles, all counts scaling with the round index. Every random draw
/// goes through the world's shared RNG, so a fixed seed reproduces a
/// full run.
///
/// ## Scaling (round = 1, 2, ...):
///   shops    = clamp(shop_base + round - 1, 3, slot count)
///   bad      = 3
///   enemies  = clamp(2 + (round - 1) / 2, 2, 5)
///   target   = clue_target_base + round * clue_target_step
///   enemy speed = enemy_base_speed + round * enemy_round_speed

use rand::seq::SliceRandom;

use crate::config::GameConfig;
use crate::domain::entity::{Enemy, Player, Shop};
use crate::domain::grid::Grid;
use crate::sim::world::{Phase, WorldState, BAD_SHOPS};

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// (Re)generate the world for `world.round_index` and enter the intro.
pub fn start_round(world: &mut WorldState) {
    world.clue_meter = 0;
    world.exposed_bad_count = 0;
    world.penalty_stacks = 0;
    world.freeze_timer = 0;
    world.hit_cooldown = 0;
    world.tick = 0;

    let round = world.round_index;
    world.clue_target = world.rules.clue_target_base + round * world.rules.clue_target_step;

    place_shops(world, round);
    scatter_clues(world);
    spawn_enemies(world, round);

    world.player = Player::new(world.grid.player_spawn, world.speed.player_speed);

    world.phase = Phase::RoundIntro;
    world.phase_timer = world.rules.intro_ticks;
    world.set_message(&format!("Round {round}"), world.rules.message_ticks);
}

/// Enemies requested for a round. Monotonic, clamped to [2, 5].
pub fn num_enemies(round: u32) -> u32 {
    (2 + (round - 1) / 2).clamp(2, 5)
}

// ══════════════════════════════════════════════════════════════
// Generation passes
// ══════════════════════════════════════════════════════════════

fn place_shops(world: &mut WorldState, round: u32) {
    let mut slots = world.grid.placement_slots();
    slots.shuffle(&mut world.rng);

    let want = ((world.rules.shop_base + round - 1) as usize)
        .max(BAD_SHOPS as usize)
        .min(slots.len());
    slots.truncate(want);

    world.shops = slots.iter().map(|&t| Shop::new(t)).collect();
    world.shop_blocks = slots.into_iter().collect();

    // Bad shops are drawn independently of placement order.
    let mut order: Vec<usize> = (0..world.shops.len()).collect();
    order.shuffle(&mut world.rng);
    for &i in order.iter().take(BAD_SHOPS as usize) {
        world.shops[i].is_bad = true;
    }
}

fn scatter_clues(world: &mut WorldState) {
    let mut eligible: Vec<(i32, i32)> = world
        .grid
        .open_tiles()
        .into_iter()
        .filter(|t| {
            !world.shop_blocks.contains(t)
                && *t != world.grid.player_spawn
                && !world.grid.enemy_spawns.contains(t)
        })
        .collect();

    let ratio = world.rules.clue_ratio.clamp(0.0, 1.0);
    if ratio < 1.0 {
        eligible.shuffle(&mut world.rng);
        eligible.truncate((eligible.len() as f32 * ratio) as usize);
    }

    world.clues = eligible.into_iter().collect();
}

fn spawn_enemies(world: &mut WorldState, round: u32) {
    let mut candidates: Vec<(i32, i32)> = world
        .grid
        .enemy_spawns
        .iter()
        .copied()
        .filter(|t| !world.shop_blocks.contains(t))
        .collect();
    if candidates.is_empty() {
        candidates = world
            .grid
            .open_tiles()
            .into_iter()
            .filter(|t| !world.shop_blocks.contains(t) && *t != world.grid.player_spawn)
            .collect();
    }

    world.enemies.clear();
    if candidates.is_empty() {
        return;
    }
    candidates.shuffle(&mut world.rng);

    let speed = world.speed.enemy_base_speed + round as f32 * world.speed.enemy_round_speed;
    let n = num_enemies(round) as usize;
    for i in 0..n {
        // Fewer spawn tiles than enemies: reuse them cyclically.
        let tile = candidates[i % candidates.len()];
        world.enemies.push(Enemy::new(tile, speed));
    }
}

// ══════════════════════════════════════════════════════════════
// Layout loading
// ══════════════════════════════════════════════════════════════

/// Load the custom layout named in the config, falling back to the
/// embedded city on any read or parse failure.
pub fn load_layout(config: &GameConfig) -> Grid {
    if let Some(path) = &config.map_file {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let rows: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
                match Grid::parse(&rows) {
                    Ok(grid) => return grid,
                    Err(e) => eprintln!("Warning: invalid layout {}: {e}", path.display()),
                }
            }
            Err(e) => eprintln!("Warning: could not read {}: {e}", path.display()),
        }
        eprintln!("Falling back to the embedded city map.");
    }
    embedded_city()
}

pub fn embedded_city() -> Grid {
    Grid::parse(&EMBEDDED_CITY).expect("embedded city map is valid")
}

/// The city: one screen, wall border, central park with a subway
/// entrance, ten storefront slots, four patrol spawns.
const EMBEDDED_CITY: [&str; 27] = [
    "#####################",
    "#P..................#",
    "#.####.GGG.S####S##.#",
    "#.##S#.GGG.########.#",
    "#......GGG..........#",
    "#.####.GGG.########.#",
    "#.####.GGG..#######.#",
    "#.E....GGG...######.#",
    "#.####.GGG.G..#####.#",
    "#.####.GGG.G!..####.#",
    "#......GGGEGGG..###.#",
    "#.###S.GGG.GGGG..##.#",
    "#..........GGGGG..#.#",
    "#.########.GGGGGG...#",
    "#.########.GGGUUGGG.#",
    "#.########..........#",
    "#..........#S######.#",
    "#.##S#S###.########.#",
    "#.#######S....E.....#",
    "#.########.########.#",
    "#.########.S#######.#",
    "#.########..........#",
    "#..........########.#",
    "#.########.####S###.#",
    "#.########..........#",
    "#....E.....##########",
    "#####################",
];
