/// Entry point and frame driver.
///
/// A wall-clock accumulator converts elapsed time into fixed
/// simulation ticks: every frame we run as many ticks as the
/// accumulator affords (never fewer than zero), then render once.
/// Fast-forward multiplies the accumulated time, not the tick length,
/// so the simulation stays deterministic at any speed.

mod config;
mod domain;
mod sim;
mod ui;

use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use config::GameConfig;
use domain::entity::Dir;
use sim::command::Command;
use sim::event::GameEvent;
use sim::level;
use sim::step;
use sim::world::{Phase, WorldState};
use ui::gamepad::GamepadState;
use ui::input::InputState;
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(5);
/// Accumulator multiplier while fast-forward is toggled on.
const FAST_FORWARD: u32 = 4;

fn main() {
    let config = GameConfig::load();

    let rng = if config.seed != 0 {
        ChaCha8Rng::seed_from_u64(config.seed)
    } else {
        ChaCha8Rng::from_entropy()
    };
    let grid = level::load_layout(&config);
    let mut world = WorldState::new(grid, config.speed.clone(), config.rules.clone(), rng);

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();

    let result = game_loop(&mut world, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Paper Trail!");
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);

    let tick_rate = Duration::from_millis(config.speed.tick_rate_ms.max(1));
    let mut accumulator = Duration::ZERO;
    let mut last = Instant::now();
    let mut fast_forward = false;

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }
        if handle_meta(world, &kb, &gp, &mut fast_forward) {
            break;
        }
        queue_commands(world, &kb, &gp);

        let now = Instant::now();
        let mut elapsed = now.duration_since(last);
        last = now;
        if fast_forward {
            elapsed *= FAST_FORWARD;
        }

        if world.paused {
            accumulator = Duration::ZERO;
        } else {
            accumulator += elapsed;
            while accumulator >= tick_rate {
                accumulator -= tick_rate;
                let events = step::step(world);
                process_sound_events(sound, &events);
            }
        }

        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

// ── Key constants ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_ACCUSE: &[KeyCode] = &[KeyCode::Char(' ')];
const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];
const KEYS_PAUSE: &[KeyCode] = &[KeyCode::F(1), KeyCode::Char('p'), KeyCode::Char('P')];

/// Translate raw input into simulation commands for the current phase.
fn queue_commands(world: &mut WorldState, kb: &InputState, gp: &GamepadState) {
    match world.phase {
        Phase::Playing => {
            if world.paused {
                return;
            }
            if let Some(dir) = held_direction(kb, gp) {
                world.push_command(Command::SetDirection(dir));
            }
            if kb.any_pressed(KEYS_ACCUSE) || gp.accuse_pressed() {
                world.push_command(Command::Accuse);
            }
        }
        Phase::Title | Phase::RoundIntro => {
            if kb.any_pressed(KEYS_CONFIRM) || gp.confirm_pressed() {
                world.push_command(Command::BeginRound);
            }
        }
        Phase::RoundLose => {
            if kb.any_pressed(KEYS_CONFIRM) || gp.restart_pressed() {
                world.push_command(Command::Restart);
            }
        }
        Phase::RoundWin => {}
    }
}

fn held_direction(kb: &InputState, gp: &GamepadState) -> Option<Dir> {
    if kb.any_held(KEYS_UP) || gp.up_held() {
        Some(Dir::Up)
    } else if kb.any_held(KEYS_DOWN) || gp.down_held() {
        Some(Dir::Down)
    } else if kb.any_held(KEYS_LEFT) || gp.left_held() {
        Some(Dir::Left)
    } else if kb.any_held(KEYS_RIGHT) || gp.right_held() {
        Some(Dir::Right)
    } else {
        None
    }
}

/// Keys that live outside the simulation: quit, pause, fast-forward,
/// abandoning a run. Returns true to exit the game loop.
fn handle_meta(
    world: &mut WorldState,
    kb: &InputState,
    gp: &GamepadState,
    fast_forward: &mut bool,
) -> bool {
    let esc = kb.any_pressed(&[KeyCode::Esc]) || gp.cancel_pressed();

    if world.phase == Phase::Title {
        if esc || kb.any_pressed(&[KeyCode::Char('q'), KeyCode::Char('Q')]) {
            return true;
        }
    } else if esc {
        return_to_title(world);
        return false;
    }

    if kb.any_pressed(&[KeyCode::Char('f'), KeyCode::Char('F')]) {
        *fast_forward = !*fast_forward;
    }

    if world.phase == Phase::Playing && kb.any_pressed(KEYS_PAUSE) {
        world.paused = !world.paused;
        if world.paused {
            world.set_message("PAUSED  [P] Resume", 0);
        } else {
            world.message.clear();
            world.message_timer = 0;
        }
    }

    false
}

/// Abandon the current run. The next new game resets to round 1.
fn return_to_title(world: &mut WorldState) {
    world.phase = Phase::Title;
    world.paused = false;
    world.message.clear();
    world.message_timer = 0;
    world.commands.clear();
}

fn process_sound_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let sfx = match sound {
        Some(s) => s,
        None => return,
    };
    for event in events {
        match event {
            GameEvent::CluePicked { .. } => sfx.play_clue(),
            GameEvent::ShopExposed { .. } => sfx.play_expose(),
            GameEvent::AccusationRejected | GameEvent::AccusedInnocent { .. } => sfx.play_reject(),
            GameEvent::PlayerCaught => sfx.play_caught(),
            GameEvent::RoundWon { .. } => sfx.play_win(),
            GameEvent::RoundLost => sfx.play_lose(),
            GameEvent::RoundStarted { .. } => sfx.play_round(),
        }
    }
}
