/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;

// ── Public Config Structs ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub speed: SpeedConfig,
    pub rules: RuleConfig,
    pub gamepad: GamepadConfig,
    /// 0 = seed the RNG from OS entropy.
    pub seed: u64,
    /// Custom ASCII layout file; `None` = embedded city map.
    pub map_file: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct SpeedConfig {
    pub tick_rate_ms: u64,
    /// Sub-tile units per tick (48 units per tile).
    pub player_speed: f32,
    pub enemy_base_speed: f32,
    /// Added to the enemy base speed once per round index.
    pub enemy_round_speed: f32,
}

/// What an enemy hit does to the clue meter.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HitPenalty {
    Zero,
    Halve,
}

#[derive(Clone, Debug)]
pub struct RuleConfig {
    /// Accusation reach, in tiles (Euclidean on tile coordinates).
    pub accuse_radius: f32,
    /// Player-enemy contact distance, in tiles.
    pub hit_radius: f32,
    pub hit_penalty: HitPenalty,
    pub clue_target_base: u32,
    pub clue_target_step: u32,
    /// Fraction of eligible tiles that receive a clue pickup.
    pub clue_ratio: f32,
    /// Round-1 shop count; grows by one per round up to the slot count.
    pub shop_base: u32,
    pub freeze_ticks: u32,
    pub hit_cooldown_ticks: u32,
    pub intro_ticks: u32,
    pub win_ticks: u32,
    pub message_ticks: u32,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub accuse: Vec<String>,
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub restart: Vec<String>,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        SpeedConfig {
            tick_rate_ms: default_tick_rate(),
            player_speed: default_player_speed(),
            enemy_base_speed: default_enemy_base_speed(),
            enemy_round_speed: default_enemy_round_speed(),
        }
    }
}

impl Default for RuleConfig {
    fn default() -> Self {
        RuleConfig {
            accuse_radius: default_accuse_radius(),
            hit_radius: default_hit_radius(),
            hit_penalty: HitPenalty::Zero,
            clue_target_base: default_clue_target_base(),
            clue_target_step: default_clue_target_step(),
            clue_ratio: default_clue_ratio(),
            shop_base: default_shop_base(),
            freeze_ticks: default_freeze_ticks(),
            hit_cooldown_ticks: default_hit_cooldown_ticks(),
            intro_ticks: default_intro_ticks(),
            win_ticks: default_win_ticks(),
            message_ticks: default_message_ticks(),
        }
    }
}

impl Default for GamepadConfig {
    fn default() -> Self {
        GamepadConfig {
            accuse: default_accuse_buttons(),
            confirm: default_confirm(),
            cancel: default_cancel(),
            restart: default_restart(),
        }
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    speed: TomlSpeed,
    #[serde(default)]
    rules: TomlRules,
    #[serde(default)]
    gamepad: TomlGamepad,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default)]
    seed: u64,
    #[serde(default)]
    map: String,
}

#[derive(Deserialize, Debug)]
struct TomlSpeed {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_player_speed")]
    player_speed: f32,
    #[serde(default = "default_enemy_base_speed")]
    enemy_base_speed: f32,
    #[serde(default = "default_enemy_round_speed")]
    enemy_round_speed: f32,
}

#[derive(Deserialize, Debug)]
struct TomlRules {
    #[serde(default = "default_accuse_radius")]
    accuse_radius: f32,
    #[serde(default = "default_hit_radius")]
    hit_radius: f32,
    #[serde(default = "default_hit_penalty")]
    hit_penalty: HitPenalty,
    #[serde(default = "default_clue_target_base")]
    clue_target_base: u32,
    #[serde(default = "default_clue_target_step")]
    clue_target_step: u32,
    #[serde(default = "default_clue_ratio")]
    clue_ratio: f32,
    #[serde(default = "default_shop_base")]
    shop_base: u32,
    #[serde(default = "default_freeze_ticks")]
    freeze_ticks: u32,
    #[serde(default = "default_hit_cooldown_ticks")]
    hit_cooldown_ticks: u32,
    #[serde(default = "default_intro_ticks")]
    intro_ticks: u32,
    #[serde(default = "default_win_ticks")]
    win_ticks: u32,
    #[serde(default = "default_message_ticks")]
    message_ticks: u32,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_accuse_buttons")]
    accuse: Vec<String>,
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
    #[serde(default = "default_restart")]
    restart: Vec<String>,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 16 }
fn default_player_speed() -> f32 { 2.0 }
fn default_enemy_base_speed() -> f32 { 1.6 }
fn default_enemy_round_speed() -> f32 { 0.1 }

fn default_accuse_radius() -> f32 { 2.0 }
fn default_hit_radius() -> f32 { 0.45 }
fn default_hit_penalty() -> HitPenalty { HitPenalty::Zero }
fn default_clue_target_base() -> u32 { 20 }
fn default_clue_target_step() -> u32 { 5 }
fn default_clue_ratio() -> f32 { 1.0 }
fn default_shop_base() -> u32 { 8 }
fn default_freeze_ticks() -> u32 { 60 }
fn default_hit_cooldown_ticks() -> u32 { 60 }
fn default_intro_ticks() -> u32 { 96 }
fn default_win_ticks() -> u32 { 96 }
fn default_message_ticks() -> u32 { 90 }

fn default_accuse_buttons() -> Vec<String> { vec!["A".into(), "X".into(), "R1".into()] }
fn default_confirm() -> Vec<String> { vec!["Start".into()] }
fn default_cancel() -> Vec<String> { vec!["Select".into()] }
fn default_restart() -> Vec<String> { vec!["Start".into()] }

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral { seed: 0, map: String::new() }
    }
}

impl Default for TomlSpeed {
    fn default() -> Self {
        TomlSpeed {
            tick_rate_ms: default_tick_rate(),
            player_speed: default_player_speed(),
            enemy_base_speed: default_enemy_base_speed(),
            enemy_round_speed: default_enemy_round_speed(),
        }
    }
}

impl Default for TomlRules {
    fn default() -> Self {
        TomlRules {
            accuse_radius: default_accuse_radius(),
            hit_radius: default_hit_radius(),
            hit_penalty: default_hit_penalty(),
            clue_target_base: default_clue_target_base(),
            clue_target_step: default_clue_target_step(),
            clue_ratio: default_clue_ratio(),
            shop_base: default_shop_base(),
            freeze_ticks: default_freeze_ticks(),
            hit_cooldown_ticks: default_hit_cooldown_ticks(),
            intro_ticks: default_intro_ticks(),
            win_ticks: default_win_ticks(),
            message_ticks: default_message_ticks(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            accuse: default_accuse_buttons(),
            confirm: default_confirm(),
            cancel: default_cancel(),
            restart: default_restart(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        Self::from_toml(toml_cfg, &search_dirs)
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        // Resolve the custom map path against the search dirs.
        let map_file = if toml_cfg.general.map.is_empty() {
            None
        } else {
            let raw = PathBuf::from(&toml_cfg.general.map);
            if raw.is_absolute() {
                Some(raw)
            } else {
                Some(
                    search_dirs
                        .iter()
                        .map(|d| d.join(&toml_cfg.general.map))
                        .find(|p| p.is_file())
                        .unwrap_or(raw),
                )
            }
        };

        GameConfig {
            speed: SpeedConfig {
                tick_rate_ms: toml_cfg.speed.tick_rate_ms,
                player_speed: toml_cfg.speed.player_speed,
                enemy_base_speed: toml_cfg.speed.enemy_base_speed,
                enemy_round_speed: toml_cfg.speed.enemy_round_speed,
            },
            rules: RuleConfig {
                accuse_radius: toml_cfg.rules.accuse_radius,
                hit_radius: toml_cfg.rules.hit_radius,
                hit_penalty: toml_cfg.rules.hit_penalty,
                clue_target_base: toml_cfg.rules.clue_target_base,
                clue_target_step: toml_cfg.rules.clue_target_step,
                clue_ratio: toml_cfg.rules.clue_ratio,
                shop_base: toml_cfg.rules.shop_base,
                freeze_ticks: toml_cfg.rules.freeze_ticks,
                hit_cooldown_ticks: toml_cfg.rules.hit_cooldown_ticks,
                intro_ticks: toml_cfg.rules.intro_ticks,
                win_ticks: toml_cfg.rules.win_ticks,
                message_ticks: toml_cfg.rules.message_ticks,
            },
            gamepad: GamepadConfig {
                accuse: toml_cfg.gamepad.accuse,
                confirm: toml_cfg.gamepad.confirm,
                cancel: toml_cfg.gamepad.cancel,
                restart: toml_cfg.gamepad.restart,
            },
            seed: toml_cfg.general.seed,
            map_file,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            speed: SpeedConfig::default(),
            rules: RuleConfig::default(),
            gamepad: GamepadConfig::default(),
            seed: 0,
            map_file: None,
        }
    }
}

/// Candidate directories to search: exe dir + CWD + system paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable (resolve symlinks)
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/papertrail)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/papertrail");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory (/usr/share/papertrail)
    let sys = PathBuf::from("/usr/share/papertrail");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    // 5. Fallback
    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        eprintln!("Warning: config.toml parse error: {e}");
                        eprintln!("Using default settings.");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    eprintln!("Warning: could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg: TomlConfig = toml::from_str("").unwrap();
        let game = GameConfig::from_toml(cfg, &[]);
        assert_eq!(game.speed.tick_rate_ms, 16);
        assert_eq!(game.rules.clue_target_base, 20);
        assert_eq!(game.rules.hit_penalty, HitPenalty::Zero);
        assert!(game.map_file.is_none());
        assert_eq!(game.seed, 0);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let cfg: TomlConfig = toml::from_str(
            r#"
            [general]
            seed = 99

            [rules]
            accuse_radius = 1.0
            hit_penalty = "halve"
            "#,
        )
        .unwrap();
        let game = GameConfig::from_toml(cfg, &[]);
        assert_eq!(game.seed, 99);
        assert!((game.rules.accuse_radius - 1.0).abs() < f32::EPSILON);
        assert_eq!(game.rules.hit_penalty, HitPenalty::Halve);
        // Untouched keys fall back.
        assert_eq!(game.rules.freeze_ticks, 60);
        assert!((game.speed.player_speed - 2.0).abs() < f32::EPSILON);
    }
}
