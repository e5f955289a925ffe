/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` (an array of Cell)
///   2. Compare each cell with `back` (the previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// This eliminates flicker caused by full-screen redraws. The whole
/// maze fits on one screen, so there is no scrolling viewport; each
/// maze tile occupies two terminal columns.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::tile::Tile;
use crate::sim::world::{Phase, WorldState, BAD_SHOPS};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells. Using
    /// the same RGB for `Clear` and every cell keeps VTE-based
    /// terminals from showing lighter inter-row gap lines.
    const BASE_BG: Color = Color::Rgb { r: 18, g: 18, b: 28 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel used to invalidate the back buffer: differs from any
    /// real cell, so every position gets re-emitted.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        // Every cell carries an explicit background, never the
        // terminal default.
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y). Each char occupies one column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        let mut cx = x;
        for ch in s.chars() {
            if cx >= self.width {
                break;
            }
            self.set(cx, y, Cell::new(ch, fg, bg));
            cx += 1;
        }
    }

    /// Fill a whole row with a background color.
    fn fill_row(&mut self, y: usize, fg: Color, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', fg, bg));
        }
    }
}

// ── Renderer ──

/// Each maze tile = 2 terminal columns.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

// Palette
const HUD_BG: Color = Color::Rgb { r: 25, g: 25, b: 55 };
const MSG_FG: Color = Color::Black;
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };
const ROAD_BG: Color = Color::Rgb { r: 32, g: 34, b: 42 };
const GOLD: Color = Color::Rgb { r: 255, g: 210, b: 70 };
const GREEN: Color = Color::Rgb { r: 90, g: 230, b: 110 };
const RED: Color = Color::Rgb { r: 235, g: 85, b: 75 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    /// Frame counter driving blink effects; independent of the
    /// simulation tick so prompts keep blinking while paused.
    frame: u32,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            frame: 0,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, world: &WorldState) -> io::Result<()> {
        self.frame = self.frame.wrapping_add(1);

        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Phase change → full repaint for a clean transition
        let phase_changed = self.last_phase != Some(world.phase);
        if phase_changed {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        self.front.clear();

        match world.phase {
            Phase::Title => self.compose_title(world),
            Phase::RoundIntro => {
                self.compose_game(world);
                self.compose_intro_overlay(world);
            }
            Phase::Playing => self.compose_game(world),
            Phase::RoundWin => {
                self.compose_game(world);
                self.compose_win_overlay(world);
            }
            Phase::RoundLose => {
                self.compose_game(world);
                self.compose_lose_overlay();
            }
        }

        if world.paused {
            self.compose_pause_overlay();
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);

        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors at frame start; ResetColor would fall
        // back to the terminal default and reintroduce gap artifacts.
        queue!(
            self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Game view ──

    fn compose_game(&mut self, w: &WorldState) {
        self.compose_hud(w);

        for y in 0..w.grid.height {
            let row = MAP_ROW + y as usize;
            if row >= self.front.height {
                break;
            }
            for x in 0..w.grid.width {
                let col = x as usize * CELL_W;
                if col + 1 >= self.front.width {
                    break;
                }
                self.compose_tile(w, x, y, col, row);
            }
        }

        // Enemies and player on top of the tiles, at their containing cell.
        let frozen = w.freeze_timer > 0;
        let enemy_fg = if frozen {
            Color::Rgb { r: 110, g: 190, b: 230 }
        } else {
            RED
        };
        for e in &w.enemies {
            let (ex, ey) = e.tile();
            let col = ex as usize * CELL_W;
            let row = MAP_ROW + ey as usize;
            self.front.set(col, row, Cell::new('◆', enemy_fg, ROAD_BG));
        }

        let (px, py) = w.player.tile();
        let col = px as usize * CELL_W;
        let row = MAP_ROW + py as usize;
        self.front.set(col, row, Cell::new('◉', GOLD, ROAD_BG));

        self.compose_message_bar(w);

        // Help bar
        let help_row = MAP_ROW + w.grid.height as usize + 3;
        if help_row < self.front.height {
            let help = " ←→↑↓/WASD Move   SPACE Accuse   F FastFwd   P Pause   ESC Title";
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }

    fn compose_hud(&mut self, w: &WorldState) {
        self.front.fill_row(HUD_ROW, Color::White, HUD_BG);

        // Evidence meter: ten segments.
        let segs = if w.clue_target == 0 {
            0
        } else {
            (w.clue_meter * 10 / w.clue_target).min(10) as usize
        };
        let mut bar = String::with_capacity(10);
        for i in 0..10 {
            bar.push(if i < segs { '█' } else { '░' });
        }

        let hud = format!(
            " Round {:<2} Evidence {} {:>2}/{:<2} Exposed {}/{} Heat x{:.1} ",
            w.round_index,
            bar,
            w.clue_meter,
            w.clue_target,
            w.exposed_bad_count,
            BAD_SHOPS,
            w.heat_multiplier(),
        );
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
    }

    fn compose_tile(&mut self, w: &WorldState, x: i32, y: i32, col: usize, row: usize) {
        // Storefronts sit on top of their road tile. The bad flag is
        // never rendered; only the exposed state is visible.
        if let Some(shop) = w.shops.iter().find(|s| s.tile() == (x, y)) {
            let (c0, c1, fg, bg) = if shop.exposed {
                ('╳', '╳', RED, Color::Rgb { r: 55, g: 22, b: 22 })
            } else {
                ('◢', '◣', Color::Rgb { r: 230, g: 170, b: 70 }, Color::Rgb { r: 60, g: 45, b: 20 })
            };
            self.front.set(col, row, Cell::new(c0, fg, bg));
            self.front.set(col + 1, row, Cell::new(c1, fg, bg));
            return;
        }

        let (c0, c1, fg, bg) = match w.grid.tile_at(x, y) {
            Tile::Wall => (
                '▓',
                '▓',
                Color::Rgb { r: 85, g: 90, b: 105 },
                Color::Rgb { r: 45, g: 48, b: 60 },
            ),
            Tile::Road => {
                if w.clues.contains(&(x, y)) {
                    ('•', ' ', GOLD, ROAD_BG)
                } else {
                    (' ', ' ', Color::White, ROAD_BG)
                }
            }
            Tile::Park => (
                '♣',
                ' ',
                Color::Rgb { r: 110, g: 180, b: 90 },
                Color::Rgb { r: 22, g: 48, b: 26 },
            ),
            Tile::Subway => (
                '▼',
                '▼',
                Color::Rgb { r: 90, g: 200, b: 220 },
                Color::Rgb { r: 20, g: 40, b: 52 },
            ),
            Tile::Hazard => (
                '!',
                '!',
                Color::Rgb { r: 245, g: 200, b: 80 },
                Color::Rgb { r: 70, g: 32, b: 22 },
            ),
        };
        self.front.set(col, row, Cell::new(c0, fg, bg));
        self.front.set(col + 1, row, Cell::new(c1, fg, bg));
    }

    fn compose_message_bar(&mut self, w: &WorldState) {
        let msg_row = MAP_ROW + w.grid.height as usize + 1;
        if msg_row >= self.front.height {
            return;
        }
        if !w.message.is_empty() {
            self.front.fill_row(msg_row, MSG_FG, MSG_BG);
            self.front.put_str(0, msg_row, &format!(" ◈ {} ", w.message), MSG_FG, MSG_BG);
            return;
        }
        // Accuse affordance: quiet hint while a storefront is in reach.
        if w.phase == Phase::Playing {
            if w.nearest_shop_in_range().is_some() {
                let hint = if w.clue_meter >= w.clue_target {
                    " ▸ Storefront in reach — SPACE to accuse!"
                } else {
                    " ▸ Storefront in reach — evidence still short."
                };
                let fg = if w.clue_meter >= w.clue_target { GREEN } else { Color::DarkGrey };
                self.front.put_str(0, msg_row, hint, fg, Color::Reset);
            }
        }
    }

    // ── Overlays ──

    /// Centered text box over the map region.
    fn overlay_box(&mut self, lines: &[(String, Color)], bg: Color) {
        let widest = lines.iter().map(|(s, _)| s.chars().count()).max().unwrap_or(0);
        let box_w = widest + 4;
        let box_h = lines.len() + 2;
        let cx = self.front.width.saturating_sub(box_w) / 2;
        let cy = MAP_ROW + 10_usize.saturating_sub(box_h / 2);

        for y in cy..cy + box_h {
            for x in cx..cx + box_w {
                self.front.set(x, y, Cell::new(' ', Color::White, bg));
            }
        }
        for (i, (line, fg)) in lines.iter().enumerate() {
            let lx = cx + (box_w - line.chars().count()) / 2;
            self.front.put_str(lx, cy + 1 + i, line, *fg, bg);
        }
    }

    fn compose_intro_overlay(&mut self, w: &WorldState) {
        let blink = (self.frame / 8) % 2 == 0;
        let prompt = if blink {
            "▸▸▸ ENTER: hit the streets ◂◂◂".to_string()
        } else {
            String::new()
        };
        self.overlay_box(
            &[
                (format!("ROUND {}", w.round_index), GOLD),
                (String::new(), Color::White),
                (format!("Expose the {} laundering fronts.", BAD_SHOPS), Color::White),
                ("Collect evidence. Avoid the patrols.".to_string(), Color::White),
                (String::new(), Color::White),
                (prompt, GREEN),
            ],
            Color::Rgb { r: 25, g: 30, b: 55 },
        );
    }

    fn compose_win_overlay(&mut self, w: &WorldState) {
        self.overlay_box(
            &[
                ("★ ALL FRONTS EXPOSED ★".to_string(), GOLD),
                (String::new(), Color::White),
                (format!("Round {} cleared.", w.round_index), Color::White),
                ("The city gets meaner...".to_string(), Color::DarkGrey),
            ],
            Color::Rgb { r: 20, g: 55, b: 25 },
        );
    }

    fn compose_lose_overlay(&mut self) {
        self.overlay_box(
            &[
                ("✕ THE TRAIL WENT COLD ✕".to_string(), RED),
                (String::new(), Color::White),
                ("Not enough evidence left in the city.".to_string(), Color::White),
                (String::new(), Color::White),
                ("ENTER: Retry from Round 1   ESC: Title".to_string(), GREEN),
            ],
            Color::Rgb { r: 55, g: 22, b: 22 },
        );
    }

    fn compose_pause_overlay(&mut self) {
        let blink = (self.frame / 10) % 2 == 0;
        let label = if blink { "▶  PAUSED  ◀" } else { "   PAUSED   " };
        self.overlay_box(
            &[
                (label.to_string(), GOLD),
                ("P: Resume    ESC: Title".to_string(), Color::White),
            ],
            Color::Rgb { r: 40, g: 40, b: 40 },
        );
    }

    // ── Title screen ──

    fn compose_title(&mut self, w: &WorldState) {
        let title = [
            r"  ___                         _____  ___    _    ___  _",
            r" | _ \ __ _  _ __  ___  _ _  |_   _|| _ \  /_\  |_ _|| |",
            r" |  _// _` || '_ \/ -_)| '_|   | |  |   / / _ \  | | | |__",
            r" |_|  \__,_|| .__/\___||_|     |_|  |_|_\/_/ \_\|___||____|",
            r"            |_|",
        ];
        for (i, line) in title.iter().enumerate() {
            self.front.put_str(2, 2 + i, line, GOLD, Color::Reset);
        }

        let subtitle = "◈◈  Follow the Money  ◈◈";
        self.front.put_str(18, 8, subtitle, GREEN, Color::Reset);
        let tagline = "━━━ Terminal Edition (Rust) ━━━";
        self.front.put_str(15, 10, tagline, Color::Rgb { r: 180, g: 140, b: 50 }, Color::Reset);

        let menu_base = 13;
        self.front.put_str(8, menu_base, "ENTER   New Investigation", GREEN, Color::Reset);
        self.front.put_str(8, menu_base + 1, "  Q     Quit", Color::White, Color::Reset);

        let help = [
            "Controls",
            "  ←→↑↓ / WASD   Move",
            "  SPACE          Accuse the nearest storefront",
            "  F              Fast-forward    P  Pause",
            "  ESC            Back to title",
            "",
            "Three of the city's storefronts launder money.",
            "Fill the evidence meter, get close, and call them out.",
            "Wrong calls raise the heat, and the patrols get faster.",
        ];
        let help_base = menu_base + 3;
        for (i, line) in help.iter().enumerate() {
            let color = if i == 0 { GOLD } else { Color::White };
            self.front.put_str(8, help_base + i, line, color, Color::Reset);
        }

        if !w.message.is_empty() {
            let msg_row = self.front.height.saturating_sub(1);
            self.front.fill_row(msg_row, MSG_FG, MSG_BG);
            self.front.put_str(0, msg_row, &format!(" ◈ {} ", w.message), MSG_FG, MSG_BG);
        }
    }
}
