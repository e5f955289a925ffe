/// Static maze model, parsed once from an ASCII layout.
///
/// ## Tile legend:
///   '#' = Wall                   '.' = Road (walkable)
///   'G' = Park (decor)           'U' = Subway entrance (decor)
///   '!' = Hazard (decor)         'S' = Shop slot (road, pre-designated)
///   'P' = Player spawn (road)    'E' = Enemy spawn (road)
///
/// The tile array never changes after parse. Per-round occupancy
/// (shops placed on slots) is layered on top via `NavView`, so the
/// same grid serves every round.

use std::collections::HashSet;

use thiserror::Error;

use super::tile::{CellClass, Tile};

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("layout is empty")]
    Empty,
    #[error("row {0} has length {1}, expected {2}")]
    RaggedRow(usize, usize, usize),
    #[error("border tile ({0}, {1}) is not a wall")]
    OpenBorder(i32, i32),
    #[error("layout has no walkable tiles")]
    NoOpenTiles,
}

pub struct Grid {
    tiles: Vec<Vec<Tile>>,
    pub width: i32,
    pub height: i32,
    pub shop_slots: Vec<(i32, i32)>,
    pub player_spawn: (i32, i32),
    pub enemy_spawns: Vec<(i32, i32)>,
}

impl Grid {
    /// Parse an ASCII layout. Rows must be rectangular with a full wall
    /// border; unknown characters read as road.
    pub fn parse(rows: &[&str]) -> Result<Grid, LayoutError> {
        if rows.is_empty() {
            return Err(LayoutError::Empty);
        }
        let width = rows[0].chars().count();
        let height = rows.len();

        let mut tiles = vec![vec![Tile::Wall; width]; height];
        let mut shop_slots = Vec::new();
        let mut enemy_spawns = Vec::new();
        let mut player_spawn = None;

        for (y, row) in rows.iter().enumerate() {
            let count = row.chars().count();
            if count != width {
                return Err(LayoutError::RaggedRow(y, count, width));
            }
            for (x, ch) in row.chars().enumerate() {
                tiles[y][x] = match ch {
                    '#' => Tile::Wall,
                    'G' => Tile::Park,
                    'U' => Tile::Subway,
                    '!' => Tile::Hazard,
                    _ => Tile::Road,
                };
                let pos = (x as i32, y as i32);
                match ch {
                    'S' => shop_slots.push(pos),
                    'P' => player_spawn = Some(pos),
                    'E' => enemy_spawns.push(pos),
                    _ => {}
                }
            }
        }

        let grid = Grid {
            tiles,
            width: width as i32,
            height: height as i32,
            shop_slots,
            player_spawn: (0, 0),
            enemy_spawns,
        };

        for x in 0..grid.width {
            for y in [0, grid.height - 1] {
                if grid.tile_at(x, y) != Tile::Wall {
                    return Err(LayoutError::OpenBorder(x, y));
                }
            }
        }
        for y in 0..grid.height {
            for x in [0, grid.width - 1] {
                if grid.tile_at(x, y) != Tile::Wall {
                    return Err(LayoutError::OpenBorder(x, y));
                }
            }
        }

        let spawn = match player_spawn {
            Some(p) => p,
            None => grid.first_open_tile().ok_or(LayoutError::NoOpenTiles)?,
        };

        Ok(Grid { player_spawn: spawn, ..grid })
    }

    /// Tile at (x, y). Out of bounds reads as wall.
    #[inline]
    pub fn tile_at(&self, x: i32, y: i32) -> Tile {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return Tile::Wall;
        }
        self.tiles[y as usize][x as usize]
    }

    #[inline]
    pub fn classify(&self, x: i32, y: i32) -> CellClass {
        self.tile_at(x, y).classify()
    }

    /// Is (x, y) a walkable tile? Out of bounds is never walkable.
    #[inline]
    pub fn is_open(&self, x: i32, y: i32) -> bool {
        self.tile_at(x, y).is_open()
    }

    fn first_open_tile(&self) -> Option<(i32, i32)> {
        for y in 0..self.height {
            for x in 0..self.width {
                if self.is_open(x, y) {
                    return Some((x, y));
                }
            }
        }
        None
    }

    /// All walkable tiles, in row-major order.
    pub fn open_tiles(&self) -> Vec<(i32, i32)> {
        let mut out = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                if self.is_open(x, y) {
                    out.push((x, y));
                }
            }
        }
        out
    }

    /// Shop placement candidates. Pre-designated slots win if the layout
    /// has any; otherwise open tiles with at least one open 4-neighbor,
    /// excluding the player spawn and enemy spawns.
    pub fn placement_slots(&self) -> Vec<(i32, i32)> {
        if !self.shop_slots.is_empty() {
            return self.shop_slots.clone();
        }
        self.open_tiles()
            .into_iter()
            .filter(|&(x, y)| {
                if (x, y) == self.player_spawn {
                    return false;
                }
                if self.enemy_spawns.contains(&(x, y)) {
                    return false;
                }
                [(0, -1), (0, 1), (-1, 0), (1, 0)]
                    .iter()
                    .any(|&(dx, dy)| self.is_open(x + dx, y + dy))
            })
            .collect()
    }
}

/// Navigation view: static terrain plus the current round's shop
/// occupancy. Shops always block, exposed or not.
pub struct NavView<'a> {
    pub grid: &'a Grid,
    pub blocks: &'a HashSet<(i32, i32)>,
}

impl<'a> NavView<'a> {
    pub fn is_blocked(&self, x: i32, y: i32) -> bool {
        !self.grid.is_open(x, y) || self.blocks.contains(&(x, y))
    }
}
