/// Tile-grid movement engine.
///
/// Entities move continuously, but every decision happens at a tile
/// center: that is the only point where a direction change commits or
/// a blocked entity halts. Between centers an entity advances along
/// its current direction; if a tick would carry it past the center of
/// the tile it is entering, it is clamped onto that center so the next
/// tick runs the decision again. Sampled at centers, an entity is
/// therefore always on an unblocked tile, for any speed up to one tile
/// per tick (speeds beyond that are a configuration error, not checked
/// at runtime).

use super::entity::{tile_center, tile_of, Dir, Player};
use super::grid::NavView;

pub const CENTER_EPS: f32 = 0.01;

/// Is the position within the decision window of its tile center?
pub fn near_center(x: f32, y: f32) -> bool {
    let (cx, cy) = tile_center(tile_of(x, y));
    (x - cx).abs() < CENTER_EPS && (y - cy).abs() < CENTER_EPS
}

pub fn snap_to_center(x: &mut f32, y: &mut f32) {
    let (cx, cy) = tile_center(tile_of(*x, *y));
    *x = cx;
    *y = cy;
}

/// Can an entity standing on `tile` head toward `dir`?
pub fn can_head(nav: &NavView, tile: (i32, i32), dir: Dir) -> bool {
    let (dx, dy) = dir.delta();
    !nav.is_blocked(tile.0 + dx, tile.1 + dy)
}

/// Advance a position along `dir` by `dist` sub-tile units, clamping
/// onto any tile center crossed mid-flight.
pub fn advance(x: &mut f32, y: &mut f32, dir: Dir, dist: f32) {
    let (dx, dy) = dir.delta();
    let before = if dx != 0 { *x } else { *y };
    *x += dx as f32 * dist;
    *y += dy as f32 * dist;

    let (cx, cy) = tile_center(tile_of(*x, *y));
    let (after, center) = if dx != 0 { (*x, cx) } else { (*y, cy) };
    let crossed = (before < center && after > center)
        || (before > center && after < center)
        || (after - center).abs() < CENTER_EPS;
    if crossed {
        *x = cx;
        *y = cy;
    }
}

/// One tick of player motion: commit the buffered direction at a tile
/// center if its target is free, halt if the current direction is
/// blocked, otherwise keep rolling.
pub fn step_player(p: &mut Player, nav: &NavView) {
    if near_center(p.x, p.y) {
        snap_to_center(&mut p.x, &mut p.y);
        let tile = p.tile();
        if can_head(nav, tile, p.next_dir) {
            p.dir = p.next_dir;
        } else if !can_head(nav, tile, p.dir) {
            return;
        }
        // Buffered turn stays pending while the current direction is open.
    }
    advance(&mut p.x, &mut p.y, p.dir, p.speed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::TILE_UNITS;
    use crate::domain::grid::Grid;
    use std::collections::HashSet;

    fn corridor() -> Grid {
        // One horizontal corridor from (1,1) to (5,1).
        Grid::parse(&[
            "#######",
            "#P....#",
            "#######",
        ])
        .unwrap()
    }

    fn nav<'a>(grid: &'a Grid, blocks: &'a HashSet<(i32, i32)>) -> NavView<'a> {
        NavView { grid, blocks }
    }

    #[test]
    fn buffered_turn_commits_only_when_open() {
        let grid = corridor();
        let blocks = HashSet::new();
        let nav = nav(&grid, &blocks);
        let mut p = Player::new((2, 1), 2.0);
        p.dir = Dir::Right;
        p.next_dir = Dir::Up; // wall above: must not commit
        step_player(&mut p, &nav);
        assert_eq!(p.dir, Dir::Right);
        assert_eq!(p.next_dir, Dir::Up);
        let (cx, _) = tile_center((2, 1));
        assert!(p.x > cx); // kept rolling right
    }

    #[test]
    fn halts_at_center_when_both_directions_blocked() {
        let grid = corridor();
        let blocks = HashSet::new();
        let nav = nav(&grid, &blocks);
        let mut p = Player::new((1, 1), 2.0);
        p.dir = Dir::Left; // wall
        p.next_dir = Dir::Up; // wall
        let before = (p.x, p.y);
        step_player(&mut p, &nav);
        assert_eq!((p.x, p.y), before);
        assert_eq!(p.dir, Dir::Left);
    }

    #[test]
    fn never_tunnels_past_the_last_open_tile() {
        let grid = corridor();
        let blocks = HashSet::new();
        let nav = nav(&grid, &blocks);
        // 2.24 does not divide the tile size evenly; the clamp must
        // still land the player exactly on each center.
        let mut p = Player::new((1, 1), 2.24);
        p.dir = Dir::Right;
        p.next_dir = Dir::Right;
        for _ in 0..500 {
            step_player(&mut p, &nav);
            if near_center(p.x, p.y) {
                let t = p.tile();
                assert!(!nav.is_blocked(t.0, t.1), "center sample on blocked tile {:?}", t);
            }
        }
        assert_eq!((p.x, p.y), {
            let (cx, cy) = tile_center((5, 1));
            (cx, cy)
        });
    }

    #[test]
    fn shop_occupancy_blocks_like_a_wall() {
        let grid = corridor();
        let mut blocks = HashSet::new();
        blocks.insert((3, 1));
        let nav = nav(&grid, &blocks);
        let mut p = Player::new((2, 1), 2.0);
        p.dir = Dir::Right;
        p.next_dir = Dir::Right;
        for _ in 0..200 {
            step_player(&mut p, &nav);
        }
        let (cx, cy) = tile_center((2, 1));
        assert_eq!((p.x, p.y), (cx, cy));
    }

    #[test]
    fn mid_transit_ticks_reach_the_next_center_exactly() {
        let grid = corridor();
        let blocks = HashSet::new();
        let nav = nav(&grid, &blocks);
        let mut p = Player::new((1, 1), 2.0);
        p.dir = Dir::Right;
        p.next_dir = Dir::Right;
        let ticks_per_tile = (TILE_UNITS / 2.0) as usize;
        for _ in 0..ticks_per_tile {
            step_player(&mut p, &nav);
        }
        assert_eq!((p.x, p.y), tile_center((2, 1)));
    }
}
