/// Tile kinds and their classification.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.

/// Broad classification used by blocking queries. Only `Open` tiles
/// are walkable; decor renders differently but blocks like a wall.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CellClass {
    Wall,
    Open,
    Decor,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tile {
    Wall,
    Road,
    Park,   // Decor
    Subway, // Decor
    Hazard, // Decor
}

impl Tile {
    pub fn classify(self) -> CellClass {
        match self {
            Tile::Wall => CellClass::Wall,
            Tile::Road => CellClass::Open,
            Tile::Park | Tile::Subway | Tile::Hazard => CellClass::Decor,
        }
    }

    /// Can an entity occupy this tile? (shop occupancy is layered on top,
    /// see `NavView`)
    pub fn is_open(self) -> bool {
        self.classify() == CellClass::Open
    }

    pub fn is_decor(self) -> bool {
        self.classify() == CellClass::Decor
    }
}

impl Default for Tile {
    fn default() -> Self {
        Tile::Wall
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_road_is_open() {
        assert!(Tile::Road.is_open());
        assert!(!Tile::Wall.is_open());
        assert!(!Tile::Park.is_open());
        assert!(!Tile::Subway.is_open());
        assert!(!Tile::Hazard.is_open());
    }

    #[test]
    fn decor_variants_classify_as_decor() {
        for t in [Tile::Park, Tile::Subway, Tile::Hazard] {
            assert_eq!(t.classify(), CellClass::Decor);
            assert!(t.is_decor());
        }
        assert_eq!(Tile::Wall.classify(), CellClass::Wall);
        assert_eq!(Tile::Road.classify(), CellClass::Open);
    }
}
