//! Map grid - tiles, terrain generation, ownership

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::ws::protocol::{TerrainKind, TileState};

/// A single map tile (authoritative)
#[derive(Debug, Clone)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
    pub terrain: TerrainKind,
    pub owner: Option<String>,
    /// Capture accumulator, reset to zero when ownership flips
    pub capture: f32,
    /// Cosmetic height, pathing-neutral
    pub elevation: i32,
}

impl Tile {
    fn new(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            terrain: TerrainKind::Plain,
            owner: None,
            capture: 0.0,
            elevation: 0,
        }
    }

    pub fn to_state(&self) -> TileState {
        TileState {
            x: self.x,
            y: self.y,
            terrain: self.terrain,
            owner: self.owner.clone(),
            capture: self.capture,
            elevation: self.elevation,
        }
    }
}

/// Fixed-size square grid of tiles, row-major
pub struct MapGrid {
    size: i32,
    tiles: Vec<Tile>,
}

impl MapGrid {
    /// Generate terrain: water lakes, resource/defense/event scatter.
    /// Spawn corners are kept clear so bases always land on buildable ground.
    pub fn generate(size: i32, rng: &mut ChaCha8Rng) -> Self {
        let mut tiles = Vec::with_capacity((size * size) as usize);
        for y in 0..size {
            for x in 0..size {
                tiles.push(Tile::new(x, y));
            }
        }

        let mut grid = Self { size, tiles };

        // Water lakes grown by random walk from seed tiles
        for _ in 0..(size / 6).max(1) {
            let mut x = rng.gen_range(0..size);
            let mut y = rng.gen_range(0..size);
            for _ in 0..rng.gen_range(4..9) {
                if let Some(tile) = grid.tile_mut(x, y) {
                    tile.terrain = TerrainKind::Water;
                    tile.elevation = 0;
                }
                match rng.gen_range(0..4) {
                    0 => x += 1,
                    1 => x -= 1,
                    2 => y += 1,
                    _ => y -= 1,
                }
            }
        }

        // Elevated defensive ground
        for _ in 0..(size / 2) {
            let x = rng.gen_range(0..size);
            let y = rng.gen_range(0..size);
            if let Some(tile) = grid.tile_mut(x, y) {
                if tile.terrain == TerrainKind::Plain {
                    tile.terrain = TerrainKind::Defense;
                    tile.elevation = rng.gen_range(1..3);
                }
            }
        }

        // Resource deposits
        for _ in 0..size {
            let x = rng.gen_range(0..size);
            let y = rng.gen_range(0..size);
            if let Some(tile) = grid.tile_mut(x, y) {
                if tile.terrain == TerrainKind::Plain {
                    tile.terrain = TerrainKind::Resource;
                }
            }
        }

        // Special-event tiles
        for _ in 0..(size / 4).max(1) {
            let x = rng.gen_range(0..size);
            let y = rng.gen_range(0..size);
            if let Some(tile) = grid.tile_mut(x, y) {
                if tile.terrain == TerrainKind::Plain {
                    tile.terrain = TerrainKind::Event;
                }
            }
        }

        // Clear spawn corners
        for (cx, cy) in spawn_corners(size) {
            for dy in -2..=2 {
                for dx in -2..=2 {
                    if let Some(tile) = grid.tile_mut(cx + dx, cy + dy) {
                        if tile.terrain == TerrainKind::Water {
                            tile.terrain = TerrainKind::Plain;
                        }
                    }
                }
            }
        }

        grid
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.size && y < self.size
    }

    fn index(&self, x: i32, y: i32) -> usize {
        (y * self.size + x) as usize
    }

    pub fn tile(&self, x: i32, y: i32) -> Option<&Tile> {
        if self.in_bounds(x, y) {
            Some(&self.tiles[self.index(x, y)])
        } else {
            None
        }
    }

    pub fn tile_mut(&mut self, x: i32, y: i32) -> Option<&mut Tile> {
        if self.in_bounds(x, y) {
            let idx = self.index(x, y);
            Some(&mut self.tiles[idx])
        } else {
            None
        }
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn is_water(&self, x: i32, y: i32) -> bool {
        self.tile(x, y)
            .map(|t| t.terrain == TerrainKind::Water)
            .unwrap_or(false)
    }

    /// Claim every tile within a Manhattan radius for a faction
    pub fn claim_area(&mut self, cx: i32, cy: i32, radius: i32, owner: &str) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx.abs() + dy.abs() > radius {
                    continue;
                }
                if let Some(tile) = self.tile_mut(cx + dx, cy + dy) {
                    tile.owner = Some(owner.to_string());
                    tile.capture = 0.0;
                }
            }
        }
    }
}

/// Faction spawn points, one per map corner, assigned in join order
pub fn spawn_corners(size: i32) -> [(i32, i32); 4] {
    [
        (2, 2),
        (size - 3, size - 3),
        (2, size - 3),
        (size - 3, 2),
    ]
}
