//! Target selection heuristics and AI decision sources
//!
//! AI factions issue the same ability/build intents a human would; both are
//! applied through the identical action path on the match.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::game::entity::BuildingSpec;
use crate::game::grid::MapGrid;
use crate::game::pathing::Mobility;
use crate::game::r#match::GameMatch;
use crate::game::tuning::Tuning;
use crate::ws::protocol::{AbilityKind, BuildingKind};

/// Pick a destination for an idle unit: scan a bounded neighborhood and
/// score candidate tiles by ownership bonus minus distance, restricted to
/// tiles the unit's mobility can occupy.
pub fn pick_target(
    grid: &MapGrid,
    tuning: &Tuning,
    owner: &str,
    x: f32,
    y: f32,
    mobility: Mobility,
) -> Option<(f32, f32)> {
    let cx = x.round() as i32;
    let cy = y.round() as i32;
    let radius = tuning.target_scan_radius;

    let mut best: Option<((f32, f32), f32)> = None;

    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let (tx, ty) = (cx + dx, cy + dy);
            if (tx, ty) == (cx, cy) || !mobility.passable(grid, tx, ty) {
                continue;
            }
            let Some(tile) = grid.tile(tx, ty) else {
                continue;
            };
            let bonus = match &tile.owner {
                Some(o) if o == owner => 0.0,
                Some(_) => 4.0,
                None => 2.0,
            };
            let distance = (dx.abs() + dy.abs()) as f32;
            let score = bonus - 0.4 * distance;
            if score <= 0.0 {
                continue;
            }
            // Ties go to the first candidate encountered
            if best.map(|(_, s)| score > s).unwrap_or(true) {
                best = Some(((tx as f32, ty as f32), score));
            }
        }
    }

    best.map(|(pos, _)| pos)
}

/// An action an AI faction wants to take this tick
#[derive(Debug, Clone)]
pub enum Intent {
    Cast {
        target: (f32, f32),
        ability: AbilityKind,
    },
    Build {
        x: i32,
        y: i32,
        kind: BuildingKind,
    },
}

/// A per-faction decision maker invoked once per tick
pub trait DecisionSource: Send {
    fn faction(&self) -> &str;
    fn decide(&mut self, game: &GameMatch, dt: f32) -> Vec<Intent>;
}

/// Scripted opponent: banks resources toward a random building on owned
/// ground and periodically throws a reinforcement squad at the nearest
/// enemy base.
pub struct ScriptedAi {
    faction: String,
    rng: ChaCha8Rng,
    think_timer: f32,
}

impl ScriptedAi {
    const BUILD_CHOICES: [BuildingKind; 6] = [
        BuildingKind::Barracks,
        BuildingKind::Archery,
        BuildingKind::Mine,
        BuildingKind::Mine,
        BuildingKind::Factory,
        BuildingKind::MageTower,
    ];

    pub fn new(faction: &str, seed: u64) -> Self {
        Self {
            faction: faction.to_string(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            think_timer: 0.0,
        }
    }

    fn pick_build(&mut self, game: &GameMatch) -> Option<Intent> {
        let kind = Self::BUILD_CHOICES[self.rng.gen_range(0..Self::BUILD_CHOICES.len())];
        if game.resource(&self.faction) < BuildingSpec::for_kind(kind).cost {
            return None;
        }

        let candidates: Vec<(i32, i32)> = game
            .grid()
            .tiles()
            .iter()
            .filter(|t| {
                t.owner.as_deref() == Some(self.faction.as_str())
                    && !game.grid().is_water(t.x, t.y)
                    && game.building_at(t.x, t.y).is_none()
            })
            .map(|t| (t.x, t.y))
            .collect();

        if candidates.is_empty() {
            return None;
        }
        let (x, y) = candidates[self.rng.gen_range(0..candidates.len())];
        Some(Intent::Build { x, y, kind })
    }

    fn pick_attack(&mut self, game: &GameMatch) -> Option<Intent> {
        let own_base = game
            .buildings()
            .iter()
            .find(|b| b.kind == BuildingKind::Base && b.owner == self.faction)?;

        let target = game
            .buildings()
            .iter()
            .filter(|b| b.kind == BuildingKind::Base && b.owner != self.faction)
            .min_by_key(|b| (b.x - own_base.x).abs() + (b.y - own_base.y).abs())?;

        Some(Intent::Cast {
            target: (target.x as f32, target.y as f32),
            ability: AbilityKind::Reinforce,
        })
    }
}

impl DecisionSource for ScriptedAi {
    fn faction(&self) -> &str {
        &self.faction
    }

    fn decide(&mut self, game: &GameMatch, dt: f32) -> Vec<Intent> {
        self.think_timer -= dt;
        if self.think_timer > 0.0 {
            return Vec::new();
        }
        self.think_timer = self.rng.gen_range(2.0..4.0);

        let mut intents = Vec::new();
        if let Some(build) = self.pick_build(game) {
            intents.push(build);
        }
        if self.rng.gen_bool(0.5) {
            if let Some(attack) = self.pick_attack(game) {
                intents.push(attack);
            }
        }
        intents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::TerrainKind;
    use rand_chacha::ChaCha8Rng;

    fn flat_grid() -> MapGrid {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut grid = MapGrid::generate(16, &mut rng);
        for y in 0..16 {
            for x in 0..16 {
                grid.tile_mut(x, y).unwrap().terrain = TerrainKind::Plain;
            }
        }
        grid
    }

    #[test]
    fn prefers_enemy_tiles_over_neutral() {
        let mut grid = flat_grid();
        grid.tile_mut(9, 8).unwrap().owner = Some("enemy".to_string());
        let tuning = Tuning::default();

        let target = pick_target(&grid, &tuning, "p1", 8.0, 8.0, Mobility::Ground).unwrap();
        assert_eq!(target, (9.0, 8.0));
    }

    #[test]
    fn ground_units_never_target_water() {
        let mut grid = flat_grid();
        for y in 0..16 {
            for x in 0..16 {
                let tile = grid.tile_mut(x, y).unwrap();
                tile.terrain = TerrainKind::Water;
                tile.owner = Some("enemy".to_string());
            }
        }
        grid.tile_mut(8, 8).unwrap().terrain = TerrainKind::Plain;
        let tuning = Tuning::default();

        assert!(pick_target(&grid, &tuning, "p1", 8.0, 8.0, Mobility::Ground).is_none());
        assert!(pick_target(&grid, &tuning, "p1", 8.0, 8.0, Mobility::Sea).is_some());
    }

    #[test]
    fn fully_owned_neighborhood_yields_no_target() {
        let mut grid = flat_grid();
        for y in 0..16 {
            for x in 0..16 {
                grid.tile_mut(x, y).unwrap().owner = Some("p1".to_string());
            }
        }
        let tuning = Tuning::default();
        assert!(pick_target(&grid, &tuning, "p1", 8.0, 8.0, Mobility::Ground).is_none());
    }
}
