//! Grid pathfinding honoring per-archetype passability

use std::collections::VecDeque;

use crate::game::entity::UnitStats;
use crate::game::grid::MapGrid;

/// How a unit traverses terrain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mobility {
    /// Non-water tiles only
    Ground,
    /// Water tiles only
    Sea,
    /// Ignores terrain entirely
    Air,
}

impl Mobility {
    pub fn for_stats(stats: &UnitStats) -> Self {
        if stats.can_fly {
            Self::Air
        } else if stats.can_sail {
            Self::Sea
        } else {
            Self::Ground
        }
    }

    pub fn passable(self, grid: &MapGrid, x: i32, y: i32) -> bool {
        if !grid.in_bounds(x, y) {
            return false;
        }
        match self {
            Self::Air => true,
            Self::Sea => grid.is_water(x, y),
            Self::Ground => !grid.is_water(x, y),
        }
    }
}

/// Breadth-first shortest path from `start` to `goal`; returns the first
/// step off `start`, or `None` when already there or the goal is
/// unreachable for this mobility. Bounded by the grid, so worst case is one
/// full sweep of a small map.
pub fn next_step(
    grid: &MapGrid,
    mobility: Mobility,
    start: (i32, i32),
    goal: (i32, i32),
) -> Option<(i32, i32)> {
    if start == goal || !grid.in_bounds(start.0, start.1) || !grid.in_bounds(goal.0, goal.1) {
        return None;
    }

    let size = grid.size();
    let index = |x: i32, y: i32| (y * size + x) as usize;

    let mut parent: Vec<Option<usize>> = vec![None; (size * size) as usize];
    let mut visited = vec![false; (size * size) as usize];
    let start_idx = index(start.0, start.1);
    let goal_idx = index(goal.0, goal.1);
    visited[start_idx] = true;

    let mut queue = VecDeque::new();
    queue.push_back(start);

    while let Some((cx, cy)) = queue.pop_front() {
        if (cx, cy) == goal {
            break;
        }
        for (nx, ny) in [(cx + 1, cy), (cx - 1, cy), (cx, cy + 1), (cx, cy - 1)] {
            if !mobility.passable(grid, nx, ny) {
                continue;
            }
            let n_idx = index(nx, ny);
            if visited[n_idx] {
                continue;
            }
            visited[n_idx] = true;
            parent[n_idx] = Some(index(cx, cy));
            queue.push_back((nx, ny));
        }
    }

    if !visited[goal_idx] {
        return None;
    }

    // Walk the parent chain back to the node adjacent to start
    let mut current = goal_idx;
    while let Some(prev) = parent[current] {
        if prev == start_idx {
            return Some((current as i32 % size, current as i32 / size));
        }
        current = prev;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::TerrainKind;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// All-plain grid with a vertical water channel at x = 5
    fn channel_grid() -> MapGrid {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut grid = MapGrid::generate(16, &mut rng);
        for y in 0..16 {
            for x in 0..16 {
                let tile = grid.tile_mut(x, y).unwrap();
                tile.terrain = if x == 5 {
                    TerrainKind::Water
                } else {
                    TerrainKind::Plain
                };
            }
        }
        grid
    }

    #[test]
    fn ground_path_never_steps_onto_water() {
        let grid = channel_grid();
        let mut pos = (2, 8);
        // The channel spans the full map height, so land cannot cross it
        for _ in 0..64 {
            match next_step(&grid, Mobility::Ground, pos, (10, 8)) {
                Some(step) => {
                    assert!(!grid.is_water(step.0, step.1));
                    pos = step;
                }
                None => break,
            }
        }
        assert!(pos.0 < 5, "ground unit must be stuck west of the channel");
    }

    #[test]
    fn sea_path_stays_on_water() {
        let grid = channel_grid();
        let step = next_step(&grid, Mobility::Sea, (5, 2), (5, 10)).unwrap();
        assert!(grid.is_water(step.0, step.1));
        // A land goal is unreachable by sea
        assert!(next_step(&grid, Mobility::Sea, (5, 2), (8, 2)).is_none());
    }

    #[test]
    fn air_crosses_the_channel() {
        let grid = channel_grid();
        let mut pos = (2, 8);
        for _ in 0..64 {
            match next_step(&grid, Mobility::Air, pos, (10, 8)) {
                Some(step) => pos = step,
                None => break,
            }
        }
        assert_eq!(pos, (10, 8));
    }

    #[test]
    fn first_step_moves_toward_adjacent_goal() {
        let grid = channel_grid();
        assert_eq!(
            next_step(&grid, Mobility::Ground, (2, 2), (3, 2)),
            Some((3, 2))
        );
        assert_eq!(next_step(&grid, Mobility::Ground, (2, 2), (2, 2)), None);
    }
}
