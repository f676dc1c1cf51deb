//! Gameplay tuning table
//!
//! Capture, combat, and economy numbers went through several retunes; they
//! are configuration, not invariants, so everything adjustable lives in one
//! table.

#[derive(Debug, Clone)]
pub struct Tuning {
    /// Map side length in tiles
    pub grid_size: i32,

    /// Capture progress needed to flip tile ownership
    pub capture_threshold: f32,
    /// Capture progress per second per contesting ground unit
    pub capture_rate: f32,

    /// Mage splash damage multiplier in contested tiles
    pub splash_factor: f32,

    /// Max Manhattan distance from an owned anchor tile to an ability target
    pub ability_anchor_radius: i32,
    /// Units spawned per reinforcement cast
    pub ability_squad_size: usize,
    /// Flat damage applied by a bombardment
    pub bombard_damage: f32,
    /// Euclidean radius of the bombardment area
    pub bombard_radius: f32,
    /// Lifetime of the bombardment effect projectile (seconds)
    pub bombard_ttl: f32,

    /// Chebyshev radius of the target-selection neighborhood scan
    pub target_scan_radius: i32,
    /// Manhattan distance below which a unit counts as arrived
    pub arrival_epsilon: f32,
    /// Distance under which units push each other apart
    pub separation_radius: f32,
    /// Strength of the separation steering force
    pub separation_strength: f32,

    /// Resource trickle per building per second
    pub building_income: f32,
    /// Resource trickle per mine per second
    pub mine_income: f32,
    /// Ledger balance granted to each faction at initialization
    pub starting_resources: f32,
    /// Manhattan radius of territory owned around a fresh base
    pub start_territory_radius: i32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            grid_size: 24,

            capture_threshold: 100.0,
            capture_rate: 12.0,

            splash_factor: 0.5,

            ability_anchor_radius: 2,
            ability_squad_size: 3,
            bombard_damage: 35.0,
            bombard_radius: 1.5,
            bombard_ttl: 0.6,

            target_scan_radius: 6,
            arrival_epsilon: 0.1,
            separation_radius: 0.4,
            separation_strength: 1.5,

            building_income: 1.0,
            mine_income: 4.0,
            starting_resources: 200.0,
            start_territory_radius: 2,
        }
    }
}
