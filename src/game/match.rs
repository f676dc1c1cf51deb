//! Match state and authoritative tick pipeline

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::game::ai::{self, DecisionSource, Intent, ScriptedAi};
use crate::game::entity::{Building, BuildingSpec, Projectile, Unit, UnitStats};
use crate::game::grid::{spawn_corners, MapGrid};
use crate::game::pathing::{self, Mobility};
use crate::game::tuning::Tuning;
use crate::util::time::{unix_millis, SNAPSHOT_EVERY_TICKS};
use crate::ws::protocol::{
    AbilityKind, BuildingKind, EventCategory, PlayerInfo, ServerMsg, UnitKind,
};

/// Fixed AI opponent roster, initialized on first join so a joining player
/// always faces opponents
pub const AI_ROSTER: [&str; 2] = ["ai_crimson", "ai_cobalt"];

/// One client connection registered with a match
pub struct Connection {
    pub faction: String,
    pub tx: mpsc::UnboundedSender<ServerMsg>,
}

/// The authoritative game match: grid, entity registry, ledger, connections
pub struct GameMatch {
    id: String,
    tick: u64,
    grid: MapGrid,
    units: Vec<Unit>,
    buildings: Vec<Building>,
    projectiles: Vec<Projectile>,
    resources: HashMap<String, f32>,
    connections: Vec<Connection>,
    ai: Vec<Box<dyn DecisionSource>>,
    tuning: Tuning,
    rng: ChaCha8Rng,
}

impl GameMatch {
    pub fn new(id: &str, seed: u64, tuning: Tuning) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let grid = MapGrid::generate(tuning.grid_size, &mut rng);

        Self {
            id: id.to_string(),
            tick: 0,
            grid,
            units: Vec::new(),
            buildings: Vec::new(),
            projectiles: Vec::new(),
            resources: HashMap::new(),
            connections: Vec::new(),
            ai: Vec::new(),
            tuning,
            rng,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn grid(&self) -> &MapGrid {
        &self.grid
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    pub fn building_at(&self, x: i32, y: i32) -> Option<&Building> {
        self.buildings.iter().find(|b| b.x == x && b.y == y)
    }

    pub fn resource(&self, faction: &str) -> f32 {
        self.resources.get(faction).copied().unwrap_or(0.0)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn connected_factions(&self) -> Vec<String> {
        self.connections.iter().map(|c| c.faction.clone()).collect()
    }

    // ------------------------------------------------------------------
    // Player-facing operations
    // ------------------------------------------------------------------

    /// Register a connection under a faction. First sight of a faction
    /// allocates its starting kit; the AI roster is initialized alongside
    /// so the match always has opponents. The joining connection gets a
    /// snapshot immediately, out of band from the periodic broadcast.
    pub fn join(&mut self, faction: &str, tx: mpsc::UnboundedSender<ServerMsg>) {
        if !self.has_base(faction) {
            self.init_faction(faction);
        }
        for ai_faction in AI_ROSTER {
            if !self.has_base(ai_faction) {
                self.init_faction(ai_faction);
                let seed = self.rng.gen();
                self.ai.push(Box::new(ScriptedAi::new(ai_faction, seed)));
            }
        }

        let snapshot = self.snapshot();
        let _ = tx.send(snapshot);

        self.connections.push(Connection {
            faction: faction.to_string(),
            tx,
        });

        info!(
            match_id = %self.id,
            faction = %faction,
            connections = self.connections.len(),
            "Player joined match"
        );
        self.push_event(
            format!("{} joined the match", faction),
            EventCategory::Info,
        );
    }

    /// Cast an ability at a world position. Invalid casts are silent no-ops;
    /// the client is advisory, not trusted.
    pub fn cast(&mut self, faction: &str, target: (f32, f32), ability: AbilityKind) {
        match ability {
            AbilityKind::Reinforce => self.cast_reinforce(faction, target),
            AbilityKind::Bombard => self.cast_bombard(faction, target),
        }
    }

    fn cast_reinforce(&mut self, faction: &str, target: (f32, f32)) {
        let tx = target.0.round() as i32;
        let ty = target.1.round() as i32;
        let radius = self.tuning.ability_anchor_radius;

        // Anchor: an owned tile within Manhattan range of the target
        let anchor = self
            .grid
            .tiles()
            .iter()
            .find(|t| {
                t.owner.as_deref() == Some(faction)
                    && (t.x - tx).abs() + (t.y - ty).abs() <= radius
            })
            .map(|t| (t.x, t.y));

        let Some((ax, ay)) = anchor else {
            debug!(match_id = %self.id, faction = %faction, "Reinforce rejected: no anchor tile");
            return;
        };

        for _ in 0..self.tuning.ability_squad_size {
            self.units.push(Unit::new(
                faction,
                UnitKind::Melee,
                ax as f32,
                ay as f32,
                target,
            ));
        }
    }

    fn cast_bombard(&mut self, faction: &str, target: (f32, f32)) {
        let radius_sq = self.tuning.bombard_radius * self.tuning.bombard_radius;
        let damage = self.tuning.bombard_damage;

        for unit in &mut self.units {
            let dx = unit.x - target.0;
            let dy = unit.y - target.1;
            if dx * dx + dy * dy <= radius_sq {
                unit.hp -= damage;
            }
        }
        for building in &mut self.buildings {
            let dx = building.x as f32 - target.0;
            let dy = building.y as f32 - target.1;
            if dx * dx + dy * dy <= radius_sq {
                building.hp -= damage;
            }
        }

        // Effect record for the client; damage was already applied above
        let origin = self
            .buildings
            .iter()
            .find(|b| b.kind == BuildingKind::Base && b.owner == faction)
            .map(|b| (b.x as f32, b.y as f32))
            .unwrap_or(target);
        self.projectiles.push(Projectile::new(
            faction,
            origin,
            target,
            self.tuning.bombard_ttl,
        ));

        self.push_event(
            format!(
                "{} bombarded ({:.0}, {:.0})",
                faction, target.0, target.1
            ),
            EventCategory::Combat,
        );
    }

    /// Construct a building on an owned, buildable tile. Invalid requests
    /// are silently ignored.
    pub fn build(&mut self, faction: &str, x: i32, y: i32, kind: BuildingKind) {
        let Some(tile) = self.grid.tile(x, y) else {
            return;
        };
        if tile.owner.as_deref() != Some(faction) || self.grid.is_water(x, y) {
            return;
        }
        if self.building_at(x, y).is_some() {
            return;
        }
        let cost = BuildingSpec::for_kind(kind).cost;
        if self.resource(faction) < cost {
            return;
        }

        *self.resources.entry(faction.to_string()).or_insert(0.0) -= cost;
        self.buildings.push(Building::new(faction, kind, x, y));

        info!(match_id = %self.id, faction = %faction, kind = ?kind, x, y, "Building constructed");
        self.push_event(
            format!("{} built {:?} at ({}, {})", faction, kind, x, y),
            EventCategory::Build,
        );
    }

    fn has_base(&self, faction: &str) -> bool {
        self.buildings
            .iter()
            .any(|b| b.owner == faction && b.kind == BuildingKind::Base)
    }

    /// Starting kit: base + starter structures, resources, and owned
    /// territory around a faction-specific spawn corner
    fn init_faction(&mut self, faction: &str) {
        let corners = spawn_corners(self.grid.size());
        let taken = self
            .buildings
            .iter()
            .filter(|b| b.kind == BuildingKind::Base)
            .count();
        let (cx, cy) = corners[taken % corners.len()];

        self.buildings.push(Building::new(faction, BuildingKind::Base, cx, cy));
        self.buildings
            .push(Building::new(faction, BuildingKind::Barracks, cx + 1, cy));
        self.buildings
            .push(Building::new(faction, BuildingKind::Mine, cx, cy + 1));

        self.grid
            .claim_area(cx, cy, self.tuning.start_territory_radius, faction);
        self.resources
            .insert(faction.to_string(), self.tuning.starting_resources);

        info!(match_id = %self.id, faction = %faction, x = cx, y = cy, "Faction initialized");
    }

    // ------------------------------------------------------------------
    // Tick pipeline
    // ------------------------------------------------------------------

    /// Advance the simulation by one fixed step. Stage order matters: each
    /// stage reads the post-state of the previous one.
    pub fn update(&mut self, dt: f32) {
        self.tick += 1;
        self.run_ai(dt);
        self.spawn_system(dt);
        self.movement_system(dt);
        self.combat_system();
        self.projectile_system(dt);
        self.capture_system(dt);
        self.cleanup_system();
        self.economy_system(dt);
        if self.tick % SNAPSHOT_EVERY_TICKS == 0 {
            self.broadcast_state();
        }
    }

    /// AI factions think once per tick and act through the same
    /// cast/build path as human players
    fn run_ai(&mut self, dt: f32) {
        let mut ai = std::mem::take(&mut self.ai);
        for source in &mut ai {
            let faction = source.faction().to_string();
            for intent in source.decide(self, dt) {
                match intent {
                    Intent::Cast { target, ability } => self.cast(&faction, target, ability),
                    Intent::Build { x, y, kind } => self.build(&faction, x, y, kind),
                }
            }
        }
        self.ai = ai;
    }

    /// Producing buildings spawn one unit on cooldown expiry
    fn spawn_system(&mut self, dt: f32) {
        let mut spawned: Vec<(String, UnitKind, f32, f32)> = Vec::new();

        for building in &mut self.buildings {
            let Some(kind) = BuildingSpec::for_kind(building.kind).produces else {
                continue;
            };
            building.spawn_cooldown -= dt;
            if building.spawn_cooldown <= 0.0 {
                spawned.push((
                    building.owner.clone(),
                    kind,
                    building.x as f32,
                    building.y as f32,
                ));
                building.spawn_cooldown = UnitStats::for_kind(kind).spawn_interval;
            }
        }

        for (owner, kind, x, y) in spawned {
            let mobility = Mobility::for_stats(&UnitStats::for_kind(kind));
            let target = ai::pick_target(&self.grid, &self.tuning, &owner, x, y, mobility)
                .unwrap_or((x, y));
            self.units.push(Unit::new(&owner, kind, x, y, target));
        }
    }

    /// Advance units along BFS paths with separation steering blended in
    fn movement_system(&mut self, dt: f32) {
        let positions: Vec<(f32, f32)> = self.units.iter().map(|u| (u.x, u.y)).collect();
        let size = self.grid.size() as f32;

        for i in 0..self.units.len() {
            let unit = &self.units[i];
            let stats = unit.stats();
            let mobility = Mobility::for_stats(&stats);
            let (x, y) = (unit.x, unit.y);
            let (tx, ty) = (unit.target_x, unit.target_y);

            if (tx - x).abs() + (ty - y).abs() < self.tuning.arrival_epsilon {
                let next = ai::pick_target(&self.grid, &self.tuning, &unit.owner, x, y, mobility)
                    .unwrap_or((x, y));
                let unit = &mut self.units[i];
                unit.target_x = next.0;
                unit.target_y = next.1;
                continue;
            }

            let start = (x.round() as i32, y.round() as i32);
            let goal = (tx.round() as i32, ty.round() as i32);

            // Direction: next path step, or straight at the target once
            // inside the goal tile
            let (dir_x, dir_y) = if start == goal {
                (tx - x, ty - y)
            } else {
                match pathing::next_step(&self.grid, mobility, start, goal) {
                    Some((sx, sy)) => (sx as f32 - x, sy as f32 - y),
                    None => {
                        // Unreachable target, re-pick next tick
                        let unit = &mut self.units[i];
                        unit.target_x = x;
                        unit.target_y = y;
                        continue;
                    }
                }
            };

            let len = (dir_x * dir_x + dir_y * dir_y).sqrt();
            if len < f32::EPSILON {
                continue;
            }
            let step = stats.speed * dt;
            let path_x = x + dir_x / len * step;
            let path_y = y + dir_y / len * step;

            // Separation: nudge away from units sharing nearly the same spot
            let mut sep_x = 0.0;
            let mut sep_y = 0.0;
            for (j, &(ox, oy)) in positions.iter().enumerate() {
                if j == i {
                    continue;
                }
                let dx = x - ox;
                let dy = y - oy;
                let dist_sq = dx * dx + dy * dy;
                let r = self.tuning.separation_radius;
                if dist_sq < r * r && dist_sq > f32::EPSILON {
                    let dist = dist_sq.sqrt();
                    sep_x += dx / dist;
                    sep_y += dy / dist;
                }
            }
            let mut new_x = path_x + sep_x * self.tuning.separation_strength * dt;
            let mut new_y = path_y + sep_y * self.tuning.separation_strength * dt;

            // Steering never overrides passability
            if !mobility.passable(&self.grid, new_x.round() as i32, new_y.round() as i32) {
                new_x = path_x;
                new_y = path_y;
            }

            let unit = &mut self.units[i];
            unit.x = new_x.clamp(0.0, size - 1.0);
            unit.y = new_y.clamp(0.0, size - 1.0);
        }
    }

    /// Units bucketed by rounded tile; mixed buckets exchange damage.
    /// Each unit damages one opposing unit per tick; mages splash reduced
    /// damage across every opposing unit in the bucket.
    fn combat_system(&mut self) {
        let mut buckets: HashMap<(i32, i32), Vec<usize>> = HashMap::new();
        for (i, unit) in self.units.iter().enumerate() {
            buckets.entry(unit.tile()).or_default().push(i);
        }

        let mut damage = vec![0.0f32; self.units.len()];

        for bucket in buckets.values() {
            let first_owner = &self.units[bucket[0]].owner;
            if bucket
                .iter()
                .all(|&i| self.units[i].owner == *first_owner)
            {
                continue;
            }

            for &attacker in bucket {
                let unit = &self.units[attacker];
                let stats = unit.stats();
                if unit.kind == UnitKind::Mage {
                    let splash = stats.damage * self.tuning.splash_factor;
                    for &other in bucket {
                        if self.units[other].owner != unit.owner {
                            damage[other] += splash;
                        }
                    }
                } else if let Some(&victim) = bucket
                    .iter()
                    .find(|&&other| self.units[other].owner != unit.owner)
                {
                    damage[victim] += stats.damage;
                }
            }
        }

        for (i, dmg) in damage.into_iter().enumerate() {
            if dmg > 0.0 {
                self.units[i].hp -= dmg;
            }
        }
    }

    fn projectile_system(&mut self, dt: f32) {
        for projectile in &mut self.projectiles {
            projectile.advance(dt);
        }
    }

    /// Ground units on foreign tiles accumulate capture progress; crossing
    /// the threshold flips ownership to the dominant occupier and resets
    /// progress in the same tick
    fn capture_system(&mut self, dt: f32) {
        let mut deltas: HashMap<(i32, i32), f32> = HashMap::new();

        for unit in &self.units {
            if !unit.is_ground() {
                continue;
            }
            let (tx, ty) = unit.tile();
            let Some(tile) = self.grid.tile(tx, ty) else {
                continue;
            };
            // Water never accumulates progress from ground-only units
            if self.grid.is_water(tx, ty) {
                continue;
            }
            if tile.owner.as_deref() != Some(unit.owner.as_str()) {
                *deltas.entry((tx, ty)).or_insert(0.0) += self.tuning.capture_rate * dt;
            }
        }

        let threshold = self.tuning.capture_threshold;
        for ((tx, ty), delta) in deltas {
            let dominant = self.dominant_faction_at(tx, ty);
            let Some(tile) = self.grid.tile_mut(tx, ty) else {
                continue;
            };
            tile.capture += delta;
            if tile.capture >= threshold {
                tile.owner = dominant;
                tile.capture = 0.0;
            }
        }
    }

    /// Ground faction with the most units on the tile, first encountered
    /// winning ties
    fn dominant_faction_at(&self, x: i32, y: i32) -> Option<String> {
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for unit in &self.units {
            if !unit.is_ground() || unit.tile() != (x, y) {
                continue;
            }
            match counts.iter_mut().find(|(f, _)| *f == unit.owner) {
                Some((_, n)) => *n += 1,
                None => counts.push((&unit.owner, 1)),
            }
        }
        // Strictly-greater keeps the first faction seen on even splits
        let mut best: Option<(&str, usize)> = None;
        for (faction, n) in counts {
            if best.map(|(_, m)| n > m).unwrap_or(true) {
                best = Some((faction, n));
            }
        }
        best.map(|(f, _)| f.to_string())
    }

    /// Remove dead or out-of-bounds units, destroyed buildings, and
    /// expired projectiles
    fn cleanup_system(&mut self) {
        let size = self.grid.size() as f32;
        self.units.retain(|u| {
            u.hp > 0.0 && u.x >= 0.0 && u.y >= 0.0 && u.x < size && u.y < size
        });
        self.buildings.retain(|b| b.hp > 0.0);
        self.projectiles.retain(|p| !p.expired());
    }

    /// Every building trickles resources to its owner; mines pay more
    fn economy_system(&mut self, dt: f32) {
        for building in &self.buildings {
            let rate = if building.kind == BuildingKind::Mine {
                self.tuning.mine_income
            } else {
                self.tuning.building_income
            };
            *self
                .resources
                .entry(building.owner.clone())
                .or_insert(0.0) += rate * dt;
        }
    }

    // ------------------------------------------------------------------
    // Serialization & broadcast
    // ------------------------------------------------------------------

    /// Full-state snapshot for the wire
    pub fn snapshot(&self) -> ServerMsg {
        ServerMsg::MatchState {
            tick: self.tick,
            tiles: self.grid.tiles().iter().map(|t| t.to_state()).collect(),
            units: self.units.iter().map(|u| u.to_state()).collect(),
            buildings: self.buildings.iter().map(|b| b.to_state()).collect(),
            projectiles: self.projectiles.iter().map(|p| p.to_state()).collect(),
            resources: self.resources.clone(),
            players: self
                .connections
                .iter()
                .map(|c| PlayerInfo {
                    id: c.faction.clone(),
                })
                .collect(),
        }
    }

    fn broadcast_state(&mut self) {
        let snapshot = self.snapshot();
        self.broadcast(snapshot);
    }

    /// Best-effort delivery; connections whose receiver is gone are pruned
    /// without affecting the rest
    fn broadcast(&mut self, msg: ServerMsg) {
        self.connections.retain(|c| c.tx.send(msg.clone()).is_ok());
    }

    fn push_event(&mut self, message: String, category: EventCategory) {
        self.broadcast(ServerMsg::EventLog {
            message,
            category,
            timestamp: unix_millis(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::TerrainKind;

    const DT: f32 = 0.1;

    fn new_match() -> GameMatch {
        GameMatch::new("test", 42, Tuning::default())
    }

    fn channel() -> (
        mpsc::UnboundedSender<ServerMsg>,
        mpsc::UnboundedReceiver<ServerMsg>,
    ) {
        mpsc::unbounded_channel()
    }

    fn add_unit(game: &mut GameMatch, owner: &str, kind: UnitKind, x: f32, y: f32) {
        game.units.push(Unit::new(owner, kind, x, y, (x, y)));
    }

    #[test]
    fn join_initializes_every_faction_once() {
        let mut game = new_match();
        let (tx, mut rx) = channel();
        game.join("p1", tx);

        let base_owners: Vec<&str> = game
            .buildings
            .iter()
            .filter(|b| b.kind == BuildingKind::Base)
            .map(|b| b.owner.as_str())
            .collect();
        assert_eq!(base_owners.len(), 1 + AI_ROSTER.len());
        assert!(base_owners.contains(&"p1"));
        for ai in AI_ROSTER {
            assert!(base_owners.contains(&ai));
            assert_eq!(game.resource(ai), game.tuning.starting_resources);
        }
        assert_eq!(game.resource("p1"), game.tuning.starting_resources);

        // Joining connection gets an immediate snapshot
        match rx.try_recv().unwrap() {
            ServerMsg::MatchState { tick, .. } => assert_eq!(tick, 0),
            other => panic!("expected snapshot, got {:?}", other),
        }

        // A second join of the same faction allocates nothing new
        let (tx2, _rx2) = channel();
        game.join("p1", tx2);
        let bases = game
            .buildings
            .iter()
            .filter(|b| b.kind == BuildingKind::Base)
            .count();
        assert_eq!(bases, 1 + AI_ROSTER.len());
    }

    #[test]
    fn bombard_hits_exactly_the_units_in_radius() {
        let mut game = new_match();
        game.resources.insert("p1".to_string(), 0.0);

        add_unit(&mut game, "enemy", UnitKind::Melee, 10.0, 10.0);
        add_unit(&mut game, "enemy", UnitKind::Melee, 10.8, 10.0);
        add_unit(&mut game, "enemy", UnitKind::Melee, 10.0, 11.0);
        add_unit(&mut game, "enemy", UnitKind::Melee, 14.0, 10.0); // outside

        game.cast("p1", (10.0, 10.0), AbilityKind::Bombard);

        let max = UnitStats::for_kind(UnitKind::Melee).max_hp;
        let dmg = game.tuning.bombard_damage;
        assert_eq!(game.units[0].hp, max - dmg);
        assert_eq!(game.units[1].hp, max - dmg);
        assert_eq!(game.units[2].hp, max - dmg);
        assert_eq!(game.units[3].hp, max);
        assert_eq!(game.projectiles.len(), 1);
    }

    #[test]
    fn reinforce_requires_an_owned_anchor_tile() {
        let mut game = new_match();
        game.cast("p1", (10.0, 10.0), AbilityKind::Reinforce);
        assert!(game.units.is_empty());

        game.grid.claim_area(10, 10, 1, "p1");
        game.cast("p1", (10.0, 10.0), AbilityKind::Reinforce);
        assert_eq!(game.units.len(), game.tuning.ability_squad_size);
        assert!(game.units.iter().all(|u| u.owner == "p1"));
    }

    #[test]
    fn contested_tile_damages_both_sides() {
        let mut game = new_match();
        add_unit(&mut game, "p1", UnitKind::Melee, 8.0, 8.0);
        add_unit(&mut game, "p2", UnitKind::Melee, 8.2, 7.9);

        game.combat_system();

        let melee_dmg = UnitStats::for_kind(UnitKind::Melee).damage;
        let max = UnitStats::for_kind(UnitKind::Melee).max_hp;
        assert_eq!(game.units[0].hp, max - melee_dmg);
        assert_eq!(game.units[1].hp, max - melee_dmg);
    }

    #[test]
    fn uncontested_tile_produces_no_damage() {
        let mut game = new_match();
        add_unit(&mut game, "p1", UnitKind::Melee, 8.0, 8.0);
        add_unit(&mut game, "p1", UnitKind::Ranged, 8.1, 8.0);

        game.combat_system();

        assert!(game
            .units
            .iter()
            .all(|u| u.hp == u.stats().max_hp));
    }

    #[test]
    fn mage_splashes_reduced_damage_across_the_bucket() {
        let mut game = new_match();
        add_unit(&mut game, "p1", UnitKind::Mage, 8.0, 8.0);
        add_unit(&mut game, "p2", UnitKind::Melee, 8.0, 8.0);
        add_unit(&mut game, "p2", UnitKind::Melee, 8.1, 8.0);

        game.combat_system();

        let splash =
            UnitStats::for_kind(UnitKind::Mage).damage * game.tuning.splash_factor;
        let melee_dmg = UnitStats::for_kind(UnitKind::Melee).damage;
        let max = UnitStats::for_kind(UnitKind::Melee).max_hp;
        assert_eq!(game.units[1].hp, max - splash);
        assert_eq!(game.units[2].hp, max - splash);
        // Both melee units hit the first opposing unit in the bucket: the mage
        let mage_max = UnitStats::for_kind(UnitKind::Mage).max_hp;
        assert_eq!(game.units[0].hp, mage_max - 2.0 * melee_dmg);
    }

    #[test]
    fn capture_progress_stays_bounded_and_flips_atomically() {
        let mut game = new_match();
        game.grid.tile_mut(8, 8).unwrap().owner = Some("p2".to_string());
        add_unit(&mut game, "p1", UnitKind::Melee, 8.0, 8.0);

        let threshold = game.tuning.capture_threshold;
        for _ in 0..200 {
            game.capture_system(DT);
            let tile = game.grid.tile(8, 8).unwrap();
            assert!(tile.capture >= 0.0 && tile.capture < threshold);
        }
        assert_eq!(
            game.grid.tile(8, 8).unwrap().owner.as_deref(),
            Some("p1")
        );
        // Owned by the occupier now, so progress stays at zero
        game.capture_system(DT);
        assert_eq!(game.grid.tile(8, 8).unwrap().capture, 0.0);
    }

    #[test]
    fn tied_capture_flips_to_first_encountered_faction() {
        let mut game = new_match();
        game.grid.tile_mut(8, 8).unwrap().terrain = TerrainKind::Plain;
        add_unit(&mut game, "first", UnitKind::Melee, 8.0, 8.0);
        add_unit(&mut game, "second", UnitKind::Melee, 8.0, 8.0);

        for _ in 0..200 {
            game.capture_system(DT);
        }
        assert_eq!(
            game.grid.tile(8, 8).unwrap().owner.as_deref(),
            Some("first")
        );
    }

    #[test]
    fn airborne_and_seaborne_units_do_not_capture() {
        let mut game = new_match();
        game.grid.tile_mut(8, 8).unwrap().owner = Some("p2".to_string());
        add_unit(&mut game, "p1", UnitKind::Air, 8.0, 8.0);

        for _ in 0..200 {
            game.capture_system(DT);
        }
        assert_eq!(
            game.grid.tile(8, 8).unwrap().owner.as_deref(),
            Some("p2")
        );
        assert_eq!(game.grid.tile(8, 8).unwrap().capture, 0.0);
    }

    #[test]
    fn water_tiles_never_accumulate_capture() {
        let mut game = new_match();
        game.grid.tile_mut(8, 8).unwrap().terrain = TerrainKind::Water;
        add_unit(&mut game, "p1", UnitKind::Melee, 8.0, 8.0);

        for _ in 0..50 {
            game.capture_system(DT);
        }
        assert_eq!(game.grid.tile(8, 8).unwrap().capture, 0.0);
    }

    #[test]
    fn build_on_unowned_tile_is_rejected_idempotently() {
        let mut game = new_match();
        game.resources.insert("p1".to_string(), 1000.0);

        for _ in 0..3 {
            game.build("p1", 8, 8, BuildingKind::Barracks);
        }
        assert!(game.buildings.is_empty());
        assert_eq!(game.resource("p1"), 1000.0);
    }

    #[test]
    fn build_validations_cover_water_occupancy_and_cost() {
        let mut game = new_match();
        game.grid.claim_area(8, 8, 2, "p1");
        game.resources.insert("p1".to_string(), 1000.0);

        // Water tile
        game.grid.tile_mut(9, 8).unwrap().terrain = TerrainKind::Water;
        game.build("p1", 9, 8, BuildingKind::Dock);
        assert!(game.buildings.is_empty());

        // Valid build debits exactly the cost
        game.build("p1", 8, 8, BuildingKind::Barracks);
        assert_eq!(game.buildings.len(), 1);
        let cost = BuildingSpec::for_kind(BuildingKind::Barracks).cost;
        assert_eq!(game.resource("p1"), 1000.0 - cost);

        // Occupied tile
        game.build("p1", 8, 8, BuildingKind::Archery);
        assert_eq!(game.buildings.len(), 1);

        // Insufficient funds
        game.resources.insert("p1".to_string(), 1.0);
        game.build("p1", 8, 7, BuildingKind::Factory);
        assert_eq!(game.buildings.len(), 1);
    }

    #[test]
    fn ledger_only_decreases_on_successful_build() {
        let mut game = new_match();
        let (tx, _rx) = channel();
        game.join("p1", tx);

        let mut last = game.resource("p1");
        for _ in 0..20 {
            game.economy_system(DT);
            let now = game.resource("p1");
            assert!(now >= last);
            last = now;
        }

        let owned = game
            .grid
            .tiles()
            .iter()
            .find(|t| {
                t.owner.as_deref() == Some("p1")
                    && !game.grid.is_water(t.x, t.y)
                    && game.building_at(t.x, t.y).is_none()
            })
            .map(|t| (t.x, t.y))
            .unwrap();
        let before = game.resource("p1");
        game.build("p1", owned.0, owned.1, BuildingKind::Barracks);
        let cost = BuildingSpec::for_kind(BuildingKind::Barracks).cost;
        assert_eq!(game.resource("p1"), before - cost);
    }

    #[test]
    fn mines_pay_more_than_other_buildings() {
        let mut game = new_match();
        game.buildings
            .push(Building::new("p1", BuildingKind::Mine, 5, 5));
        game.buildings
            .push(Building::new("p2", BuildingKind::Barracks, 6, 5));

        game.economy_system(1.0);

        assert_eq!(game.resource("p1"), game.tuning.mine_income);
        assert_eq!(game.resource("p2"), game.tuning.building_income);
    }

    #[test]
    fn cleanup_removes_exactly_dead_and_out_of_bounds_units() {
        let mut game = new_match();
        add_unit(&mut game, "p1", UnitKind::Melee, 5.0, 5.0);
        add_unit(&mut game, "p1", UnitKind::Melee, 6.0, 5.0);
        add_unit(&mut game, "p1", UnitKind::Melee, 7.0, 5.0);
        game.units[1].hp = 0.0;
        game.units[2].x = game.grid.size() as f32 + 1.0;

        game.projectiles
            .push(Projectile::new("p1", (0.0, 0.0), (1.0, 1.0), -0.1));

        game.cleanup_system();

        assert_eq!(game.units.len(), 1);
        assert_eq!(game.units[0].tile(), (5, 5));
        assert!(game.projectiles.is_empty());
    }

    #[test]
    fn spawn_system_respects_cooldowns_and_producers() {
        let mut game = new_match();
        game.buildings
            .push(Building::new("p1", BuildingKind::Barracks, 5, 5));
        game.buildings
            .push(Building::new("p1", BuildingKind::Turret, 6, 5));

        // Fresh buildings spawn immediately, turrets never do
        game.spawn_system(DT);
        assert_eq!(game.units.len(), 1);
        assert_eq!(game.units[0].kind, UnitKind::Melee);

        // Cooldown holds until the archetype interval elapses
        game.spawn_system(DT);
        assert_eq!(game.units.len(), 1);
        let interval = UnitStats::for_kind(UnitKind::Melee).spawn_interval;
        for _ in 0..(interval / DT).ceil() as usize {
            game.spawn_system(DT);
        }
        assert_eq!(game.units.len(), 2);
    }

    #[test]
    fn full_tick_keeps_ai_factions_acting() {
        let mut game = new_match();
        let (tx, _rx) = channel();
        game.join("p1", tx);

        for _ in 0..30 {
            game.update(DT);
        }
        // AI bases keep producing even with no human input
        assert!(game.units.iter().any(|u| u.owner.starts_with("ai_")));
        assert_eq!(game.tick, 30);
    }

    #[test]
    fn scripted_ai_builds_beyond_its_starter_kit() {
        let mut game = new_match();
        let (tx, _rx) = channel();
        game.join("p1", tx);

        for _ in 0..50 {
            game.update(DT);
        }

        // Starter kit is base + barracks + mine; anything past three means
        // the decision source drove a build through the shared action path
        for ai in AI_ROSTER {
            let owned = game.buildings.iter().filter(|b| b.owner == ai).count();
            assert!(owned > 3, "{} never built past its starter kit", ai);
        }
    }

    #[test]
    fn snapshot_round_trip_preserves_all_counts() {
        let mut game = new_match();
        let (tx, _rx) = channel();
        game.join("p1", tx);
        for _ in 0..10 {
            game.update(DT);
        }
        game.cast("p1", (3.0, 3.0), AbilityKind::Bombard);

        let json = serde_json::to_string(&game.snapshot()).unwrap();
        let parsed: ServerMsg = serde_json::from_str(&json).unwrap();
        match parsed {
            ServerMsg::MatchState {
                tick,
                tiles,
                units,
                buildings,
                projectiles,
                resources,
                players,
            } => {
                assert_eq!(tick, game.tick);
                assert_eq!(tiles.len(), game.grid.tiles().len());
                assert_eq!(units.len(), game.units.len());
                assert_eq!(buildings.len(), game.buildings.len());
                assert_eq!(projectiles.len(), game.projectiles.len());
                assert_eq!(resources.len(), game.resources.len());
                assert_eq!(players.len(), game.connections.len());
            }
            other => panic!("expected match_state, got {:?}", other),
        }
    }
}
