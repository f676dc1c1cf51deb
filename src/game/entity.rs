//! Entity registry types - units, buildings, projectiles

use uuid::Uuid;

use crate::ws::protocol::{
    BuildingKind, BuildingState, ProjectileState, UnitKind, UnitState,
};

/// Archetype-fixed base stats per unit kind
#[derive(Debug, Clone, Copy)]
pub struct UnitStats {
    pub max_hp: f32,
    /// Damage dealt per combat tick in a contested tile
    pub damage: f32,
    /// Tiles per second
    pub speed: f32,
    pub can_sail: bool,
    pub can_fly: bool,
    /// Production cooldown at the building that spawns this archetype
    pub spawn_interval: f32,
}

impl UnitStats {
    pub fn for_kind(kind: UnitKind) -> Self {
        match kind {
            UnitKind::Melee => Self {
                max_hp: 100.0,
                damage: 12.0,
                speed: 3.0,
                can_sail: false,
                can_fly: false,
                spawn_interval: 1.5,
            },
            UnitKind::Ranged => Self {
                max_hp: 70.0,
                damage: 9.0,
                speed: 3.0,
                can_sail: false,
                can_fly: false,
                spawn_interval: 2.0,
            },
            UnitKind::Tank => Self {
                max_hp: 220.0,
                damage: 16.0,
                speed: 1.5,
                can_sail: false,
                can_fly: false,
                spawn_interval: 4.0,
            },
            UnitKind::Mage => Self {
                max_hp: 60.0,
                damage: 8.0,
                speed: 2.5,
                can_sail: false,
                can_fly: false,
                spawn_interval: 3.0,
            },
            UnitKind::Air => Self {
                max_hp: 80.0,
                damage: 10.0,
                speed: 4.0,
                can_sail: false,
                can_fly: true,
                spawn_interval: 3.5,
            },
            UnitKind::Ship => Self {
                max_hp: 150.0,
                damage: 14.0,
                speed: 2.5,
                can_sail: true,
                can_fly: false,
                spawn_interval: 4.0,
            },
        }
    }
}

/// A unit on the map, continuous position
#[derive(Debug, Clone)]
pub struct Unit {
    pub id: Uuid,
    pub owner: String,
    pub kind: UnitKind,
    pub x: f32,
    pub y: f32,
    pub hp: f32,
    pub target_x: f32,
    pub target_y: f32,
}

impl Unit {
    pub fn new(owner: &str, kind: UnitKind, x: f32, y: f32, target: (f32, f32)) -> Self {
        let stats = UnitStats::for_kind(kind);
        Self {
            id: Uuid::new_v4(),
            owner: owner.to_string(),
            kind,
            x,
            y,
            hp: stats.max_hp,
            target_x: target.0,
            target_y: target.1,
        }
    }

    pub fn stats(&self) -> UnitStats {
        UnitStats::for_kind(self.kind)
    }

    /// Ground units are the only ones that accumulate capture progress
    pub fn is_ground(&self) -> bool {
        let stats = self.stats();
        !stats.can_fly && !stats.can_sail
    }

    pub fn tile(&self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }

    pub fn to_state(&self) -> UnitState {
        UnitState {
            id: self.id,
            owner: self.owner.clone(),
            kind: self.kind,
            x: self.x,
            y: self.y,
            hp: self.hp,
            target_x: self.target_x,
            target_y: self.target_y,
        }
    }
}

/// Per-kind building properties
#[derive(Debug, Clone, Copy)]
pub struct BuildingSpec {
    pub cost: f32,
    pub max_hp: f32,
    /// Unit archetype produced on cooldown expiry; turrets and mines produce none
    pub produces: Option<UnitKind>,
}

impl BuildingSpec {
    pub fn for_kind(kind: BuildingKind) -> Self {
        match kind {
            BuildingKind::Base => Self {
                cost: 500.0,
                max_hp: 1000.0,
                produces: Some(UnitKind::Melee),
            },
            BuildingKind::Barracks => Self {
                cost: 100.0,
                max_hp: 300.0,
                produces: Some(UnitKind::Melee),
            },
            BuildingKind::Archery => Self {
                cost: 120.0,
                max_hp: 250.0,
                produces: Some(UnitKind::Ranged),
            },
            BuildingKind::Factory => Self {
                cost: 200.0,
                max_hp: 400.0,
                produces: Some(UnitKind::Tank),
            },
            BuildingKind::MageTower => Self {
                cost: 180.0,
                max_hp: 220.0,
                produces: Some(UnitKind::Mage),
            },
            BuildingKind::Turret => Self {
                cost: 150.0,
                max_hp: 350.0,
                produces: None,
            },
            BuildingKind::Mine => Self {
                cost: 120.0,
                max_hp: 200.0,
                produces: None,
            },
            BuildingKind::Dock => Self {
                cost: 140.0,
                max_hp: 300.0,
                produces: Some(UnitKind::Ship),
            },
            BuildingKind::Airfield => Self {
                cost: 220.0,
                max_hp: 350.0,
                produces: Some(UnitKind::Air),
            },
        }
    }
}

/// A building anchored to a tile
#[derive(Debug, Clone)]
pub struct Building {
    pub id: Uuid,
    pub owner: String,
    pub kind: BuildingKind,
    pub x: i32,
    pub y: i32,
    pub hp: f32,
    pub level: u32,
    /// Seconds until the next unit spawn (unused for non-producing kinds)
    pub spawn_cooldown: f32,
}

impl Building {
    pub fn new(owner: &str, kind: BuildingKind, x: i32, y: i32) -> Self {
        let spec = BuildingSpec::for_kind(kind);
        Self {
            id: Uuid::new_v4(),
            owner: owner.to_string(),
            kind,
            x,
            y,
            hp: spec.max_hp,
            level: 1,
            spawn_cooldown: 0.0,
        }
    }

    pub fn to_state(&self) -> BuildingState {
        BuildingState {
            id: self.id,
            owner: self.owner.clone(),
            kind: self.kind,
            x: self.x,
            y: self.y,
            hp: self.hp,
            level: self.level,
        }
    }
}

/// Visual/telemetry artifact; damage is applied at cast time, not on impact
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: Uuid,
    pub owner: String,
    pub x: f32,
    pub y: f32,
    pub target_x: f32,
    pub target_y: f32,
    pub ttl: f32,
}

impl Projectile {
    pub fn new(owner: &str, origin: (f32, f32), target: (f32, f32), ttl: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner: owner.to_string(),
            x: origin.0,
            y: origin.1,
            target_x: target.0,
            target_y: target.1,
            ttl,
        }
    }

    /// Move toward the target proportionally to `dt`, arriving as ttl expires
    pub fn advance(&mut self, dt: f32) {
        let fraction = (dt / self.ttl.max(dt)).min(1.0);
        self.x += (self.target_x - self.x) * fraction;
        self.y += (self.target_y - self.y) * fraction;
        self.ttl -= dt;
    }

    pub fn expired(&self) -> bool {
        self.ttl <= 0.0
    }

    pub fn to_state(&self) -> ProjectileState {
        ProjectileState {
            id: self.id,
            owner: self.owner.clone(),
            x: self.x,
            y: self.y,
            target_x: self.target_x,
            target_y: self.target_y,
            ttl: self.ttl,
        }
    }
}
