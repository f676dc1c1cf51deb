//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unit archetypes available in the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// Cheap frontline brawler
    Melee,
    /// Fragile, cheap to field
    Ranged,
    /// Slow, heavily armored
    Tank,
    /// Splashes damage across a contested tile
    Mage,
    /// Flies over any terrain
    Air,
    /// Water-bound, hits hard
    Ship,
}

/// Building kinds a faction can own or construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildingKind {
    Base,
    Barracks,
    Archery,
    Factory,
    MageTower,
    Turret,
    Mine,
    Dock,
    Airfield,
}

/// Tile terrain kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerrainKind {
    Plain,
    /// Elevated defensive ground
    Defense,
    Resource,
    Water,
    /// Special-event tile
    Event,
}

/// Player-castable abilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityKind {
    /// Spawn a small squad at an owned anchor tile near the target
    Reinforce,
    /// Long-range area bombardment, no ownership range check
    Bombard,
}

impl Default for AbilityKind {
    fn default() -> Self {
        Self::Reinforce
    }
}

/// Event log categories for client notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Info,
    Combat,
    Build,
}

/// World-space target point (continuous coordinates)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TargetPoint {
    pub x: f32,
    pub y: f32,
}

/// Grid tile reference
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TilePoint {
    pub x: i32,
    pub y: i32,
}

/// Messages sent from client to server
///
/// `buildingType` parses into [`BuildingKind`], so a request carrying an
/// unknown kind fails deserialization and the whole message is dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Join (or lazily create) a match
    #[serde(rename_all = "camelCase")]
    JoinMatch {
        match_id: String,
        /// Used verbatim as the faction identifier (auth is out of scope)
        auth_token: String,
    },

    /// Cast an ability at a world position
    #[serde(rename_all = "camelCase")]
    AbilityUse {
        match_id: String,
        player_id: String,
        target: TargetPoint,
        #[serde(default)]
        ability: AbilityKind,
    },

    /// Request construction of a building on an owned tile
    #[serde(rename_all = "camelCase")]
    BuildRequest {
        match_id: String,
        player_id: String,
        tile: TilePoint,
        building_type: BuildingKind,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Full state snapshot (sent every second tick, and on join)
    MatchState {
        tick: u64,
        tiles: Vec<TileState>,
        units: Vec<UnitState>,
        buildings: Vec<BuildingState>,
        projectiles: Vec<ProjectileState>,
        /// Per-faction resource balances
        resources: HashMap<String, f32>,
        /// Connected faction identifiers
        players: Vec<PlayerInfo>,
    },

    /// Free-text notification, pushed immediately when produced
    EventLog {
        message: String,
        category: EventCategory,
        timestamp: u64,
    },
}

/// Connected player entry in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: String,
}

/// Tile state on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileState {
    pub x: i32,
    pub y: i32,
    #[serde(rename = "type")]
    pub terrain: TerrainKind,
    pub owner: Option<String>,
    pub capture: f32,
    pub elevation: i32,
}

/// Unit state on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitState {
    pub id: Uuid,
    pub owner: String,
    #[serde(rename = "type")]
    pub kind: UnitKind,
    pub x: f32,
    pub y: f32,
    pub hp: f32,
    pub target_x: f32,
    pub target_y: f32,
}

/// Building state on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingState {
    pub id: Uuid,
    pub owner: String,
    #[serde(rename = "type")]
    pub kind: BuildingKind,
    pub x: i32,
    pub y: i32,
    pub hp: f32,
    pub level: u32,
}

/// Projectile state on the wire (client-side effect rendering only)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileState {
    pub id: Uuid,
    pub owner: String,
    pub x: f32,
    pub y: f32,
    pub target_x: f32,
    pub target_y: f32,
    pub ttl: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_match_parses_camel_case_fields() {
        let raw = r#"{"type":"join_match","matchId":"alpha","authToken":"p1"}"#;
        let msg: ClientMsg = serde_json::from_str(raw).unwrap();
        match msg {
            ClientMsg::JoinMatch {
                match_id,
                auth_token,
            } => {
                assert_eq!(match_id, "alpha");
                assert_eq!(auth_token, "p1");
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn ability_use_defaults_to_reinforce_when_omitted() {
        let raw = r#"{"type":"ability_use","matchId":"alpha","playerId":"p1","target":{"x":4.0,"y":5.0}}"#;
        let msg: ClientMsg = serde_json::from_str(raw).unwrap();
        match msg {
            ClientMsg::AbilityUse {
                ability, target, ..
            } => {
                assert_eq!(ability, AbilityKind::Reinforce);
                assert_eq!(target.x, 4.0);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn build_request_parses_kebab_case_kind() {
        let raw = r#"{"type":"build_request","matchId":"alpha","playerId":"p1","tile":{"x":2,"y":3},"buildingType":"mage-tower"}"#;
        let msg: ClientMsg = serde_json::from_str(raw).unwrap();
        match msg {
            ClientMsg::BuildRequest { building_type, .. } => {
                assert_eq!(building_type, BuildingKind::MageTower);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn build_request_rejects_unknown_building_kind() {
        let raw = r#"{"type":"build_request","matchId":"alpha","playerId":"p1","tile":{"x":2,"y":3},"buildingType":"wonder"}"#;
        assert!(serde_json::from_str::<ClientMsg>(raw).is_err());
    }

    #[test]
    fn malformed_message_shape_is_an_error() {
        let raw = r#"{"type":"ability_use","matchId":"alpha","playerId":"p1","target":{"x":"no"}}"#;
        assert!(serde_json::from_str::<ClientMsg>(raw).is_err());
    }

    #[test]
    fn unit_state_serializes_kind_under_type_key() {
        let unit = UnitState {
            id: Uuid::new_v4(),
            owner: "p1".to_string(),
            kind: UnitKind::Ship,
            x: 1.5,
            y: 2.5,
            hp: 150.0,
            target_x: 8.0,
            target_y: 8.0,
        };
        let json = serde_json::to_value(&unit).unwrap();
        assert_eq!(json["type"], "ship");
        assert!(json["targetX"].is_number());
    }
}
