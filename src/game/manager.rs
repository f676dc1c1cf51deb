//! Match manager - owns live matches, drives the global tick timer,
//! routes inbound messages

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, info};

use crate::game::r#match::GameMatch;
use crate::game::tuning::Tuning;
use crate::util::time::{tick_delta, TICK_DURATION_MICROS};
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Admin-facing summary of a live match
#[derive(Debug, Clone, Serialize)]
pub struct MatchSummary {
    pub id: String,
    pub tick: u64,
    pub connections: usize,
    pub factions: Vec<String>,
}

/// Owns the matchId -> Match mapping and the global fixed-interval timer.
/// Each match is behind its own mutex: the tick loop and the message router
/// both lock per match, so no stage ever observes partial state.
pub struct MatchManager {
    matches: DashMap<String, Arc<Mutex<GameMatch>>>,
    tuning: Tuning,
    seed_override: Option<u64>,
}

impl MatchManager {
    pub fn new(tuning: Tuning, seed_override: Option<u64>) -> Self {
        Self {
            matches: DashMap::new(),
            tuning,
            seed_override,
        }
    }

    /// Route one inbound client message. Unknown match ids on action
    /// messages are dropped; a stale message from a disconnected client
    /// must never take the manager down.
    pub fn handle_message(&self, tx: &mpsc::UnboundedSender<ServerMsg>, msg: ClientMsg) {
        match msg {
            ClientMsg::JoinMatch {
                match_id,
                auth_token,
            } => {
                let faction = if auth_token.is_empty() {
                    "player"
                } else {
                    auth_token.as_str()
                };
                self.route_join(tx.clone(), &match_id, faction);
            }
            ClientMsg::AbilityUse {
                match_id,
                player_id,
                target,
                ability,
            } => {
                self.route_ability(&match_id, &player_id, (target.x, target.y), ability);
            }
            ClientMsg::BuildRequest {
                match_id,
                player_id,
                tile,
                building_type,
            } => {
                self.route_build(&match_id, &player_id, tile.x, tile.y, building_type);
            }
        }
    }

    /// Look up or lazily create the match, then delegate the join.
    /// The entry API makes concurrent creation first-writer-wins.
    pub fn route_join(
        &self,
        tx: mpsc::UnboundedSender<ServerMsg>,
        match_id: &str,
        faction: &str,
    ) {
        let game = self
            .matches
            .entry(match_id.to_string())
            .or_insert_with(|| {
                let seed = self.seed_override.unwrap_or_else(rand::random);
                info!(match_id = %match_id, seed, "Creating match");
                Arc::new(Mutex::new(GameMatch::new(match_id, seed, self.tuning.clone())))
            })
            .clone();

        game.lock().join(faction, tx);
    }

    pub fn route_ability(
        &self,
        match_id: &str,
        faction: &str,
        target: (f32, f32),
        ability: crate::ws::protocol::AbilityKind,
    ) {
        match self.matches.get(match_id) {
            Some(game) => game.lock().cast(faction, target, ability),
            None => debug!(match_id = %match_id, "Dropping ability for unknown match"),
        }
    }

    pub fn route_build(
        &self,
        match_id: &str,
        faction: &str,
        x: i32,
        y: i32,
        kind: crate::ws::protocol::BuildingKind,
    ) {
        match self.matches.get(match_id) {
            Some(game) => game.lock().build(faction, x, y, kind),
            None => debug!(match_id = %match_id, "Dropping build for unknown match"),
        }
    }

    /// Drive every live match with a fixed `dt` on a fixed interval.
    /// The delta is the configured tick period, not measured wall clock,
    /// so simulation speed is immune to scheduler jitter.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = interval(Duration::from_micros(TICK_DURATION_MICROS));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!("Match manager tick loop started");
        loop {
            ticker.tick().await;
            let dt = tick_delta();
            for entry in self.matches.iter() {
                entry.value().lock().update(dt);
            }
        }
    }

    /// Admin surface: list live matches
    pub fn list(&self) -> Vec<MatchSummary> {
        self.matches
            .iter()
            .map(|entry| {
                let game = entry.value().lock();
                MatchSummary {
                    id: game.id().to_string(),
                    tick: game.tick(),
                    connections: game.connection_count(),
                    factions: game.connected_factions(),
                }
            })
            .collect()
    }

    /// Admin surface: stop and drop a match. Connections are released with
    /// it; returns false for unknown ids.
    pub fn stop(&self, match_id: &str) -> bool {
        let removed = self.matches.remove(match_id).is_some();
        if removed {
            info!(match_id = %match_id, "Match stopped");
        }
        removed
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }

    pub fn total_connections(&self) -> usize {
        self.matches
            .iter()
            .map(|entry| entry.value().lock().connection_count())
            .sum()
    }
}
