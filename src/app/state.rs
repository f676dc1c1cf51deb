//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::tuning::Tuning;
use crate::game::MatchManager;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub manager: Arc<MatchManager>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        let tuning = Tuning {
            grid_size: config.grid_size,
            ..Tuning::default()
        };

        let manager = Arc::new(MatchManager::new(tuning, config.world_seed));

        Self { config, manager }
    }
}
