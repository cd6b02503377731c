//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{SessionRegistry, TickScheduler};
use crate::lobby::LobbyService;
use crate::ws::dispatcher::InputDispatcher;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<SessionRegistry>,
    pub dispatcher: Arc<InputDispatcher>,
    pub scheduler: Arc<TickScheduler>,
    pub lobby: Arc<LobbyService>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        let registry = Arc::new(SessionRegistry::new());
        let dispatcher = Arc::new(InputDispatcher::new(registry.clone(), &config.game));
        let scheduler = Arc::new(TickScheduler::new(registry.clone(), &config.game));

        let lobby = Arc::new(LobbyService::new(
            config.clone(),
            registry.clone(),
            dispatcher.clone(),
            scheduler.clone(),
        ));

        Self {
            config,
            registry,
            dispatcher,
            scheduler,
            lobby,
        }
    }
}
