pub mod config;
pub mod error;
pub mod gateway;
pub mod routes;

use std::sync::Arc;

use config::Config;
use gateway::fanout::Fanout;
use gateway::registry::ConnectionRegistry;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<ConnectionRegistry>,
    pub fanout: Fanout,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let fanout = Fanout::new(registry.clone(), config.delivery_timeout);
        Self {
            config: Arc::new(config),
            registry,
            fanout,
        }
    }
}
