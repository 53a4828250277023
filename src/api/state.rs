//! Application state shared by every handler.

use std::sync::Arc;

use crate::config::Config;
use crate::infra::{Cache, Database, Mailer};
use crate::services::{ServiceContainer, Services};

/// Application state (DI container).
///
/// Redis and the database handle are optional so the router can be driven
/// in tests with only a mocked [`ServiceContainer`]. Without a cache, rate
/// limiting is skipped; without a database, health reports it as absent.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<dyn ServiceContainer>,
    pub cache: Option<Arc<Cache>>,
    pub database: Option<Arc<Database>>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Production wiring over a connected database.
    pub fn from_config(
        database: Arc<Database>,
        cache: Option<Arc<Cache>>,
        mailer: Arc<dyn Mailer>,
        config: Config,
    ) -> Self {
        let services = Services::from_connection(database.get_connection(), mailer, config.clone());

        Self {
            services: Arc::new(services),
            cache,
            database: Some(database),
            config: Arc::new(config),
        }
    }

    /// State around an arbitrary container, with no infrastructure attached.
    pub fn new(services: Arc<dyn ServiceContainer>, config: Config) -> Self {
        Self {
            services,
            cache: None,
            database: None,
            config: Arc::new(config),
        }
    }

    pub fn with_cache(mut self, cache: Arc<Cache>) -> Self {
        self.cache = Some(cache);
        self
    }
}
