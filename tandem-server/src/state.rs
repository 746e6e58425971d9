//! Application state shared by all handlers.

use crate::config::ServerConfig;
use crate::engine::RelationshipEngine;
use crate::error::SocialError;
use crate::queries::QueryFacade;
use crate::recommend::RecommendationEngine;
use crate::store::Store;
use crate::users::UserDirectory;

#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub store: Store,
    pub directory: UserDirectory,
    pub relationships: RelationshipEngine,
    pub recommendations: RecommendationEngine,
    pub queries: QueryFacade,
}

impl AppState {
    pub fn new(store: Store, config: ServerConfig) -> Self {
        let directory = store.directory();
        Self {
            relationships: RelationshipEngine::new(store.clone(), config.policy.clone()),
            recommendations: RecommendationEngine::new(directory.clone()),
            queries: QueryFacade::new(
                directory.clone(),
                store.requests(),
                config.policy.accepted_direction,
            ),
            directory,
            store,
            config,
        }
    }

    /// Opens the configured database, or a temporary one when no data dir is set.
    pub fn open(config: ServerConfig) -> Result<Self, SocialError> {
        let store = match &config.data_dir {
            Some(dir) => Store::open(dir)?,
            None => Store::temporary()?,
        };
        Ok(Self::new(store, config))
    }
}
