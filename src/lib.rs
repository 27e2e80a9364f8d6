// Core modules
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod model;

// Re-export key types and functions
pub use auth::{AccessDecision, Authorizer, Effect, KeyMaterialCache, TokenVerifier};
pub use config::{AppConfig, AuthSettings};
pub use db::{DatabaseConfig, ReviewStore, create_connection, ensure_schema};
pub use model::{Review, classify};

use std::sync::Arc;

use anyhow::Result;
use axum::Router;

/// Build the fully wired application router: store connection, schema, key
/// cache, verifier, authorizer gate, and routes.
pub async fn create_app(config: AppConfig) -> Result<Router> {
    let db = create_connection(config.database).await?;
    ensure_schema(&db, &config.table).await?;
    let store = ReviewStore::new(db, config.table);

    let keys = Arc::new(KeyMaterialCache::new(config.auth.jwks_url));
    let verifier = if config.auth.use_first_key {
        TokenVerifier::new(keys).with_first_key_only()
    } else {
        TokenVerifier::new(keys)
    };
    let authorizer = Arc::new(Authorizer::new(verifier));

    Ok(api::create_router(store, authorizer))
}
