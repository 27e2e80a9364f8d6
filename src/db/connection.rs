use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::env;
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;

pub type Db = Surreal<Any>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: env::var("SURREALDB_URL").unwrap_or_else(|_| "memory".to_string()),
            namespace: env::var("SURREALDB_NAMESPACE").unwrap_or_else(|_| "reelgate".to_string()),
            database: env::var("SURREALDB_DATABASE").unwrap_or_else(|_| "reviews".to_string()),
            username: env::var("SURREALDB_USERNAME").ok(),
            password: env::var("SURREALDB_PASSWORD").ok(),
        }
    }
}

pub async fn create_connection(config: DatabaseConfig) -> Result<Db> {
    let db = surrealdb::engine::any::connect(config.url).await?;

    // Sign in if credentials are provided
    if let (Some(username), Some(password)) = (config.username, config.password) {
        db.signin(Root {
            username: &username,
            password: &password,
        })
        .await?;
    }

    db.use_ns(config.namespace).use_db(config.database).await?;

    Ok(db)
}

/// Define the review table and its fields.
///
/// The table name is configurable (it arrives from the environment at
/// startup), so it is validated before being interpolated into DDL.
pub async fn ensure_schema(db: &Db, table: &str) -> Result<()> {
    validate_table_name(table)?;

    let ddl = format!(
        "DEFINE TABLE IF NOT EXISTS {table} SCHEMAFULL;
         DEFINE FIELD IF NOT EXISTS movieId ON TABLE {table} TYPE int;
         DEFINE FIELD IF NOT EXISTS reviewerName ON TABLE {table} TYPE string;
         DEFINE FIELD IF NOT EXISTS content ON TABLE {table} TYPE string;
         DEFINE FIELD IF NOT EXISTS reviewDate ON TABLE {table} TYPE string;
         DEFINE FIELD IF NOT EXISTS rating ON TABLE {table} TYPE int;
         DEFINE INDEX IF NOT EXISTS {table}_movie_id ON TABLE {table} COLUMNS movieId;"
    );

    db.query(ddl).await?;

    Ok(())
}

/// Table identifiers come from configuration, not request input, but they are
/// interpolated into query text and so must stay plain identifiers.
pub fn validate_table_name(table: &str) -> Result<()> {
    if table.is_empty() {
        bail!("table name must not be empty");
    }
    if !table
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        bail!("table name `{}` must be alphanumeric/underscore", table);
    }
    Ok(())
}
