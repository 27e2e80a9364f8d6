//! Application configuration.
//!
//! Everything here is resolved once at process start; a missing required
//! value (the reviews table, the issuer) is a startup failure, never a
//! per-request error.

use anyhow::{Result, bail};

use crate::auth::well_known_jwks_url;
use crate::db::DatabaseConfig;

/// Where the verifier finds the issuer's key material, and how it selects a
/// key from the set.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Full JWKS document URL.
    pub jwks_url: String,
    /// Ignore the token `kid` and always use the first key in the set
    /// (compatibility mode).
    pub use_first_key: bool,
}

impl AuthSettings {
    /// Resolve the JWKS URL from an explicit override or from the issuer's
    /// well-known per-pool, per-region location.
    pub fn resolve(
        jwks_url: Option<String>,
        region: Option<&str>,
        user_pool_id: Option<&str>,
        use_first_key: bool,
    ) -> Result<Self> {
        let jwks_url = match (jwks_url, region, user_pool_id) {
            (Some(url), _, _) => url,
            (None, Some(region), Some(pool)) => well_known_jwks_url(region, pool),
            _ => bail!(
                "issuer not configured: set --jwks-url, or both --region and --user-pool-id"
            ),
        };

        Ok(Self {
            jwks_url,
            use_first_key,
        })
    }
}

/// The full startup configuration for the service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    /// Name of the review table; required, validated at startup.
    pub table: String,
    pub auth: AuthSettings,
}
