//! Issuer key material: JWKS fetching and the process-lifetime cache.
//!
//! The public-key set is fetched lazily over HTTPS from the issuer's
//! well-known URL and cached write-once for the remaining process lifetime.
//! There is no TTL and no background refresh; a key rotation at the issuer
//! requires a fresh process.

use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::debug;

/// A single JSON Web Key from the issuer's JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type (e.g., "RSA")
    pub kty: String,
    /// Key ID, matched against the JWT header kid
    pub kid: Option<String>,
    /// Algorithm (e.g., "RS256")
    pub alg: Option<String>,
    /// Key use (e.g., "sig" for signature)
    #[serde(rename = "use")]
    pub key_use: Option<String>,
    /// RSA modulus (base64url encoded)
    pub n: Option<String>,
    /// RSA exponent (base64url encoded)
    pub e: Option<String>,
}

/// A JWKS document containing multiple keys.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksDocument {
    pub keys: Vec<Jwk>,
}

/// Errors from fetching or using issuer key material.
#[derive(Debug, Clone)]
pub enum KeyMaterialError {
    /// Failed to fetch the JWKS document from the issuer.
    FetchError(String),
    /// Failed to parse the JWKS response or a key inside it.
    ParseError(String),
    /// The fetched document contained no keys.
    NoKeysAvailable,
}

impl std::fmt::Display for KeyMaterialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FetchError(msg) => write!(f, "Failed to fetch JWKS: {}", msg),
            Self::ParseError(msg) => write!(f, "Failed to parse JWKS: {}", msg),
            Self::NoKeysAvailable => write!(f, "No keys available in JWKS"),
        }
    }
}

impl std::error::Error for KeyMaterialError {}

/// Well-known JWKS URL for a user pool in a region.
pub fn well_known_jwks_url(region: &str, user_pool_id: &str) -> String {
    format!(
        "https://cognito-idp.{}.amazonaws.com/{}/.well-known/jwks.json",
        region, user_pool_id
    )
}

/// Write-once, process-lifetime cache of the issuer's public-key set.
///
/// Modeled as a single-slot memoized value behind an accessor rather than a
/// bare mutable global; callers inject it as a constructor-scoped dependency
/// so tests can point it at a local issuer. Concurrent readers are safe
/// without a lock once populated; the fetch is idempotent, so a racing
/// double-initialization would waste at most one network call.
pub struct KeyMaterialCache {
    jwks_url: String,
    keys: OnceCell<Vec<Jwk>>,
    client: reqwest::Client,
}

impl KeyMaterialCache {
    pub fn new(jwks_url: String) -> Self {
        Self {
            jwks_url,
            keys: OnceCell::new(),
            client: reqwest::Client::new(),
        }
    }

    /// The cached key set, fetching it on first use.
    pub async fn keys(&self) -> Result<&[Jwk], KeyMaterialError> {
        let keys = self.keys.get_or_try_init(|| self.fetch_keys()).await?;
        Ok(keys.as_slice())
    }

    /// Select a key from the cached set.
    ///
    /// When `kid` is given and present in the set, that key wins; otherwise
    /// the first key in the set is used. Passing `None` reproduces the
    /// original first-key behavior as a compatibility mode.
    pub async fn select_key(&self, kid: Option<&str>) -> Result<&Jwk, KeyMaterialError> {
        let keys = self.keys().await?;

        if let Some(kid) = kid
            && let Some(key) = keys.iter().find(|k| k.kid.as_deref() == Some(kid))
        {
            return Ok(key);
        }

        keys.first().ok_or(KeyMaterialError::NoKeysAvailable)
    }

    /// Whether the cache has been populated for this process.
    pub fn is_populated(&self) -> bool {
        self.keys.initialized()
    }

    async fn fetch_keys(&self) -> Result<Vec<Jwk>, KeyMaterialError> {
        debug!("Fetching JWKS from {}", self.jwks_url);

        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| KeyMaterialError::FetchError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(KeyMaterialError::FetchError(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        let jwks: JwksDocument = response
            .json()
            .await
            .map_err(|e| KeyMaterialError::ParseError(e.to_string()))?;

        if jwks.keys.is_empty() {
            return Err(KeyMaterialError::NoKeysAvailable);
        }

        debug!("Cached {} keys for the process lifetime", jwks.keys.len());
        Ok(jwks.keys)
    }
}

/// Convert a JWK's RSA components into a usable decoding key.
pub fn jwk_to_decoding_key(jwk: &Jwk) -> Result<DecodingKey, KeyMaterialError> {
    if jwk.kty != "RSA" {
        return Err(KeyMaterialError::ParseError(format!(
            "Unsupported key type: {}",
            jwk.kty
        )));
    }

    let n = jwk
        .n
        .as_ref()
        .ok_or_else(|| KeyMaterialError::ParseError("Missing 'n' in RSA key".to_string()))?;
    let e = jwk
        .e
        .as_ref()
        .ok_or_else(|| KeyMaterialError::ParseError("Missing 'e' in RSA key".to_string()))?;

    DecodingKey::from_rsa_components(n, e)
        .map_err(|e| KeyMaterialError::ParseError(format!("Invalid RSA components: {}", e)))
}
