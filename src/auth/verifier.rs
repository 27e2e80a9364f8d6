//! Credential verification against the issuer's cached key material.

use std::sync::Arc;

use jsonwebtoken::{Algorithm, Validation, decode, decode_header};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::auth::jwks::{KeyMaterialCache, KeyMaterialError, jwk_to_decoding_key};

/// Identity extracted from a verified credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    pub sub: String,
    pub email: Option<String>,
}

/// The claim shape this core supports: subject plus email.
#[derive(Debug, Deserialize)]
struct TokenPayload {
    sub: String,
    email: Option<String>,
}

#[derive(Debug)]
enum VerifyError {
    Keys(KeyMaterialError),
    Token(jsonwebtoken::errors::Error),
}

impl std::fmt::Display for VerifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keys(e) => write!(f, "key material unavailable: {}", e),
            Self::Token(e) => write!(f, "token rejected: {}", e),
        }
    }
}

/// Verifies a credential's signature and expiry against the cached key set
/// and extracts identity claims.
///
/// Verification is restricted to RS256; `exp` is checked as part of decoding.
/// Total failure collapses to `None` — the caller turns that into a deny
/// decision, and the underlying cause is only logged for operators.
pub struct TokenVerifier {
    keys: Arc<KeyMaterialCache>,
    use_first_key: bool,
}

impl TokenVerifier {
    pub fn new(keys: Arc<KeyMaterialCache>) -> Self {
        Self {
            keys,
            use_first_key: false,
        }
    }

    /// Always select the first key in the set, ignoring the token's `kid`.
    /// Compatibility mode matching the original behavior.
    pub fn with_first_key_only(mut self) -> Self {
        self.use_first_key = true;
        self
    }

    /// Verify a credential. Never fails outward: any failure (network,
    /// malformed key, bad signature, expired token, malformed payload)
    /// returns `None`.
    pub async fn verify(&self, token: &str) -> Option<IdentityClaims> {
        match self.verify_inner(token).await {
            Ok(claims) => {
                debug!(sub = %claims.sub, "credential verified");
                Some(claims)
            }
            Err(e) => {
                warn!("Token verification failed: {}", e);
                None
            }
        }
    }

    async fn verify_inner(&self, token: &str) -> Result<IdentityClaims, VerifyError> {
        let kid = if self.use_first_key {
            None
        } else {
            decode_header(token).map_err(VerifyError::Token)?.kid
        };

        let jwk = self
            .keys
            .select_key(kid.as_deref())
            .await
            .map_err(VerifyError::Keys)?;
        let decoding_key = jwk_to_decoding_key(jwk).map_err(VerifyError::Keys)?;

        let validation = Validation::new(Algorithm::RS256);
        let data =
            decode::<TokenPayload>(token, &decoding_key, &validation).map_err(VerifyError::Token)?;

        Ok(IdentityClaims {
            sub: data.claims.sub,
            email: data.claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testkit::{serve_test_jwks, sign_token, unix_now};

    async fn test_verifier() -> TokenVerifier {
        let url = serve_test_jwks().await;
        TokenVerifier::new(Arc::new(KeyMaterialCache::new(url)))
    }

    #[tokio::test]
    async fn valid_credential_yields_its_embedded_claims() {
        let verifier = test_verifier().await;
        let token = sign_token("user-123", Some("ann@example.com"), unix_now() + 3600);

        let claims = verifier.verify(&token).await.unwrap();
        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.email.as_deref(), Some("ann@example.com"));
    }

    #[tokio::test]
    async fn claims_without_email_still_verify() {
        let verifier = test_verifier().await;
        let token = sign_token("user-123", None, unix_now() + 3600);

        let claims = verifier.verify(&token).await.unwrap();
        assert_eq!(claims.sub, "user-123");
        assert!(claims.email.is_none());
    }

    #[tokio::test]
    async fn tampered_signature_collapses_to_none() {
        let verifier = test_verifier().await;
        let token = sign_token("user-123", None, unix_now() + 3600);

        // Flip one character inside the signature segment
        let mut tampered = token.clone();
        let sig_start = token.rfind('.').unwrap() + 1;
        let byte = tampered.as_bytes()[sig_start + 4];
        let replacement = if byte == b'A' { 'B' } else { 'A' };
        tampered.replace_range(sig_start + 4..sig_start + 5, &replacement.to_string());

        assert!(verifier.verify(&tampered).await.is_none());
    }

    #[tokio::test]
    async fn expired_credential_collapses_to_none() {
        let verifier = test_verifier().await;
        let token = sign_token("user-123", None, unix_now() - 3600);

        assert!(verifier.verify(&token).await.is_none());
    }

    #[tokio::test]
    async fn garbage_credential_collapses_to_none() {
        let verifier = test_verifier().await;
        assert!(verifier.verify("not-a-jwt").await.is_none());
        assert!(verifier.verify("").await.is_none());
    }

    #[tokio::test]
    async fn unreachable_issuer_collapses_to_none() {
        let cache = Arc::new(KeyMaterialCache::new(
            "http://127.0.0.1:1/jwks.json".to_string(),
        ));
        let verifier = TokenVerifier::new(cache);
        let token = sign_token("user-123", None, unix_now() + 3600);

        assert!(verifier.verify(&token).await.is_none());
    }

    #[tokio::test]
    async fn first_key_compatibility_mode_still_verifies() {
        let url = serve_test_jwks().await;
        let verifier =
            TokenVerifier::new(Arc::new(KeyMaterialCache::new(url))).with_first_key_only();
        let token = sign_token("user-123", None, unix_now() + 3600);

        assert!(verifier.verify(&token).await.is_some());
    }
}
