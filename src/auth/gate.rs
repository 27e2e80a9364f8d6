//! The request authorizer and its enforcement at the HTTP layer.
//!
//! Mutating routes are gated: the cookie credential is extracted, verified,
//! and turned into an access decision scoped to the invoking method. A Deny
//! rejects the request with 403 and no body before the handler runs; the
//! decision document itself is never visible to downstream handlers.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, info};

use crate::auth::cookies::extract_token;
use crate::auth::policy::{AccessDecision, Effect};
use crate::auth::verifier::TokenVerifier;

/// Principal recorded on decisions for requests that carried no verifiable
/// identity.
const ANONYMOUS_PRINCIPAL: &str = "anonymous";

/// Runs the extract / verify / decide pipeline for one request.
pub struct Authorizer {
    verifier: TokenVerifier,
}

impl Authorizer {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self { verifier }
    }

    /// Produce an access decision for a request.
    ///
    /// Effect is Allow if and only if the extracted credential verified to
    /// non-null claims; every failure mode, including an absent cookie
    /// header, collapses to Deny.
    pub async fn authorize(&self, cookie_header: Option<&str>, method_arn: &str) -> AccessDecision {
        let claims = match extract_token(cookie_header) {
            Some(token) => self.verifier.verify(&token).await,
            None => None,
        };

        match claims {
            Some(claims) => AccessDecision::new(claims.sub, method_arn, Effect::Allow),
            None => AccessDecision::new(ANONYMOUS_PRINCIPAL, method_arn, Effect::Deny),
        }
    }
}

/// The single method identifier a decision is scoped to, e.g.
/// `POST /movies/reviews`.
pub fn method_arn(request: &Request) -> String {
    format!("{} {}", request.method(), request.uri().path())
}

/// Axum middleware enforcing the authorizer on the routes it wraps.
pub async fn require_authorization(
    State(authorizer): State<Arc<Authorizer>>,
    request: Request,
    next: Next,
) -> Response {
    let arn = method_arn(&request);
    let cookie_header = request
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok());

    let decision = authorizer.authorize(cookie_header, &arn).await;

    if decision.is_allow() {
        debug!(principal = %decision.principal_id, method = %arn, "request allowed");
        next.run(request).await
    } else {
        info!(method = %arn, "request denied by authorizer");
        StatusCode::FORBIDDEN.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwks::KeyMaterialCache;

    fn offline_authorizer() -> Authorizer {
        // Issuer unreachable: any credential that reaches verification fails
        let cache = Arc::new(KeyMaterialCache::new(
            "http://127.0.0.1:1/jwks.json".to_string(),
        ));
        Authorizer::new(TokenVerifier::new(cache))
    }

    #[tokio::test]
    async fn missing_cookie_header_denies_without_contacting_the_issuer() {
        let authorizer = offline_authorizer();
        let decision = authorizer.authorize(None, "POST /movies/reviews").await;

        assert!(!decision.is_allow());
        assert_eq!(decision.principal_id, ANONYMOUS_PRINCIPAL);
        assert_eq!(
            decision.policy_document.statement[0].resource,
            vec!["POST /movies/reviews".to_string()]
        );
    }

    #[tokio::test]
    async fn cookie_without_token_denies() {
        let authorizer = offline_authorizer();
        let decision = authorizer
            .authorize(Some("theme=dark"), "POST /movies/reviews")
            .await;
        assert!(!decision.is_allow());
    }

    #[tokio::test]
    async fn unverifiable_token_denies() {
        let authorizer = offline_authorizer();
        let decision = authorizer
            .authorize(Some("token=not-a-jwt"), "PUT /movies/1/reviews/Ann")
            .await;

        assert!(!decision.is_allow());
        assert_eq!(
            decision.policy_document.statement[0].resource,
            vec!["PUT /movies/1/reviews/Ann".to_string()]
        );
    }
}
