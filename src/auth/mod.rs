//! Access-control layer: credential extraction, verification, and the
//! allow/deny decision gating mutating routes.
//!
//! Pipeline per request: cookie header → [`cookies::extract_token`] →
//! [`TokenVerifier::verify`] (consulting the write-once
//! [`KeyMaterialCache`]) → [`AccessDecision`] → enforcement in
//! [`gate::require_authorization`]. Verification failure never surfaces as
//! an error; it becomes a Deny.

pub mod cookies;
pub mod gate;
pub mod jwks;
pub mod policy;
#[cfg(test)]
pub mod testkit;
pub mod verifier;

pub use cookies::{extract_token, parse_cookies};
pub use gate::{Authorizer, require_authorization};
pub use jwks::{KeyMaterialCache, KeyMaterialError, well_known_jwks_url};
pub use policy::{AccessDecision, Effect, build_policy};
pub use verifier::{IdentityClaims, TokenVerifier};
