//! Access decision documents.
//!
//! A verification outcome is converted into a single-statement, signed-effect
//! policy document scoped to exactly the method that triggered the check. The
//! gate consumes the decision opaquely; an allow for one route never implies
//! an allow for another.

use serde::Serialize;

/// The action every decision in this core grants or denies.
pub const INVOKE_ACTION: &str = "execute-api:Invoke";

const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub effect: Effect,
    pub action: &'static str,
    pub resource: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: &'static str,
    pub statement: Vec<PolicyStatement>,
}

/// The allow/deny artifact returned by the authorization check.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AccessDecision {
    #[serde(rename = "principalId")]
    pub principal_id: String,
    #[serde(rename = "policyDocument")]
    pub policy_document: PolicyDocument,
}

/// Build a policy document scoped to the originating method ARN.
///
/// Pure and deterministic: exactly one statement, whose resource is the
/// triggering method and nothing else.
pub fn build_policy(method_arn: &str, effect: Effect) -> PolicyDocument {
    PolicyDocument {
        version: POLICY_VERSION,
        statement: vec![PolicyStatement {
            effect,
            action: INVOKE_ACTION,
            resource: vec![method_arn.to_string()],
        }],
    }
}

impl AccessDecision {
    pub fn new(principal_id: impl Into<String>, method_arn: &str, effect: Effect) -> Self {
        Self {
            principal_id: principal_id.into(),
            policy_document: build_policy(method_arn, effect),
        }
    }

    pub fn effect(&self) -> Effect {
        // Single-statement invariant: the document is built only through
        // build_policy.
        self.policy_document.statement[0].effect
    }

    pub fn is_allow(&self) -> bool {
        self.effect() == Effect::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_has_exactly_one_statement_scoped_to_the_method() {
        let policy = build_policy("POST /movies/reviews", Effect::Allow);

        assert_eq!(policy.statement.len(), 1);
        let statement = &policy.statement[0];
        assert_eq!(statement.effect, Effect::Allow);
        assert_eq!(statement.action, INVOKE_ACTION);
        assert_eq!(statement.resource, vec!["POST /movies/reviews".to_string()]);
    }

    #[test]
    fn an_allow_for_one_route_names_only_that_route() {
        let policy = build_policy("PUT /movies/1/reviews/Ann", Effect::Allow);
        assert_eq!(
            policy.statement[0].resource,
            vec!["PUT /movies/1/reviews/Ann".to_string()]
        );
        assert!(!policy.statement[0].resource.contains(&"*".to_string()));
    }

    #[test]
    fn decision_serializes_in_the_gateway_document_shape() {
        let decision = AccessDecision::new("user-123", "POST /movies/reviews", Effect::Deny);
        let value = serde_json::to_value(&decision).unwrap();

        assert_eq!(value["principalId"], "user-123");
        assert_eq!(value["policyDocument"]["Version"], "2012-10-17");
        assert_eq!(
            value["policyDocument"]["Statement"][0]["Effect"],
            "Deny"
        );
        assert_eq!(
            value["policyDocument"]["Statement"][0]["Action"],
            "execute-api:Invoke"
        );
        assert_eq!(
            value["policyDocument"]["Statement"][0]["Resource"][0],
            "POST /movies/reviews"
        );
    }

    #[test]
    fn effect_accessor_reads_the_single_statement() {
        assert!(AccessDecision::new("p", "GET /x", Effect::Allow).is_allow());
        assert!(!AccessDecision::new("p", "GET /x", Effect::Deny).is_allow());
    }
}
