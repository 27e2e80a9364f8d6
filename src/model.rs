//! Review domain model: the stored record shape, write-request validation,
//! and the classification of the ambiguous `{reviewerNameOrYear}` path
//! segment into a concrete query filter.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single movie review as stored and as serialized on the wire.
///
/// The composite pair (movieId, reviewerName) identifies a review for
/// write-conflict purposes; within a movie, reviews are ordered by
/// `reviewDate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub movie_id: i64,
    pub reviewer_name: String,
    pub content: String,
    pub review_date: String,
    pub rating: i64,
}

/// How a movie-scoped query matches the ambiguous segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentClass {
    /// Exactly four decimal digits: prefix-match against `reviewDate`.
    Year,
    /// Anything else: substring-match against `reviewerName`.
    ReviewerName,
}

/// Classify the ambiguous path segment.
///
/// Total and deterministic: every input string falls into exactly one of the
/// two classes.
pub fn classify(segment: &str) -> SegmentClass {
    if segment.len() == 4 && segment.bytes().all(|b| b.is_ascii_digit()) {
        SegmentClass::Year
    } else {
        SegmentClass::ReviewerName
    }
}

/// A store filter derived from one request; built per request, discarded
/// after use.
#[derive(Debug, Clone)]
pub struct QueryFilter {
    pub movie_id: i64,
    pub class: SegmentClass,
    pub match_value: String,
    pub min_rating: Option<i64>,
}

impl QueryFilter {
    /// Filter on the ambiguous segment, with no rating floor.
    pub fn for_segment(movie_id: i64, segment: &str) -> Self {
        Self {
            movie_id,
            class: classify(segment),
            match_value: segment.to_string(),
            min_rating: None,
        }
    }
}

/// One violated constraint found while validating a write request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    Missing(&'static str),
    NotAnInteger(&'static str),
    NotAString(&'static str),
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(field) => write!(f, "missing required field `{}`", field),
            Self::NotAnInteger(field) => write!(f, "field `{}` must be an integer", field),
            Self::NotAString(field) => write!(f, "field `{}` must be a string", field),
        }
    }
}

fn take_i64(body: &Value, field: &'static str, violations: &mut Vec<Violation>) -> Option<i64> {
    match body.get(field) {
        None | Some(Value::Null) => {
            violations.push(Violation::Missing(field));
            None
        }
        Some(v) => match v.as_i64() {
            Some(n) => Some(n),
            None => {
                violations.push(Violation::NotAnInteger(field));
                None
            }
        },
    }
}

fn take_string(
    body: &Value,
    field: &'static str,
    violations: &mut Vec<Violation>,
) -> Option<String> {
    match body.get(field) {
        None | Some(Value::Null) => {
            violations.push(Violation::Missing(field));
            None
        }
        Some(v) => match v.as_str() {
            Some(s) => Some(s.to_string()),
            None => {
                violations.push(Violation::NotAString(field));
                None
            }
        },
    }
}

/// Validate a create-request body against the full review shape.
///
/// Returns the parsed review or the complete list of violated constraints,
/// never a bare boolean.
pub fn validate_review(body: &Value) -> Result<Review, Vec<Violation>> {
    let mut violations = Vec::new();

    let movie_id = take_i64(body, "movieId", &mut violations);
    let reviewer_name = take_string(body, "reviewerName", &mut violations);
    let content = take_string(body, "content", &mut violations);
    let review_date = take_string(body, "reviewDate", &mut violations);
    let rating = take_i64(body, "rating", &mut violations);

    if violations.is_empty() {
        Ok(Review {
            movie_id: movie_id.unwrap(),
            reviewer_name: reviewer_name.unwrap(),
            content: content.unwrap(),
            review_date: review_date.unwrap(),
            rating: rating.unwrap(),
        })
    } else {
        Err(violations)
    }
}

/// The guarded-update body: only `content` and `rating`; the identity comes
/// from the path and the date is stamped at acceptance time.
#[derive(Debug, Clone)]
pub struct ReviewUpdate {
    pub content: String,
    pub rating: i64,
}

/// Validate an update-request body.
pub fn validate_update(body: &Value) -> Result<ReviewUpdate, Vec<Violation>> {
    let mut violations = Vec::new();

    let content = take_string(body, "content", &mut violations);
    let rating = take_i64(body, "rating", &mut violations);

    if violations.is_empty() {
        Ok(ReviewUpdate {
            content: content.unwrap(),
            rating: rating.unwrap(),
        })
    } else {
        Err(violations)
    }
}

/// Current time in the ISO-8601 shape the store expects for `reviewDate`,
/// e.g. `2026-08-27T10:15:30.123Z`.
pub fn review_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
