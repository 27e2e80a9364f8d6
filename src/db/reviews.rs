//! Review store operations.
//!
//! Reviews live under a composite record id `[movieId, reviewerName]`, which
//! gives the write guard its atomic conditional-write primitive: `CREATE` on
//! that id fails when the record already exists, with no read-then-write
//! race, while `UPSERT` on the same id silently overwrites.

use tracing::error;

use crate::db::connection::Db;
use crate::model::{QueryFilter, Review, SegmentClass};

/// Errors from store reads and writes.
#[derive(Debug)]
pub enum StoreError {
    /// The conditional write's guard failed: a record for this
    /// (movieId, reviewerName) pair already exists.
    ConditionFailed,
    /// Any other store fault.
    Db(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConditionFailed => write!(f, "The conditional request failed"),
            Self::Db(msg) => write!(f, "Store error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<surrealdb::Error> for StoreError {
    fn from(e: surrealdb::Error) -> Self {
        let msg = e.to_string();
        if msg.contains("already exists") {
            StoreError::ConditionFailed
        } else {
            StoreError::Db(msg)
        }
    }
}

/// Store access for review records in the configured table.
#[derive(Clone)]
pub struct ReviewStore {
    db: Db,
    table: String,
}

impl ReviewStore {
    pub fn new(db: Db, table: impl Into<String>) -> Self {
        Self {
            db,
            table: table.into(),
        }
    }

    /// All reviews for one movie, in the store's native order (by review
    /// date within the movie).
    pub async fn query_by_movie(&self, movie_id: i64) -> Result<Vec<Review>, StoreError> {
        let mut res = self
            .db
            .query(
                "SELECT * FROM type::table($tb)
                 WHERE movieId = $m
                 ORDER BY reviewDate ASC",
            )
            .bind(("tb", self.table.clone()))
            .bind(("m", movie_id))
            .await?;

        Ok(res.take(0)?)
    }

    /// Movie-scoped query with the segment filter applied at the store:
    /// prefix match on `reviewDate` for a year, substring match on
    /// `reviewerName` otherwise. The optional rating floor is applied by the
    /// caller in memory, not here — rating is not part of the store's key.
    pub async fn query_filtered(&self, filter: &QueryFilter) -> Result<Vec<Review>, StoreError> {
        let predicate = match filter.class {
            SegmentClass::Year => "string::starts_with(reviewDate, $f)",
            SegmentClass::ReviewerName => "string::contains(reviewerName, $f)",
        };

        let query = format!(
            "SELECT * FROM type::table($tb)
             WHERE movieId = $m AND {}
             ORDER BY reviewDate ASC",
            predicate
        );

        let mut res = self
            .db
            .query(query)
            .bind(("tb", self.table.clone()))
            .bind(("m", filter.movie_id))
            .bind(("f", filter.match_value.clone()))
            .await?;

        Ok(res.take(0)?)
    }

    /// Cross-movie scan: every review whose reviewer name contains the given
    /// string.
    pub async fn scan_by_reviewer(&self, reviewer_name: &str) -> Result<Vec<Review>, StoreError> {
        let mut res = self
            .db
            .query(
                "SELECT * FROM type::table($tb)
                 WHERE string::contains(reviewerName, $f)
                 ORDER BY reviewDate ASC",
            )
            .bind(("tb", self.table.clone()))
            .bind(("f", reviewer_name.to_string()))
            .await?;

        Ok(res.take(0)?)
    }

    /// Unconditional put: a record with the same (movieId, reviewerName) is
    /// silently overwritten. No uniqueness on this path.
    pub async fn put(&self, review: &Review) -> Result<(), StoreError> {
        let mut res = self
            .db
            .query("UPSERT type::thing($tb, [$m, $r]) CONTENT $review")
            .bind(("tb", self.table.clone()))
            .bind(("m", review.movie_id))
            .bind(("r", review.reviewer_name.clone()))
            .bind((
                "review",
                serde_json::to_value(review).map_err(|e| StoreError::Db(e.to_string()))?,
            ))
            .await?;

        let _written: Option<Review> = res.take(0).inspect_err(|e| {
            error!("review put failed: {}", e);
        })?;

        Ok(())
    }

    /// Conditional put guarded by "record for (movieId, reviewerName) must
    /// not already exist". The check-and-set happens inside the store's
    /// `CREATE`; a conflicting record yields [`StoreError::ConditionFailed`].
    pub async fn put_if_absent(&self, review: &Review) -> Result<(), StoreError> {
        let mut res = self
            .db
            .query("CREATE type::thing($tb, [$m, $r]) CONTENT $review")
            .bind(("tb", self.table.clone()))
            .bind(("m", review.movie_id))
            .bind(("r", review.reviewer_name.clone()))
            .bind((
                "review",
                serde_json::to_value(review).map_err(|e| StoreError::Db(e.to_string()))?,
            ))
            .await?;

        let _created: Option<Review> = res.take(0)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::{DatabaseConfig, create_connection, ensure_schema};
    use crate::model::QueryFilter;

    async fn test_store() -> ReviewStore {
        let config = DatabaseConfig {
            url: "memory".to_string(),
            ..Default::default()
        };
        let db = create_connection(config).await.unwrap();
        ensure_schema(&db, "review").await.unwrap();
        ReviewStore::new(db, "review")
    }

    fn review(movie_id: i64, name: &str, date: &str, rating: i64) -> Review {
        Review {
            movie_id,
            reviewer_name: name.to_string(),
            content: format!("review by {}", name),
            review_date: date.to_string(),
            rating,
        }
    }

    #[tokio::test]
    async fn query_by_movie_orders_by_review_date() {
        let store = test_store().await;
        store
            .put(&review(1, "Ben", "2022-03-01T00:00:00.000Z", 5))
            .await
            .unwrap();
        store
            .put(&review(1, "Ann", "2021-05-01T00:00:00.000Z", 8))
            .await
            .unwrap();
        store
            .put(&review(2, "Ann", "2020-01-01T00:00:00.000Z", 3))
            .await
            .unwrap();

        let reviews = store.query_by_movie(1).await.unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].reviewer_name, "Ann");
        assert_eq!(reviews[1].reviewer_name, "Ben");
    }

    #[tokio::test]
    async fn year_filter_prefix_matches_review_date() {
        let store = test_store().await;
        store
            .put(&review(5, "Ann", "2021-05-01T00:00:00.000Z", 8))
            .await
            .unwrap();
        store
            .put(&review(5, "Ben", "2022-03-01T00:00:00.000Z", 5))
            .await
            .unwrap();

        let filter = QueryFilter::for_segment(5, "2021");
        let reviews = store.query_filtered(&filter).await.unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].reviewer_name, "Ann");
    }

    #[tokio::test]
    async fn name_filter_substring_matches_reviewer_name() {
        let store = test_store().await;
        store
            .put(&review(5, "Joanna", "2021-05-01T00:00:00.000Z", 8))
            .await
            .unwrap();
        store
            .put(&review(5, "Ben", "2022-03-01T00:00:00.000Z", 5))
            .await
            .unwrap();

        let filter = QueryFilter::for_segment(5, "Ann");
        let reviews = store.query_filtered(&filter).await.unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].reviewer_name, "Joanna");
    }

    #[tokio::test]
    async fn repeated_query_is_idempotent() {
        let store = test_store().await;
        store
            .put(&review(5, "Ann", "2021-05-01T00:00:00.000Z", 8))
            .await
            .unwrap();
        store
            .put(&review(5, "Ben", "2021-06-01T00:00:00.000Z", 5))
            .await
            .unwrap();

        let filter = QueryFilter::for_segment(5, "2021");
        let first = store.query_filtered(&filter).await.unwrap();
        let second = store.query_filtered(&filter).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn scan_by_reviewer_crosses_movies() {
        let store = test_store().await;
        store
            .put(&review(1, "Ann", "2021-05-01T00:00:00.000Z", 8))
            .await
            .unwrap();
        store
            .put(&review(2, "Ann", "2022-03-01T00:00:00.000Z", 6))
            .await
            .unwrap();
        store
            .put(&review(3, "Ben", "2022-04-01T00:00:00.000Z", 4))
            .await
            .unwrap();

        let reviews = store.scan_by_reviewer("Ann").await.unwrap();
        assert_eq!(reviews.len(), 2);
        assert!(reviews.iter().all(|r| r.reviewer_name == "Ann"));
    }

    #[tokio::test]
    async fn put_overwrites_the_same_composite_key() {
        let store = test_store().await;
        store
            .put(&review(1, "Ann", "2021-05-01T00:00:00.000Z", 8))
            .await
            .unwrap();

        let mut second = review(1, "Ann", "2021-06-01T00:00:00.000Z", 2);
        second.content = "changed my mind".to_string();
        store.put(&second).await.unwrap();

        let reviews = store.query_by_movie(1).await.unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].rating, 2);
        assert_eq!(reviews[0].content, "changed my mind");
    }

    #[tokio::test]
    async fn put_if_absent_rejects_an_existing_pair() {
        let store = test_store().await;
        store
            .put_if_absent(&review(1, "Ann", "2021-05-01T00:00:00.000Z", 8))
            .await
            .unwrap();

        let err = store
            .put_if_absent(&review(1, "Ann", "2021-06-01T00:00:00.000Z", 2))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConditionFailed));

        // The original record is untouched
        let reviews = store.query_by_movie(1).await.unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].rating, 8);
    }

    #[tokio::test]
    async fn put_if_absent_allows_distinct_pairs() {
        let store = test_store().await;
        store
            .put_if_absent(&review(1, "Ann", "2021-05-01T00:00:00.000Z", 8))
            .await
            .unwrap();
        // Same reviewer, different movie
        store
            .put_if_absent(&review(2, "Ann", "2021-05-02T00:00:00.000Z", 7))
            .await
            .unwrap();
        // Same movie, different reviewer
        store
            .put_if_absent(&review(1, "Ben", "2021-05-03T00:00:00.000Z", 6))
            .await
            .unwrap();
    }
}
