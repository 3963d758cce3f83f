use crate::models::{ActionKind, ActionSummary, BoundingBox, FeedFilters, MatchPair, Profile};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

/// Errors surfaced by the persistence boundary. Retrieval and persistence
/// failures propagate to the caller; the core never silently falls back to
/// stale data.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Persistence contract consumed by the matching core.
///
/// The relational engine behind it is an external collaborator; the core only
/// depends on these query/insert contracts. All methods are lock-free and
/// safely retryable, except `insert_match_if_absent` which must be atomic.
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch a single profile. `None` when the user has no profile row.
    async fn find_profile(&self, user_id: i64) -> Result<Option<Profile>, StoreError>;

    /// Batch profile lookup, keyed by user id. Missing users are absent from
    /// the map.
    async fn find_profiles(&self, user_ids: &[i64]) -> Result<HashMap<i64, Profile>, StoreError>;

    /// Query candidate profiles, cheaply pre-filtered by bounding box (when
    /// the requester has coordinates), age range, and lifestyle filters.
    /// `actor_id` and every target it has already acted on are excluded
    /// before `limit` applies, so the cap bounds eligible candidates rather
    /// than raw rows. Only users with a profile are returned.
    async fn query_candidates(
        &self,
        actor_id: i64,
        bounds: Option<BoundingBox>,
        filters: &FeedFilters,
        limit: usize,
    ) -> Result<Vec<Profile>, StoreError>;

    /// Record an action. One logical action per (actor, target): a repeated
    /// action for the same ordered pair replaces the previous kind and
    /// timestamp.
    async fn upsert_action(
        &self,
        actor_id: i64,
        target_id: i64,
        kind: ActionKind,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Every target the actor has ever acted on, in any way. Drives the feed
    /// exclusion set.
    async fn acted_target_ids(&self, actor_id: i64) -> Result<Vec<i64>, StoreError>;

    /// Users who currently have a like or super-like recorded toward
    /// `target_id`.
    async fn positive_actors(&self, target_id: i64) -> Result<Vec<i64>, StoreError>;

    /// Whether `actor_id`'s latest action on `target_id` is a like or
    /// super-like.
    async fn has_positive_action(&self, actor_id: i64, target_id: i64)
        -> Result<bool, StoreError>;

    /// The actor's action history grouped by (target, kind) with counts.
    /// Input for the behavior vector.
    async fn action_summaries(&self, actor_id: i64) -> Result<Vec<ActionSummary>, StoreError>;

    /// Atomically create the match row for a canonical pair if absent.
    /// Returns true only for the call that created it. Must be safe under
    /// concurrent duplicate mutual detections.
    async fn insert_match_if_absent(
        &self,
        user_low: i64,
        user_high: i64,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// All confirmed matches involving the user.
    async fn list_matches(&self, user_id: i64) -> Result<Vec<MatchPair>, StoreError>;

    /// Proximity artifacts created per user since `since`, for the given
    /// users. Users with no artifacts may be absent from the map.
    async fn artifact_counts_since(
        &self,
        user_ids: &[i64],
        since: DateTime<Utc>,
    ) -> Result<HashMap<i64, i64>, StoreError>;
}
