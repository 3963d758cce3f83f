use crate::models::{
    ActionKind, ActionSummary, BoundingBox, FeedFilters, MatchPair, Preferences, Profile,
};
use crate::services::store::{Store, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::time::Duration;

const PROFILE_COLUMNS: &str = "user_id, latitude, longitude, date_of_birth, gender, bio, \
     looking_for, preferences, last_seen_at";

/// PostgreSQL-backed store.
///
/// Holds the profiles, the one-row-per-ordered-pair action history, the
/// canonical match table, and the proximity artifact log.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and run pending migrations.
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Health check for the database connection.
    pub async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

fn row_to_profile(row: &PgRow) -> Result<Profile, sqlx::Error> {
    let preferences: sqlx::types::Json<Preferences> = row.try_get("preferences")?;
    Ok(Profile {
        user_id: row.try_get("user_id")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        date_of_birth: row.try_get("date_of_birth")?,
        gender: row.try_get("gender")?,
        bio: row.try_get("bio")?,
        looking_for: row
            .try_get::<Option<Vec<String>>, _>("looking_for")?
            .unwrap_or_default(),
        preferences: preferences.0,
        last_seen_at: row.try_get("last_seen_at")?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn find_profile(&self, user_id: i64) -> Result<Option<Profile>, StoreError> {
        let query = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1");

        let row = sqlx::query(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_profile).transpose().map_err(Into::into)
    }

    async fn find_profiles(&self, user_ids: &[i64]) -> Result<HashMap<i64, Profile>, StoreError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let query = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ANY($1)");

        let rows = sqlx::query(&query)
            .bind(user_ids)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| row_to_profile(row).map(|p| (p.user_id, p)))
            .collect::<Result<HashMap<_, _>, _>>()
            .map_err(Into::into)
    }

    async fn query_candidates(
        &self,
        actor_id: i64,
        bounds: Option<BoundingBox>,
        filters: &FeedFilters,
        limit: usize,
    ) -> Result<Vec<Profile>, StoreError> {
        // Cheap pre-filter; the retrieval stage re-applies the exact
        // predicates. NULL filter parameters disable their clause. The
        // actor and already-acted-on targets must be filtered before
        // LIMIT: the cap bounds eligible candidates, not raw rows.
        let query = format!(
            r#"
            SELECT {PROFILE_COLUMNS}
            FROM profiles
            WHERE user_id <> $11
              AND NOT EXISTS (
                  SELECT 1 FROM match_actions
                  WHERE actor_id = $11 AND target_id = profiles.user_id)
              AND ($1::float8 IS NULL
                   OR (latitude BETWEEN $1 AND $2 AND longitude BETWEEN $3 AND $4))
              AND (date_of_birth IS NULL
                   OR date_of_birth <= CURRENT_DATE - ($5::int * INTERVAL '1 year'))
              AND (date_of_birth IS NULL
                   OR date_of_birth > CURRENT_DATE - (($6::int + 1) * INTERVAL '1 year'))
              AND ($7::text IS NULL
                   OR preferences->>'smoking' IS NULL OR preferences->>'smoking' = $7)
              AND ($8::text IS NULL
                   OR preferences->>'drinking' IS NULL OR preferences->>'drinking' = $8)
              AND ($9::text IS NULL
                   OR preferences->>'bodyType' IS NULL OR preferences->>'bodyType' = $9)
              AND ($10::int IS NULL
                   OR preferences->>'heightCm' IS NULL
                   OR (preferences->>'heightCm')::int >= $10)
            ORDER BY last_seen_at DESC NULLS LAST
            LIMIT $12
            "#
        );

        let rows = sqlx::query(&query)
            .bind(bounds.map(|b| b.min_lat))
            .bind(bounds.map(|b| b.max_lat))
            .bind(bounds.map(|b| b.min_lon))
            .bind(bounds.map(|b| b.max_lon))
            .bind(i32::from(filters.age_min))
            .bind(i32::from(filters.age_max))
            .bind(filters.smoking.as_deref())
            .bind(filters.drinking.as_deref())
            .bind(filters.body_type.as_deref())
            .bind(filters.height_min.map(i32::from))
            .bind(actor_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!("Candidate pre-filter returned {} rows", rows.len());

        rows.iter()
            .map(row_to_profile)
            .collect::<Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    async fn upsert_action(
        &self,
        actor_id: i64,
        target_id: i64,
        kind: ActionKind,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO match_actions (actor_id, target_id, kind, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (actor_id, target_id)
            DO UPDATE SET
                kind = EXCLUDED.kind,
                created_at = EXCLUDED.created_at
        "#;

        sqlx::query(query)
            .bind(actor_id)
            .bind(target_id)
            .bind(kind.as_str())
            .bind(at)
            .execute(&self.pool)
            .await?;

        tracing::debug!(
            "Recorded action: {} -> {} ({})",
            actor_id,
            target_id,
            kind.as_str()
        );
        Ok(())
    }

    async fn acted_target_ids(&self, actor_id: i64) -> Result<Vec<i64>, StoreError> {
        let rows = sqlx::query("SELECT target_id FROM match_actions WHERE actor_id = $1")
            .bind(actor_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(|row| row.get("target_id")).collect())
    }

    async fn positive_actors(&self, target_id: i64) -> Result<Vec<i64>, StoreError> {
        let query = r#"
            SELECT actor_id
            FROM match_actions
            WHERE target_id = $1 AND kind IN ('like', 'super_like')
        "#;

        let rows = sqlx::query(query)
            .bind(target_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(|row| row.get("actor_id")).collect())
    }

    async fn has_positive_action(
        &self,
        actor_id: i64,
        target_id: i64,
    ) -> Result<bool, StoreError> {
        let query = r#"
            SELECT EXISTS(
                SELECT 1 FROM match_actions
                WHERE actor_id = $1 AND target_id = $2
                  AND kind IN ('like', 'super_like')
            ) AS present
        "#;

        let row = sqlx::query(query)
            .bind(actor_id)
            .bind(target_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get("present"))
    }

    async fn action_summaries(&self, actor_id: i64) -> Result<Vec<ActionSummary>, StoreError> {
        let query = r#"
            SELECT target_id, kind, COUNT(*) AS action_count
            FROM match_actions
            WHERE actor_id = $1
            GROUP BY target_id, kind
        "#;

        let rows = sqlx::query(query)
            .bind(actor_id)
            .fetch_all(&self.pool)
            .await?;

        let summaries = rows
            .iter()
            .filter_map(|row| {
                let raw: String = row.get("kind");
                let Some(kind) = ActionKind::parse(&raw) else {
                    tracing::warn!("Skipping action row with unknown kind: {}", raw);
                    return None;
                };
                Some(ActionSummary {
                    target_id: row.get("target_id"),
                    kind,
                    count: row.get::<i64, _>("action_count") as u32,
                })
            })
            .collect();

        Ok(summaries)
    }

    async fn insert_match_if_absent(
        &self,
        user_low: i64,
        user_high: i64,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let query = r#"
            INSERT INTO matches (user_low, user_high, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_low, user_high) DO NOTHING
        "#;

        let result = sqlx::query(query)
            .bind(user_low)
            .bind(user_high)
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_matches(&self, user_id: i64) -> Result<Vec<MatchPair>, StoreError> {
        let query = r#"
            SELECT user_low, user_high, created_at
            FROM matches
            WHERE user_low = $1 OR user_high = $1
            ORDER BY created_at DESC
        "#;

        let rows = sqlx::query(query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| MatchPair {
                user_low: row.get("user_low"),
                user_high: row.get("user_high"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn artifact_counts_since(
        &self,
        user_ids: &[i64],
        since: DateTime<Utc>,
    ) -> Result<HashMap<i64, i64>, StoreError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let query = r#"
            SELECT user_id, COUNT(*) AS artifact_count
            FROM proximity_artifacts
            WHERE user_id = ANY($1) AND created_at >= $2
            GROUP BY user_id
        "#;

        let rows = sqlx::query(query)
            .bind(user_ids)
            .bind(since)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| (row.get("user_id"), row.get("artifact_count")))
            .collect())
    }
}
