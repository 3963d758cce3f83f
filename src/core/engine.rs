use crate::core::behavior;
use crate::core::geo;
use crate::core::retrieval::{self, CandidateRetriever};
use crate::core::scoring::MatchScorer;
use crate::models::{
    ActionKind, BehaviorWeights, FeedEntry, FeedRequest, MatchPair, ScoreContext, ScoringWeights,
};
use crate::services::{
    ConversationGateway, FeatureFlags, FeedCache, NotificationGateway, Store, StoreError,
    TelemetrySink,
};
use chrono::{Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Feature flag checked after a new match is created.
const AUTO_CHAT_FLAG: &str = "auto_chat_on_match";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("profile for user {0} is missing or incomplete")]
    ProfileIncomplete(i64),

    #[error("users cannot act on themselves")]
    SelfAction,

    #[error("target user {0} does not exist or is not accessible")]
    InaccessibleTarget(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Tuning knobs for the engine, loaded from configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on the candidate pool per feed computation.
    pub pool_cap: usize,
    /// Hard cap on the per-request page size.
    pub max_limit: usize,
    /// Miles, applied when neither request nor preferences set a radius.
    pub default_max_distance: f64,
    pub scoring: ScoringWeights,
    pub behavior: BehaviorWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pool_cap: 100,
            max_limit: 100,
            default_max_distance: 50.0,
            scoring: ScoringWeights::default(),
            behavior: BehaviorWeights::default(),
        }
    }
}

/// Result of recording an action.
#[derive(Debug, Clone, Copy)]
pub struct ActionOutcome {
    pub kind: ActionKind,
    /// True only when this action created the match. A repeat of a positive
    /// action on an already-matched pair reports false.
    pub is_match: bool,
}

/// Orchestrates feed computation and action handling over the persistence,
/// cache, and gateway seams.
pub struct MatchEngine {
    store: Arc<dyn Store>,
    cache: Arc<dyn FeedCache>,
    notifier: Arc<dyn NotificationGateway>,
    conversations: Arc<dyn ConversationGateway>,
    flags: Arc<dyn FeatureFlags>,
    telemetry: Arc<dyn TelemetrySink>,
    scorer: MatchScorer,
    config: EngineConfig,
}

impl MatchEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn Store>,
        cache: Arc<dyn FeedCache>,
        notifier: Arc<dyn NotificationGateway>,
        conversations: Arc<dyn ConversationGateway>,
        flags: Arc<dyn FeatureFlags>,
        telemetry: Arc<dyn TelemetrySink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            cache,
            notifier,
            conversations,
            flags,
            telemetry,
            scorer: MatchScorer::new(config.scoring),
            config,
        }
    }

    /// Compute (or serve from cache) the ranked feed for a user.
    ///
    /// The cached value is the full ranked pool for the resolved filter set;
    /// the page limit is applied on the way out, so different page sizes
    /// share one cache entry.
    pub async fn get_feed(&self, request: &FeedRequest) -> Result<Vec<FeedEntry>, EngineError> {
        let requester = self
            .store
            .find_profile(request.user_id)
            .await?
            .ok_or(EngineError::ProfileIncomplete(request.user_id))?;

        let retriever = CandidateRetriever::new(
            self.store.as_ref(),
            self.config.pool_cap,
            self.config.default_max_distance,
        );
        let filters = retriever.resolve_filters(&requester, request);
        let fingerprint = filters.fingerprint();
        let limit = (request.limit as usize).min(self.config.max_limit);

        if let Some(cached) = self.cache.get(request.user_id, &fingerprint).await {
            self.telemetry
                .feed_served(request.user_id, cached.len().min(limit), true);
            return Ok(cached.into_iter().take(limit).collect());
        }

        let now = Utc::now();
        let pool = retriever.retrieve(&requester, &filters, now).await?;

        // Behavioral signal from the requester's own history
        let summaries = self.store.action_summaries(request.user_id).await?;
        let history_ids: Vec<i64> = summaries.iter().map(|s| s.target_id).collect();
        let history_profiles = self.store.find_profiles(&history_ids).await?;
        let vector = behavior::build(&summaries, &history_profiles, &self.config.behavior, now);

        // Cross-candidate context
        let admirers: HashSet<i64> = self
            .store
            .positive_actors(request.user_id)
            .await?
            .into_iter()
            .collect();
        let pool_ids: Vec<i64> = pool.iter().map(|c| c.user_id).collect();
        let artifact_counts = self
            .store
            .artifact_counts_since(&pool_ids, now - Duration::hours(24))
            .await?;

        let mut entries: Vec<FeedEntry> = pool
            .iter()
            .map(|candidate| {
                let context = ScoreContext {
                    liked_requester: admirers.contains(&candidate.user_id),
                    artifacts_last_24h: artifact_counts
                        .get(&candidate.user_id)
                        .copied()
                        .unwrap_or(0),
                };
                FeedEntry {
                    candidate_id: candidate.user_id,
                    score: self.scorer.score(&requester, candidate, &vector, &context, now),
                    distance: geo::distance_between(&requester, candidate),
                    age: candidate.age_at(now),
                    gender: candidate.gender.clone(),
                    bio: candidate.bio.clone(),
                }
            })
            .collect();

        // Highest score first, nearest first on ties
        entries.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.distance.total_cmp(&b.distance))
        });

        self.cache.put(request.user_id, &fingerprint, &entries).await;
        self.telemetry
            .feed_served(request.user_id, entries.len().min(limit), false);

        Ok(entries.into_iter().take(limit).collect())
    }

    /// Record an action and, on mutual positive interest, create the match.
    ///
    /// The action write and the cache invalidation always happen; match
    /// side effects (notifications, auto-chat) run only for the call that
    /// actually created the match row, so concurrent duplicate detections
    /// fire them once.
    pub async fn submit_action(
        &self,
        actor_id: i64,
        target_id: i64,
        kind: ActionKind,
    ) -> Result<ActionOutcome, EngineError> {
        if actor_id == target_id {
            return Err(EngineError::SelfAction);
        }
        let actor = self
            .store
            .find_profile(actor_id)
            .await?
            .ok_or(EngineError::ProfileIncomplete(actor_id))?;
        let target = self
            .store
            .find_profile(target_id)
            .await?
            .ok_or(EngineError::InaccessibleTarget(target_id))?;

        // The target must be someone the actor's feed could have shown
        let max_distance = actor
            .preferences
            .max_distance
            .unwrap_or(self.config.default_max_distance);
        if !retrieval::mutual_gender_match(&actor, &target)
            || !retrieval::within_distance(&actor, &target, max_distance)
        {
            return Err(EngineError::InaccessibleTarget(target_id));
        }

        let now = Utc::now();
        self.store.upsert_action(actor_id, target_id, kind, now).await?;
        self.cache.invalidate(actor_id).await;

        let mut is_match = false;
        if kind.is_positive() && self.store.has_positive_action(target_id, actor_id).await? {
            let pair = MatchPair::canonical(actor_id, target_id, now);
            if self
                .store
                .insert_match_if_absent(pair.user_low, pair.user_high, now)
                .await?
            {
                is_match = true;
                tracing::info!(actor_id, target_id, "new match created");
                self.on_match_created(actor_id, target_id).await;
            }
        }

        self.telemetry
            .action_recorded(actor_id, target_id, kind.as_str(), is_match);
        Ok(ActionOutcome { kind, is_match })
    }

    /// All confirmed matches for a user, cached per user.
    pub async fn established_matches(&self, user_id: i64) -> Result<Vec<MatchPair>, EngineError> {
        if let Some(cached) = self.cache.get_matches(user_id).await {
            return Ok(cached);
        }
        let matches = self.store.list_matches(user_id).await?;
        self.cache.put_matches(user_id, &matches).await;
        Ok(matches)
    }

    /// Side effects of a freshly created match. None of them can fail the
    /// action that triggered the match.
    async fn on_match_created(&self, actor_id: i64, target_id: i64) {
        self.cache.invalidate_matches(actor_id).await;
        self.cache.invalidate_matches(target_id).await;
        self.cache.invalidate(target_id).await;

        for (user, other) in [(actor_id, target_id), (target_id, actor_id)] {
            if let Err(e) = self.notifier.notify_match(user, other).await {
                tracing::warn!(user_id = user, "match notification failed: {}", e);
            }
        }

        if self.flags.is_enabled(AUTO_CHAT_FLAG) {
            if let Err(e) = self.conversations.open_conversation(actor_id, target_id).await {
                tracing::warn!(actor_id, target_id, "auto-chat conversation failed: {}", e);
            }
        }
    }
}
