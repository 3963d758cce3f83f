// Shared fakes for integration tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ember_match::models::{
    ActionKind, ActionSummary, BoundingBox, FeedFilters, MatchPair, Preferences, Profile,
};
use ember_match::services::{
    ConversationGateway, GatewayError, NotificationGateway, Store, StoreError, TelemetrySink,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// In-memory store with the same contracts as the PostgreSQL implementation.
/// `insert_match_if_absent` is atomic under the internal lock.
#[derive(Default)]
pub struct FakeStore {
    pub profiles: Mutex<HashMap<i64, Profile>>,
    pub actions: Mutex<HashMap<(i64, i64), (ActionKind, DateTime<Utc>)>>,
    pub matches: Mutex<HashMap<(i64, i64), DateTime<Utc>>>,
    pub artifacts: Mutex<HashMap<i64, i64>>,
}

impl FakeStore {
    pub fn with_profiles(profiles: impl IntoIterator<Item = Profile>) -> Self {
        let store = Self::default();
        {
            let mut map = store.profiles.lock().unwrap();
            for profile in profiles {
                map.insert(profile.user_id, profile);
            }
        }
        store
    }

    pub fn match_count(&self) -> usize {
        self.matches.lock().unwrap().len()
    }
}

#[async_trait]
impl Store for FakeStore {
    async fn find_profile(&self, user_id: i64) -> Result<Option<Profile>, StoreError> {
        Ok(self.profiles.lock().unwrap().get(&user_id).cloned())
    }

    async fn find_profiles(&self, user_ids: &[i64]) -> Result<HashMap<i64, Profile>, StoreError> {
        let profiles = self.profiles.lock().unwrap();
        Ok(user_ids
            .iter()
            .filter_map(|id| profiles.get(id).map(|p| (*id, p.clone())))
            .collect())
    }

    async fn query_candidates(
        &self,
        actor_id: i64,
        _bounds: Option<BoundingBox>,
        _filters: &FeedFilters,
        limit: usize,
    ) -> Result<Vec<Profile>, StoreError> {
        // Geo and lifestyle pre-filtering is approximate in production too;
        // the retrieval stage applies the exact predicates. Exclusion of the
        // actor and acted-on targets happens before the cap, as in the SQL.
        let acted: HashSet<i64> = self
            .actions
            .lock()
            .unwrap()
            .keys()
            .filter(|(actor, _)| *actor == actor_id)
            .map(|(_, target)| *target)
            .collect();

        let mut eligible: Vec<Profile> = self
            .profiles
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.user_id != actor_id && !acted.contains(&p.user_id))
            .cloned()
            .collect();
        eligible.sort_by_key(|p| p.user_id);
        eligible.truncate(limit);
        Ok(eligible)
    }

    async fn upsert_action(
        &self,
        actor_id: i64,
        target_id: i64,
        kind: ActionKind,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.actions
            .lock()
            .unwrap()
            .insert((actor_id, target_id), (kind, at));
        Ok(())
    }

    async fn acted_target_ids(&self, actor_id: i64) -> Result<Vec<i64>, StoreError> {
        Ok(self
            .actions
            .lock()
            .unwrap()
            .keys()
            .filter(|(actor, _)| *actor == actor_id)
            .map(|(_, target)| *target)
            .collect())
    }

    async fn positive_actors(&self, target_id: i64) -> Result<Vec<i64>, StoreError> {
        Ok(self
            .actions
            .lock()
            .unwrap()
            .iter()
            .filter(|((_, target), (kind, _))| *target == target_id && kind.is_positive())
            .map(|((actor, _), _)| *actor)
            .collect())
    }

    async fn has_positive_action(
        &self,
        actor_id: i64,
        target_id: i64,
    ) -> Result<bool, StoreError> {
        Ok(self
            .actions
            .lock()
            .unwrap()
            .get(&(actor_id, target_id))
            .map(|(kind, _)| kind.is_positive())
            .unwrap_or(false))
    }

    async fn action_summaries(&self, actor_id: i64) -> Result<Vec<ActionSummary>, StoreError> {
        Ok(self
            .actions
            .lock()
            .unwrap()
            .iter()
            .filter(|((actor, _), _)| *actor == actor_id)
            .map(|((_, target), (kind, _))| ActionSummary {
                target_id: *target,
                kind: *kind,
                count: 1,
            })
            .collect())
    }

    async fn insert_match_if_absent(
        &self,
        user_low: i64,
        user_high: i64,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut matches = self.matches.lock().unwrap();
        if matches.contains_key(&(user_low, user_high)) {
            return Ok(false);
        }
        matches.insert((user_low, user_high), at);
        Ok(true)
    }

    async fn list_matches(&self, user_id: i64) -> Result<Vec<MatchPair>, StoreError> {
        Ok(self
            .matches
            .lock()
            .unwrap()
            .iter()
            .filter(|((low, high), _)| *low == user_id || *high == user_id)
            .map(|((low, high), at)| MatchPair {
                user_low: *low,
                user_high: *high,
                created_at: *at,
            })
            .collect())
    }

    async fn artifact_counts_since(
        &self,
        user_ids: &[i64],
        _since: DateTime<Utc>,
    ) -> Result<HashMap<i64, i64>, StoreError> {
        let wanted: HashSet<i64> = user_ids.iter().copied().collect();
        Ok(self
            .artifacts
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| wanted.contains(id))
            .map(|(id, count)| (*id, *count))
            .collect())
    }
}

/// Notification gateway that records deliveries.
#[derive(Default)]
pub struct RecordingNotifier {
    pub delivered: Mutex<Vec<(i64, i64)>>,
    pub fail: bool,
}

#[async_trait]
impl NotificationGateway for RecordingNotifier {
    async fn notify_match(&self, user_id: i64, matched_user_id: i64) -> Result<(), GatewayError> {
        if self.fail {
            return Err(GatewayError::Delivery("forced failure".to_string()));
        }
        self.delivered
            .lock()
            .unwrap()
            .push((user_id, matched_user_id));
        Ok(())
    }
}

/// Conversation gateway that records opened conversations.
#[derive(Default)]
pub struct RecordingConversations {
    pub opened: Mutex<Vec<(i64, i64)>>,
}

#[async_trait]
impl ConversationGateway for RecordingConversations {
    async fn open_conversation(&self, user_a: i64, user_b: i64) -> Result<(), GatewayError> {
        self.opened.lock().unwrap().push((user_a, user_b));
        Ok(())
    }
}

/// Telemetry sink that swallows events.
pub struct NullTelemetry;

impl TelemetrySink for NullTelemetry {
    fn feed_served(&self, _user_id: i64, _count: usize, _cache_hit: bool) {}
    fn action_recorded(&self, _actor_id: i64, _target_id: i64, _action: &str, _is_match: bool) {}
}

/// Profile builder with sensible defaults for tests.
pub fn profile(user_id: i64, lat: f64, lon: f64) -> Profile {
    Profile {
        user_id,
        latitude: Some(lat),
        longitude: Some(lon),
        date_of_birth: chrono::NaiveDate::from_ymd_opt(1994, 1, 1),
        gender: Some("woman".to_string()),
        bio: Some("coffee and long walks".to_string()),
        looking_for: vec![],
        preferences: Preferences::default(),
        last_seen_at: Some(Utc::now()),
    }
}
