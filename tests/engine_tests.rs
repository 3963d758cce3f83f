// End-to-end engine tests over in-memory fakes

mod common;

use common::{profile, FakeStore, NullTelemetry, RecordingConversations, RecordingNotifier};
use ember_match::core::{EngineConfig, EngineError, MatchEngine};
use ember_match::models::{ActionKind, FeedRequest};
use ember_match::services::{MemoryCache, StaticFlags};
use std::collections::HashMap;
use std::sync::Arc;

struct Harness {
    store: Arc<FakeStore>,
    notifier: Arc<RecordingNotifier>,
    conversations: Arc<RecordingConversations>,
    engine: MatchEngine,
}

fn harness(store: FakeStore) -> Harness {
    harness_with_flags(store, HashMap::new(), false)
}

fn harness_with_config(store: FakeStore, config: EngineConfig) -> Harness {
    build_harness(store, HashMap::new(), false, config)
}

fn harness_with_flags(
    store: FakeStore,
    flags: HashMap<String, bool>,
    failing_notifier: bool,
) -> Harness {
    build_harness(store, flags, failing_notifier, EngineConfig::default())
}

fn build_harness(
    store: FakeStore,
    flags: HashMap<String, bool>,
    failing_notifier: bool,
    config: EngineConfig,
) -> Harness {
    let store = Arc::new(store);
    let notifier = Arc::new(RecordingNotifier {
        fail: failing_notifier,
        ..Default::default()
    });
    let conversations = Arc::new(RecordingConversations::default());
    let engine = MatchEngine::new(
        store.clone(),
        Arc::new(MemoryCache::default()),
        notifier.clone(),
        conversations.clone(),
        Arc::new(StaticFlags::new(flags)),
        Arc::new(NullTelemetry),
        EngineConfig::default(),
    );
    Harness {
        store,
        notifier,
        conversations,
        engine,
    }
}

fn feed_request(user_id: i64) -> FeedRequest {
    FeedRequest {
        user_id,
        age_min: None,
        age_max: None,
        max_distance: None,
        smoking: None,
        drinking: None,
        body_type: None,
        height_min: None,
        limit: 20,
    }
}

#[tokio::test]
async fn test_distant_candidate_is_excluded() {
    let h = harness(FakeStore::with_profiles([
        profile(1, 0.0, 0.0),
        // ~69 miles north, outside a 10-mile radius
        profile(2, 1.0, 0.0),
    ]));

    let mut request = feed_request(1);
    request.max_distance = Some(10.0);

    let feed = h.engine.get_feed(&request).await.unwrap();
    assert!(feed.is_empty());
}

#[tokio::test]
async fn test_nearby_candidate_is_ranked() {
    let h = harness(FakeStore::with_profiles([
        profile(1, 40.71, -74.01),
        profile(2, 40.72, -74.02),
    ]));

    let feed = h.engine.get_feed(&feed_request(1)).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].candidate_id, 2);
    assert!(feed[0].score > 0.0 && feed[0].score <= 100.0);
}

#[tokio::test]
async fn test_missing_profile_fails_feed() {
    let h = harness(FakeStore::default());

    let err = h.engine.get_feed(&feed_request(1)).await.unwrap_err();
    assert!(matches!(err, EngineError::ProfileIncomplete(1)));
}

#[tokio::test]
async fn test_unreciprocated_like_is_not_a_match() {
    let h = harness(FakeStore::with_profiles([
        profile(1, 40.71, -74.01),
        profile(2, 40.72, -74.02),
    ]));

    let outcome = h.engine.submit_action(1, 2, ActionKind::Like).await.unwrap();
    assert!(!outcome.is_match);
    assert_eq!(h.store.match_count(), 0);
}

#[tokio::test]
async fn test_mutual_like_creates_one_canonical_match() {
    let h = harness(FakeStore::with_profiles([
        profile(1, 40.71, -74.01),
        profile(2, 40.72, -74.02),
    ]));

    let first = h.engine.submit_action(2, 1, ActionKind::Like).await.unwrap();
    assert!(!first.is_match);

    let second = h.engine.submit_action(1, 2, ActionKind::Like).await.unwrap();
    assert!(second.is_match);

    assert_eq!(h.store.match_count(), 1);
    assert!(h.store.matches.lock().unwrap().contains_key(&(1, 2)));

    // Both sides see the same pair
    let of_1 = h.engine.established_matches(1).await.unwrap();
    let of_2 = h.engine.established_matches(2).await.unwrap();
    assert_eq!(of_1.len(), 1);
    assert_eq!(of_1[0].user_low, of_2[0].user_low);
    assert_eq!(of_1[0].user_high, of_2[0].user_high);
}

#[tokio::test]
async fn test_repeated_like_does_not_recreate_the_match() {
    let h = harness(FakeStore::with_profiles([
        profile(1, 40.71, -74.01),
        profile(2, 40.72, -74.02),
    ]));

    h.engine.submit_action(2, 1, ActionKind::Like).await.unwrap();
    let created = h.engine.submit_action(1, 2, ActionKind::Like).await.unwrap();
    assert!(created.is_match);

    let repeated = h.engine.submit_action(1, 2, ActionKind::SuperLike).await.unwrap();
    assert!(!repeated.is_match);
    assert_eq!(h.store.match_count(), 1);
}

#[tokio::test]
async fn test_concurrent_mutual_likes_create_exactly_one_match() {
    let h = harness(FakeStore::with_profiles([
        profile(1, 40.71, -74.01),
        profile(2, 40.72, -74.02),
    ]));

    let (a, b) = tokio::join!(
        h.engine.submit_action(1, 2, ActionKind::Like),
        h.engine.submit_action(2, 1, ActionKind::Like),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(h.store.match_count(), 1);
    // Exactly one of the two calls reports the creation
    assert!(a.is_match ^ b.is_match);
    // Both users were notified exactly once
    assert_eq!(h.notifier.delivered.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_self_action_is_rejected() {
    let h = harness(FakeStore::with_profiles([profile(1, 40.71, -74.01)]));

    let err = h.engine.submit_action(1, 1, ActionKind::Like).await.unwrap_err();
    assert!(matches!(err, EngineError::SelfAction));
}

#[tokio::test]
async fn test_unknown_target_is_rejected() {
    let h = harness(FakeStore::with_profiles([profile(1, 40.71, -74.01)]));

    let err = h.engine.submit_action(1, 99, ActionKind::Like).await.unwrap_err();
    assert!(matches!(err, EngineError::InaccessibleTarget(99)));
}

#[tokio::test]
async fn test_out_of_range_target_is_inaccessible() {
    // ~345 miles apart, past the 50-mile default radius
    let h = harness(FakeStore::with_profiles([
        profile(1, 40.71, -74.01),
        profile(2, 45.71, -74.01),
    ]));

    let err = h.engine.submit_action(1, 2, ActionKind::Like).await.unwrap_err();
    assert!(matches!(err, EngineError::InaccessibleTarget(2)));
}

#[tokio::test]
async fn test_acted_on_candidate_disappears_from_feed() {
    let h = harness(FakeStore::with_profiles([
        profile(1, 40.71, -74.01),
        profile(2, 40.72, -74.02),
        profile(3, 40.73, -74.03),
    ]));

    let before = h.engine.get_feed(&feed_request(1)).await.unwrap();
    assert_eq!(before.len(), 2);

    h.engine.submit_action(1, 2, ActionKind::Pass).await.unwrap();

    // The action invalidated the cached feed, so this recomputes
    let after = h.engine.get_feed(&feed_request(1)).await.unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].candidate_id, 3);
}

#[tokio::test]
async fn test_acted_on_profiles_do_not_consume_the_pool_cap() {
    let profiles: Vec<_> = (1..=5).map(|id| profile(id, 40.71, -74.01)).collect();
    let h = harness_with_config(
        FakeStore::with_profiles(profiles),
        EngineConfig {
            pool_cap: 2,
            ..EngineConfig::default()
        },
    );

    // More history than the pool cap
    for target in [2, 3, 4] {
        h.engine.submit_action(1, target, ActionKind::Pass).await.unwrap();
    }

    // The cap bounds eligible candidates, so the remaining one still shows
    let feed = h.engine.get_feed(&feed_request(1)).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].candidate_id, 5);
}

#[tokio::test]
async fn test_notification_failure_does_not_fail_the_action() {
    let h = harness_with_flags(
        FakeStore::with_profiles([profile(1, 40.71, -74.01), profile(2, 40.72, -74.02)]),
        HashMap::new(),
        true,
    );

    h.engine.submit_action(2, 1, ActionKind::Like).await.unwrap();
    let outcome = h.engine.submit_action(1, 2, ActionKind::Like).await.unwrap();

    assert!(outcome.is_match);
    assert_eq!(h.store.match_count(), 1);
    assert!(h.notifier.delivered.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_auto_chat_opens_conversation_when_enabled() {
    let h = harness_with_flags(
        FakeStore::with_profiles([profile(1, 40.71, -74.01), profile(2, 40.72, -74.02)]),
        HashMap::from([("auto_chat_on_match".to_string(), true)]),
        false,
    );

    h.engine.submit_action(2, 1, ActionKind::Like).await.unwrap();
    h.engine.submit_action(1, 2, ActionKind::Like).await.unwrap();

    assert_eq!(h.conversations.opened.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_auto_chat_stays_closed_by_default() {
    let h = harness(FakeStore::with_profiles([
        profile(1, 40.71, -74.01),
        profile(2, 40.72, -74.02),
    ]));

    h.engine.submit_action(2, 1, ActionKind::Like).await.unwrap();
    h.engine.submit_action(1, 2, ActionKind::Like).await.unwrap();

    assert!(h.conversations.opened.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_artifact_saturation_demotes_a_candidate() {
    let store = FakeStore::with_profiles([
        profile(1, 40.71, -74.01),
        profile(2, 40.72, -74.02),
        profile(3, 40.72, -74.02),
    ]);
    // Candidate 3 flooded the system with 35 artifacts in the last day
    store.artifacts.lock().unwrap().insert(3, 35);
    let h = harness(store);

    let feed = h.engine.get_feed(&feed_request(1)).await.unwrap();
    assert_eq!(feed.len(), 2);

    let clean = feed.iter().find(|e| e.candidate_id == 2).unwrap();
    let flooded = feed.iter().find(|e| e.candidate_id == 3).unwrap();
    // Identical profiles, so the gap is exactly the min(5, 35/10) penalty
    assert!((clean.score - flooded.score - 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_feed_respects_the_page_limit() {
    let profiles: Vec<_> = (1..=30)
        .map(|id| profile(id, 40.71 + id as f64 * 0.001, -74.01))
        .collect();
    let h = harness(FakeStore::with_profiles(profiles));

    let mut request = feed_request(1);
    request.limit = 5;

    let feed = h.engine.get_feed(&request).await.unwrap();
    assert_eq!(feed.len(), 5);

    // Ranked by score descending
    for pair in feed.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}
