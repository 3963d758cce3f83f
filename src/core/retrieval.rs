use crate::core::geo;
use crate::models::{BoundingBox, FeedFilters, FeedRequest, Profile};
use crate::services::{Store, StoreError};
use std::collections::HashSet;

/// Default age window applied when neither the request nor the stored
/// preferences narrow it.
const DEFAULT_AGE_MIN: u8 = 18;
const DEFAULT_AGE_MAX: u8 = 100;

/// Builds the candidate pool for one feed computation.
///
/// Resolution order for every filter is request, then stored preferences,
/// then configured default. The store does the cheap pre-filtering
/// (bounding box, age range, lifestyle columns) and leaves the requester
/// and already-acted-on targets out before capping the pool; this stage
/// re-applies the exact predicates, exclusion included, against the live
/// action history.
pub struct CandidateRetriever<'a> {
    store: &'a dyn Store,
    pool_cap: usize,
    default_max_distance: f64,
}

impl<'a> CandidateRetriever<'a> {
    pub fn new(store: &'a dyn Store, pool_cap: usize, default_max_distance: f64) -> Self {
        Self {
            store,
            pool_cap,
            default_max_distance,
        }
    }

    /// Merge request overrides onto the requester's stored preferences.
    pub fn resolve_filters(&self, requester: &Profile, request: &FeedRequest) -> FeedFilters {
        let prefs = &requester.preferences;
        let stored_range = prefs.age_range;

        FeedFilters {
            age_min: request
                .age_min
                .or(stored_range.map(|r| r.min))
                .unwrap_or(DEFAULT_AGE_MIN),
            age_max: request
                .age_max
                .or(stored_range.map(|r| r.max))
                .unwrap_or(DEFAULT_AGE_MAX),
            max_distance: request
                .max_distance
                .or(prefs.max_distance)
                .unwrap_or(self.default_max_distance),
            smoking: request.smoking.clone().or_else(|| prefs.smoking.clone()),
            drinking: request.drinking.clone().or_else(|| prefs.drinking.clone()),
            body_type: request.body_type.clone().or_else(|| prefs.body_type.clone()),
            height_min: request.height_min,
        }
    }

    /// Fetch and filter the pool. The store already excludes the requester
    /// and acted-on targets before the cap; survivors must additionally
    /// pass mutual gender compatibility, the exact distance cutoff, and
    /// the lifestyle filters.
    pub async fn retrieve(
        &self,
        requester: &Profile,
        filters: &FeedFilters,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<Profile>, StoreError> {
        let bounds: Option<BoundingBox> = requester
            .coordinates()
            .map(|(lat, lon)| geo::bounding_box(lat, lon, filters.max_distance));

        let candidates = self
            .store
            .query_candidates(requester.user_id, bounds, filters, self.pool_cap)
            .await?;

        let mut excluded: HashSet<i64> = self
            .store
            .acted_target_ids(requester.user_id)
            .await?
            .into_iter()
            .collect();
        excluded.insert(requester.user_id);

        let pool: Vec<Profile> = candidates
            .into_iter()
            .filter(|c| !excluded.contains(&c.user_id))
            .filter(|c| mutual_gender_match(requester, c))
            .filter(|c| within_distance(requester, c, filters.max_distance))
            .filter(|c| within_age_range(c, filters, now))
            .filter(|c| passes_lifestyle_filters(c, filters))
            .collect();

        tracing::debug!(
            user_id = requester.user_id,
            pool_size = pool.len(),
            "candidate pool built"
        );
        Ok(pool)
    }
}

pub fn mutual_gender_match(requester: &Profile, candidate: &Profile) -> bool {
    requester.preferences.wants_gender(candidate.gender.as_deref())
        && candidate.preferences.wants_gender(requester.gender.as_deref())
}

/// Candidates without coordinates cannot be excluded on distance.
pub fn within_distance(requester: &Profile, candidate: &Profile, max_miles: f64) -> bool {
    match (requester.coordinates(), candidate.coordinates()) {
        (Some(_), Some(_)) => geo::distance_between(requester, candidate) <= max_miles,
        _ => true,
    }
}

/// Candidates without a date of birth pass; the age signal simply scores 0.
fn within_age_range(
    candidate: &Profile,
    filters: &FeedFilters,
    now: chrono::DateTime<chrono::Utc>,
) -> bool {
    match candidate.age_at(now) {
        Some(age) => age >= i32::from(filters.age_min) && age <= i32::from(filters.age_max),
        None => true,
    }
}

/// A lifestyle filter only excludes candidates who state a conflicting
/// value; unset attributes pass.
fn passes_lifestyle_filters(candidate: &Profile, filters: &FeedFilters) -> bool {
    let prefs = &candidate.preferences;

    let attribute_ok = |filter: &Option<String>, value: &Option<String>| match (filter, value) {
        (Some(wanted), Some(actual)) => wanted == actual,
        _ => true,
    };

    let height_ok = match (filters.height_min, prefs.height_cm) {
        (Some(min), Some(height)) => height >= min,
        _ => true,
    };

    attribute_ok(&filters.smoking, &prefs.smoking)
        && attribute_ok(&filters.drinking, &prefs.drinking)
        && attribute_ok(&filters.body_type, &prefs.body_type)
        && height_ok
}
