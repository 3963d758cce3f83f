use crate::core::geo;
use crate::models::{ActionSummary, BehaviorVector, BehaviorWeights, Profile};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Build the requester's behavior vector from their aggregated action
/// history.
///
/// Each summary contributes `weight(kind) * count` to the age, location
/// bucket, and gender keys of its target profile. Targets whose profile is
/// missing, or whose action kind carries zero weight, contribute nothing. A
/// requester with no weighted history yields an empty vector, which keeps
/// scoring in basic mode.
pub fn build(
    summaries: &[ActionSummary],
    targets: &HashMap<i64, Profile>,
    weights: &BehaviorWeights,
    now: DateTime<Utc>,
) -> BehaviorVector {
    let mut vector = BehaviorVector::default();

    for summary in summaries {
        let weight = weights.for_kind(summary.kind);
        if weight <= 0.0 {
            continue;
        }
        let Some(target) = targets.get(&summary.target_id) else {
            continue;
        };
        let contribution = weight * f64::from(summary.count);

        if let Some(age) = target.age_at(now) {
            *vector.ages.entry(age).or_insert(0.0) += contribution;
        }
        if let Some((lat, lon)) = target.coordinates() {
            *vector
                .locations
                .entry(geo::location_bucket(lat, lon))
                .or_insert(0.0) += contribution;
        }
        if let Some(gender) = &target.gender {
            *vector.genders.entry(gender.clone()).or_insert(0.0) += contribution;
        }
    }

    vector
}
