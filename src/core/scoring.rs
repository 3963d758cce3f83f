use crate::core::geo;
use crate::models::{BehaviorVector, Profile, ScoreContext, ScoringWeights};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Maximum points each base signal can contribute.
const DISTANCE_POINTS: f64 = 20.0;
const AGE_POINTS: f64 = 15.0;
const GENDER_POINTS: f64 = 25.0;
const PREFERENCE_POINTS: f64 = 35.0;

/// Points per affinity dimension of the behavioral component.
const AFFINITY_POINTS: f64 = 25.0;

/// Flat bonus when the candidate has already liked the requester.
const MUTUAL_INTEREST_POINTS: f64 = 50.0;

/// Compatibility scorer.
///
/// Runs in one of two modes per request. Basic mode uses only the two
/// profiles. Advanced mode engages when the requester has a non-empty
/// behavior vector, blending the base score with behavioral affinity,
/// communication style, and mutual interest. Both modes share the freshness
/// boost and the saturation penalty, and both land in [0, 100].
pub struct MatchScorer {
    weights: ScoringWeights,
}

impl MatchScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    /// Score a candidate for the requester. Deterministic for fixed inputs.
    pub fn score(
        &self,
        requester: &Profile,
        candidate: &Profile,
        behavior: &BehaviorVector,
        context: &ScoreContext,
        now: DateTime<Utc>,
    ) -> f64 {
        let base = base_score(requester, candidate, now);
        let freshness = freshness_boost(candidate.last_seen_at, now);
        let penalty = saturation_penalty(context.artifacts_last_24h);

        let core = if behavior.is_empty() {
            base
        } else {
            self.weights.base * base
                + self.weights.behavioral * behavioral_score(behavior, candidate, now)
                + self.weights.communication
                    * communication_score(requester.bio.as_deref(), candidate.bio.as_deref())
                + self.weights.mutual * mutual_interest_score(context)
        };

        (core + freshness - penalty).clamp(0.0, 100.0)
    }
}

impl Default for MatchScorer {
    fn default() -> Self {
        Self::new(ScoringWeights::default())
    }
}

/// Profile-only compatibility: distance + age + gender + stated preferences.
/// Ranges over [0, 95]. A side without coordinates cannot be distance-scored
/// and earns none of the distance bucket.
pub fn base_score(requester: &Profile, candidate: &Profile, now: DateTime<Utc>) -> f64 {
    let proximity = match (requester.coordinates(), candidate.coordinates()) {
        (Some(_), Some(_)) => distance_score(geo::distance_between(requester, candidate)),
        _ => 0.0,
    };
    proximity
        + age_score(requester.age_at(now), candidate.age_at(now))
        + gender_score(requester, candidate)
        + preference_score(requester, candidate)
}

/// Decays 1 point per 5 miles from a 20-point maximum.
pub fn distance_score(miles: f64) -> f64 {
    (DISTANCE_POINTS - miles / 5.0).max(0.0)
}

/// Decays 1 point per year of age difference from a 15-point maximum.
/// Zero when either age is unknown.
pub fn age_score(a: Option<i32>, b: Option<i32>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => (AGE_POINTS - f64::from((a - b).abs())).max(0.0),
        _ => 0.0,
    }
}

/// All-or-nothing: 25 points when each side wants the other's gender, with
/// an empty preference map counting as compatible.
pub fn gender_score(requester: &Profile, candidate: &Profile) -> f64 {
    let mutual = requester.preferences.wants_gender(candidate.gender.as_deref())
        && candidate.preferences.wants_gender(requester.gender.as_deref());
    if mutual {
        GENDER_POINTS
    } else {
        0.0
    }
}

/// Stated-preference agreement over relationship style, orientation, and
/// STI status. A side that has set no preferences at all grants full credit.
/// Per field, credit is granted unless both sides state a value and the
/// values differ.
pub fn preference_score(requester: &Profile, candidate: &Profile) -> f64 {
    let a = &requester.preferences;
    let b = &candidate.preferences;
    if a.is_unset() || b.is_unset() {
        return PREFERENCE_POINTS;
    }

    let fields = [
        (&a.relationship_style, &b.relationship_style),
        (&a.orientation, &b.orientation),
        (&a.sti_status, &b.sti_status),
    ];
    let per_field = PREFERENCE_POINTS / fields.len() as f64;

    fields
        .iter()
        .map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) if x != y => 0.0,
            _ => per_field,
        })
        .sum()
}

/// Recency boost for candidates active within the last week.
pub fn freshness_boost(last_seen: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let Some(seen) = last_seen else {
        return 0.0;
    };
    let hours = (now - seen).num_hours();
    if hours < 1 {
        5.0
    } else if hours < 24 {
        3.0
    } else if hours < 168 {
        1.0
    } else {
        0.0
    }
}

/// Demotes candidates flooding the system with proximity artifacts.
/// 1 point per 10 artifacts in the last 24 hours, capped at 5.
pub fn saturation_penalty(artifacts_last_24h: i64) -> f64 {
    ((artifacts_last_24h / 10) as f64).min(5.0)
}

/// How strongly the candidate resembles the requester's past positive
/// targets, over age, location bucket, and gender. Each dimension scores
/// [0, 25] relative to the heaviest key in that dimension.
pub fn behavioral_score(vector: &BehaviorVector, candidate: &Profile, now: DateTime<Utc>) -> f64 {
    let age_affinity = candidate
        .age_at(now)
        .and_then(|age| relative_affinity(vector.ages.get(&age), vector.ages.values()))
        .unwrap_or(0.0);

    let location_affinity = candidate
        .coordinates()
        .and_then(|(lat, lon)| {
            relative_affinity(
                vector.locations.get(&geo::location_bucket(lat, lon)),
                vector.locations.values(),
            )
        })
        .unwrap_or(0.0);

    let gender_affinity = candidate
        .gender
        .as_ref()
        .and_then(|g| relative_affinity(vector.genders.get(g), vector.genders.values()))
        .unwrap_or(0.0);

    age_affinity + location_affinity + gender_affinity
}

fn relative_affinity<'a>(
    weight: Option<&f64>,
    all: impl Iterator<Item = &'a f64>,
) -> Option<f64> {
    let weight = *weight?;
    let max = all.fold(0.0_f64, |acc, w| acc.max(*w));
    if max <= 0.0 {
        return None;
    }
    Some(AFFINITY_POINTS * weight / max)
}

/// Writing-style similarity between two bios: word-overlap Dice coefficient
/// worth up to 50 plus length similarity worth up to 25. Zero when either
/// bio is missing or empty.
pub fn communication_score(a: Option<&str>, b: Option<&str>) -> f64 {
    let (Some(a), Some(b)) = (a, b) else {
        return 0.0;
    };
    let words_a: HashSet<String> = tokenize(a);
    let words_b: HashSet<String> = tokenize(b);
    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let shared = words_a.intersection(&words_b).count() as f64;
    let dice = 2.0 * shared / (words_a.len() + words_b.len()) as f64;

    let (len_a, len_b) = (words_a.len() as f64, words_b.len() as f64);
    let length_similarity = len_a.min(len_b) / len_a.max(len_b);

    dice * 50.0 + length_similarity * 25.0
}

fn tokenize(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

/// Flat bonus when mutual interest already exists in one direction.
pub fn mutual_interest_score(context: &ScoreContext) -> f64 {
    if context.liked_requester {
        MUTUAL_INTEREST_POINTS
    } else {
        0.0
    }
}
