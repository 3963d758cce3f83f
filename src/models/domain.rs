use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Structured profile preferences.
///
/// Modeled as a versioned struct with explicit optional fields plus a
/// string-keyed extension map, so the scorer's field access stays statically
/// checkable while unknown keys written by newer clients survive round-trips.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Preferences {
    /// Gender -> wanted. An empty map means "no stated preference".
    #[serde(rename = "genderPreferences", default)]
    pub gender_preferences: HashMap<String, bool>,
    #[serde(rename = "ageRange", default)]
    pub age_range: Option<AgeRange>,
    /// Maximum feed distance in miles.
    #[serde(rename = "maxDistance", default)]
    pub max_distance: Option<f64>,
    #[serde(default)]
    pub smoking: Option<String>,
    #[serde(default)]
    pub drinking: Option<String>,
    #[serde(rename = "bodyType", default)]
    pub body_type: Option<String>,
    #[serde(rename = "heightCm", default)]
    pub height_cm: Option<u16>,
    #[serde(rename = "relationshipStyle", default)]
    pub relationship_style: Option<String>,
    #[serde(default)]
    pub orientation: Option<String>,
    #[serde(rename = "stiStatus", default)]
    pub sti_status: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Preferences {
    /// True when the user has not filled in any preference at all.
    pub fn is_unset(&self) -> bool {
        self.gender_preferences.is_empty()
            && self.age_range.is_none()
            && self.max_distance.is_none()
            && self.smoking.is_none()
            && self.drinking.is_none()
            && self.body_type.is_none()
            && self.height_cm.is_none()
            && self.relationship_style.is_none()
            && self.orientation.is_none()
            && self.sti_status.is_none()
            && self.extra.is_empty()
    }

    /// Whether this user wants the given gender. An empty preference map
    /// defaults to compatible.
    pub fn wants_gender(&self, gender: Option<&str>) -> bool {
        if self.gender_preferences.is_empty() {
            return true;
        }
        match gender {
            Some(g) => self.gender_preferences.get(g).copied().unwrap_or(false),
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AgeRange {
    pub min: u8,
    pub max: u8,
}

/// User profile with demographic and location data. One per user; read-only
/// from the matching core's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(rename = "dateOfBirth", default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(rename = "lookingFor", default)]
    pub looking_for: Vec<String>,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(rename = "lastSeenAt", default)]
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    /// Age in whole years at `now`, if a date of birth is set.
    pub fn age_at(&self, now: DateTime<Utc>) -> Option<i32> {
        let dob = self.date_of_birth?;
        let today = now.date_naive();
        Some(today.years_since(dob)? as i32)
    }
}

/// Kind of a recorded swipe action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Like,
    Pass,
    SuperLike,
}

impl ActionKind {
    /// Positive actions are the ones that can form a mutual match.
    pub fn is_positive(self) -> bool {
        matches!(self, ActionKind::Like | ActionKind::SuperLike)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Like => "like",
            ActionKind::Pass => "pass",
            ActionKind::SuperLike => "super_like",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "like" => Some(ActionKind::Like),
            "pass" => Some(ActionKind::Pass),
            "super_like" | "superLike" => Some(ActionKind::SuperLike),
            _ => None,
        }
    }
}

/// Confirmed mutual interest, stored once per unordered pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPair {
    #[serde(rename = "userLow")]
    pub user_low: i64,
    #[serde(rename = "userHigh")]
    pub user_high: i64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl MatchPair {
    /// Canonicalize so the pair is unique regardless of who liked first.
    pub fn canonical(a: i64, b: i64, created_at: DateTime<Utc>) -> Self {
        Self {
            user_low: a.min(b),
            user_high: a.max(b),
            created_at,
        }
    }

    pub fn other(&self, user_id: i64) -> i64 {
        if self.user_low == user_id {
            self.user_high
        } else {
            self.user_low
        }
    }
}

/// Requester action history aggregated by (target, kind).
#[derive(Debug, Clone)]
pub struct ActionSummary {
    pub target_id: i64,
    pub kind: ActionKind,
    pub count: u32,
}

/// Derived, request-scoped preference signal built from action history.
/// Maps from target age / location bucket / gender to an accumulated weight.
#[derive(Debug, Clone, Default)]
pub struct BehaviorVector {
    pub ages: HashMap<i32, f64>,
    pub locations: HashMap<String, f64>,
    pub genders: HashMap<String, f64>,
}

impl BehaviorVector {
    pub fn is_empty(&self) -> bool {
        self.ages.is_empty() && self.locations.is_empty() && self.genders.is_empty()
    }
}

/// Geospatial bounding box used for cheap candidate pre-filtering.
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// Feed filters after merging the request with the requester's stored
/// preferences and the configured defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedFilters {
    pub age_min: u8,
    pub age_max: u8,
    /// Miles.
    pub max_distance: f64,
    pub smoking: Option<String>,
    pub drinking: Option<String>,
    pub body_type: Option<String>,
    pub height_min: Option<u16>,
}

impl FeedFilters {
    /// Stable fingerprint of the normalized filter parameters, used as the
    /// per-user cache key suffix.
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let canonical = format!(
            "age={}-{}|dist={:.2}|smoke={}|drink={}|body={}|hmin={}",
            self.age_min,
            self.age_max,
            self.max_distance,
            self.smoking.as_deref().unwrap_or(""),
            self.drinking.as_deref().unwrap_or(""),
            self.body_type.as_deref().unwrap_or(""),
            self.height_min.map(|h| h.to_string()).unwrap_or_default(),
        );
        let digest = Sha256::digest(canonical.as_bytes());
        hex::encode(&digest[..16])
    }
}

/// One ranked entry of a computed feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEntry {
    #[serde(rename = "candidateId")]
    pub candidate_id: i64,
    pub score: f64,
    /// Miles; 0 when either side has no coordinates.
    pub distance: f64,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub bio: Option<String>,
}

/// Per-candidate signals that come from outside the two profiles.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreContext {
    /// Candidate has already liked or super-liked the requester.
    pub liked_requester: bool,
    /// Proximity artifacts the candidate created in the last 24 hours.
    pub artifacts_last_24h: i64,
}

/// Blend weights for the advanced scoring mode.
#[derive(Debug, Clone, Copy)]
pub struct ScoringWeights {
    pub base: f64,
    pub behavioral: f64,
    pub communication: f64,
    pub mutual: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            base: 0.40,
            behavioral: 0.30,
            communication: 0.20,
            mutual: 0.10,
        }
    }
}

/// Per-action-kind weights used when building the behavior vector.
#[derive(Debug, Clone, Copy)]
pub struct BehaviorWeights {
    pub like: f64,
    pub super_like: f64,
    pub pass: f64,
}

impl Default for BehaviorWeights {
    fn default() -> Self {
        Self {
            like: 0.3,
            super_like: 0.5,
            pass: 0.0,
        }
    }
}

impl BehaviorWeights {
    pub fn for_kind(&self, kind: ActionKind) -> f64 {
        match kind {
            ActionKind::Like => self.like,
            ActionKind::SuperLike => self.super_like,
            ActionKind::Pass => self.pass,
        }
    }
}
