use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to fetch a ranked feed for a user.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FeedRequest {
    #[validate(range(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: i64,
    #[validate(range(min = 18, max = 100))]
    #[serde(alias = "age_min", rename = "ageMin", default)]
    pub age_min: Option<u8>,
    #[validate(range(min = 18, max = 100))]
    #[serde(alias = "age_max", rename = "ageMax", default)]
    pub age_max: Option<u8>,
    /// Miles.
    #[validate(range(min = 1.0, max = 500.0))]
    #[serde(alias = "max_distance", rename = "maxDistance", default)]
    pub max_distance: Option<f64>,
    #[serde(default)]
    pub smoking: Option<String>,
    #[serde(default)]
    pub drinking: Option<String>,
    #[serde(alias = "body_type", rename = "bodyType", default)]
    pub body_type: Option<String>,
    #[serde(alias = "height_min", rename = "heightMin", default)]
    pub height_min: Option<u16>,
    #[serde(default = "default_limit")]
    pub limit: u16,
}

fn default_limit() -> u16 {
    20
}

/// Request to record a like/pass/super-like action.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ActionRequest {
    #[validate(range(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: i64,
    #[validate(range(min = 1))]
    #[serde(alias = "target_user_id", rename = "targetUserId")]
    pub target_user_id: i64,
    /// One of: like, pass, super_like.
    pub action: String,
}
