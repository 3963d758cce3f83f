use crate::models::domain::{FeedEntry, MatchPair};
use serde::{Deserialize, Serialize};

/// Response for the feed endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedResponse {
    pub matches: Vec<FeedEntry>,
    pub total: usize,
}

/// Response for the action endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    pub action: String,
    #[serde(rename = "isMatch")]
    pub is_match: bool,
    pub message: String,
}

/// Response for the established matches endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstablishedMatchesResponse {
    pub matches: Vec<MatchPair>,
    pub total: usize,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
