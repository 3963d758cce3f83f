//! Ember Match - peer-matching service for the Ember dating app
//!
//! This library computes ranked candidate feeds and handles like/pass
//! actions, including mutual-match detection. Scoring blends profile
//! compatibility with a behavioral signal derived from each user's own
//! action history.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{
    geo::{bounding_box, haversine_miles},
    ActionOutcome, EngineConfig, EngineError, MatchEngine, MatchScorer,
};
pub use models::{
    ActionKind, ActionRequest, ActionResponse, FeedEntry, FeedRequest, FeedResponse, MatchPair,
    Profile,
};
