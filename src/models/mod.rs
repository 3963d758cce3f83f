// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    ActionKind, ActionSummary, AgeRange, BehaviorVector, BehaviorWeights, BoundingBox, FeedEntry,
    FeedFilters, MatchPair, Preferences, Profile, ScoreContext, ScoringWeights,
};
pub use requests::{ActionRequest, FeedRequest};
pub use responses::{
    ActionResponse, ErrorResponse, EstablishedMatchesResponse, FeedResponse, HealthResponse,
};
