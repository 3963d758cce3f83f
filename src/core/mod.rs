// Core matching exports
pub mod behavior;
pub mod engine;
pub mod geo;
pub mod retrieval;
pub mod scoring;

pub use engine::{ActionOutcome, EngineConfig, EngineError, MatchEngine};
pub use retrieval::CandidateRetriever;
pub use scoring::MatchScorer;
