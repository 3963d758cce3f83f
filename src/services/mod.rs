// Service exports
pub mod cache;
pub mod gateway;
pub mod postgres;
pub mod store;

pub use cache::{FeedCache, MemoryCache, TieredCache};
pub use gateway::{
    ConversationGateway, FeatureFlags, GatewayError, LogTelemetry, NotificationGateway,
    StaticFlags, TelemetrySink, WebhookNotifier,
};
pub use postgres::PgStore;
pub use store::{Store, StoreError};
