use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Outbound notification seam. Delivery failures are reported but must never
/// roll back the action that triggered them.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn notify_match(&self, user_id: i64, matched_user_id: i64) -> Result<(), GatewayError>;
}

/// Conversation bootstrap seam, invoked on match creation when the
/// auto-chat feature is enabled.
#[async_trait]
pub trait ConversationGateway: Send + Sync {
    async fn open_conversation(&self, user_a: i64, user_b: i64) -> Result<(), GatewayError>;
}

/// Runtime feature toggles.
pub trait FeatureFlags: Send + Sync {
    fn is_enabled(&self, flag: &str) -> bool;
}

/// Flag set loaded once from configuration.
pub struct StaticFlags {
    flags: HashMap<String, bool>,
}

impl StaticFlags {
    pub fn new(flags: HashMap<String, bool>) -> Self {
        Self { flags }
    }
}

impl FeatureFlags for StaticFlags {
    fn is_enabled(&self, flag: &str) -> bool {
        self.flags.get(flag).copied().unwrap_or(false)
    }
}

/// Telemetry seam for feed and action events.
pub trait TelemetrySink: Send + Sync {
    fn feed_served(&self, user_id: i64, count: usize, cache_hit: bool);
    fn action_recorded(&self, actor_id: i64, target_id: i64, action: &str, is_match: bool);
}

/// Default sink that emits structured log events.
pub struct LogTelemetry;

impl TelemetrySink for LogTelemetry {
    fn feed_served(&self, user_id: i64, count: usize, cache_hit: bool) {
        tracing::info!(
            event_id = %Uuid::new_v4(),
            user_id,
            count,
            cache_hit,
            "feed served"
        );
    }

    fn action_recorded(&self, actor_id: i64, target_id: i64, action: &str, is_match: bool) {
        tracing::info!(
            event_id = %Uuid::new_v4(),
            actor_id,
            target_id,
            action,
            is_match,
            "action recorded"
        );
    }
}

/// Webhook-backed notifier that POSTs match events to a configured endpoint.
pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl WebhookNotifier {
    pub fn new(endpoint: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
        }
    }
}

#[async_trait]
impl NotificationGateway for WebhookNotifier {
    async fn notify_match(&self, user_id: i64, matched_user_id: i64) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(format!("{}/notifications", self.endpoint))
            .header("X-API-Key", &self.api_key)
            .json(&json!({
                "type": "new_match",
                "userId": user_id,
                "matchedUserId": matched_user_id,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Delivery(format!(
                "notification endpoint returned {}: {}",
                status, body
            )));
        }

        tracing::debug!("Match notification delivered to user {}", user_id);
        Ok(())
    }
}

#[async_trait]
impl ConversationGateway for WebhookNotifier {
    async fn open_conversation(&self, user_a: i64, user_b: i64) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(format!("{}/conversations", self.endpoint))
            .header("X-API-Key", &self.api_key)
            .json(&json!({
                "participants": [user_a, user_b],
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::Delivery(format!(
                "conversation endpoint returned {}",
                response.status()
            )));
        }

        tracing::debug!("Conversation opened for users {} and {}", user_a, user_b);
        Ok(())
    }
}
