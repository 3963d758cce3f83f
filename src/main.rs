mod config;
mod core;
mod models;
mod routes;
mod services;

use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use crate::config::Settings;
use crate::core::{EngineConfig, MatchEngine};
use models::{BehaviorWeights, ScoringWeights};
use routes::feed::AppState;
use services::{
    FeedCache, LogTelemetry, MemoryCache, PgStore, StaticFlags, TieredCache, WebhookNotifier,
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST),
        )
        .content_type("application/json")
        .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(
    err: error::JsonPayloadError,
    req: &actix_web::HttpRequest,
) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(
    err: error::QueryPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Initialize logging
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting Ember Match service...");

    // Load configuration
    let settings = Settings::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        panic!("Configuration error: {}", e);
    });

    info!("Configuration loaded successfully");

    // Initialize PostgreSQL store (runs migrations)
    let db_max_conn = settings.database.max_connections.unwrap_or(10);
    let db_min_conn = settings.database.min_connections.unwrap_or(1);

    let store = Arc::new(
        PgStore::new(&settings.database.url, db_max_conn, db_min_conn)
            .await
            .unwrap_or_else(|e| {
                error!("Failed to connect to PostgreSQL: {}", e);
                panic!("PostgreSQL connection error: {}", e);
            }),
    );

    info!("PostgreSQL store initialized (max: {} connections)", db_max_conn);

    // Initialize the feed cache. Redis is optional: without it the service
    // falls back to a process-local cache.
    let cache_ttl = settings.cache.ttl_secs.unwrap_or(300);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(1000);

    let cache: Arc<dyn FeedCache> =
        match TieredCache::new(&settings.cache.redis_url, l1_cache_size, cache_ttl).await {
            Ok(c) => {
                info!(
                    "Tiered cache initialized (L1: {} entries, TTL: {}s)",
                    l1_cache_size, cache_ttl
                );
                Arc::new(c)
            }
            Err(e) => {
                warn!("Failed to connect to Redis ({}), using in-process cache", e);
                Arc::new(MemoryCache::new(l1_cache_size, cache_ttl))
            }
        };

    // Initialize gateways
    let webhook = Arc::new(WebhookNotifier::new(
        settings.gateway.endpoint.clone(),
        settings.gateway.api_key.clone(),
    ));
    let flags = Arc::new(StaticFlags::new(settings.features.clone()));

    // Initialize the matching engine with configured weights
    let engine_config = EngineConfig {
        pool_cap: settings.matching.pool_cap.unwrap_or(100),
        max_limit: settings.matching.max_limit.unwrap_or(100),
        default_max_distance: settings.matching.default_max_distance.unwrap_or(50.0),
        scoring: ScoringWeights {
            base: settings.scoring.weights.base,
            behavioral: settings.scoring.weights.behavioral,
            communication: settings.scoring.weights.communication,
            mutual: settings.scoring.weights.mutual,
        },
        behavior: BehaviorWeights {
            like: settings.scoring.behavior.like,
            super_like: settings.scoring.behavior.super_like,
            pass: settings.scoring.behavior.pass,
        },
    };

    info!("Engine initialized with config: {:?}", engine_config);

    let engine = Arc::new(MatchEngine::new(
        store.clone(),
        cache,
        webhook.clone(),
        webhook,
        flags,
        Arc::new(LogTelemetry),
        engine_config,
    ));

    // Build application state
    let app_state = AppState { engine, store };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
