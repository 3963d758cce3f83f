use crate::core::{EngineError, MatchEngine};
use crate::models::{
    ActionKind, ActionRequest, ActionResponse, ErrorResponse, EstablishedMatchesResponse,
    FeedRequest, FeedResponse, HealthResponse,
};
use crate::services::PgStore;
use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<MatchEngine>,
    pub store: Arc<PgStore>,
}

/// Configure all matching routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/feed", web::post().to(get_feed))
        .route("/actions", web::post().to(submit_action))
        .route("/matches", web::get().to(get_established_matches));
}

fn engine_error_response(e: EngineError) -> HttpResponse {
    match &e {
        EngineError::SelfAction => HttpResponse::BadRequest().json(ErrorResponse {
            error: "self_action".to_string(),
            message: e.to_string(),
            status_code: 400,
        }),
        EngineError::ProfileIncomplete(_) => {
            HttpResponse::UnprocessableEntity().json(ErrorResponse {
                error: "profile_incomplete".to_string(),
                message: e.to_string(),
                status_code: 422,
            })
        }
        EngineError::InaccessibleTarget(_) => HttpResponse::NotFound().json(ErrorResponse {
            error: "inaccessible_target".to_string(),
            message: e.to_string(),
            status_code: 404,
        }),
        EngineError::Store(_) => {
            tracing::error!("Store failure: {}", e);
            HttpResponse::ServiceUnavailable().json(ErrorResponse {
                error: "store_unavailable".to_string(),
                message: e.to_string(),
                status_code: 503,
            })
        }
    }
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let db_healthy = state.store.health_check().await.unwrap_or(false);
    let status = if db_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Ranked feed endpoint
///
/// POST /api/v1/feed
///
/// Request body:
/// ```json
/// {
///   "userId": 42,
///   "ageMin": 21,
///   "ageMax": 35,
///   "maxDistance": 25.0,
///   "limit": 20
/// }
/// ```
async fn get_feed(state: web::Data<AppState>, req: web::Json<FeedRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for feed request: {:?}", errors);
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    tracing::info!("Computing feed for user {}, limit {}", req.user_id, req.limit);

    match state.engine.get_feed(&req).await {
        Ok(entries) => {
            let total = entries.len();
            HttpResponse::Ok().json(FeedResponse {
                matches: entries,
                total,
            })
        }
        Err(e) => engine_error_response(e),
    }
}

/// Action endpoint
///
/// POST /api/v1/actions
///
/// Request body:
/// ```json
/// {
///   "userId": 42,
///   "targetUserId": 99,
///   "action": "like|pass|super_like"
/// }
/// ```
async fn submit_action(state: web::Data<AppState>, req: web::Json<ActionRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let Some(kind) = ActionKind::parse(&req.action.to_lowercase()) else {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Invalid action".to_string(),
            message: "Action must be one of: like, pass, super_like".to_string(),
            status_code: 400,
        });
    };

    match state
        .engine
        .submit_action(req.user_id, req.target_user_id, kind)
        .await
    {
        Ok(outcome) => {
            let message = if outcome.is_match {
                "It's a match!".to_string()
            } else {
                "Action recorded".to_string()
            };
            HttpResponse::Ok().json(ActionResponse {
                action: outcome.kind.as_str().to_string(),
                is_match: outcome.is_match,
                message,
            })
        }
        Err(e) => engine_error_response(e),
    }
}

/// Established matches endpoint
///
/// GET /api/v1/matches?userId={userId}
async fn get_established_matches(
    state: web::Data<AppState>,
    query: web::Query<std::collections::HashMap<String, String>>,
) -> impl Responder {
    let user_id = match query.get("userId").and_then(|id| id.parse::<i64>().ok()) {
        Some(id) if id >= 1 => id,
        _ => {
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: "Missing userId parameter".to_string(),
                message: "userId query parameter must be a positive integer".to_string(),
                status_code: 400,
            });
        }
    };

    match state.engine.established_matches(user_id).await {
        Ok(matches) => {
            let total = matches.len();
            HttpResponse::Ok().json(EstablishedMatchesResponse { matches, total })
        }
        Err(e) => engine_error_response(e),
    }
}
