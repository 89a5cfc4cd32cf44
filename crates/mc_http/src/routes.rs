//! 路由与处理函数

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use mc_assess::AssessmentReport;
use mc_counsel::{CounselReply, CounselingService, SessionStart};
use mc_durable::{MessageRecord, SessionRecord};

use crate::error::ApiError;

type ApiResult<T> = std::result::Result<T, ApiError>;

// 提取失败也走统一的 `{error, code}` 响应
type JsonBody<T> = std::result::Result<Json<T>, JsonRejection>;
type SessionPath = std::result::Result<Path<Uuid>, PathRejection>;

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub student_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// 构建咨询服务路由
pub fn router(service: Arc<CounselingService>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/counsel/sessions", post(start_session))
        .route(
            "/api/counsel/sessions/:id/messages",
            post(send_message).get(history),
        )
        .route("/api/counsel/sessions/:id/result", get(result))
        .route(
            "/api/counsel/students/:student_id/sessions",
            get(student_sessions),
        )
        .with_state(service)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn start_session(
    State(service): State<Arc<CounselingService>>,
    body: JsonBody<StartSessionRequest>,
) -> ApiResult<(StatusCode, Json<SessionStart>)> {
    let Json(req) = body?;
    let start = service.start_session(&req.student_id).await?;
    Ok((StatusCode::CREATED, Json(start)))
}

async fn send_message(
    State(service): State<Arc<CounselingService>>,
    path: SessionPath,
    body: JsonBody<SendMessageRequest>,
) -> ApiResult<Json<CounselReply>> {
    let Path(id) = path?;
    let Json(req) = body?;
    Ok(Json(service.send_message(id, &req.content).await?))
}

async fn history(
    State(service): State<Arc<CounselingService>>,
    path: SessionPath,
) -> ApiResult<Json<Vec<MessageRecord>>> {
    let Path(id) = path?;
    Ok(Json(service.history(id).await?))
}

async fn result(
    State(service): State<Arc<CounselingService>>,
    path: SessionPath,
) -> ApiResult<Json<AssessmentReport>> {
    let Path(id) = path?;
    Ok(Json(service.get_report(id).await?))
}

async fn student_sessions(
    State(service): State<Arc<CounselingService>>,
    Path(student_id): Path<String>,
) -> ApiResult<Json<Vec<SessionRecord>>> {
    Ok(Json(service.sessions_for_student(&student_id).await?))
}
