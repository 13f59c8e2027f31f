use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use moxbot_db::DbPool;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub detail: Option<String>,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool })
}

async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database_error =
        sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(&state.db_pool).await.err();

    let response = match database_error {
        None => HealthResponse {
            status: "ready",
            database: "ready",
            detail: None,
            checked_at: Utc::now().to_rfc3339(),
        },
        Some(error) => HealthResponse {
            status: "degraded",
            database: "unreachable",
            detail: Some(error.to_string()),
            checked_at: Utc::now().to_rfc3339(),
        },
    };

    let status_code =
        if response.status == "ready" { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(response))
}
