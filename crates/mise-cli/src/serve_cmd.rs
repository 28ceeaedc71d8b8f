use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use mise_core::error::{GenerateError, StoreError};
use mise_core::gateway::{CompletionGateway, GatewayError};
use mise_core::plan::{GenerateRequest, generate_meal_plan};
use mise_core::shopping::{ShoppingListOptions, shopping_list_for_plan};
use mise_db::queries::{meal_plans, pantry, users};

/// Default look-ahead of the expiring-pantry endpoint.
const DEFAULT_EXPIRING_DAYS: u32 = 7;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub gateway: Arc<dyn CompletionGateway>,
    /// Upper bound on one completion call.
    pub timeout: Duration,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            kind: "not_found",
            message: msg.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "validation",
            message: msg.into(),
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "store",
            message: format!("{err:#}"),
        }
    }
}

impl From<GenerateError> for AppError {
    fn from(err: GenerateError) -> Self {
        let status = match &err {
            GenerateError::Validation(_) => StatusCode::BAD_REQUEST,
            GenerateError::Gateway(GatewayError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            GenerateError::Gateway(_) | GenerateError::Parse(_) => StatusCode::BAD_GATEWAY,
            GenerateError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Bodies that are not valid JSON or do not fit the request type.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "store",
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        if self.status.is_server_error() {
            tracing::warn!(status = %self.status, kind = self.kind, error = %self.message, "request failed");
        }
        let body = serde_json::json!({
            "error": { "kind": self.kind, "message": self.message }
        });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Query types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct PlanRange {
    pub from: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExpiringQuery {
    pub days: Option<u32>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/users/{user_id}/meal-plans",
            post(create_meal_plan).get(list_meal_plans),
        )
        .route("/api/users/{user_id}/pantry/expiring", get(list_expiring))
        .route("/api/meal-plans/{id}", get(get_meal_plan_detail))
        .route("/api/meal-plans/{id}/shopping-list", get(get_shopping_list))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(state: AppState, bind: &str, port: u16) -> Result<()> {
    let model = state.gateway.model_name().to_string();
    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!(%model, "mise serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("mise serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl+C; shutting down");
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn create_meal_plan(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<axum::response::Response, AppError> {
    let Json(request) = payload?;
    let plan = generate_meal_plan(
        &state.pool,
        state.gateway.as_ref(),
        user_id,
        &request,
        state.timeout,
    )
    .await?;

    let detail = meal_plans::get_meal_plan_detail(&state.pool, plan.id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("meal plan {} not found", plan.id)))?;

    Ok((StatusCode::CREATED, Json(detail)).into_response())
}

async fn list_meal_plans(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(range): Query<PlanRange>,
) -> Result<axum::response::Response, AppError> {
    ensure_user(&state.pool, user_id).await?;

    let plans = meal_plans::list_meal_plans_for_user(&state.pool, user_id, range.from, range.until)
        .await
        .map_err(AppError::internal)?;

    Ok(Json(plans).into_response())
}

async fn get_meal_plan_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<axum::response::Response, AppError> {
    let detail = meal_plans::get_meal_plan_detail(&state.pool, id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("meal plan {id} not found")))?;

    Ok(Json(detail).into_response())
}

async fn get_shopping_list(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(options): Query<ShoppingListOptions>,
) -> Result<axum::response::Response, AppError> {
    let lines = shopping_list_for_plan(&state.pool, id, options)
        .await?
        .ok_or_else(|| AppError::not_found(format!("meal plan {id} not found")))?;

    Ok(Json(lines).into_response())
}

async fn list_expiring(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<ExpiringQuery>,
) -> Result<axum::response::Response, AppError> {
    ensure_user(&state.pool, user_id).await?;

    let today = Local::now().date_naive();
    let days = query.days.unwrap_or(DEFAULT_EXPIRING_DAYS);
    let items = pantry::list_expiring_soon(&state.pool, user_id, today, days)
        .await
        .map_err(AppError::internal)?;

    Ok(Json(items).into_response())
}

async fn ensure_user(pool: &PgPool, user_id: Uuid) -> Result<(), AppError> {
    users::get_user(pool, user_id)
        .await
        .map_err(AppError::internal)?
        .map(|_| ())
        .ok_or_else(|| AppError::not_found(format!("user {user_id} not found")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
