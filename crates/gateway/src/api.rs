//! REST façade over a [`Gateway`].
//!
//! | Route                  | Method | Contract function    |
//! |------------------------|--------|----------------------|
//! | `/create`              | POST   | `CreateAsset`        |
//! | `/update`              | POST   | `UpdateAsset`        |
//! | `/read/{dealerID}`     | GET    | `ReadAsset`          |
//! | `/history/{dealerID}`  | GET    | `GetHistoryForAsset` |
//!
//! Submits answer with a short plain-text confirmation; reads return the
//! contract payload unchanged as `application/json`.

use std::sync::Arc;

use asset_contract::{CREATE_ASSET, GET_HISTORY_FOR_ASSET, READ_ASSET, UPDATE_ASSET};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::dto::AssetRequest;
use crate::error::ApiError;
use crate::gateway::Gateway;

const DEALER_ID_REQUIRED: &str = "dealerID required";

#[derive(Clone)]
pub struct AppState {
    gateway: Arc<dyn Gateway>,
}

pub fn router(gateway: Arc<dyn Gateway>) -> Router {
    Router::new()
        .route("/create", post(create_asset))
        .route("/update", post(update_asset))
        .route("/read", get(missing_dealer_id))
        .route("/read/", get(missing_dealer_id))
        .route("/read/{*dealer_id}", get(read_asset))
        .route("/history", get(missing_dealer_id))
        .route("/history/", get(missing_dealer_id))
        .route("/history/{*dealer_id}", get(asset_history))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { gateway })
}

async fn create_asset(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    submit(&state, CREATE_ASSET, &body).await?;
    Ok((StatusCode::CREATED, "Asset created\n"))
}

async fn update_asset(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    submit(&state, UPDATE_ASSET, &body).await?;
    Ok((StatusCode::OK, "Asset updated\n"))
}

async fn read_asset(
    State(state): State<AppState>,
    Path(dealer_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    evaluate(&state, READ_ASSET, dealer_id).await
}

async fn asset_history(
    State(state): State<AppState>,
    Path(dealer_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    evaluate(&state, GET_HISTORY_FOR_ASSET, dealer_id).await
}

async fn missing_dealer_id() -> ApiError {
    ApiError::BadRequest(DEALER_ID_REQUIRED.to_string())
}

async fn submit(state: &AppState, function: &str, body: &[u8]) -> Result<Vec<u8>, ApiError> {
    let request =
        AssetRequest::from_body(body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    tracing::debug!(function, dealer_id = %request.dealer_id, "submitting transaction");
    state
        .gateway
        .submit_transaction(function.to_string(), request.into_args())
        .await
        .map_err(ApiError::Submit)
}

async fn evaluate(
    state: &AppState,
    function: &str,
    dealer_id: String,
) -> Result<impl IntoResponse, ApiError> {
    if dealer_id.is_empty() {
        return Err(ApiError::BadRequest(DEALER_ID_REQUIRED.to_string()));
    }
    let payload = state
        .gateway
        .evaluate_transaction(function.to_string(), vec![dealer_id])
        .await
        .map_err(ApiError::Evaluate)?;
    Ok(([(header::CONTENT_TYPE, "application/json")], payload))
}
