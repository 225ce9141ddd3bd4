//! Datapack API endpoints
//!
//! Lets offline clients check the published version, compare digests and
//! reconcile their local datapack. Publishing is restricted to allow-listed
//! addresses.

use axum::{
    body::Bytes,
    extract::State,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;

use crate::access::require_allowed_ip;
use crate::cards::CardRepository;
use crate::datapack::{
    BumpKind, CardRecord, DatapackError, HashCheckRequest, HashCheckResponse, PublishRequest,
    PublishResponse, SyncResponse, VersionRecord,
};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Create the datapack router
pub fn router(state: &AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/publish", post(publish))
        .route("/export", post(export))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_allowed_ip));

    Router::new()
        .route("/version", get(get_version))
        .route("/sync", post(sync_datapack))
        .route("/hashcheck", post(hashcheck))
        .merge(admin)
}

/// Current published version
async fn get_version(State(state): State<AppState>) -> Result<Json<VersionRecord>> {
    let record = state
        .datapack()
        .version()
        .await?
        .ok_or_else(|| AppError::NotFound("version.json not found".to_string()))?;
    Ok(Json(record))
}

/// Reconcile the client's datapack with the server's
///
/// The body is optional; an empty body requests the full datapack.
async fn sync_datapack(State(state): State<AppState>, body: Bytes) -> Result<Json<SyncResponse>> {
    let client = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        let value: Value = serde_json::from_slice(&body)
            .map_err(|e| DatapackError::InvalidClientData(e.to_string()))?;
        Some(value)
    };

    let response = state.datapack().sync(client).await?;
    Ok(Json(response))
}

/// Compare the client's digest with the server's
async fn hashcheck(
    State(state): State<AppState>,
    Json(req): Json<HashCheckRequest>,
) -> Result<Json<HashCheckResponse>> {
    let response = state.datapack().hashcheck(req.hash.as_deref()).await?;
    Ok(Json(response))
}

/// Bump the version and re-export the datapack from the card table
async fn publish(
    State(state): State<AppState>,
    Json(req): Json<PublishRequest>,
) -> Result<Json<PublishResponse>> {
    let kind: BumpKind = req.kind.parse()?;
    let cards = load_records(&state).await?;
    let response = state.datapack().publish(kind, cards).await?;
    Ok(Json(response))
}

/// Re-export the datapack under the current version
async fn export(State(state): State<AppState>) -> Result<Json<PublishResponse>> {
    let cards = load_records(&state).await?;
    let response = state.datapack().export(cards).await?;
    Ok(Json(response))
}

async fn load_records(state: &AppState) -> Result<Vec<CardRecord>> {
    let cards = CardRepository::new(state.db()).list().await?;
    Ok(cards.iter().map(|card| card.to_record()).collect())
}
