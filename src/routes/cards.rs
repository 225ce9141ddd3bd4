//! Card catalog endpoints
//!
//! Reads are public. Writes go through the IP allow-list and refresh the
//! card's `last_updated`, which is what the next publish picks up.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;

use crate::access::require_allowed_ip;
use crate::cards::{Card, CardInput, CardRepository, IMAGE_EXTENSION};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Uploaded artwork limit
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Serialize)]
pub struct CardListResponse {
    pub cards: Vec<Card>,
    pub total: usize,
}

/// Create the cards router
pub fn router(state: &AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/", post(create_card))
        .route("/:id", put(update_card).delete(delete_card))
        .route("/:id/image", post(upload_image))
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_allowed_ip));

    Router::new()
        .route("/", get(list_cards))
        .route("/:id", get(get_card))
        .merge(admin)
}

async fn list_cards(State(state): State<AppState>) -> Result<Json<CardListResponse>> {
    let cards = CardRepository::new(state.db()).list().await?;
    let total = cards.len();
    Ok(Json(CardListResponse { cards, total }))
}

async fn get_card(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Card>> {
    let card = CardRepository::new(state.db())
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Card not found: {}", id)))?;
    Ok(Json(card))
}

async fn create_card(
    State(state): State<AppState>,
    Json(input): Json<CardInput>,
) -> Result<(StatusCode, Json<Card>)> {
    let card = CardRepository::new(state.db()).create(&input).await?;
    Ok((StatusCode::CREATED, Json(card)))
}

async fn update_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CardInput>,
) -> Result<Json<Card>> {
    let card = CardRepository::new(state.db())
        .update(&id, &input)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Card not found: {}", id)))?;

    tracing::info!(card_id = %id, "Card updated");
    Ok(Json(card))
}

async fn delete_card(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    let deleted = CardRepository::new(state.db()).delete(&id).await?;
    if !deleted {
        return Err(AppError::NotFound(format!("Card not found: {}", id)));
    }

    tracing::info!(card_id = %id, "Card deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Replace a card's artwork
///
/// Expects a multipart field named `image`; it is stored as `<id>.png`.
async fn upload_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<Card>> {
    let repo = CardRepository::new(state.db());
    if repo.get(&id).await?.is_none() {
        return Err(AppError::NotFound(format!("Card not found: {}", id)));
    }

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read upload: {}", e))
    })? {
        if field.name() != Some("image") {
            continue;
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read image data: {}", e)))?;
        if data.is_empty() {
            return Err(AppError::BadRequest("Image is empty".to_string()));
        }

        let image_name = format!("{}{}", id, IMAGE_EXTENSION);
        state.images().save(&image_name, &data).await?;

        let card = repo
            .set_image(&id, &image_name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Card not found: {}", id)))?;
        return Ok(Json(card));
    }

    tracing::warn!(card_id = %id, "No image field found in multipart upload");
    Err(AppError::BadRequest(
        "No image provided. Use field name 'image'".to_string(),
    ))
}
