//! Card persistence
//!
//! SQLite storage for the catalog's card records. Every write refreshes
//! `last_updated`, which is what datapack reconciliation keys on.

use sqlx::SqlitePool;
use uuid::Uuid;

use super::types::{Card, CardInput, IMAGE_EXTENSION};
use crate::datapack::SyncStamp;
use crate::error::{AppError, Result};

const CARD_COLUMNS: &str = "id, code, image_name, name, description, type, dimension, \
                            level, score, rarity, last_updated";

/// Repository for card records
pub struct CardRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CardRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// All cards ordered by identity
    pub async fn list(&self) -> Result<Vec<Card>> {
        let cards = sqlx::query_as::<_, Card>(&format!(
            "SELECT {} FROM cards ORDER BY id ASC",
            CARD_COLUMNS
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(cards)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Card>> {
        let card = sqlx::query_as::<_, Card>(&format!(
            "SELECT {} FROM cards WHERE id = ?",
            CARD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(card)
    }

    /// Insert a new card
    pub async fn create(&self, input: &CardInput) -> Result<Card> {
        input.validate().map_err(AppError::BadRequest)?;

        let id = input
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let image_name = input
            .image_name
            .clone()
            .unwrap_or_else(|| format!("{}{}", id, IMAGE_EXTENSION));
        let now = SyncStamp::now();

        let result = sqlx::query(
            r#"
            INSERT INTO cards (id, code, image_name, name, description, type, dimension,
                               level, score, rarity, last_updated)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&input.code)
        .bind(&image_name)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.card_type.as_str())
        .bind(input.dimension.as_str())
        .bind(input.level)
        .bind(input.score)
        .bind(input.rarity.map(|r| r.as_str()))
        .bind(now.as_str())
        .execute(self.pool)
        .await;

        match result {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(AppError::BadRequest(format!("Card already exists: {}", id)));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(card_id = %id, "Card created");

        self.get(&id)
            .await?
            .ok_or_else(|| AppError::Internal("Failed to fetch created card".to_string()))
    }

    /// Replace a card's attributes; the identity never changes
    pub async fn update(&self, id: &str, input: &CardInput) -> Result<Option<Card>> {
        input.validate().map_err(AppError::BadRequest)?;

        let Some(existing) = self.get(id).await? else {
            return Ok(None);
        };
        let image_name = input.image_name.clone().unwrap_or(existing.image_name);

        sqlx::query(
            r#"
            UPDATE cards SET
                code = ?, image_name = ?, name = ?, description = ?, type = ?,
                dimension = ?, level = ?, score = ?, rarity = ?, last_updated = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.code)
        .bind(&image_name)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.card_type.as_str())
        .bind(input.dimension.as_str())
        .bind(input.level)
        .bind(input.score)
        .bind(input.rarity.map(|r| r.as_str()))
        .bind(SyncStamp::now().as_str())
        .bind(id)
        .execute(self.pool)
        .await?;

        self.get(id).await
    }

    /// Point a card at a new image; the image must already be stored
    pub async fn set_image(&self, id: &str, image_name: &str) -> Result<Option<Card>> {
        let result = sqlx::query("UPDATE cards SET image_name = ?, last_updated = ? WHERE id = ?")
            .bind(image_name)
            .bind(SyncStamp::now().as_str())
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(id).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cards WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
