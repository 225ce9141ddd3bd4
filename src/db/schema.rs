//! Database schema initialization

use sqlx::SqlitePool;

use crate::error::Result;

/// Initialize the database schema
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(SCHEMA_SQL)
        .execute(pool)
        .await?;

    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Card catalog; `id` is the identity used by datapack sync and never changes
CREATE TABLE IF NOT EXISTS cards (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL,
    image_name TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    type TEXT NOT NULL,
    dimension TEXT NOT NULL,
    level INTEGER,
    score INTEGER,
    rarity TEXT,
    last_updated TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cards_code ON cards(code);
CREATE INDEX IF NOT EXISTS idx_cards_last_updated ON cards(last_updated);
"#;
