//! Datapack file persistence
//!
//! `datapack.json` is written by export/publish and read on every sync or
//! hash-check request.

use std::path::PathBuf;

use super::error::DatapackError;
use super::snapshot::CatalogSnapshot;
use crate::fsutil::write_atomic;

/// Reads and writes the server's datapack file
pub struct DatapackStore {
    path: PathBuf,
}

impl DatapackStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the current snapshot
    ///
    /// Any failure (missing file, I/O error, corrupt JSON, duplicate
    /// identities) is reported as [`DatapackError::CatalogUnavailable`].
    pub async fn load(&self) -> Result<CatalogSnapshot, DatapackError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DatapackError::CatalogUnavailable(format!(
                    "{} not found on server",
                    self.path.display()
                ))
            } else {
                DatapackError::CatalogUnavailable(format!("{}: {}", self.path.display(), e))
            }
        })?;

        CatalogSnapshot::from_json(&bytes).map_err(|e| {
            DatapackError::CatalogUnavailable(format!("{} is corrupt: {}", self.path.display(), e))
        })
    }

    /// Replace the datapack with `snapshot`
    pub async fn write(&self, snapshot: &CatalogSnapshot) -> Result<(), DatapackError> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        write_atomic(&self.path, &bytes).await?;

        tracing::info!(
            path = %self.path.display(),
            cards = snapshot.len(),
            version = snapshot.version().unwrap_or("none"),
            "Datapack written"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datapack::snapshot::{CardRecord, SyncStamp};
    use tempfile::TempDir;

    fn record(id: &str) -> CardRecord {
        CardRecord {
            id: id.to_string(),
            code: "SLZ".to_string(),
            name: "Ghostface".to_string(),
            description: None,
            card_type: "victime".to_string(),
            dimension: "urbain".to_string(),
            level: 3,
            score: 900,
            rarity: Some("super_rare".to_string()),
            image_name: format!("{}.png", id),
            last_updated: SyncStamp::new("2024-06-01T08:30:00Z"),
        }
    }

    #[tokio::test]
    async fn test_missing_datapack_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let store = DatapackStore::new(dir.path().join("datapack.json"));

        assert!(matches!(
            store.load().await,
            Err(DatapackError::CatalogUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_datapack_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("datapack.json");
        tokio::fs::write(&path, b"{\"cards\": [").await.unwrap();

        let store = DatapackStore::new(&path);
        assert!(matches!(
            store.load().await,
            Err(DatapackError::CatalogUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_write_then_load() {
        let dir = TempDir::new().unwrap();
        let store = DatapackStore::new(dir.path().join("datapack.json"));

        let snapshot =
            CatalogSnapshot::new(Some("0.3.0".to_string()), vec![record("a"), record("b")]).unwrap();
        store.write(&snapshot).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.version(), Some("0.3.0"));
        assert_eq!(loaded.cards(), snapshot.cards());
    }

    #[tokio::test]
    async fn test_loads_legacy_datapack_without_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("datapack.json");
        let legacy = serde_json::json!({
            "cards": [{
                "id": "a",
                "code": "SLZ-1",
                "name": "Jason",
                "description": "Camp Crystal Lake",
                "type": "survivant",
                "dimension": "nature",
                "level": -1,
                "score": -1,
                "rarity": "commune",
                "image_name": "a.png",
                "last_updated": "2024-01-01T00:00:00Z"
            }]
        });
        tokio::fs::write(&path, serde_json::to_vec_pretty(&legacy).unwrap())
            .await
            .unwrap();

        let loaded = DatapackStore::new(&path).load().await.unwrap();
        assert_eq!(loaded.version(), None);
        assert_eq!(loaded.len(), 1);
    }
}
