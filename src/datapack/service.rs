//! Datapack sync orchestration
//!
//! Ties the store, ledger, diff engine and digest together behind the
//! operations the HTTP layer exposes. Sync and hash-check are read-only;
//! publish and export are the only writers and are serialized.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use super::diff::reconcile;
use super::digest::{self, ContentHasher};
use super::error::DatapackError;
use super::ledger::{BumpKind, VersionLedger, VersionRecord};
use super::snapshot::{CardRecord, CatalogSnapshot, ClientSnapshot};
use super::store::DatapackStore;
use super::types::{HashCheckResponse, PublishResponse, SyncResponse};

/// File name of the datapack inside the data directory
pub const DATAPACK_FILE: &str = "datapack.json";

/// File name of the version record inside the data directory
pub const VERSION_FILE: &str = "version.json";

/// Entry point for every datapack operation
pub struct DatapackService {
    store: DatapackStore,
    ledger: VersionLedger,
    hasher: Arc<dyn ContentHasher>,
    publish_lock: Mutex<()>,
}

impl DatapackService {
    /// Create a service over `datapack.json` and `version.json` in `dir`
    pub fn new(dir: &Path, hasher: Arc<dyn ContentHasher>) -> Self {
        Self {
            store: DatapackStore::new(dir.join(DATAPACK_FILE)),
            ledger: VersionLedger::new(dir.join(VERSION_FILE)),
            hasher,
            publish_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &DatapackStore {
        &self.store
    }

    /// Current published version, if any
    pub async fn version(&self) -> Result<Option<VersionRecord>, DatapackError> {
        self.ledger.current().await
    }

    /// Reconcile a client's last-known datapack against the server's
    ///
    /// `client` is the raw request body. No body, `null` and `{}` all mean
    /// the client has no prior state.
    pub async fn sync(&self, client: Option<Value>) -> Result<SyncResponse, DatapackError> {
        let snapshot = self.store.load().await?;

        let client = match client {
            None | Some(Value::Null) => None,
            Some(Value::Object(ref map)) if map.is_empty() => None,
            Some(value) => Some(ClientSnapshot::from_value(&value)?),
        };

        let reconciliation = reconcile(&snapshot, client.as_ref());
        let version = self.reported_version(&snapshot).await?;

        tracing::debug!(
            mode = ?reconciliation.mode,
            server_cards = snapshot.len(),
            client_cards = client.as_ref().map(ClientSnapshot::len).unwrap_or(0),
            to_update = reconciliation.to_update.len(),
            to_delete = reconciliation.to_delete.len(),
            "Datapack sync computed"
        );

        Ok(SyncResponse {
            mode: reconciliation.mode,
            version,
            to_update: reconciliation.to_update,
            to_delete: reconciliation.to_delete,
            datapack: snapshot,
        })
    }

    /// Compare a client's digest with the digest of the current datapack
    pub async fn hashcheck(
        &self,
        client_hash: Option<&str>,
    ) -> Result<HashCheckResponse, DatapackError> {
        let server_hash = self.digest().await?;
        let is_same = client_hash
            .map(|hash| digest::compare(hash, &server_hash))
            .unwrap_or(false);

        Ok(HashCheckResponse {
            server_hash,
            is_same,
        })
    }

    /// Digest of the current datapack
    pub async fn digest(&self) -> Result<String, DatapackError> {
        let snapshot = self.store.load().await?;
        let hasher = Arc::clone(&self.hasher);

        // The hasher may spawn an external process
        tokio::task::spawn_blocking(move || digest::digest(&snapshot, hasher.as_ref()))
            .await
            .map_err(|e| DatapackError::Hasher(e.to_string()))?
    }

    /// Bump the version and re-export the datapack from `cards`
    ///
    /// The catalog is validated before the ledger is touched, so a refused
    /// export leaves the version unchanged.
    pub async fn publish(
        &self,
        kind: BumpKind,
        cards: Vec<CardRecord>,
    ) -> Result<PublishResponse, DatapackError> {
        let _guard = self.publish_lock.lock().await;

        let snapshot = Self::build_snapshot(cards)?;
        let record = self.ledger.bump(kind).await?;
        let snapshot = snapshot.with_version(record.version.to_string());

        if let Err(e) = self.store.write(&snapshot).await {
            tracing::error!(
                version = %record.version,
                error = %e,
                "Version bumped but datapack export failed"
            );
            return Err(e);
        }

        Ok(PublishResponse {
            version: Some(record.version),
            last_update: Some(record.last_update),
            card_count: snapshot.len(),
        })
    }

    /// Re-export the datapack from `cards` under the current version
    pub async fn export(&self, cards: Vec<CardRecord>) -> Result<PublishResponse, DatapackError> {
        let _guard = self.publish_lock.lock().await;

        let mut snapshot = Self::build_snapshot(cards)?;
        let record = self.ledger.current().await?;
        if let Some(record) = &record {
            snapshot = snapshot.with_version(record.version.to_string());
        }

        self.store.write(&snapshot).await?;

        Ok(PublishResponse {
            version: record.as_ref().map(|r| r.version),
            last_update: record.map(|r| r.last_update),
            card_count: snapshot.len(),
        })
    }

    fn build_snapshot(cards: Vec<CardRecord>) -> Result<CatalogSnapshot, DatapackError> {
        if cards.is_empty() {
            return Err(DatapackError::EmptyCatalog);
        }
        CatalogSnapshot::new(None, cards)
    }

    /// The version embedded in the shipped datapack; the ledger only
    /// answers for datapacks exported without one
    async fn reported_version(
        &self,
        snapshot: &CatalogSnapshot,
    ) -> Result<Option<String>, DatapackError> {
        if let Some(version) = snapshot.version() {
            return Ok(Some(version.to_string()));
        }
        Ok(self
            .ledger
            .current()
            .await?
            .map(|record| record.version.to_string()))
    }
}
