//! Request and response bodies of the datapack API

use serde::{Deserialize, Serialize};

use super::diff::SyncMode;
use super::ledger::Version;
use super::snapshot::{CatalogSnapshot, SyncStamp};

/// Response to `POST /sync`
///
/// Always carries the full datapack; `to_update` / `to_delete` only tell
/// the client which of its entries changed.
#[derive(Debug, Clone, Serialize)]
pub struct SyncResponse {
    pub mode: SyncMode,
    pub version: Option<String>,
    pub to_update: Vec<String>,
    pub to_delete: Vec<String>,
    pub datapack: CatalogSnapshot,
}

/// Request to `POST /hashcheck`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HashCheckRequest {
    #[serde(default)]
    pub hash: Option<String>,
}

/// Response to `POST /hashcheck`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashCheckResponse {
    pub server_hash: String,
    pub is_same: bool,
}

/// Request to `POST /publish`
///
/// `kind` stays a string so unknown values surface as an invalid version
/// kind rather than a body rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishRequest {
    pub kind: String,
}

/// Response to `POST /publish` and `POST /export`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResponse {
    pub version: Option<Version>,
    pub last_update: Option<SyncStamp>,
    pub card_count: usize,
}
