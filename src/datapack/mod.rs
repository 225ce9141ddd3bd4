//! Datapack synchronization
//!
//! Provides:
//! - Catalog snapshots loaded from `datapack.json`
//! - A `major.minor.patch` version ledger persisted in `version.json`
//! - Reconciliation of a client's last-known datapack against the server's
//! - An order-independent integrity digest
//!
//! # Sync Protocol
//!
//! 1. Client asks `GET /version` whether a newer catalog was published
//! 2. Client may send its digest to `POST /hashcheck` to detect "no change"
//! 3. Client sends its last-known datapack (or nothing) to `POST /sync`
//! 4. Server replies with the identities to fetch and to delete, plus the
//!    full current datapack
//!
//! # Reconciliation
//!
//! - Cards are keyed by `id`
//! - A card is re-sent when the server's `last_updated` is strictly newer
//! - Cards missing on the server are deleted on the client

mod diff;
mod digest;
mod error;
mod ledger;
mod service;
mod snapshot;
mod store;
mod types;

pub use diff::{reconcile, Reconciliation, SyncMode};
pub use digest::{
    canonical_bytes, compare, digest, B2sumHasher, Blake2bHasher, ContentHasher, FallbackHasher,
    DIGEST_HEX_LEN,
};
pub use error::DatapackError;
pub use ledger::{BumpKind, Version, VersionLedger, VersionRecord};
pub use service::{DatapackService, DATAPACK_FILE, VERSION_FILE};
pub use snapshot::{
    CardRecord, CatalogSnapshot, ClientSnapshot, SyncStamp, EPOCH_STAMP, NO_VALUE, STAMP_FORMAT,
};
pub use store::DatapackStore;
pub use types::{HashCheckRequest, HashCheckResponse, PublishRequest, PublishResponse, SyncResponse};
