//! Datapack error types

use thiserror::Error;

/// Errors raised by the datapack sync core
#[derive(Error, Debug)]
pub enum DatapackError {
    /// The client-supplied snapshot could not be decoded
    #[error("Invalid client data: {0}")]
    InvalidClientData(String),

    /// The server-side datapack is missing or unreadable
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// The version record exists but cannot be read
    #[error("Version record unavailable: {0}")]
    VersionUnavailable(String),

    #[error("Invalid version kind: {0} (expected major, minor or patch)")]
    InvalidVersionKind(String),

    #[error("Malformed version: {0:?}")]
    MalformedVersion(String),

    /// A version component is already at its maximum
    #[error("Version {0} cannot be bumped further")]
    VersionOverflow(String),

    #[error("Duplicate card identity: {0}")]
    DuplicateIdentity(String),

    #[error("Refusing to export an empty catalog")]
    EmptyCatalog,

    #[error("Hasher error: {0}")]
    Hasher(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
