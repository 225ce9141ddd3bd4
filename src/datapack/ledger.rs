//! Catalog version ledger
//!
//! Tracks the `major.minor.patch` version of the published datapack in
//! `version.json`. The ledger is the only writer of that file; every
//! mutation goes through [`VersionLedger::bump`].

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use tokio::sync::Mutex;

use super::error::DatapackError;
use super::snapshot::SyncStamp;
use crate::fsutil::write_atomic;

/// A three-part catalog version
///
/// Ordering is by major, then minor, then patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// The version that follows this one for a change of the given size
    pub fn bumped(self, kind: BumpKind) -> Result<Self, DatapackError> {
        let overflow = || DatapackError::VersionOverflow(self.to_string());
        Ok(match kind {
            BumpKind::Major => Self::new(self.major.checked_add(1).ok_or_else(overflow)?, 0, 0),
            BumpKind::Minor => {
                Self::new(self.major, self.minor.checked_add(1).ok_or_else(overflow)?, 0)
            }
            BumpKind::Patch => {
                Self::new(self.major, self.minor, self.patch.checked_add(1).ok_or_else(overflow)?)
            }
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = DatapackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || DatapackError::MalformedVersion(s.to_string());

        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(malformed());
        }

        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            // u64::from_str accepts a leading '+', which is not part of the format
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            *slot = part.parse().map_err(|_| malformed())?;
        }

        Ok(Self::new(numbers[0], numbers[1], numbers[2]))
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Magnitude of a catalog change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpKind {
    Major,
    Minor,
    Patch,
}

impl FromStr for BumpKind {
    type Err = DatapackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "major" | "majeur" => Ok(Self::Major),
            "minor" | "mineur" => Ok(Self::Minor),
            "patch" => Ok(Self::Patch),
            other => Err(DatapackError::InvalidVersionKind(other.to_string())),
        }
    }
}

impl fmt::Display for BumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
        })
    }
}

/// Contents of `version.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub version: Version,
    #[serde(default)]
    pub last_update: SyncStamp,
}

/// Owner of the persisted version record
pub struct VersionLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl VersionLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Read the current record; `None` if nothing has been published yet
    pub async fn current(&self) -> Result<Option<VersionRecord>, DatapackError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(DatapackError::VersionUnavailable(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            DatapackError::VersionUnavailable(format!("{}: {}", self.path.display(), e))
        })
    }

    /// Increment the version and persist it
    ///
    /// Concurrent bumps are serialized; the record on disk is replaced
    /// atomically. Starts from `0.0.0` when no record exists.
    pub async fn bump(&self, kind: BumpKind) -> Result<VersionRecord, DatapackError> {
        let _guard = self.write_lock.lock().await;

        let previous = self.current().await?;
        let record = VersionRecord {
            version: previous
                .as_ref()
                .map(|r| r.version)
                .unwrap_or_default()
                .bumped(kind)?,
            last_update: SyncStamp::now(),
        };

        let bytes = serde_json::to_vec_pretty(&record)?;
        write_atomic(&self.path, &bytes).await?;

        tracing::info!(
            kind = %kind,
            from = %previous.map(|r| r.version.to_string()).unwrap_or_else(|| "none".to_string()),
            to = %record.version,
            "Bumped datapack version"
        );

        Ok(record)
    }
}
