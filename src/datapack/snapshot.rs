//! Catalog snapshots
//!
//! A [`CatalogSnapshot`] is the immutable, in-memory view of every card in
//! the datapack at the moment it was loaded. A [`ClientSnapshot`] is the
//! much thinner view a client sends back: only identities and timestamps
//! matter for reconciliation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::error::DatapackError;

/// Wire format for card timestamps. Zero-padded and UTC so that string
/// order equals chronological order.
pub const STAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Timestamp assumed when a card carries none
pub const EPOCH_STAMP: &str = "1970-01-01T00:00:00Z";

/// Serialized value for an integer attribute with no value
pub const NO_VALUE: i64 = -1;

/// A card modification timestamp, compared as a string
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SyncStamp(String);

impl SyncStamp {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn epoch() -> Self {
        Self(EPOCH_STAMP.to_string())
    }

    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.format(STAMP_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SyncStamp {
    fn default() -> Self {
        Self::epoch()
    }
}

impl std::fmt::Display for SyncStamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SyncStamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<String>::deserialize(deserializer)?
            .map(SyncStamp)
            .unwrap_or_default())
    }
}

/// One catalog entry as it appears in the datapack
///
/// Enumerated attributes (`type`, `dimension`, `rarity`) are carried as
/// opaque strings: their value sets drift between catalog revisions and the
/// sync protocol never inspects them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    /// Stable identity, used as the reconciliation key
    pub id: String,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub card_type: String,
    pub dimension: String,
    #[serde(default = "no_value", deserialize_with = "optional_level")]
    pub level: i64,
    #[serde(default = "no_value", deserialize_with = "optional_level")]
    pub score: i64,
    pub rarity: Option<String>,
    pub image_name: String,
    #[serde(default)]
    pub last_updated: SyncStamp,
}

fn no_value() -> i64 {
    NO_VALUE
}

fn optional_level<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or(NO_VALUE))
}

/// On-disk shape of `datapack.json`
#[derive(Deserialize)]
struct DatapackDocument {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    cards: Vec<CardRecord>,
}

#[derive(Serialize)]
struct DatapackDocumentRef<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
    cards: &'a [CardRecord],
}

/// Immutable view of the full catalog
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    version: Option<String>,
    cards: Vec<CardRecord>,
    index: HashMap<String, usize>,
}

impl CatalogSnapshot {
    /// Build a snapshot, rejecting duplicate identities
    pub fn new(version: Option<String>, cards: Vec<CardRecord>) -> Result<Self, DatapackError> {
        let mut index = HashMap::with_capacity(cards.len());
        for (position, card) in cards.iter().enumerate() {
            if index.insert(card.id.clone(), position).is_some() {
                return Err(DatapackError::DuplicateIdentity(card.id.clone()));
            }
        }

        Ok(Self {
            version,
            cards,
            index,
        })
    }

    /// Decode a snapshot from datapack JSON
    pub fn from_json(bytes: &[u8]) -> Result<Self, DatapackError> {
        let document: DatapackDocument = serde_json::from_slice(bytes)?;
        Self::new(document.version, document.cards)
    }

    /// Replace the version captured in this snapshot
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Version string captured when the datapack was exported
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Cards in snapshot order
    pub fn cards(&self) -> &[CardRecord] {
        &self.cards
    }

    pub fn get(&self, id: &str) -> Option<&CardRecord> {
        self.index.get(id).map(|&position| &self.cards[position])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Identities in snapshot order
    pub fn identities(&self) -> impl Iterator<Item = &str> {
        self.cards.iter().map(|card| card.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl Serialize for CatalogSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        DatapackDocumentRef {
            version: self.version.as_deref(),
            cards: &self.cards,
        }
        .serialize(serializer)
    }
}

/// The client's last-known view of the catalog
///
/// Only identity and `last_updated` are read from each card. An identity
/// repeated in the payload keeps the position of its first occurrence and
/// the timestamp of its last one.
#[derive(Debug, Clone, Default)]
pub struct ClientSnapshot {
    entries: Vec<(String, SyncStamp)>,
    index: HashMap<String, usize>,
}

impl ClientSnapshot {
    /// Decode a client snapshot from a JSON value of the form
    /// `{"cards": [{"id": "...", "last_updated": "..."}, ...]}`
    pub fn from_value(value: &Value) -> Result<Self, DatapackError> {
        let object = value.as_object().ok_or_else(|| {
            DatapackError::InvalidClientData("expected a JSON object".to_string())
        })?;

        let mut snapshot = Self::default();

        let cards = match object.get("cards") {
            None => return Ok(snapshot),
            Some(Value::Array(cards)) => cards,
            Some(_) => {
                return Err(DatapackError::InvalidClientData(
                    "`cards` must be an array".to_string(),
                ))
            }
        };

        for (position, card) in cards.iter().enumerate() {
            let card = card.as_object().ok_or_else(|| {
                DatapackError::InvalidClientData(format!("card #{} is not an object", position))
            })?;

            let id = card.get("id").and_then(Value::as_str).ok_or_else(|| {
                DatapackError::InvalidClientData(format!("card #{} has no string `id`", position))
            })?;

            let stamp = match card.get("last_updated") {
                None | Some(Value::Null) => SyncStamp::epoch(),
                Some(Value::String(s)) => SyncStamp::new(s.as_str()),
                Some(_) => {
                    return Err(DatapackError::InvalidClientData(format!(
                        "card {} has a non-string `last_updated`",
                        id
                    )))
                }
            };

            snapshot.insert(id.to_string(), stamp);
        }

        Ok(snapshot)
    }

    fn insert(&mut self, id: String, stamp: SyncStamp) {
        match self.index.get(&id) {
            Some(&position) => self.entries[position].1 = stamp,
            None => {
                self.index.insert(id.clone(), self.entries.len());
                self.entries.push((id, stamp));
            }
        }
    }

    /// Timestamp the client holds for `id`, if it has the card at all
    pub fn stamp(&self, id: &str) -> Option<&SyncStamp> {
        self.index.get(id).map(|&position| &self.entries[position].1)
    }

    /// Identities in the order the client sent them
    pub fn identities(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<&CatalogSnapshot> for ClientSnapshot {
    fn from(snapshot: &CatalogSnapshot) -> Self {
        let mut client = Self::default();
        for card in snapshot.cards() {
            client.insert(card.id.clone(), card.last_updated.clone());
        }
        client
    }
}
