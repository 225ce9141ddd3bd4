//! Card types
//!
//! The enumerations below are the catalog's current value sets. The
//! datapack carries them as plain strings, so changing a set here never
//! affects the sync protocol.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::datapack::{CardRecord, SyncStamp, NO_VALUE};

/// Required extension for card artwork
pub const IMAGE_EXTENSION: &str = ".png";

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    other => Err(format!("unknown {}: {}", stringify!($name), other)),
                }
            }
        }
    };
}

string_enum!(
    /// What a card represents in play
    CardType {
        Survivant => "survivant",
        Victime => "victime",
        Lvl1 => "lvl1",
        Lvl2 => "lvl2",
        Lvl3 => "lvl3",
        Objet => "objet",
        Evenement => "evenement",
        Lieu => "lieu",
        Jeton => "jeton",
    }
);

string_enum!(
    /// The realm a card belongs to
    CardDimension {
        Desert => "desert",
        Nature => "nature",
        Urbain => "urbain",
        Enfer => "enfer",
        Espace => "espace",
    }
);

string_enum!(
    CardRarity {
        Commune => "commune",
        Rare => "rare",
        SuperRare => "super_rare",
        Mythique => "mythique",
    }
);

/// Card row as stored in the `cards` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Card {
    pub id: String,
    pub code: String,
    pub image_name: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub card_type: String,
    pub dimension: String,
    pub level: Option<i64>,
    pub score: Option<i64>,
    pub rarity: Option<String>,
    pub last_updated: String,
}

impl Card {
    /// Datapack form of this card; absent integers become the `-1` sentinel
    pub fn to_record(&self) -> CardRecord {
        CardRecord {
            id: self.id.clone(),
            code: self.code.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            card_type: self.card_type.clone(),
            dimension: self.dimension.clone(),
            level: self.level.unwrap_or(NO_VALUE),
            score: self.score.unwrap_or(NO_VALUE),
            rarity: self.rarity.clone(),
            image_name: self.image_name.clone(),
            last_updated: SyncStamp::new(self.last_updated.as_str()),
        }
    }
}

/// Body of card create/update requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardInput {
    /// Only honoured on create; generated when absent
    #[serde(default)]
    pub id: Option<String>,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub card_type: CardType,
    pub dimension: CardDimension,
    #[serde(default)]
    pub level: Option<i64>,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub rarity: Option<CardRarity>,
    /// Defaults to `<id>.png`
    #[serde(default)]
    pub image_name: Option<String>,
}

impl CardInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.code.trim().is_empty() {
            return Err("code must not be empty".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if let Some(id) = &self.id {
            if id.trim().is_empty() {
                return Err("id must not be empty".to_string());
            }
        }
        if let Some(image_name) = &self.image_name {
            if !image_name.ends_with(IMAGE_EXTENSION) {
                return Err(format!("image_name must end with {}", IMAGE_EXTENSION));
            }
        }
        Ok(())
    }
}
