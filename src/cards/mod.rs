//! Card catalog
//!
//! CRUD over the `cards` table. Published datapacks are exported from here.

mod store;
mod types;

pub use store::CardRepository;
pub use types::{Card, CardDimension, CardInput, CardRarity, CardType, IMAGE_EXTENSION};
