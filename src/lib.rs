//! Slasherz Server
//!
//! Card catalog backend for the Slasherz trading card game. Cards are edited
//! in SQLite and published as a versioned JSON datapack that offline clients
//! reconcile against with a timestamp diff and a BLAKE2b-512 digest.

pub mod access;
pub mod cards;
pub mod config;
pub mod datapack;
pub mod db;
pub mod error;
pub mod fsutil;
pub mod routes;
pub mod state;
pub mod storage;
