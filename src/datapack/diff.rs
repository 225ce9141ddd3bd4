//! Reconciliation between the server's snapshot and a client's view
//!
//! Last write wins by `last_updated`: a card is re-sent when the server copy
//! is strictly newer than the client's. Cards the client holds that no
//! longer exist on the server are reported for deletion.

use serde::{Deserialize, Serialize};

use super::snapshot::{CatalogSnapshot, ClientSnapshot};

/// How the reconciliation was computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Client sent no prior state; everything must be fetched
    Full,
    /// Client state was compared card by card
    Diff,
}

/// Identities the client must fetch and delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub mode: SyncMode,
    /// Server identities, in server snapshot order
    pub to_update: Vec<String>,
    /// Client identities, in client order
    pub to_delete: Vec<String>,
}

/// Compute the reconciliation set for `client` against `server`
pub fn reconcile(server: &CatalogSnapshot, client: Option<&ClientSnapshot>) -> Reconciliation {
    let Some(client) = client else {
        return Reconciliation {
            mode: SyncMode::Full,
            to_update: server.identities().map(str::to_string).collect(),
            to_delete: Vec::new(),
        };
    };

    let to_update = server
        .cards()
        .iter()
        .filter(|card| match client.stamp(&card.id) {
            None => true,
            Some(client_stamp) => card.last_updated > *client_stamp,
        })
        .map(|card| card.id.clone())
        .collect();

    let to_delete = client
        .identities()
        .filter(|id| !server.contains(id))
        .map(str::to_string)
        .collect();

    Reconciliation {
        mode: SyncMode::Diff,
        to_update,
        to_delete,
    }
}
