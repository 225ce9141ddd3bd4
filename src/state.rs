//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::access::AllowList;
use crate::config::{Config, DatapackConfig};
use crate::datapack::{B2sumHasher, Blake2bHasher, ContentHasher, DatapackService, FallbackHasher};
use crate::storage::ImageStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pub db: SqlitePool,
    pub datapack: DatapackService,
    pub images: ImageStore,
    pub allow_list: AllowList,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: &Config, db: SqlitePool, images: ImageStore) -> Self {
        let hasher = build_hasher(&config.datapack);
        let datapack = DatapackService::new(&config.datapack.dir, hasher);
        let allow_list = AllowList::new(config.access.allowed_ips.iter().cloned());

        Self {
            inner: Arc::new(AppStateInner {
                db,
                datapack,
                images,
                allow_list,
            }),
        }
    }

    /// Get the database pool
    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    /// Get the datapack service
    pub fn datapack(&self) -> &DatapackService {
        &self.inner.datapack
    }

    /// Get the image store
    pub fn images(&self) -> &ImageStore {
        &self.inner.images
    }

    /// Get the administrative allow-list
    pub fn allow_list(&self) -> &AllowList {
        &self.inner.allow_list
    }
}

/// External `b2sum` with in-process fallback, or in-process only when no
/// command is configured
fn build_hasher(config: &DatapackConfig) -> Arc<dyn ContentHasher> {
    match &config.hasher_command {
        Some(command) => Arc::new(FallbackHasher::new(
            B2sumHasher::new(command.clone()),
            Blake2bHasher,
        )),
        None => Arc::new(Blake2bHasher),
    }
}
