//! Track metadata lookups
//!
//! The engine only ever reads two things from the library database: the file
//! path of a track and the handful of fields shown in the status snapshot.
//! Both go through [`TrackStore`] so the service can run against an in-memory
//! store in tests.

use crate::error::Result;
use parking_lot::RwLock;
use playd_common::{TrackId, TrackInfo};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::runtime::Handle;
use tracing::info;

/// Read-only metadata lookups keyed by track
pub trait TrackStore: Send + Sync {
    /// Filesystem path of the track's audio file
    fn path_for(&self, id: TrackId) -> Result<Option<PathBuf>>;

    /// Display metadata for the track
    fn info_for(&self, id: TrackId) -> Result<Option<TrackInfo>>;
}

/// Open the library database read-only
pub async fn open_pool(path: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .read_only(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(2)
        .connect_with(options)
        .await?;
    info!("Opened track database {}", path.display());
    Ok(pool)
}

/// Look up the file path of a track
pub async fn get_track_path(db: &SqlitePool, id: TrackId) -> Result<Option<PathBuf>> {
    let row = sqlx::query("SELECT path FROM Songs WHERE id = ?")
        .bind(id.0)
        .fetch_optional(db)
        .await?;
    Ok(row.map(|row| PathBuf::from(row.get::<String, _>("path"))))
}

/// Look up display metadata of a track. A NULL title falls back to the id.
pub async fn get_track_info(db: &SqlitePool, id: TrackId) -> Result<Option<TrackInfo>> {
    let row = sqlx::query("SELECT title, artist, album, duration FROM Songs WHERE id = ?")
        .bind(id.0)
        .fetch_optional(db)
        .await?;

    Ok(row.map(|row| TrackInfo {
        id,
        title: row
            .get::<Option<String>, _>("title")
            .unwrap_or_else(|| id.to_string()),
        artist: row.get::<Option<String>, _>("artist").unwrap_or_default(),
        album: row.get::<Option<String>, _>("album").unwrap_or_default(),
        duration_secs: row
            .get::<Option<i64>, _>("duration")
            .map(|d| d.clamp(0, u32::MAX as i64) as u32)
            .unwrap_or(0),
    }))
}

/// [`TrackStore`] over the SQLite library
///
/// Lookups are made from the service's OS threads, so each call blocks on
/// the runtime that owns the pool. Never call these from inside that
/// runtime's async context.
pub struct SqliteTrackStore {
    pool: SqlitePool,
    handle: Handle,
}

impl SqliteTrackStore {
    pub fn new(pool: SqlitePool, handle: Handle) -> Self {
        Self { pool, handle }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl TrackStore for SqliteTrackStore {
    fn path_for(&self, id: TrackId) -> Result<Option<PathBuf>> {
        self.handle.block_on(get_track_path(&self.pool, id))
    }

    fn info_for(&self, id: TrackId) -> Result<Option<TrackInfo>> {
        self.handle.block_on(get_track_info(&self.pool, id))
    }
}

/// In-memory [`TrackStore`]
#[derive(Default)]
pub struct MemoryTrackStore {
    tracks: RwLock<HashMap<TrackId, (PathBuf, TrackInfo)>>,
}

impl MemoryTrackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, info: TrackInfo, path: impl Into<PathBuf>) {
        self.tracks.write().insert(info.id, (path.into(), info));
    }
}

impl TrackStore for MemoryTrackStore {
    fn path_for(&self, id: TrackId) -> Result<Option<PathBuf>> {
        Ok(self.tracks.read().get(&id).map(|(path, _)| path.clone()))
    }

    fn info_for(&self, id: TrackId) -> Result<Option<TrackInfo>> {
        Ok(self.tracks.read().get(&id).map(|(_, info)| info.clone()))
    }
}
