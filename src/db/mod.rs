pub mod migrations;
pub mod queries;

use crate::journal::patch::{EntryPatch, merge};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::{debug, info};

pub use migrations::SCHEMA_VERSION;

pub type EntryId = i64;

pub const DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: EntryId,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub description: String,
    pub category: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntry {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub description: String,
    pub category: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyGoal {
    pub date: String,
    pub goal: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyGoal {
    pub week_start: String,
    pub goal: String,
    pub timestamp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("entry {0} not found")]
    NotFound(EntryId),
    #[error("invalid entry: {0}")]
    Validation(String),
    #[error("database schema version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("database connection lock poisoned")]
    Poisoned,
    #[error("database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

type SharedConnection = Arc<Mutex<Connection>>;

/// Local record store for journal entries and goals.
///
/// Cloning is cheap and every clone shares one lazily opened connection. The first
/// `connect` opens the file and runs migrations; callers racing on that first open all
/// wait on the same initialization.
///
/// `update_entry` reads and writes under two separate lock acquisitions, so it is not
/// isolated from a concurrent delete or update of the same id. The journal assumes a
/// single writer.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    path: PathBuf,
    target_version: u32,
    conn: OnceCell<SharedConnection>,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_target_version(path, SCHEMA_VERSION)
    }

    pub(crate) fn with_target_version(path: impl Into<PathBuf>, target_version: u32) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                path: path.into(),
                target_version,
                conn: OnceCell::new(),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub async fn connect(&self) -> Result<SharedConnection, StoreError> {
        let conn = self
            .inner
            .conn
            .get_or_try_init(|| open_connection(self.inner.path.clone(), self.inner.target_version))
            .await?;

        Ok(Arc::clone(conn))
    }

    pub async fn schema_version(&self) -> Result<u32, StoreError> {
        self.run_blocking(|conn| Ok(migrations::stored_version(conn)?))
            .await
    }

    async fn run_blocking<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<R, StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let conn = self.connect().await?;

        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&mut *guard)
        })
        .await?
    }

    pub async fn add_entry(&self, entry: NewEntry) -> Result<EntryId, StoreError> {
        if entry.description.trim().is_empty() {
            return Err(StoreError::Validation(
                "description must not be empty".to_string(),
            ));
        }

        let date = entry.date.clone();
        let id = self
            .run_blocking(move |conn| Ok(queries::insert_entry(conn, &entry)?))
            .await?;

        info!(id, date = %date, "entry added");
        Ok(id)
    }

    pub async fn entries_by_date(&self, date: &str) -> Result<Vec<ActivityEntry>, StoreError> {
        let date = date.to_string();
        self.run_blocking(move |conn| Ok(queries::entries_by_date(conn, &date)?))
            .await
    }

    /// Merges `patch` over the stored entry and writes it back. `check` sees the merged
    /// record before the write; a rejection becomes [`StoreError::Validation`].
    pub async fn update_entry<C>(
        &self,
        id: EntryId,
        patch: EntryPatch,
        check: C,
    ) -> Result<(), StoreError>
    where
        C: FnOnce(&ActivityEntry) -> Result<(), String> + Send,
    {
        let existing = self
            .run_blocking(move |conn| Ok(queries::find_entry(conn, id)?))
            .await?
            .ok_or(StoreError::NotFound(id))?;

        let merged = merge(existing, patch);
        check(&merged).map_err(StoreError::Validation)?;

        let updated = self
            .run_blocking(move |conn| Ok(queries::update_entry(conn, &merged)?))
            .await?;

        // The row can vanish between the read and the write.
        if updated == 0 {
            return Err(StoreError::NotFound(id));
        }

        info!(id, "entry updated");
        Ok(())
    }

    pub async fn delete_entry(&self, id: EntryId) -> Result<(), StoreError> {
        let deleted = self
            .run_blocking(move |conn| Ok(queries::delete_entry(conn, id)?))
            .await?;

        if deleted == 0 {
            debug!(id, "delete requested for missing entry");
        } else {
            info!(id, "entry deleted");
        }

        Ok(())
    }

    pub async fn set_daily_goal(&self, goal: DailyGoal) -> Result<(), StoreError> {
        let date = goal.date.clone();
        self.run_blocking(move |conn| Ok(queries::upsert_daily_goal(conn, &goal)?))
            .await?;

        info!(date = %date, "daily goal saved");
        Ok(())
    }

    pub async fn daily_goal(&self, date: &str) -> Result<Option<DailyGoal>, StoreError> {
        let date = date.to_string();
        self.run_blocking(move |conn| Ok(queries::daily_goal(conn, &date)?))
            .await
    }

    pub async fn set_weekly_goal(&self, goal: WeeklyGoal) -> Result<(), StoreError> {
        let week_start = goal.week_start.clone();
        self.run_blocking(move |conn| Ok(queries::upsert_weekly_goal(conn, &goal)?))
            .await?;

        info!(week_start = %week_start, "weekly goal saved");
        Ok(())
    }

    pub async fn weekly_goal(&self, week_start: &str) -> Result<Option<WeeklyGoal>, StoreError> {
        let week_start = week_start.to_string();
        self.run_blocking(move |conn| Ok(queries::weekly_goal(conn, &week_start)?))
            .await
    }
}

async fn open_connection(path: PathBuf, target_version: u32) -> Result<SharedConnection, StoreError> {
    let display_path = path.display().to_string();

    let (conn, version) = tokio::task::spawn_blocking(move || {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut conn = Connection::open(&path)?;
        let version = migrations::migrate(&mut conn, target_version)?;
        Ok::<_, StoreError>((conn, version))
    })
    .await??;

    info!(path = %display_path, version, "journal database opened");
    Ok(Arc::new(Mutex::new(conn)))
}
