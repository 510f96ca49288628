use crate::db::StoreError;
use crate::db::queries;
use rusqlite::Connection;
use tracing::info;

/// Schema version this build opens databases at.
pub const SCHEMA_VERSION: u32 = 2;

struct Migration {
    version: u32,
    description: &'static str,
    statements: &'static [&'static str],
}

// Steps only ever create containers that are missing. Existing tables are left untouched.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "entries table with date index",
        statements: &[queries::CREATE_ENTRIES, queries::INDEX_ENTRIES_DATE],
    },
    Migration {
        version: 2,
        description: "daily and weekly goal tables",
        statements: &[queries::CREATE_DAILY_GOALS, queries::CREATE_WEEKLY_GOALS],
    },
];

pub fn stored_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}

/// Brings the database from its stored version up to `target`, returning the resulting version.
pub fn migrate(conn: &mut Connection, target: u32) -> Result<u32, StoreError> {
    let current = stored_version(conn)?;

    if current > target {
        return Err(StoreError::UnsupportedVersion {
            found: current,
            supported: target,
        });
    }

    if current == target {
        return Ok(current);
    }

    let transaction = conn.transaction()?;

    MIGRATIONS
        .iter()
        .filter(|step| step.version > current && step.version <= target)
        .try_for_each(|step| {
            step.statements
                .iter()
                .try_for_each(|statement| transaction.execute_batch(statement))?;
            info!(
                version = step.version,
                step = step.description,
                "schema migration applied"
            );
            Ok::<_, rusqlite::Error>(())
        })?;

    transaction.pragma_update(None, "user_version", target)?;
    transaction.commit()?;

    Ok(target)
}
