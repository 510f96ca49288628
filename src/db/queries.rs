use crate::db::{ActivityEntry, DailyGoal, EntryId, NewEntry, WeeklyGoal};
use rusqlite::{Connection, OptionalExtension, Row, params};

pub const CREATE_ENTRIES: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
  id          INTEGER PRIMARY KEY AUTOINCREMENT,
  date        TEXT NOT NULL,
  start_time  TEXT NOT NULL,
  end_time    TEXT NOT NULL,
  description TEXT NOT NULL,
  category    TEXT NOT NULL DEFAULT 'General',
  timestamp   INTEGER NOT NULL
);
"#;

pub const INDEX_ENTRIES_DATE: &str =
    "CREATE INDEX IF NOT EXISTS idx_entries_date ON entries(date);";

pub const CREATE_DAILY_GOALS: &str = r#"
CREATE TABLE IF NOT EXISTS daily_goals (
  date      TEXT PRIMARY KEY NOT NULL,
  goal      TEXT NOT NULL,
  timestamp INTEGER NOT NULL
);
"#;

pub const CREATE_WEEKLY_GOALS: &str = r#"
CREATE TABLE IF NOT EXISTS weekly_goals (
  week_start TEXT PRIMARY KEY NOT NULL,
  goal       TEXT NOT NULL,
  timestamp  INTEGER NOT NULL
);
"#;

const ENTRY_COLUMNS: &str = "id, date, start_time, end_time, description, category, timestamp";

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<ActivityEntry> {
    Ok(ActivityEntry {
        id: row.get(0)?,
        date: row.get(1)?,
        start_time: row.get(2)?,
        end_time: row.get(3)?,
        description: row.get(4)?,
        category: row.get(5)?,
        timestamp: row.get(6)?,
    })
}

pub fn insert_entry(conn: &Connection, entry: &NewEntry) -> rusqlite::Result<EntryId> {
    conn.execute(
        "INSERT INTO entries (date, start_time, end_time, description, category, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.date,
            entry.start_time,
            entry.end_time,
            entry.description,
            entry.category,
            entry.timestamp,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Entries for one date, ordered by `start_time` (binary collation) with ties in insertion order.
pub fn entries_by_date(conn: &Connection, date: &str) -> rusqlite::Result<Vec<ActivityEntry>> {
    let mut statement = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS}
         FROM entries
         WHERE date = ?1
         ORDER BY start_time ASC, id ASC"
    ))?;

    let rows = statement.query_map(params![date], entry_from_row)?;
    rows.collect()
}

pub fn find_entry(conn: &Connection, id: EntryId) -> rusqlite::Result<Option<ActivityEntry>> {
    conn.query_row(
        &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1"),
        params![id],
        entry_from_row,
    )
    .optional()
}

pub fn update_entry(conn: &Connection, entry: &ActivityEntry) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE entries
         SET date = ?1, start_time = ?2, end_time = ?3, description = ?4, category = ?5, timestamp = ?6
         WHERE id = ?7",
        params![
            entry.date,
            entry.start_time,
            entry.end_time,
            entry.description,
            entry.category,
            entry.timestamp,
            entry.id,
        ],
    )
}

pub fn delete_entry(conn: &Connection, id: EntryId) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM entries WHERE id = ?1", params![id])
}

pub fn upsert_daily_goal(conn: &Connection, goal: &DailyGoal) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO daily_goals (date, goal, timestamp)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(date)
         DO UPDATE SET goal=excluded.goal, timestamp=excluded.timestamp",
        params![goal.date, goal.goal, goal.timestamp],
    )?;
    Ok(())
}

pub fn daily_goal(conn: &Connection, date: &str) -> rusqlite::Result<Option<DailyGoal>> {
    conn.query_row(
        "SELECT date, goal, timestamp FROM daily_goals WHERE date = ?1",
        params![date],
        |row| {
            Ok(DailyGoal {
                date: row.get(0)?,
                goal: row.get(1)?,
                timestamp: row.get(2)?,
            })
        },
    )
    .optional()
}

pub fn upsert_weekly_goal(conn: &Connection, goal: &WeeklyGoal) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO weekly_goals (week_start, goal, timestamp)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(week_start)
         DO UPDATE SET goal=excluded.goal, timestamp=excluded.timestamp",
        params![goal.week_start, goal.goal, goal.timestamp],
    )?;
    Ok(())
}

pub fn weekly_goal(conn: &Connection, week_start: &str) -> rusqlite::Result<Option<WeeklyGoal>> {
    conn.query_row(
        "SELECT week_start, goal, timestamp FROM weekly_goals WHERE week_start = ?1",
        params![week_start],
        |row| {
            Ok(WeeklyGoal {
                week_start: row.get(0)?,
                goal: row.get(1)?,
                timestamp: row.get(2)?,
            })
        },
    )
    .optional()
}
