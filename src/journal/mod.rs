pub mod dates;
pub mod patch;

use crate::db::{
    ActivityEntry, DEFAULT_CATEGORY, DailyGoal, EntryId, NewEntry, Store, StoreError, WeeklyGoal,
};
use anyhow::{Result, bail};
use chrono::{NaiveDate, Utc};
use serde::Serialize;

pub const SUGGESTED_CATEGORIES: [&str; 6] =
    ["Work", "Meeting", "Break", "Study", "Exercise", "Personal"];

/// Everything the timeline shows for one date.
#[derive(Debug, Clone, Serialize)]
pub struct DayView {
    pub date: String,
    pub label: String,
    pub week_start: String,
    pub entries: Vec<ActivityEntry>,
    pub daily_goal: Option<DailyGoal>,
    pub weekly_goal: Option<WeeklyGoal>,
}

pub async fn load_day(store: &Store, date: NaiveDate) -> Result<DayView, StoreError> {
    let date_str = dates::format_date(date);
    let week_start = dates::format_date(dates::week_start(date));

    let entries = store.entries_by_date(&date_str).await?;
    let daily_goal = store.daily_goal(&date_str).await?;
    let weekly_goal = store.weekly_goal(&week_start).await?;

    Ok(DayView {
        label: dates::display_label(date, dates::today()),
        date: date_str,
        week_start,
        entries,
        daily_goal,
        weekly_goal,
    })
}

/// Builds a validated entry from user input. Times are normalized to `HH:MM`.
pub fn prepare_entry(
    date: NaiveDate,
    start_time: &str,
    end_time: &str,
    description: &str,
    category: Option<&str>,
) -> Result<NewEntry> {
    let start_time = dates::normalize_time(start_time)?;
    let end_time = dates::normalize_time(end_time)?;
    dates::validate_time_range(&start_time, &end_time)?;

    let description = description.trim();
    if description.is_empty() {
        bail!("Description is required");
    }

    let category = category
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_CATEGORY);

    Ok(NewEntry {
        date: dates::format_date(date),
        start_time,
        end_time,
        description: description.to_string(),
        category: category.to_string(),
        timestamp: now_millis(),
    })
}

/// Validates and normalizes the user-supplied fields of a patch.
///
/// An entry's date and creation timestamp are fixed; moving an entry means deleting it and
/// adding a new one.
pub fn prepare_patch(mut patch: patch::EntryPatch) -> Result<patch::EntryPatch> {
    if patch.date.is_some() {
        bail!("The date of an entry cannot be changed. Delete it and add a new entry instead");
    }
    if patch.timestamp.is_some() {
        bail!("The creation timestamp of an entry cannot be changed");
    }
    if let Some(start) = patch.start_time.as_deref() {
        patch.start_time = Some(dates::normalize_time(start)?);
    }
    if let Some(end) = patch.end_time.as_deref() {
        patch.end_time = Some(dates::normalize_time(end)?);
    }
    if patch
        .description
        .as_deref()
        .is_some_and(|value| value.trim().is_empty())
    {
        bail!("Description must not be empty");
    }

    Ok(patch)
}

/// Time-range rule for a stored entry, applied after a patch is merged.
pub fn check_time_range(entry: &ActivityEntry) -> Result<(), String> {
    dates::validate_time_range(&entry.start_time, &entry.end_time).map_err(|error| error.to_string())
}

/// Applies a prepared patch, rejecting it when the merged entry would end before it starts.
pub async fn apply_patch(
    store: &Store,
    id: EntryId,
    patch: patch::EntryPatch,
) -> Result<(), StoreError> {
    store.update_entry(id, patch, check_time_range).await
}

pub fn daily_goal(date: NaiveDate, goal: &str) -> DailyGoal {
    DailyGoal {
        date: dates::format_date(date),
        goal: goal.trim().to_string(),
        timestamp: now_millis(),
    }
}

/// Weekly goals are always keyed by the Monday of the week containing `date`.
pub fn weekly_goal(date: NaiveDate, goal: &str) -> WeeklyGoal {
    WeeklyGoal {
        week_start: dates::format_date(dates::week_start(date)),
        goal: goal.trim().to_string(),
        timestamp: now_millis(),
    }
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
