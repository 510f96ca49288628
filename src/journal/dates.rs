use anyhow::{Context, Result, bail};
use chrono::{Datelike, Days, Local, NaiveDate, NaiveTime, TimeDelta};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";
pub const MIDNIGHT: &str = "00:00";

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
        .with_context(|| format!("Invalid date format: {input}. Example: 2024-01-10"))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Resolves an optional `YYYY-MM-DD` argument, falling back to today.
pub fn parse_optional_date(input: Option<&str>) -> Result<NaiveDate> {
    input.map(parse_date).transpose().map(|date| date.unwrap_or_else(today))
}

pub fn shift_days(date: NaiveDate, days: i64) -> Result<NaiveDate> {
    TimeDelta::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .with_context(|| format!("Date offset out of range: {days} days from {date}"))
}

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date.checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
        .unwrap_or(NaiveDate::MIN)
}

pub fn display_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Today".to_string()
    } else if Some(date) == today.pred_opt() {
        "Yesterday".to_string()
    } else {
        date.format("%a %-d %B").to_string().to_uppercase()
    }
}

/// Parses `H:MM` or `HH:MM` and returns the zero-padded form, which sorts lexicographically.
pub fn normalize_time(input: &str) -> Result<String> {
    let time = NaiveTime::parse_from_str(input.trim(), TIME_FORMAT)
        .with_context(|| format!("Invalid time format: {input}. Example: 09:30 (24-hour format)"))?;
    Ok(time.format(TIME_FORMAT).to_string())
}

/// The end must fall after the start, except an end of `00:00` which closes the day.
pub fn validate_time_range(start: &str, end: &str) -> Result<()> {
    if end <= start && end != MIDNIGHT {
        bail!("End time must be after start time ({start} - {end})");
    }

    Ok(())
}

/// Previous full hour to current full hour, e.g. 15:20 gives 14:00 - 15:00.
pub fn default_time_range(current_hour: u32) -> (String, String) {
    let (start, end) = match current_hour {
        0 => (23, 0),
        hour => (hour - 1, hour),
    };

    (format!("{start:02}:00"), format!("{end:02}:00"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(raw: &str) -> NaiveDate {
        parse_date(raw).unwrap()
    }

    #[test]
    fn test_week_start_is_monday() {
        assert_eq!(week_start(date("2024-01-10")), date("2024-01-08"));
        assert_eq!(week_start(date("2024-01-08")), date("2024-01-08"));
        assert_eq!(week_start(date("2024-01-14")), date("2024-01-08"));
        assert_eq!(week_start(date("2024-01-01")), date("2024-01-01"));
        assert_eq!(week_start(date("2023-12-31")), date("2023-12-25"));
    }

    #[test]
    fn test_display_label() {
        let today = date("2024-01-12");

        assert_eq!(display_label(today, today), "Today");
        assert_eq!(display_label(date("2024-01-11"), today), "Yesterday");
        assert_eq!(display_label(date("2024-01-10"), today), "WED 10 JANUARY");
        assert_eq!(display_label(date("2024-01-13"), today), "SAT 13 JANUARY");
    }

    #[test]
    fn test_shift_days_crosses_month() {
        assert_eq!(shift_days(date("2024-01-31"), 1).unwrap(), date("2024-02-01"));
        assert_eq!(shift_days(date("2024-03-01"), -1).unwrap(), date("2024-02-29"));
    }

    #[test]
    fn test_shift_days_rejects_huge_offsets() {
        assert!(shift_days(date("2024-01-10"), 100_000_000).is_err());
        assert!(shift_days(date("2024-01-10"), -100_000_000).is_err());
        assert!(shift_days(date("2024-01-10"), i64::MAX).is_err());
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("2024/01/10").is_err());
        assert!(parse_date("2024-02-30").is_err());
        assert_eq!(format_date(date(" 2024-01-10 ")), "2024-01-10");
    }

    #[test]
    fn test_parse_optional_date() {
        assert_eq!(
            parse_optional_date(Some("2024-01-10")).unwrap(),
            date("2024-01-10")
        );
        assert!(parse_optional_date(Some("yesterday")).is_err());
        assert!(parse_optional_date(None).is_ok());
    }

    #[test]
    fn test_normalize_time_pads_hours() {
        assert_eq!(normalize_time("9:05").unwrap(), "09:05");
        assert_eq!(normalize_time("23:59").unwrap(), "23:59");
        assert!(normalize_time("24:00").is_err());
        assert!(normalize_time("noon").is_err());
    }

    #[test]
    fn test_validate_time_range() {
        assert!(validate_time_range("09:00", "10:00").is_ok());
        assert!(validate_time_range("23:00", "00:00").is_ok());
        assert!(validate_time_range("10:00", "10:00").is_err());
        assert!(validate_time_range("10:00", "09:00").is_err());
    }

    #[test]
    fn test_default_time_range() {
        assert_eq!(
            default_time_range(15),
            ("14:00".to_string(), "15:00".to_string())
        );
        assert_eq!(
            default_time_range(0),
            ("23:00".to_string(), "00:00".to_string())
        );
        assert_eq!(
            default_time_range(1),
            ("00:00".to_string(), "01:00".to_string())
        );
    }
}
