//! Display formatting for timestamps shown in the list and the heatmap.

use time::macros::format_description;
use time::OffsetDateTime;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

fn to_datetime(ts_ms: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ts_ms) * 1_000_000).ok()
}

/// `2024-03-01 08:05:09 UTC`, or `-` for timestamps out of range.
pub fn format_datetime(ts_ms: i64) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second] UTC");
    to_datetime(ts_ms)
        .and_then(|dt| dt.format(format).ok())
        .unwrap_or_else(|| "-".to_string())
}

pub fn format_optional_datetime(ts_ms: Option<i64>) -> String {
    ts_ms.map(format_datetime).unwrap_or_else(|| "-".to_string())
}

/// X-axis label for a heatmap column. Day-wide buckets drop the time of day.
pub fn format_bucket_label(start_ms: i64, interval_ms: i64) -> String {
    let rendered = to_datetime(start_ms).and_then(|dt| {
        if interval_ms >= DAY_MS {
            dt.format(format_description!("[month]/[day]")).ok()
        } else {
            dt.format(format_description!("[month]/[day] [hour]:[minute]")).ok()
        }
    });
    rendered.unwrap_or_else(|| "-".to_string())
}

/// `"2h 30m"` style duration for bucket widths and detector intervals.
pub fn format_duration_ms(duration_ms: i64) -> String {
    let minutes = duration_ms.max(0) / 60_000;
    let (days, hours, mins) = (minutes / 1440, (minutes % 1440) / 60, minutes % 60);
    let parts: Vec<String> = [(days, "d"), (hours, "h"), (mins, "m")]
        .into_iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{value}{unit}"))
        .collect();
    if parts.is_empty() {
        format!("{}s", duration_ms.max(0) / 1000)
    } else {
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_utc_datetimes() {
        assert_eq!(format_datetime(0), "1970-01-01 00:00:00 UTC");
        assert_eq!(format_datetime(1_709_280_309_000), "2024-03-01 08:05:09 UTC");
        assert_eq!(format_datetime(i64::MAX), "-");
        assert_eq!(format_optional_datetime(None), "-");
    }

    #[test]
    fn bucket_labels_depend_on_width() {
        let start = 1_709_280_309_000;
        assert_eq!(format_bucket_label(start, 60_000), "03/01 08:05");
        assert_eq!(format_bucket_label(start, DAY_MS), "03/01");
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration_ms(90 * 60_000), "1h 30m");
        assert_eq!(format_duration_ms(DAY_MS + 60_000), "1d 1m");
        assert_eq!(format_duration_ms(1500), "1s");
        assert_eq!(format_duration_ms(-5), "0s");
    }
}
