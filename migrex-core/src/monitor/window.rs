//! Five-minute aggregation windows over monitoring samples.

use chrono::{DateTime, Duration, DurationRound, NaiveDateTime, Timelike, Utc};

/// Width of an aggregation window in minutes.
pub const WINDOW_MINUTES: i64 = 5;

/// Timestamp layout of the date column in agent feeds.
pub(crate) const LINE_DATE_FORMAT: &str = "%Y%m%d%H%M%S";

/// Stamps a sample with the window it belongs to.
///
/// The stamp is the last minute of the sample's five-minute bucket: advance
/// by `5 - minute % 5 - 1` minutes, then round any sub-minute remainder up
/// to the next whole minute. A sample sitting exactly on a minute keeps its
/// stamp, so `10:05:00` lands on `10:09:00` while `10:05:01` lands on
/// `10:10:00`.
pub fn window_time(sampled_at: DateTime<Utc>) -> DateTime<Utc> {
    let minute = i64::from(sampled_at.minute());
    let advanced =
        sampled_at + Duration::minutes(WINDOW_MINUTES - minute % WINDOW_MINUTES - 1);
    ceil_to_minute(advanced)
}

fn ceil_to_minute(at: DateTime<Utc>) -> DateTime<Utc> {
    // duration_trunc only fails on zero or out-of-range durations.
    match at.duration_trunc(Duration::minutes(1)) {
        Ok(floored) if floored == at => at,
        Ok(floored) => floored + Duration::minutes(1),
        Err(_) => at,
    }
}

/// Parses the `yyyymmddhhmmss` date cell agents stamp on every line.
pub(crate) fn parse_line_date(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), LINE_DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap()
    }

    #[test]
    fn mid_window_samples_round_up_to_the_next_minute() {
        assert_eq!(window_time(at(10, 7, 30)), at(10, 10, 0));
        assert_eq!(window_time(at(10, 9, 59)), at(10, 10, 0));
    }

    #[test]
    fn exact_minute_samples_keep_their_stamp() {
        assert_eq!(window_time(at(10, 0, 0)), at(10, 4, 0));
        assert_eq!(window_time(at(10, 5, 0)), at(10, 9, 0));
    }

    #[test]
    fn one_second_past_the_minute_moves_a_whole_window() {
        assert_eq!(window_time(at(10, 5, 1)), at(10, 10, 0));
    }

    #[test]
    fn line_dates_parse_in_feed_layout() {
        assert_eq!(parse_line_date("20240301100730"), Some(at(10, 7, 30)));
        assert_eq!(parse_line_date(" 20240301100730 "), Some(at(10, 7, 30)));
        assert_eq!(parse_line_date("2024-03-01"), None);
    }
}
