//! RFC 5322 date handling.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};

/// Parses a `Date` header value.
///
/// Accepts strict RFC 2822 as well as common deviations: trailing comments
/// such as `(UTC)`, missing day names, obsolete zone names and doubled
/// whitespace. Returns `None` when nothing sensible can be extracted.
#[must_use]
pub fn parse_date(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date);
    }

    let without_comment = value
        .find('(')
        .map_or(value, |i| &value[..i])
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if let Ok(date) = DateTime::parse_from_rfc2822(&without_comment) {
        return Some(date);
    }

    // Drop the day name and retry with a few explicit formats.
    let body = without_comment
        .split_once(',')
        .map_or(without_comment.as_str(), |(_, rest)| rest.trim());

    for format in ["%d %b %Y %H:%M:%S %z", "%d %b %Y %H:%M %z", "%d %b %y %H:%M:%S %z"] {
        if let Ok(date) = DateTime::parse_from_str(body, format) {
            return Some(date);
        }
    }

    // Zone given as a name chrono does not know, or missing entirely.
    let (stamp, zone) = body.rsplit_once(' ').unwrap_or((body, ""));
    let offset_seconds = zone_offset(zone);
    let stamp = if offset_seconds.is_some() { stamp } else { body };
    for format in ["%d %b %Y %H:%M:%S", "%d %b %Y %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(stamp, format) {
            let offset = FixedOffset::east_opt(offset_seconds.unwrap_or(0))?;
            return offset.from_local_datetime(&naive).single();
        }
    }

    None
}

fn zone_offset(zone: &str) -> Option<i32> {
    let hours = match zone.to_ascii_uppercase().as_str() {
        "UT" | "UTC" | "GMT" | "Z" => 0,
        "EST" => -5,
        "EDT" => -4,
        "CST" => -6,
        "CDT" => -5,
        "MST" => -7,
        "MDT" => -6,
        "PST" => -8,
        "PDT" => -7,
        "CET" => 1,
        "CEST" => 2,
        "MSK" => 3,
        _ => return None,
    };
    Some(hours * 3600)
}

/// Formats a date for a `Date` header.
#[must_use]
pub fn format_date(date: &DateTime<FixedOffset>) -> String {
    date.to_rfc2822()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_strict() {
        let date = parse_date("Tue, 1 Jul 2003 10:52:37 +0200").unwrap();
        assert_eq!(date.year(), 2003);
        assert_eq!(date.hour(), 10);
        assert_eq!(date.offset().local_minus_utc(), 7200);
    }

    #[test]
    fn test_parse_trailing_comment() {
        let date = parse_date("Mon, 14 Oct 2024 08:00:00 +0000 (UTC)").unwrap();
        assert_eq!(date.day(), 14);
    }

    #[test]
    fn test_parse_without_day_name() {
        let date = parse_date("14 Oct 2024 08:00:00 -0700").unwrap();
        assert_eq!(date.offset().local_minus_utc(), -7 * 3600);
    }

    #[test]
    fn test_parse_named_zone() {
        let date = parse_date("Mon, 14 Oct 2024 08:00:00 EDT").unwrap();
        assert_eq!(date.offset().local_minus_utc(), -4 * 3600);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_date("yesterday-ish").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn test_format_parses_back() {
        let date = parse_date("Tue, 1 Jul 2003 10:52:37 +0200").unwrap();
        assert_eq!(parse_date(&format_date(&date)), Some(date));
    }
}
