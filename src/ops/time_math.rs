use std::sync::LazyLock;

use regex::Regex;

/// 24h, zero-padded `HH:MM`
static HHMM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)$").expect("HH:MM pattern compiles"));

/// Check that a string is a zero-padded 24h `HH:MM` time.
pub fn is_valid_hhmm(s: &str) -> bool {
    HHMM.is_match(s)
}

/// Minutes since midnight, or `None` for anything that isn't `HH:MM`.
pub fn minutes_of_day(s: &str) -> Option<u32> {
    let caps = HHMM.captures(s)?;
    let hours: u32 = caps[1].parse().ok()?;
    let minutes: u32 = caps[2].parse().ok()?;
    Some(hours * 60 + minutes)
}

/// Format the span between two `HH:MM` times: `1h 30m`, `2h`, `45m`.
///
/// Returns an empty string when either side is missing or malformed, or when
/// the span is not positive.
pub fn duration(start: &str, end: &str) -> String {
    let (Some(start), Some(end)) = (minutes_of_day(start), minutes_of_day(end)) else {
        return String::new();
    };
    if end <= start {
        return String::new();
    }
    let total = end - start;
    let (h, m) = (total / 60, total % 60);
    match (h, m) {
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

/// `duration` over optional times, with "nothing to show" as `None`.
pub fn duration_opt(start: Option<&str>, end: Option<&str>) -> Option<String> {
    let d = duration(start?, end?);
    if d.is_empty() { None } else { Some(d) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hours_and_minutes() {
        assert_eq!(duration("09:00", "10:30"), "1h 30m");
        assert_eq!(duration("08:15", "08:20"), "5m");
        assert_eq!(duration("08:00", "10:00"), "2h");
        assert_eq!(duration("00:00", "23:59"), "23h 59m");
    }

    #[test]
    fn zero_or_negative_is_empty() {
        assert_eq!(duration("09:00", "09:00"), "");
        assert_eq!(duration("10:00", "09:00"), "");
    }

    #[test]
    fn missing_or_malformed_is_empty() {
        assert_eq!(duration("", "10:00"), "");
        assert_eq!(duration("09:00", ""), "");
        assert_eq!(duration("9:00", "10:00"), "");
        assert_eq!(duration("24:00", "25:00"), "");
    }

    #[test]
    fn validation() {
        assert!(is_valid_hhmm("00:00"));
        assert!(is_valid_hhmm("23:59"));
        assert!(!is_valid_hhmm("24:00"));
        assert!(!is_valid_hhmm("12:60"));
        assert!(!is_valid_hhmm("7:30"));
        assert!(!is_valid_hhmm(" 07:30"));
        assert_eq!(minutes_of_day("01:30"), Some(90));
    }

    #[test]
    fn optional_wrapper() {
        assert_eq!(duration_opt(Some("08:00"), Some("09:00")).as_deref(), Some("1h"));
        assert_eq!(duration_opt(Some("08:00"), None), None);
        assert_eq!(duration_opt(Some("09:00"), Some("09:00")), None);
    }
}
