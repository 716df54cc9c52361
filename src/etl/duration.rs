use chrono::Duration;

/// Parses a colon-delimited clock string ("HH:MM:SS", "MM:SS", or "SS") into
/// a duration. Missing higher-order components are treated as zero, so
/// "5:30" reads as five minutes thirty seconds. Hours are not bounded; dialer
/// gap totals regularly exceed 24h-looking values like "123:00:00". Totals
/// past the representable second range read as `None`, like any other
/// unparseable value.
pub(crate) fn parse_clock(value: &str) -> Option<Duration> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() > 3 {
        return None;
    }

    let mut units = [0i64; 3];
    let offset = 3 - parts.len();
    for (slot, part) in units[offset..].iter_mut().zip(parts) {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *slot = part.parse().ok()?;
    }

    let total = units[0]
        .checked_mul(3600)?
        .checked_add(units[1].checked_mul(60)?)?
        .checked_add(units[2])?;
    Duration::try_seconds(total)
}

/// Renders non-negative seconds as "HH:MM:SS". Hours widen past two digits
/// instead of wrapping at 24.
pub(crate) fn format_hhmmss(total_seconds: i64) -> String {
    let clamped = total_seconds.max(0);
    let hours = clamped / 3600;
    let minutes = (clamped % 3600) / 60;
    let seconds = clamped % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Tolerant seconds reader used when flattening duration columns: clock
/// strings convert via [`parse_clock`], plain digit strings are raw seconds,
/// and empty values count as zero. Anything else is unreadable and yields
/// `None` so the caller can record it as a data-quality finding.
pub(crate) fn tolerant_seconds(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some(0);
    }

    if trimmed.contains(':') {
        return parse_clock(trimmed).map(|duration| duration.num_seconds());
    }

    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return trimmed.parse().ok();
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_clock_reads_full_and_partial_clock_strings() {
        assert_eq!(parse_clock("01:02:03"), Some(Duration::seconds(3723)));
        assert_eq!(parse_clock("5:30"), Some(Duration::seconds(330)));
        assert_eq!(parse_clock("45"), Some(Duration::seconds(45)));
        assert_eq!(parse_clock("123:00:00"), Some(Duration::seconds(442_800)));
    }

    #[test]
    fn parse_clock_rejects_malformed_values() {
        assert_eq!(parse_clock(""), None);
        assert_eq!(parse_clock("ab:cd:ef"), None);
        assert_eq!(parse_clock("1:2:3:4"), None);
        assert_eq!(parse_clock("1::3"), None);
        assert_eq!(parse_clock("-5:00"), None);
    }

    #[test]
    fn parse_clock_rejects_hour_counts_past_the_representable_range() {
        // The component itself fits in i64; the total does not.
        assert_eq!(parse_clock("99999999999999999:00:00"), None);
        // The component alone already exceeds i64.
        assert_eq!(parse_clock("99999999999999999999:00:00"), None);
        assert_eq!(tolerant_seconds("99999999999999999:00:00"), None);
    }

    #[test]
    fn seconds_round_trip_through_clock_strings() {
        for seconds in [0i64, 1, 59, 60, 3599, 3600, 5025, 86_399, 86_400, 442_811] {
            let rendered = format_hhmmss(seconds);
            assert_eq!(
                tolerant_seconds(&rendered),
                Some(seconds),
                "round trip failed for {rendered}"
            );
        }
    }

    #[test]
    fn tolerant_seconds_accepts_digits_and_empty() {
        assert_eq!(tolerant_seconds("90"), Some(90));
        assert_eq!(tolerant_seconds(""), Some(0));
        assert_eq!(tolerant_seconds("  "), Some(0));
        assert_eq!(tolerant_seconds("00:01:30"), Some(90));
    }

    #[test]
    fn tolerant_seconds_flags_unreadable_values() {
        assert_eq!(tolerant_seconds("n/a"), None);
        assert_eq!(tolerant_seconds("1.5"), None);
        assert_eq!(tolerant_seconds("one minute"), None);
    }
}
