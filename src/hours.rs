// ⏰ Open-hours support - day names and clock strings from museum_hours
//
// The upstream hours table is the dirtiest of the eight: day names carry
// stray whitespace and at least one known misspelling, and clock values
// are strings like "10:30:AM". Everything here returns Option; callers
// decide whether a None is a skip (reports) or a finding (quality).

use chrono::{NaiveTime, Timelike};

/// Canonical day names, Sunday first (the upstream schedule convention).
pub const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Normalize a raw day string to its canonical name.
///
/// Trims, case-folds, and repairs the one misspelling the upstream data
/// is known to contain ("Thusday"). Anything else unrecognized is None.
pub fn normalize_day(raw: &str) -> Option<&'static str> {
    let folded = raw.trim().to_lowercase();

    let folded = match folded.as_str() {
        "thusday" => "thursday".to_string(),
        _ => folded,
    };

    DAY_NAMES
        .iter()
        .find(|name| name.to_lowercase() == folded)
        .copied()
}

/// Parse an upstream clock string to a NaiveTime.
///
/// The dominant shape is "10:30:AM" (meridiem behind a second colon);
/// embedded spaces and "10:30 AM" / bare "22:30" variants also occur.
pub fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let compact: String = raw.trim().chars().filter(|c| !c.is_whitespace()).collect();

    // "10:30:AM" → "10:30AM" so one %I:%M%p format covers both colon styles
    let normalized = match compact.rfind(':') {
        Some(idx) if compact[idx + 1..].eq_ignore_ascii_case("am")
            || compact[idx + 1..].eq_ignore_ascii_case("pm") =>
        {
            format!("{}{}", &compact[..idx], &compact[idx + 1..])
        }
        _ => compact,
    };

    if let Ok(time) = NaiveTime::parse_from_str(&normalized, "%I:%M%p") {
        return Some(time);
    }

    if let Ok(time) = NaiveTime::parse_from_str(&normalized, "%H:%M") {
        return Some(time);
    }

    None
}

/// Whether a raw clock string carries an explicit AM/PM marker.
fn has_meridiem(raw: &str) -> bool {
    let upper = raw.to_uppercase();
    upper.contains("AM") || upper.contains("PM")
}

/// Minutes a museum is open given its raw open/close strings.
///
/// A close at or before the open is taken as past-noon shorthand when the
/// close string has no meridiem ("8:00" closing after a 10:00:AM open
/// means 8 PM); with an explicit meridiem it is contradictory data and
/// yields None.
pub fn open_minutes(open_raw: &str, close_raw: &str) -> Option<i64> {
    let open = parse_clock(open_raw)?;
    let mut close = parse_clock(close_raw)?;

    if close <= open {
        if has_meridiem(close_raw) || close.hour() >= 12 {
            return None;
        }
        close = close.with_hour(close.hour() + 12)?;
        if close <= open {
            return None;
        }
    }

    Some((close - open).num_minutes())
}
