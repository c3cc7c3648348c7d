//! Duration string parsing for CSV imports.
//!
//! Recognized formats, attempted in order, first match wins:
//! `"2h 30m"` / `"2:30"`, `"2.5h"`, `"150m"`, bare numbers (minutes).
//! Unrecognized text resolves to zero rather than failing the row.

/// Parse a human duration string into whole seconds.
pub fn parse_duration(raw: &str) -> i64 {
    let text = raw.trim().to_lowercase();

    hours_and_minutes(&text)
        .or_else(|| decimal_hours(&text))
        .or_else(|| minutes_suffix(&text))
        .or_else(|| bare_number(&text))
        .unwrap_or(0)
}

/// `"<h>:<m>"` or `"<h>h <m>[m]"`. The separator must directly follow
/// the hour digits; minutes may be separated by spaces.
fn hours_and_minutes(s: &str) -> Option<i64> {
    let bytes = s.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b':' && b != b'h' {
            continue;
        }

        let h_start = digit_run_start(bytes, i);
        if h_start == i {
            continue;
        }
        // A '.' before the hour digits means decimal hours, not h:m.
        if h_start > 0 && bytes[h_start - 1] == b'.' {
            continue;
        }

        let mut j = i + 1;
        while j < bytes.len() && bytes[j] == b' ' {
            j += 1;
        }
        let m_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j == m_start {
            continue;
        }

        let hours: i64 = s[h_start..i].parse().ok()?;
        let minutes: i64 = s[m_start..j].parse().ok()?;
        return Some(hours * 3600 + minutes * 60);
    }
    None
}

/// `"2.5h"` — decimal hours, floored to whole seconds.
fn decimal_hours(s: &str) -> Option<i64> {
    let i = s.find('h')?;
    let bytes = s.as_bytes();
    let start = bytes[..i]
        .iter()
        .rposition(|&c| !c.is_ascii_digit() && c != b'.')
        .map(|p| p + 1)
        .unwrap_or(0);
    let run = &s[start..i];
    if !run.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: f64 = run.parse().ok()?;
    Some((hours * 3600.0).floor() as i64)
}

/// `"150m"` — the 'm' must directly follow the digits.
fn minutes_suffix(s: &str) -> Option<i64> {
    let i = s.find('m')?;
    let start = digit_run_start(s.as_bytes(), i);
    if start == i {
        return None;
    }
    let minutes: i64 = s[start..i].parse().ok()?;
    Some(minutes * 60)
}

/// A bare leading number is taken as minutes, trailing text ignored.
fn bare_number(s: &str) -> Option<i64> {
    let bytes = s.as_bytes();
    let mut end = 0;
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => end += 1,
            b'.' if !seen_dot => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }
    let value: f64 = s[..end].parse().ok()?;
    Some((value * 60.0).floor() as i64)
}

/// Start index of the maximal digit run ending just before `end`.
fn digit_run_start(bytes: &[u8], end: usize) -> usize {
    let mut start = end;
    while start > 0 && bytes[start - 1].is_ascii_digit() {
        start -= 1;
    }
    start
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hours_and_minutes_formats() {
        assert_eq!(parse_duration("2h 30m"), 9000);
        assert_eq!(parse_duration("2h30m"), 9000);
        assert_eq!(parse_duration("2:30"), 9000);
        assert_eq!(parse_duration("0:45"), 2700);
        assert_eq!(parse_duration("1:05"), 3900);
    }

    #[test]
    fn decimal_hours_floor_to_seconds() {
        assert_eq!(parse_duration("2.5h"), 9000);
        assert_eq!(parse_duration("1h"), 3600);
        assert_eq!(parse_duration("0.1h"), 360);
    }

    #[test]
    fn minute_suffix() {
        assert_eq!(parse_duration("150m"), 9000);
        assert_eq!(parse_duration("45min"), 2700);
    }

    #[test]
    fn bare_numbers_are_minutes() {
        assert_eq!(parse_duration("150"), 9000);
        assert_eq!(parse_duration("1.5"), 90);
        assert_eq!(parse_duration(" 60 "), 3600);
        // A leading number wins even with trailing words.
        assert_eq!(parse_duration("90 minutes"), 5400);
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(parse_duration("2H 30M"), 9000);
    }

    #[test]
    fn unparsable_resolves_to_zero() {
        assert_eq!(parse_duration("soon"), 0);
        assert_eq!(parse_duration(""), 0);
        assert_eq!(parse_duration("h30"), 0);
    }
}
