//! Display formatting for durations and earnings.

/// Format whole seconds as `"{h}h {m}m {s}s"`, dropping leading zero
/// units. Negative input is clamped to zero.
pub fn format_duration(seconds: i64) -> String {
    let total = seconds.max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Earnings for a span of work. Pure real arithmetic; rounding is a
/// display concern.
pub fn calculate_earnings(duration_seconds: i64, hourly_rate: f64) -> f64 {
    duration_seconds as f64 / 3600.0 * hourly_rate
}

/// Two-decimal dollar string with thousands grouping, display only.
pub fn format_currency(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let frac = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_drops_leading_zero_units() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(3600), "1h 0m 0s");
        assert_eq!(format_duration(3661), "1h 1m 1s");
        assert_eq!(format_duration(9000), "2h 30m 0s");
    }

    #[test]
    fn duration_clamps_negative_input() {
        assert_eq!(format_duration(-5), "0s");
    }

    #[test]
    fn earnings_are_exact_hour_fractions() {
        assert_eq!(calculate_earnings(3600, 50.0), 50.0);
        assert_eq!(calculate_earnings(1800, 50.0), 25.0);
        assert_eq!(calculate_earnings(0, 50.0), 0.0);
    }

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(1234.5), "$1,234.50");
        assert_eq!(format_currency(1_000_000.0), "$1,000,000.00");
        assert_eq!(format_currency(-12.345), "-$12.35");
    }
}
