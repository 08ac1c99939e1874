pub mod time;

// Re-export time utilities
pub use time::{current_time, format_duration};

use crate::ledger::Amount;
use crate::pool::math::ONE;

/// Format a base-unit amount as a decimal token string, trimming
/// trailing fractional zeros.
pub fn format_amount(amount: Amount) -> String {
    let whole = amount / ONE;
    let frac = amount % ONE;
    if frac == 0 {
        format!("{}", whole)
    } else {
        let digits = format!("{:018}", frac);
        format!("{}.{}", whole, digits.trim_end_matches('0'))
    }
}

/// Parse a decimal token string into base units. Accepts up to 18
/// fractional digits.
pub fn parse_amount(raw: &str) -> Option<Amount> {
    let mut parts = raw.splitn(2, '.');
    let whole: Amount = parts.next()?.parse().ok()?;
    let frac_digits = parts.next().unwrap_or("");
    if frac_digits.len() > 18 || !frac_digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let mut frac: Amount = 0;
    if !frac_digits.is_empty() {
        frac = frac_digits.parse().ok()?;
        for _ in 0..(18 - frac_digits.len()) {
            frac *= 10;
        }
    }
    whole.checked_mul(ONE)?.checked_add(frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_round_trips_through_display() {
        assert_eq!(format_amount(ONE), "1");
        assert_eq!(format_amount(ONE / 2), "0.5");
        assert_eq!(format_amount(3 * ONE + ONE / 4), "3.25");
        assert_eq!(parse_amount("1"), Some(ONE));
        assert_eq!(parse_amount("0.5"), Some(ONE / 2));
        assert_eq!(parse_amount("3.25"), Some(3 * ONE + ONE / 4));
        assert_eq!(parse_amount("1.2.3"), None);
        assert_eq!(parse_amount("x"), None);
    }

    #[test]
    fn test_durations_format_by_magnitude() {
        assert_eq!(format_duration(30, true), "30 seconds");
        assert_eq!(format_duration(30, false), "under a minute");
        assert_eq!(format_duration(120, true), "2 minutes");
        assert_eq!(format_duration(7200, true), "2 hours");
        assert_eq!(format_duration(200_000, true), "2 days");
    }
}
