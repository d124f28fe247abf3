use std::fmt;

/// Fiat money is represented as integer cents to avoid floating-point
/// precision issues. 1 unit = 100 cents, so 50.00 = 5000 cents.
pub type Cents = i64;

/// Crypto balances are represented in 1e-8 units ("sats"), so fractional
/// holdings like 0.003 stay exact integers (300_000 sats).
pub type Sats = i64;

/// Interest rates are integer basis points: 200 = 2%, 1000 = 10%.
pub type BasisPoints = i64;

/// Fixed conversion quote: 0.00003 crypto per fiat unit.
/// 1 fiat unit = 100 cents and 1 crypto unit = 1e8 sats, so one cent
/// buys exactly 0.00003 * 1e8 / 100 = 30 sats.
pub const SATS_PER_FIAT_CENT: i64 = 30;

/// Convert a fiat amount to crypto at the fixed quote.
/// Exact integer arithmetic: the quote never produces sub-sat remainders.
pub fn fiat_to_sats(amount_cents: Cents) -> Sats {
    amount_cents * SATS_PER_FIAT_CENT
}

/// Divide, rounding the quotient to the nearest integer (half away from
/// zero on ties). Operands must be non-negative; the denominator positive.
pub fn round_div(numerator: i128, denominator: i128) -> i64 {
    debug_assert!(numerator >= 0 && denominator > 0);
    ((numerator + denominator / 2) / denominator) as i64
}

/// Format cents as a human-readable currency string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.abs();
    let units = abs_cents / 100;
    let remainder = abs_cents % 100;
    format!("{}{}.{:02}", sign, units, remainder)
}

/// Format sats as a crypto amount with 8 decimal places.
/// Example: 300_000 -> "0.00300000"
pub fn format_sats(sats: Sats) -> String {
    let sign = if sats < 0 { "-" } else { "" };
    let abs_sats = sats.abs();
    let units = abs_sats / 100_000_000;
    let remainder = abs_sats % 100_000_000;
    format!("{}{}.{:08}", sign, units, remainder)
}

/// Format basis points as a percentage string.
/// Example: 200 -> "2.00%", 1050 -> "10.50%"
pub fn format_rate(rate_bps: BasisPoints) -> String {
    format!("{}.{:02}%", rate_bps / 100, rate_bps % 100)
}

/// Parse a decimal string into cents.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let negative = input.starts_with('-');
    let input = input.trim_start_matches('-');

    let parts: Vec<&str> = input.split('.').collect();
    match parts.len() {
        1 => {
            // No decimal point, treat as whole units
            let units: i64 = parts[0]
                .parse()
                .map_err(|_| ParseCentsError::InvalidFormat)?;
            let cents = units * 100;
            Ok(if negative { -cents } else { cents })
        }
        2 => {
            let units: i64 = if parts[0].is_empty() {
                0
            } else {
                parts[0]
                    .parse()
                    .map_err(|_| ParseCentsError::InvalidFormat)?
            };

            // Handle decimal part - pad or truncate to 2 digits
            let decimal_str = parts[1];
            let decimal_cents: i64 = match decimal_str.len() {
                0 => 0,
                1 => {
                    // Single digit like "5" means 50 cents
                    decimal_str
                        .parse::<i64>()
                        .map_err(|_| ParseCentsError::InvalidFormat)?
                        * 10
                }
                2 => decimal_str
                    .parse()
                    .map_err(|_| ParseCentsError::InvalidFormat)?,
                _ => {
                    // More than 2 decimal places - truncate
                    decimal_str[..2]
                        .parse()
                        .map_err(|_| ParseCentsError::InvalidFormat)?
                }
            };

            let cents = units * 100 + decimal_cents;
            Ok(if negative { -cents } else { cents })
        }
        _ => Err(ParseCentsError::InvalidFormat),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    InvalidFormat,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
        }
    }
}

impl std::error::Error for ParseCentsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(5000), "50.00");
        assert_eq!(format_cents(1234), "12.34");
        assert_eq!(format_cents(1), "0.01");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-5000), "-50.00");
    }

    #[test]
    fn test_format_sats() {
        assert_eq!(format_sats(300_000), "0.00300000");
        assert_eq!(format_sats(0), "0.00000000");
        assert_eq!(format_sats(100_000_000), "1.00000000");
        assert_eq!(format_sats(123_456_789), "1.23456789");
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(200), "2.00%");
        assert_eq!(format_rate(500), "5.00%");
        assert_eq!(format_rate(1000), "10.00%");
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("50.00"), Ok(5000));
        assert_eq!(parse_cents("50"), Ok(5000));
        assert_eq!(parse_cents("12.34"), Ok(1234));
        assert_eq!(parse_cents("12.5"), Ok(1250));
        assert_eq!(parse_cents("0.01"), Ok(1));
        assert_eq!(parse_cents(".50"), Ok(50));
        assert_eq!(parse_cents("-50.00"), Ok(-5000));
        assert_eq!(parse_cents("100.999"), Ok(10099)); // Truncates
    }

    #[test]
    fn test_parse_cents_invalid() {
        assert!(parse_cents("abc").is_err());
        assert!(parse_cents("12.34.56").is_err());
    }

    #[test]
    fn test_fiat_to_sats_is_exact() {
        // 100.00 fiat -> 0.003 crypto
        assert_eq!(fiat_to_sats(10_000), 300_000);
        // 1 cent is the smallest fiat amount and still converts exactly
        assert_eq!(fiat_to_sats(1), 30);
        assert_eq!(fiat_to_sats(0), 0);
    }

    #[test]
    fn test_round_div() {
        assert_eq!(round_div(10, 4), 3); // 2.5 rounds up
        assert_eq!(round_div(9, 4), 2); // 2.25 rounds down
        assert_eq!(round_div(11, 4), 3); // 2.75 rounds up
        assert_eq!(round_div(12, 4), 3); // exact
        assert_eq!(round_div(0, 7), 0);
    }
}
