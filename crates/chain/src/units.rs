use alloy::primitives::{Address, U256};

/// Placeholder shown when a value has not been loaded yet.
pub const PLACEHOLDER: &str = "—";

/// Expand a fixed-point integer amount into its exact decimal string.
///
/// Pure string arithmetic — amounts are up to 256 bits and must never pass
/// through a float. `format_units(U256::from(1500000), 6)` is `"1.500000"`.
pub fn format_units(amount: U256, decimals: u8) -> String {
    let digits = amount.to_string();
    if decimals == 0 {
        return digits;
    }

    let d = decimals as usize;
    let padded = if digits.len() <= d {
        let mut s = "0".repeat(d + 1 - digits.len());
        s.push_str(&digits);
        s
    } else {
        digits
    };

    let (int_part, frac_part) = padded.split_at(padded.len() - d);
    format!("{int_part}.{frac_part}")
}

/// Truncate fractional digits to `max_frac` (never rounding up) and drop
/// trailing zeros. A bare trailing dot is dropped too.
pub fn trim_decimals(value: &str, max_frac: usize) -> String {
    let Some((int_part, frac_part)) = value.split_once('.') else {
        return value.to_string();
    };

    let frac: &str = &frac_part[..frac_part.len().min(max_frac)];
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        int_part.to_string()
    } else {
        format!("{int_part}.{frac}")
    }
}

/// Comma-group the integer part of a decimal string: `1234567.5` → `1,234,567.5`.
pub fn group_thousands(value: &str) -> String {
    let (int_part, frac_part) = match value.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (value, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(f) => format!("{grouped}.{f}"),
        None => grouped,
    }
}

/// Full display pipeline: exact expansion, fraction cap, comma grouping.
/// `None` renders as the em-dash placeholder.
pub fn format_amount(amount: Option<U256>, decimals: u8, max_frac: usize) -> String {
    let Some(amount) = amount else {
        return PLACEHOLDER.to_string();
    };
    group_thousands(&trim_decimals(&format_units(amount, decimals), max_frac))
}

/// Abbreviate a precision-safe decimal string with K/M suffixes.
///
/// Applied only after exact formatting; the truncation here is display-only.
pub fn abbreviate(value: &str) -> String {
    let int_part = value.split('.').next().unwrap_or(value);
    let n = int_part.len();

    let (shift, suffix) = if n > 6 {
        (6, "M")
    } else if n > 3 {
        (3, "K")
    } else {
        return trim_decimals(value, 2);
    };

    let head = &int_part[..n - shift];
    let tail = &int_part[n - shift..];
    let shifted = format!("{head}.{tail}");
    format!("{}{suffix}", trim_decimals(&shifted, 2))
}

/// Error produced when a user-supplied decimal string cannot be converted.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseUnitsError {
    #[error("amount is empty")]
    Empty,
    #[error("amount contains invalid characters")]
    InvalidCharacter,
    #[error("amount has more than {0} fractional digits")]
    TooManyFractionalDigits(u8),
    #[error("amount does not fit in 256 bits")]
    Overflow,
}

/// Convert a decimal string into a fixed-point integer at `decimals` places.
///
/// Accepts digits, one dot, and commas (stripped). No float intermediates.
pub fn parse_units(input: &str, decimals: u8) -> Result<U256, ParseUnitsError> {
    let cleaned: String = input
        .trim()
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return Err(ParseUnitsError::Empty);
    }

    let mut dot_seen = false;
    for ch in cleaned.chars() {
        match ch {
            '0'..='9' => {}
            '.' if !dot_seen => dot_seen = true,
            _ => return Err(ParseUnitsError::InvalidCharacter),
        }
    }

    let (int_part, frac_part) = match cleaned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (cleaned.as_str(), ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(ParseUnitsError::Empty);
    }
    if frac_part.len() > decimals as usize {
        return Err(ParseUnitsError::TooManyFractionalDigits(decimals));
    }

    let mut raw = String::with_capacity(int_part.len() + decimals as usize);
    raw.push_str(int_part);
    raw.push_str(frac_part);
    raw.push_str(&"0".repeat(decimals as usize - frac_part.len()));
    let raw = raw.trim_start_matches('0');
    if raw.is_empty() {
        return Ok(U256::ZERO);
    }

    U256::from_str_radix(raw, 10).map_err(|_| ParseUnitsError::Overflow)
}

/// `0x1234…abcd` style address display.
pub fn short_addr(addr: &Address) -> String {
    let s = format!("{addr:#x}");
    format!("{}…{}", &s[..6], &s[s.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_exactly_without_floats() {
        let raw = U256::from_str_radix("123456789012345678901234", 10).unwrap();
        assert_eq!(format_units(raw, 18), "123456.789012345678901234");
        assert_eq!(format_units(U256::from(1_500_000u64), 6), "1.500000");
        assert_eq!(format_units(U256::ZERO, 18), "0.000000000000000000");
        assert_eq!(format_units(U256::from(42u64), 0), "42");
    }

    #[test]
    fn trims_without_rounding_up() {
        assert_eq!(trim_decimals("1.999999", 2), "1.99");
        assert_eq!(trim_decimals("2.000000", 4), "2");
        assert_eq!(trim_decimals("0.105000", 4), "0.105");
        assert_eq!(trim_decimals("7", 4), "7");
    }

    #[test]
    fn never_exceeds_requested_fraction_digits() {
        for decimals in [0u8, 1, 6, 18, 36] {
            let raw = U256::from_str_radix("987654321987654321", 10).unwrap();
            for max_frac in [0usize, 1, 2, 6] {
                let out = trim_decimals(&format_units(raw, decimals), max_frac);
                let frac_len = out.split_once('.').map_or(0, |(_, f)| f.len());
                assert!(frac_len <= max_frac);
            }
        }
    }

    #[test]
    fn groups_thousands() {
        assert_eq!(group_thousands("2000"), "2,000");
        assert_eq!(group_thousands("1234567.5"), "1,234,567.5");
        assert_eq!(group_thousands("999"), "999");
    }

    #[test]
    fn placeholder_for_missing_values() {
        assert_eq!(format_amount(None, 18, 2), "—");
        assert_eq!(format_amount(Some(U256::ZERO), 18, 2), "0");
    }

    #[test]
    fn abbreviates_large_magnitudes() {
        assert_eq!(abbreviate("2500000"), "2.5M");
        assert_eq!(abbreviate("12500"), "12.5K");
        assert_eq!(abbreviate("999"), "999");
        assert_eq!(abbreviate("999.128"), "999.12");
        assert_eq!(abbreviate("1000000"), "1M");
        assert_eq!(abbreviate("1234567.89"), "1.23M");
    }

    #[test]
    fn parses_decimal_strings() {
        assert_eq!(parse_units("1.5", 6), Ok(U256::from(1_500_000u64)));
        assert_eq!(parse_units("1,000", 2), Ok(U256::from(100_000u64)));
        assert_eq!(parse_units("0", 18), Ok(U256::ZERO));
        assert_eq!(
            parse_units("0.1234567", 6),
            Err(ParseUnitsError::TooManyFractionalDigits(6))
        );
        assert_eq!(parse_units("12a", 6), Err(ParseUnitsError::InvalidCharacter));
        assert_eq!(parse_units("", 6), Err(ParseUnitsError::Empty));
    }

    #[test]
    fn parse_format_round_trip_is_lossless() {
        let raw = U256::from_str_radix("123456789012345678901234", 10).unwrap();
        let text = format_units(raw, 18);
        assert_eq!(parse_units(&text, 18), Ok(raw));
    }

    #[test]
    fn shortens_addresses() {
        let addr: Address = "0x1234567890abcdef1234567890abcdef12345678"
            .parse()
            .unwrap();
        assert_eq!(short_addr(&addr), "0x1234…5678");
    }
}
