//! Money codec: the only place decimal strings and smallest-unit integers
//! meet. Amounts cross the human edge exactly once in each direction;
//! everything in between is `BigUint` arithmetic.

use num_bigint::BigUint;
use num_traits::Zero as _;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("invalid amount {input:?}: {reason}")]
    InvalidAmount { input: String, reason: &'static str },
}

fn invalid(input: &str, reason: &'static str) -> MoneyError {
    MoneyError::InvalidAmount {
        input: input.to_string(),
        reason,
    }
}

/// Parse a non-negative decimal string into the asset's smallest unit.
///
/// Group separators (`,`) are tolerated in the integer part so that
/// [`format_units`] output parses back, but only at thousands positions;
/// misgrouped input like `"1,0"` is rejected rather than read as `10`.
/// More fractional digits than `precision` allows are rejected, never
/// truncated. The scaling is pure string/integer arithmetic; no float is
/// ever constructed.
pub fn parse_decimal(input: &str, precision: u32) -> Result<BigUint, MoneyError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid(input, "empty amount"));
    }

    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (trimmed, ""),
    };

    let int_digits = ungroup_thousands(int_part).ok_or_else(|| {
        invalid(input, "group separator not at a thousands position")
    })?;
    if int_digits.is_empty() && frac_part.is_empty() {
        return Err(invalid(input, "no digits"));
    }
    if !int_digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid(input, "not a non-negative decimal numeral"));
    }
    if !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid(input, "not a non-negative decimal numeral"));
    }
    if frac_part.len() as u32 > precision {
        return Err(invalid(input, "more fractional digits than the asset allows"));
    }

    let int_value = if int_digits.is_empty() {
        BigUint::zero()
    } else {
        int_digits
            .parse::<BigUint>()
            .map_err(|_| invalid(input, "not a non-negative decimal numeral"))?
    };

    let frac_value = if frac_part.is_empty() {
        BigUint::zero()
    } else {
        let raw = frac_part
            .parse::<BigUint>()
            .map_err(|_| invalid(input, "not a non-negative decimal numeral"))?;
        raw * BigUint::from(10u32).pow(precision - frac_part.len() as u32)
    };

    Ok(int_value * BigUint::from(10u32).pow(precision) + frac_value)
}

/// Format a smallest-unit amount as a grouped decimal string.
///
/// The integer part is grouped en-US style; trailing fractional zeros are
/// trimmed. Round-trip law: `parse_decimal(&format_units(x, p), p) == x`
/// for every non-negative `x`.
pub fn format_units(amount: &BigUint, precision: u32) -> String {
    let scale = BigUint::from(10u32).pow(precision);
    let int_part = amount / &scale;
    let frac_part = amount % &scale;

    let grouped = group_thousands(&int_part.to_string());
    if frac_part.is_zero() {
        return grouped;
    }

    let mut frac = format!("{:0>width$}", frac_part.to_string(), width = precision as usize);
    while frac.ends_with('0') {
        frac.pop();
    }
    format!("{grouped}.{frac}")
}

/// Strip `,` separators, requiring each to sit at a thousands boundary:
/// a leading group of 1..=3 digits followed by groups of exactly 3.
fn ungroup_thousands(int_part: &str) -> Option<String> {
    if !int_part.contains(',') {
        return Some(int_part.to_string());
    }
    let mut groups = int_part.split(',');
    let first = groups.next()?;
    if first.is_empty() || first.len() > 3 {
        return None;
    }
    let mut digits = String::from(first);
    for group in groups {
        if group.len() != 3 {
            return None;
        }
        digits.push_str(group);
    }
    Some(digits)
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let offset = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i != 0 && i % 3 == offset % 3 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
