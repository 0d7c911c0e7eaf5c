//! Exact conversion between the smallest unit and the human-facing unit.
use crate::{
    currency::Currency,
    error::{Error, Result},
};

use super::{Amount, Coin};

const RADIX: u8 = 10;

impl<C> Coin<C>
where
    C: Currency,
{
    /// Parse an amount given in the display unit, e.g. `"2.5"` ETH.
    ///
    /// Accepts an optional fractional part of at most [`Currency::DECIMAL_DIGITS`]
    /// digits. Signs, exponents and separators other than a single `.` are rejected,
    /// as is an empty input.
    pub fn from_display(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));

        if whole.is_empty() && fraction.is_empty() {
            return Err(Error::invalid_amount(input, "no digits"));
        }
        if fraction.len() > usize::from(C::DECIMAL_DIGITS) {
            return Err(Error::Precision {
                input: input.into(),
                max_digits: C::DECIMAL_DIGITS,
            });
        }
        if !all_digits(whole) || !all_digits(fraction) {
            return Err(Error::invalid_amount(input, "non-digit character"));
        }

        let missing_digits = usize::from(C::DECIMAL_DIGITS) - fraction.len();
        let whole = parse_digits_or_zero(whole).ok_or_else(|| Error::Overflow(input.into()))?;
        let fraction = parse_digits_or_zero(fraction)
            .and_then(|fraction| scale(missing_digits).checked_mul(fraction))
            .ok_or_else(|| Error::Overflow(input.into()))?;

        whole
            .checked_mul(scale(C::DECIMAL_DIGITS.into()))
            .and_then(|whole| whole.checked_add(fraction))
            .map(Self::new)
            .ok_or_else(|| Error::Overflow(input.into()))
    }

    /// Render the amount in the display unit with no trailing fractional zeros.
    pub fn to_display(&self) -> String {
        let unit = scale(C::DECIMAL_DIGITS.into());
        let whole = self.amount / unit;
        let fraction = self.amount % unit;

        if fraction == Amount::ZERO {
            whole.to_string()
        } else {
            let digits = fraction.to_string();
            let padding = usize::from(C::DECIMAL_DIGITS) - digits.len();
            let fraction = format!("{}{}", "0".repeat(padding), digits);

            format!("{}.{}", whole, fraction.trim_end_matches('0'))
        }
    }
}

/// Parse a non-empty string of decimal digits, `None` on any other character or on overflow.
pub(super) fn parse_digits(digits: &str) -> Option<Amount> {
    if digits.is_empty() || !all_digits(digits) {
        None
    } else {
        parse_digits_or_zero(digits)
    }
}

fn parse_digits_or_zero(digits: &str) -> Option<Amount> {
    let radix = Amount::from(RADIX);

    digits.bytes().try_fold(Amount::ZERO, |acc, digit| {
        acc.checked_mul(radix)
            .and_then(|acc| acc.checked_add(Amount::from(digit - b'0')))
    })
}

fn all_digits(digits: &str) -> bool {
    digits.bytes().all(|byte| byte.is_ascii_digit())
}

fn scale(digits: usize) -> Amount {
    let radix = Amount::from(RADIX);

    (0..digits).fold(Amount::ONE, |acc, _| acc * radix)
}
