//! Fixed-point scaling between user-facing decimals and the `u64` plaintexts
//! the encryption primitive accepts.
//!
//! Amounts are scaled by `10^decimals` (token decimals, 6 for the payroll
//! token); percentages by 100, so `25.5 %` travels as `2550`. Parsing is
//! exact decimal arithmetic on the input text: digits beyond the scale are
//! truncated, never rounded up.

use std::fmt;

use crate::error::{Result, SessionError};

/// Decimals of the payroll token.
pub const DEFAULT_DECIMALS: u32 = 6;

/// Percentages carry two implied decimals.
pub const PERCENT_DECIMALS: u32 = 2;

/// Largest supported scale; `10^19` overflows `u64`.
pub const MAX_DECIMALS: u32 = 18;

/// Convert a decimal string such as `"5000.00"` into scaled integer units.
///
/// # Errors
/// [`SessionError::InvalidValue`] for empty, negative, non-numeric or
/// overflowing input.
pub fn to_units(text: &str, decimals: u32) -> Result<u64> {
    if decimals > MAX_DECIMALS {
        return Err(SessionError::InvalidValue(format!(
            "{decimals} decimals exceeds the supported maximum of {MAX_DECIMALS}"
        )));
    }

    let trimmed = text.trim();
    let (whole, fraction) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
        return Err(SessionError::InvalidValue(format!(
            "'{trimmed}' is not a non-negative decimal number"
        )));
    }

    let overflow = || SessionError::InvalidValue(format!("'{trimmed}' is too large"));
    let scale = 10u64.pow(decimals);

    let whole_units = if whole.is_empty() {
        0
    } else {
        whole.parse::<u64>().map_err(|_| overflow())?
    };

    // Keep at most `decimals` fractional digits, right-padded with zeros.
    let kept: String = fraction
        .chars()
        .chain(std::iter::repeat('0'))
        .take(decimals as usize)
        .collect();
    let fraction_units = if kept.is_empty() {
        0
    } else {
        kept.parse::<u64>().map_err(|_| overflow())?
    };

    whole_units
        .checked_mul(scale)
        .and_then(|v| v.checked_add(fraction_units))
        .ok_or_else(overflow)
}

/// Scale a percentage string (`"25"` → `2500`).
pub fn percentage_to_units(text: &str) -> Result<u64> {
    to_units(text, PERCENT_DECIMALS)
}

// ── Amount ────────────────────────────────────────────────────────────────────

/// A decrypted fixed-point value.
///
/// `Display` prints at least two fractional digits and drops trailing zeros
/// beyond that: `3_750_000_000` at 6 decimals renders as `3750.00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Amount {
    units: u64,
    decimals: u32,
}

impl Amount {
    pub fn new(units: u64, decimals: u32) -> Self {
        Self { units, decimals }
    }

    pub fn units(&self) -> u64 {
        self.units
    }

    pub fn decimals(&self) -> u32 {
        self.decimals
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.decimals == 0 {
            return write!(f, "{}.00", self.units);
        }
        let scale = 10u64.pow(self.decimals);
        let whole = self.units / scale;
        let fraction = format!(
            "{:0width$}",
            self.units % scale,
            width = self.decimals as usize
        );
        let trimmed = fraction.trim_end_matches('0');
        let shown = if trimmed.len() < 2 {
            &fraction[..2.min(fraction.len())]
        } else {
            trimmed
        };
        if shown.len() < 2 {
            write!(f, "{whole}.{shown:0<2}")
        } else {
            write!(f, "{whole}.{shown}")
        }
    }
}
