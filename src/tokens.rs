/// Shorthand token counts as printed in Copilot usage summaries.
///
/// Counts appear as `21`, `14.3k` or `2.1m`. Suffixes are case-insensitive.
/// Fractional shorthand is truncated after scaling, so `14.35k` is 14350
/// and `0.0005k` is 0.
use std::num::ParseFloatError;

/// A breakdown count that looked like a number but could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum TokenCountError {
    #[error("malformed token count {token:?}: {source}")]
    Malformed {
        token: String,
        #[source]
        source: ParseFloatError,
    },
    #[error("token count {token:?} is out of range")]
    OutOfRange { token: String },
}

/// Decode a shorthand token count into an exact integer.
pub fn parse_token_count(s: &str) -> Result<u64, TokenCountError> {
    let s = s.trim();
    let lower = s.to_ascii_lowercase();
    let (number, multiplier) = if lower.ends_with('k') {
        (&s[..s.len() - 1], 1_000u64)
    } else if lower.ends_with('m') {
        (&s[..s.len() - 1], 1_000_000u64)
    } else {
        (s, 1u64)
    };

    // Surface the float parser's own error for anything unparseable.
    let value: f64 = number.parse().map_err(|e| TokenCountError::Malformed {
        token: s.to_string(),
        source: e,
    })?;

    if let Some(exact) = scale_decimal(number, multiplier) {
        return Ok(exact);
    }

    // Exponents, signs and the like: scale in floating point instead.
    let scaled = (value * multiplier as f64).trunc();
    if !scaled.is_finite() || scaled < 0.0 || scaled > u64::MAX as f64 {
        return Err(TokenCountError::OutOfRange {
            token: s.to_string(),
        });
    }
    Ok(scaled as u64)
}

/// Exact `trunc(number * multiplier)` for plain `digits[.digits]` input.
///
/// Only the first `log10(multiplier)` fractional digits can contribute to
/// the integer part, so the rest are dropped. Returns `None` when the input
/// is not plain decimal or the result overflows.
fn scale_decimal(number: &str, multiplier: u64) -> Option<u64> {
    let (int_part, frac_part) = match number.split_once('.') {
        Some((i, f)) => (i, f),
        None => (number, ""),
    };
    let plain = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !plain(int_part) || !plain(frac_part) || (int_part.is_empty() && frac_part.is_empty()) {
        return None;
    }

    let places = multiplier.ilog10() as usize;
    let mut frac_value = 0u64;
    for i in 0..places {
        let digit = frac_part.as_bytes().get(i).map_or(0, |b| u64::from(b - b'0'));
        frac_value = frac_value * 10 + digit;
    }

    let whole = if int_part.is_empty() {
        0
    } else {
        int_part.parse::<u64>().ok()?
    };
    whole.checked_mul(multiplier)?.checked_add(frac_value)
}
