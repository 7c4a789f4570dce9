/// Duration shorthand from Copilot usage summaries: `150ms`, `2s`, `1m30s`.
use regex::Regex;
use std::sync::LazyLock;

static MINUTES_SECONDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(\d+)m)?(\d+)s").unwrap());

/// Parse a duration token into fractional seconds.
///
/// Tried in order: a `ms` suffix, then `[<minutes>m]<seconds>s`, then
/// whatever digits and decimal points remain. Never fails; tokens with
/// nothing numeric in them decode as zero.
pub fn parse_seconds(s: &str) -> f64 {
    let s = s.trim();

    if let Some(millis) = s.strip_suffix("ms") {
        let value = millis
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .unwrap_or_else(|| extract_number(millis));
        return value / 1000.0;
    }

    if let Some(caps) = MINUTES_SECONDS.captures(s) {
        let minutes = caps
            .get(1)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0);
        let seconds = caps[2].parse::<u64>().ok();
        if let Some(seconds) = seconds {
            return minutes.saturating_mul(60).saturating_add(seconds) as f64;
        }
    }

    extract_number(s)
}

/// Best-effort numeric extraction: keep digits and dots, parse what's left.
fn extract_number(s: &str) -> f64 {
    let digits: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if digits.is_empty() {
        return 0.0;
    }
    match digits.parse::<f64>() {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(token = s, error = %e, "unparseable duration, using zero");
            0.0
        }
    }
}
