// Small helpers shared by handlers and the CLI

use anyhow::Context;
use tokio::time::Duration;

/// Parse duration string (e.g., "60s", "5m", "1h") into Duration
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    let (digits, unit) = match s.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => (&s[..i], c),
        _ => (s, 's'),
    };
    let value: u64 = digits
        .trim()
        .parse()
        .with_context(|| format!("Invalid duration format: {}", s))?;
    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3600,
        other => anyhow::bail!("Unknown duration unit '{}' in {}", other, s),
    };
    let secs = value
        .checked_mul(multiplier)
        .with_context(|| format!("Duration out of range: {}", s))?;
    Ok(Duration::from_secs(secs))
}

/// Escape text for HTML element and attribute content
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Query flag semantics: only the literal `true` enables
pub fn flag_enabled(value: Option<&str>) -> bool {
    value == Some("true")
}
