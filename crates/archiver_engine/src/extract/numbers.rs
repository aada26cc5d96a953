/// Parse an engagement counter as platforms display it.
///
/// The first whitespace-separated token containing a digit is read, with
/// surrounding punctuation such as `(1.2K)` or `1.2K+` dropped. A trailing
/// `k`/`K` multiplies by one thousand and `m`/`M` by one million, honoring
/// a decimal mantissa (`"1.2K"` is 1200). Any other token has its non-digit
/// characters stripped (`"1,234"` is 1234). Negative scores, empty and
/// unparsable text yield 0.
pub fn parse_engagement_number(text: &str) -> u64 {
    let Some(raw) = text
        .split_whitespace()
        .find(|token| token.chars().any(|c| c.is_ascii_digit()))
    else {
        return 0;
    };

    let punctuation = |c: char| !c.is_alphanumeric();
    let body = raw.trim_start_matches(punctuation);
    if raw[..raw.len() - body.len()].ends_with(['-', '\u{2212}']) {
        return 0;
    }
    let token = body.trim_end_matches(punctuation);

    if let Some(value) = parse_compact(token) {
        return value;
    }

    let digits: String = token.chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

fn parse_compact(token: &str) -> Option<u64> {
    let multiplier = match token.chars().last()? {
        'k' | 'K' => 1_000.0,
        'm' | 'M' => 1_000_000.0,
        _ => return None,
    };
    let mantissa = &token[..token.len() - 1];
    // Some locales use a comma as decimal separator ("1,2K").
    let mantissa: f64 = mantissa.replace(',', ".").parse().ok()?;
    if !mantissa.is_finite() || mantissa < 0.0 {
        return None;
    }
    Some((mantissa * multiplier).round() as u64)
}
