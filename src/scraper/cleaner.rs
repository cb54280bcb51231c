
// ── Parsers ───────────────────────────────────────────────────────────────────

/// Parse a displayed fuel price: drop the euro sign, decimal comma → point.
/// "1,459 €" → 1.459 | "€ 1.60" → 1.6 | "n/a" → None
pub fn parse_price(s: &str) -> Option<f64> {
    let cleaned = s.trim().replace('€', "").replace(',', ".");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|p| p.is_finite())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("1,459 €"), Some(1.459));
        assert_eq!(parse_price("  1,539€ "), Some(1.539));
        assert_eq!(parse_price("€1.60"), Some(1.6));
        assert_eq!(parse_price("12.34"), Some(12.34));
    }

    #[test]
    fn test_parse_price_rejects_garbage() {
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price(" € "), None);
        assert_eq!(parse_price("n/a"), None);
        assert_eq!(parse_price("1,2,3"), None);
        assert_eq!(parse_price("inf"), None);
    }
}
