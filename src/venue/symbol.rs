/// Normalizes a venue-facing symbol: uppercase, `/` -> `-`, `-USDT` suffix
/// -> `-USD`, and a bare base symbol gets `default_quote` appended.
/// Grounded on `exchanges/extended.py::normalize_symbol` in the original
/// source, with the bare-base-symbol suffixing the spec adds on top.
pub fn normalize(symbol: &str, default_quote: &str) -> String {
    let mut s = symbol.to_uppercase().replace('/', "-");

    if let Some(base) = s.strip_suffix("-USDT") {
        s = format!("{base}-USD");
    }

    if !s.contains('-') {
        s = format!("{s}-{}", default_quote.to_uppercase());
    }

    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uppercases_and_replaces_slash() {
        assert_eq!(normalize("btc/usd", "USD"), "BTC-USD");
    }

    #[test]
    fn rewrites_usdt_suffix_to_usd() {
        assert_eq!(normalize("ETH-USDT", "USD"), "ETH-USD");
    }

    #[test]
    fn suffixes_bare_base_symbol_with_default_quote() {
        assert_eq!(normalize("btc", "USD"), "BTC-USD");
    }

    #[test]
    fn is_idempotent() {
        for input in ["btc/usd", "ETH-USDT", "sol", "BTC-USD"] {
            let once = normalize(input, "USD");
            let twice = normalize(&once, "USD");
            assert_eq!(once, twice, "normalize should be idempotent for {input}");
        }
    }
}
