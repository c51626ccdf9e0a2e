//! SLIP-44 registered coin types

/// Coin symbol to SLIP-44 coin type
const SLIP44_BY_COIN: &[(&str, u32)] = &[
    ("Bitcoin", 0),
    ("Testnet", 1),
    ("BitcoinCash", 145),
    ("Litecoin", 2),
    ("Dogecoin", 3),
    ("Dash", 5),
    ("Ethereum", 60),
    ("Atom", 118),
    ("Osmo", 118),
    ("Kuji", 118),
    ("Ripple", 144),
    ("Eos", 194),
    ("Luna", 330),
    ("Scrt", 529),
    ("Bnb", 714),
    ("Rune", 931),
];

/// Look up a coin's SLIP-44 type. Case-insensitive.
pub fn slip44_by_coin(coin: &str) -> Option<u32> {
    SLIP44_BY_COIN
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(coin))
        .map(|&(_, coin_type)| coin_type)
}

/// All registered coins, in registry order.
pub fn known_coins() -> impl Iterator<Item = (&'static str, u32)> {
    SLIP44_BY_COIN.iter().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(slip44_by_coin("Kuji"), Some(118));
        assert_eq!(slip44_by_coin("kuji"), Some(118));
        assert_eq!(slip44_by_coin("Ethereum"), Some(60));
        assert_eq!(slip44_by_coin("Rune"), Some(931));
        assert_eq!(slip44_by_coin("NotACoin"), None);
    }

    #[test]
    fn test_cosmos_family_shares_coin_type() {
        for coin in ["Atom", "Osmo", "Kuji"] {
            assert_eq!(slip44_by_coin(coin), Some(118), "{}", coin);
        }
    }

    #[test]
    fn test_known_coins_unique_names() {
        let mut names: Vec<_> = known_coins().map(|(n, _)| n.to_ascii_lowercase()).collect();
        let len = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), len);
    }
}
