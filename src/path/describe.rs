//! Path classification against a chain's account template
//!
//! Classification never fails: a path that does not fit the template is
//! reported as unknown, carrying only its rendering and the chain label.
//! Callers must check `is_known` before trusting the account fields.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::bip32::{hardened, is_hardened, to_bip32_string, unhardened};
use crate::core::errors::KeyringError;

/// BIP44 purpose
pub const BIP44_PURPOSE: u32 = 44;

/// Fixed shape of an account path for one chain:
/// `purpose' / coin_type' / account' / trailing...`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainTemplate {
    /// Coin symbol reported in descriptions (`"Kuji"`)
    pub coin: &'static str,
    /// Human-readable chain name (`"Kujira"`)
    pub name: &'static str,
    pub purpose: u32,
    /// SLIP-44 coin type, unhardened
    pub coin_type: u32,
    /// Expected values after the account segment
    pub trailing: &'static [u32],
}

impl ChainTemplate {
    /// Total number of segments a known path must have
    pub fn len(&self) -> usize {
        3 + self.trailing.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Classify `path` against this template.
    pub fn describe(&self, path: &[u32]) -> PathDescription {
        match self.account_index(path) {
            Some(index) => PathDescription {
                verbose: format!("{} Account #{}", self.name, index),
                coin: self.coin.to_string(),
                is_known: true,
                account_idx: Some(index),
                whole_account: Some(true),
                is_prefork: Some(false),
            },
            None => PathDescription::unknown(path, self.coin),
        }
    }

    /// The account path for `account_idx` (lower 31 bits are used).
    pub fn account_path(&self, account_idx: u32) -> Vec<u32> {
        let mut path = Vec::with_capacity(self.len());
        path.push(hardened(self.purpose));
        path.push(hardened(self.coin_type));
        path.push(hardened(unhardened(account_idx)));
        path.extend_from_slice(self.trailing);
        path
    }

    fn account_index(&self, path: &[u32]) -> Option<u32> {
        if path.len() != self.len() {
            return None;
        }
        if path[0] != hardened(self.purpose) {
            return None;
        }
        if path[1] != hardened(self.coin_type) {
            return None;
        }
        if !is_hardened(path[2]) {
            return None;
        }
        if &path[3..] != self.trailing {
            return None;
        }
        Some(unhardened(path[2]))
    }
}

/// Result of classifying a derivation path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathDescription {
    /// Account label when known, raw `m/...` rendering otherwise
    pub verbose: String,
    pub coin: String,
    pub is_known: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_idx: Option<u32>,
    /// Path addresses a whole account rather than a single address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whole_account: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_prefork: Option<bool>,
}

impl PathDescription {
    pub fn unknown(path: &[u32], coin: &str) -> Self {
        Self {
            verbose: to_bip32_string(path),
            coin: coin.to_string(),
            is_known: false,
            account_idx: None,
            whole_account: None,
            is_prefork: None,
        }
    }
}

/// Chains whose account paths the keyring can scope and describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Cosmos,
    Osmosis,
    Kujira,
    Thorchain,
    Secret,
    Terra,
    Binance,
}

/// Change 0 / address 0: the default external chain, used as the whole-account handle.
const ACCOUNT_TRAILING: &[u32] = &[0, 0];

impl Chain {
    pub const ALL: [Chain; 7] = [
        Chain::Cosmos,
        Chain::Osmosis,
        Chain::Kujira,
        Chain::Thorchain,
        Chain::Secret,
        Chain::Terra,
        Chain::Binance,
    ];

    pub const fn template(self) -> ChainTemplate {
        let (coin, name, coin_type) = match self {
            Chain::Cosmos => ("Atom", "Cosmos", 118),
            Chain::Osmosis => ("Osmo", "Osmosis", 118),
            Chain::Kujira => ("Kuji", "Kujira", 118),
            Chain::Thorchain => ("Rune", "THORChain", 931),
            Chain::Secret => ("Scrt", "Secret", 529),
            Chain::Terra => ("Luna", "Terra", 330),
            Chain::Binance => ("Bnb", "Binance", 714),
        };
        ChainTemplate {
            coin,
            name,
            purpose: BIP44_PURPOSE,
            coin_type,
            trailing: ACCOUNT_TRAILING,
        }
    }

    pub fn describe(self, path: &[u32]) -> PathDescription {
        self.template().describe(path)
    }

    pub fn coin(self) -> &'static str {
        self.template().coin
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.template().name)
    }
}

impl FromStr for Chain {
    type Err = KeyringError;

    /// Accepts the chain name or its coin symbol, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Chain::ALL
            .into_iter()
            .find(|chain| {
                let t = chain.template();
                t.name.eq_ignore_ascii_case(s) || t.coin.eq_ignore_ascii_case(s)
            })
            .ok_or_else(|| KeyringError::InvalidPath(format!("unsupported chain: {}", s)))
    }
}

/// Describe a Kujira path.
pub fn kujira_describe_path(path: &[u32]) -> PathDescription {
    Chain::Kujira.describe(path)
}
