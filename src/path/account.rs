//! Account path helpers

use serde::{Deserialize, Serialize};

use super::describe::Chain;

/// Derivation path of one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountPath {
    pub address_n_list: Vec<u32>,
}

/// Paths for `account_idx`, most preferred first.
pub fn account_paths(chain: Chain, account_idx: u32) -> Vec<AccountPath> {
    vec![AccountPath {
        address_n_list: chain.template().account_path(account_idx),
    }]
}

/// The path of the account following `path`, or `None` when `path` is not
/// a known account path for `chain` or is already the last account.
pub fn next_account_path(chain: Chain, path: &AccountPath) -> Option<AccountPath> {
    let description = chain.describe(&path.address_n_list);
    if !description.is_known {
        return None;
    }
    let next = description.account_idx?.checked_add(1)?;
    if next > 0x7FFF_FFFF {
        return None;
    }
    Some(AccountPath {
        address_n_list: chain.template().account_path(next),
    })
}
