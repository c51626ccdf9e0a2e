//! BIP32 path descriptor
//!
//! Classifies raw derivation paths against per-chain account templates and
//! renders them for display:
//! - `m/44'/118'/0'/0/0` rendering and parsing
//! - SLIP-44 coin type registry
//! - account path enumeration

pub mod account;
pub mod bip32;
pub mod describe;
pub mod slip44;

pub use account::{account_paths, next_account_path, AccountPath};
pub use bip32::{hardened, is_hardened, parse_bip32, to_bip32_string, unhardened, Bip32Path, HARDENED};
pub use describe::{kujira_describe_path, Chain, ChainTemplate, PathDescription, BIP44_PURPOSE};
pub use slip44::slip44_by_coin;
