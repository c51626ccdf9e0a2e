//! BIP32 path rendering and parsing

use crate::core::errors::{KeyringError, Result};

/// Hardened derivation offset (top bit)
pub const HARDENED: u32 = 0x8000_0000;

/// Raw derivation path, one index per level
pub type Bip32Path = Vec<u32>;

/// Harden an index
pub const fn hardened(index: u32) -> u32 {
    HARDENED | index
}

pub const fn is_hardened(index: u32) -> bool {
    index & HARDENED == HARDENED
}

/// Index with the hardened bit cleared
pub const fn unhardened(index: u32) -> u32 {
    index & !HARDENED
}

/// Render a path as `m/44'/118'/0'/0/0`.
///
/// An empty path renders as `m/`.
pub fn to_bip32_string(path: &[u32]) -> String {
    let segments: Vec<String> = path
        .iter()
        .map(|&index| {
            if is_hardened(index) {
                format!("{}'", unhardened(index))
            } else {
                index.to_string()
            }
        })
        .collect();
    format!("m/{}", segments.join("/"))
}

/// Parse `m/44'/118'/0'/0/0` (or `h` as the hardening suffix).
pub fn parse_bip32(path_str: &str) -> Result<Bip32Path> {
    let trimmed = path_str.trim();
    let body = trimmed
        .strip_prefix("m/")
        .ok_or_else(|| KeyringError::InvalidPath(format!("path must start with m/: {}", path_str)))?;

    if body.is_empty() {
        return Err(KeyringError::InvalidPath(format!(
            "path must contain at least one component: {}",
            path_str
        )));
    }

    body.split('/')
        .map(|part| parse_component(part, path_str))
        .collect()
}

fn parse_component(part: &str, path_str: &str) -> Result<u32> {
    if part.is_empty() {
        return Err(KeyringError::InvalidPath(format!("empty component in {}", path_str)));
    }

    let (digits, is_hard) = match part.strip_suffix('\'').or_else(|| part.strip_suffix('h')) {
        Some(digits) => (digits, true),
        None => (part, false),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(KeyringError::InvalidPath(format!("invalid component {:?} in {}", part, path_str)));
    }

    let index: u32 = digits
        .parse()
        .map_err(|_| KeyringError::InvalidPath(format!("component out of range in {}", path_str)))?;

    if index >= HARDENED {
        return Err(KeyringError::InvalidPath(format!(
            "component {} exceeds 2^31-1 in {}",
            index, path_str
        )));
    }

    Ok(if is_hard { hardened(index) } else { index })
}
