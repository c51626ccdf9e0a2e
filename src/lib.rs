// src/lib.rs
//! HD wallet keyring
//!
//! Session registry for hardware and injected wallets, the USB hot-plug
//! adapter that keeps it in sync with attached devices, and the BIP32 path
//! descriptor.

pub mod core;
pub mod path;

// Session registry and lifecycle events
pub mod keyring;

// Device transports and adapters
pub mod hardware;
pub mod provider;

pub use crate::core::{KeyringConfig, KeyringError, Result};
pub use crate::keyring::{Keyring, SessionHandle, WalletSession};
