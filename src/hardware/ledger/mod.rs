//! Ledger hardware wallet integration
//!
//! - USB hot-plug adapter and session registration
//! - HID report framing for the native backend

pub mod adapter;
pub mod framing;
pub mod session;

pub use adapter::LedgerUsbAdapter;
pub use session::{LedgerAppInfo, LedgerSession};

/// Ledger USB vendor id
pub const LEDGER_VENDOR_ID: u16 = 0x2C97;

/// HID usage page of the APDU interface
pub const LEDGER_USAGE_PAGE: u16 = 0xFFA0;
