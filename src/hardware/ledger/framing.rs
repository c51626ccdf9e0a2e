//! Ledger HID framing
//!
//! APDUs are split into 64-byte HID reports:
//! `channel(2) | tag(1) | sequence(2) | [total length(2), first report only] | data`.

use crate::core::errors::{KeyringError, Result};

/// HID report size
pub const HID_PACKET_SIZE: usize = 64;

/// APDU channel
pub const CHANNEL: u16 = 0x0101;

/// APDU command tag
pub const TAG_APDU: u8 = 0x05;

const FIRST_HEADER_LEN: usize = 7;
const NEXT_HEADER_LEN: usize = 5;

/// Reject responses that would need more reports than this
const MAX_SEQUENCE: u16 = 100;

/// Split `apdu` into output reports, each prefixed with report id 0.
/// An empty APDU still yields one report carrying a zero length.
pub fn frame_apdu(apdu: &[u8]) -> Vec<Vec<u8>> {
    let mut packets = Vec::new();
    let mut offset = 0;
    let mut sequence = 0u16;

    loop {
        let mut packet = vec![0u8; HID_PACKET_SIZE + 1];
        let body = &mut packet[1..];
        body[0..2].copy_from_slice(&CHANNEL.to_be_bytes());
        body[2] = TAG_APDU;
        body[3..5].copy_from_slice(&sequence.to_be_bytes());

        let data_start = if sequence == 0 {
            body[5..7].copy_from_slice(&(apdu.len() as u16).to_be_bytes());
            FIRST_HEADER_LEN
        } else {
            NEXT_HEADER_LEN
        };

        let chunk = (HID_PACKET_SIZE - data_start).min(apdu.len() - offset);
        body[data_start..data_start + chunk].copy_from_slice(&apdu[offset..offset + chunk]);
        offset += chunk;

        packets.push(packet);
        sequence += 1;

        if offset >= apdu.len() {
            return packets;
        }
    }
}

/// Reassembles input reports into one response
#[derive(Debug, Default)]
pub struct Reassembler {
    sequence: u16,
    expected: Option<usize>,
    data: Vec<u8>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one input report (without report id). Returns the complete
    /// response once all reports arrived. Reports on other channels or
    /// tags are skipped.
    pub fn push(&mut self, report: &[u8]) -> Result<Option<Vec<u8>>> {
        if report.len() < NEXT_HEADER_LEN {
            return Err(KeyringError::Transport(format!("short HID report: {} bytes", report.len())));
        }

        let channel = u16::from_be_bytes([report[0], report[1]]);
        if channel != CHANNEL || report[2] != TAG_APDU {
            return Ok(None);
        }

        let sequence = u16::from_be_bytes([report[3], report[4]]);
        if sequence != self.sequence {
            return Err(KeyringError::Transport(format!(
                "sequence mismatch: expected {}, got {}",
                self.sequence, sequence
            )));
        }

        if sequence == 0 {
            if report.len() < FIRST_HEADER_LEN {
                return Err(KeyringError::Transport("first HID report missing length".into()));
            }
            self.expected = Some(u16::from_be_bytes([report[5], report[6]]) as usize);
            self.data.extend_from_slice(&report[FIRST_HEADER_LEN..]);
        } else {
            self.data.extend_from_slice(&report[NEXT_HEADER_LEN..]);
        }

        if let Some(len) = self.expected {
            if self.data.len() >= len {
                let mut data = std::mem::take(&mut self.data);
                data.truncate(len);
                return Ok(Some(data));
            }
        }

        self.sequence += 1;
        if self.sequence > MAX_SEQUENCE {
            return Err(KeyringError::Transport("too many HID reports in response".into()));
        }
        Ok(None)
    }
}
