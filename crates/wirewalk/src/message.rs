// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transaction header and encoded messages.
//!
//! Header layout (16 bytes, little endian):
//!
//! ```text
//! 0       4          7       8                16
//! +-------+----------+-------+----------------+
//! | txid  | flags[3] | magic |    ordinal     |
//! +-------+----------+-------+----------------+
//! ```

use crate::config::{MAGIC_NUMBER_INITIAL, MESSAGE_HEADER_SIZE};
use crate::error::{Error, Result};
use crate::handle::HandleDisposition;

/// Header that starts every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionHeader {
    pub txid: u32,
    pub flags: [u8; 3],
    pub magic: u8,
    pub ordinal: u64,
}

impl TransactionHeader {
    pub fn new(ordinal: u64) -> Self {
        Self {
            txid: 0,
            flags: [0; 3],
            magic: MAGIC_NUMBER_INITIAL,
            ordinal,
        }
    }

    #[must_use]
    pub fn with_txid(mut self, txid: u32) -> Self {
        self.txid = txid;
        self
    }

    pub fn to_bytes(&self) -> [u8; MESSAGE_HEADER_SIZE as usize] {
        let mut out = [0u8; MESSAGE_HEADER_SIZE as usize];
        out[0..4].copy_from_slice(&self.txid.to_le_bytes());
        out[4..7].copy_from_slice(&self.flags);
        out[7] = self.magic;
        out[8..16].copy_from_slice(&self.ordinal.to_le_bytes());
        out
    }

    /// Parse the first 16 bytes of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let Some(raw) = bytes.get(..MESSAGE_HEADER_SIZE as usize) else {
            return Err(Error::Header(format!(
                "message of {} bytes is shorter than its header",
                bytes.len()
            )));
        };
        let mut txid = [0u8; 4];
        txid.copy_from_slice(&raw[0..4]);
        let mut ordinal = [0u8; 8];
        ordinal.copy_from_slice(&raw[8..16]);
        let header = Self {
            txid: u32::from_le_bytes(txid),
            flags: [raw[4], raw[5], raw[6]],
            magic: raw[7],
            ordinal: u64::from_le_bytes(ordinal),
        };
        if header.magic != MAGIC_NUMBER_INITIAL {
            return Err(Error::Header(format!(
                "unsupported magic number {}",
                header.magic
            )));
        }
        Ok(header)
    }
}

/// Finished outgoing message: bytes (header included) and the handles to
/// transfer with them.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Message {
    pub bytes: Vec<u8>,
    pub handles: Vec<HandleDisposition>,
}

impl Message {
    pub fn header(&self) -> Result<TransactionHeader> {
        TransactionHeader::parse(&self.bytes)
    }

    /// Overwrite the header, e.g. to echo a request's transaction id.
    pub fn set_header(&mut self, header: &TransactionHeader) -> Result<()> {
        let len = self.bytes.len();
        match self.bytes.get_mut(..MESSAGE_HEADER_SIZE as usize) {
            Some(out) => {
                out.copy_from_slice(&header.to_bytes());
                Ok(())
            }
            None => Err(Error::Header(format!(
                "message of {} bytes is shorter than its header",
                len
            ))),
        }
    }

    /// Bytes following the header.
    pub fn body(&self) -> &[u8] {
        self.bytes
            .get(MESSAGE_HEADER_SIZE as usize..)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = TransactionHeader::new(0x0102_0304_0506_0708).with_txid(9);
        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], &[9, 0, 0, 0]);
        assert_eq!(bytes[7], MAGIC_NUMBER_INITIAL);
        assert_eq!(&bytes[8..16], &[8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(TransactionHeader::parse(&bytes), Ok(header));
    }

    #[test]
    fn test_header_rejections() {
        assert!(matches!(
            TransactionHeader::parse(&[0u8; 15]),
            Err(Error::Header(_))
        ));
        let mut bytes = TransactionHeader::new(1).to_bytes();
        bytes[7] = 2;
        assert_eq!(
            TransactionHeader::parse(&bytes),
            Err(Error::Header("unsupported magic number 2".into()))
        );
    }

    #[test]
    fn test_set_header_echoes_txid() {
        let mut message = Message {
            bytes: TransactionHeader::new(4).to_bytes().to_vec(),
            handles: Vec::new(),
        };
        message
            .set_header(&TransactionHeader::new(4).with_txid(0xABCD))
            .expect("long enough");
        assert_eq!(message.header().map(|h| h.txid), Ok(0xABCD));
        assert!(message.body().is_empty());

        let mut short = Message::default();
        assert!(matches!(
            short.set_header(&TransactionHeader::new(4)),
            Err(Error::Header(_))
        ));
    }
}
