// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Outgoing message builder.
//!
//! The [`Encoder`] owns a growing byte buffer and the list of handles to
//! transfer. Every allocation is rounded up to the 8-byte alignment unit and
//! zero-filled, so padding between out-of-line objects is always zero. An
//! allocation that would take the buffer past the encoder's byte limit fails
//! before anything is reserved.
//!
//! ```rust
//! use wirewalk::Encoder;
//!
//! let mut encoder = Encoder::new();
//! assert_eq!(encoder.alloc(12).unwrap(), 0);
//! assert_eq!(encoder.len(), 16);
//! ```

use crate::config::{CodecConfig, HANDLE_ABSENT, HANDLE_PRESENT, MESSAGE_HEADER_SIZE};
use crate::error::{Error, Result};
use crate::graph::ObjectGraph;
use crate::handle::{Handle, HandleDisposition, ObjectType, Rights};
use crate::message::{Message, TransactionHeader};
use crate::position::{add_out_of_line, Memory, Position};
use crate::schema::{Schema, TypeId};
use crate::visitors::{EncodePosition, EncodeVisitor};
use crate::walker::walk;

/// Linear buffer allocator plus transferred-handle list.
#[derive(Debug)]
pub struct Encoder {
    bytes: Vec<u8>,
    handles: Vec<HandleDisposition>,
    max_bytes: u32,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::with_limit(u32::MAX)
    }
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoder whose buffer never grows past `max_bytes`.
    pub fn with_limit(max_bytes: u32) -> Self {
        Self {
            bytes: Vec::new(),
            handles: Vec::new(),
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> u32 {
        self.max_bytes
    }

    /// Current buffer length.
    pub fn len(&self) -> u32 {
        // alloc() keeps the length within 32 bits.
        self.bytes.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn handle_count(&self) -> u32 {
        self.handles.len() as u32
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut Vec<u8> {
        &mut self.bytes
    }

    /// Drop any previous content and start a message for `ordinal`.
    pub fn reset(&mut self, ordinal: u64) {
        self.bytes.clear();
        self.handles.clear();
        self.bytes
            .extend_from_slice(&TransactionHeader::new(ordinal).to_bytes());
    }

    /// Reserve `size` bytes; returns their offset. The buffer grows by `size`
    /// rounded up to the alignment unit.
    ///
    /// Fails with [`Error::Limit`] when the buffer would exceed the byte limit.
    pub fn alloc(&mut self, size: u32) -> Result<u32> {
        let offset = self.len();
        let Some(end) = add_out_of_line(offset, size) else {
            return Err(Error::Memory(format!(
                "allocating {} bytes at offset {} overflows 32 bits",
                size, offset
            )));
        };
        if end > self.max_bytes {
            return Err(Error::Limit(format!(
                "allocating {} bytes at offset {} exceeds the {} byte limit",
                size, offset, self.max_bytes
            )));
        }
        self.bytes.resize(end as usize, 0);
        Ok(offset)
    }

    /// Write the presence marker for `handle` at `slot` and queue the handle
    /// for transfer. An invalid handle writes the absence marker.
    pub fn encode_handle(
        &mut self,
        handle: Handle,
        object_type: ObjectType,
        rights: Rights,
        slot: u32,
    ) -> Result<()> {
        let marker = if handle.is_valid() {
            HANDLE_PRESENT
        } else {
            HANDLE_ABSENT
        };
        if Position::inline(slot).write(&mut self.bytes, marker).is_none() {
            return Err(Error::Memory(format!(
                "handle slot {} outside encoded message of {} bytes",
                slot,
                self.bytes.len()
            )));
        }
        if handle.is_valid() {
            self.handles.push(HandleDisposition {
                handle,
                object_type,
                rights,
            });
        }
        Ok(())
    }

    /// Hand the finished message over, leaving the encoder empty.
    pub fn get_message(&mut self) -> Message {
        Message {
            bytes: std::mem::take(&mut self.bytes),
            handles: std::mem::take(&mut self.handles),
        }
    }

    /// Handles queued so far, e.g. to release them after a failed encode.
    pub fn take_handles(&mut self) -> Vec<Handle> {
        self.handles.drain(..).map(|disposition| disposition.handle).collect()
    }

    /// Append the primary object of type `ty` from `graph` and everything it
    /// references. Handles are moved out of the graph.
    ///
    /// The byte limit is tightened to `config.max_message_bytes` and stays so.
    pub fn encode(
        &mut self,
        schema: &Schema,
        ty: TypeId,
        graph: &mut ObjectGraph,
        config: &CodecConfig,
    ) -> Result<()> {
        self.max_bytes = self.max_bytes.min(config.max_message_bytes);
        let size = schema.primary_object_size(ty)?;
        let offset = self.alloc(size)?;
        let Some(primary) = graph.slice(Position::inline(0), size) else {
            return Err(Error::PrimaryObject(format!(
                "primary object of {} bytes is shorter than its type ({} bytes)",
                graph.primary().len(),
                size
            )));
        };
        let Some(dest) = self.bytes.get_mut(offset as usize..(offset + size) as usize) else {
            return Err(Error::Memory("primary object outside encoded message".into()));
        };
        dest.copy_from_slice(primary);

        let start = EncodePosition {
            source: Position::inline(0),
            dest: offset,
        };
        let mut visitor = EncodeVisitor::new(self, graph);
        walk(schema, &mut visitor, ty, start, config.max_depth);
        visitor.into_result()?;

        if self.handle_count() > config.max_message_handles {
            return Err(Error::Limit(format!(
                "encoded {} handles, limit is {}",
                self.handle_count(),
                config.max_message_handles
            )));
        }
        Ok(())
    }

    /// Body offset of a message started with [`reset`](Self::reset).
    pub const fn body_offset() -> u32 {
        MESSAGE_HEADER_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_rounds_up() {
        let mut encoder = Encoder::new();
        assert_eq!(encoder.alloc(12), Ok(0));
        assert_eq!(encoder.len(), 16);
        assert_eq!(encoder.alloc(0), Ok(16));
        assert_eq!(encoder.len(), 16);
        assert_eq!(encoder.alloc(1), Ok(16));
        assert_eq!(encoder.len(), 24);
        assert!(encoder.bytes().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_alloc_overflow_is_memory_error() {
        let mut encoder = Encoder::new();
        encoder.alloc(8).expect("small");
        assert!(matches!(encoder.alloc(u32::MAX - 4), Err(Error::Memory(_))));
        assert_eq!(encoder.len(), 8);
    }

    #[test]
    fn test_alloc_stops_at_limit() {
        let mut encoder = Encoder::with_limit(32);
        assert_eq!(encoder.alloc(20), Ok(0));
        assert_eq!(encoder.alloc(8), Ok(24));
        assert!(matches!(encoder.alloc(1), Err(Error::Limit(_))));
        assert_eq!(encoder.len(), 32);
        assert!(matches!(encoder.alloc(u32::MAX - 4), Err(Error::Memory(_))));
        assert_eq!(Encoder::new().max_bytes(), u32::MAX);
    }

    #[test]
    fn test_encode_handle_moves_valid_handles() {
        let mut encoder = Encoder::new();
        encoder.alloc(8).expect("small");
        encoder
            .encode_handle(Handle::from_raw(0x42), ObjectType::VMO, Rights::READ, 0)
            .expect("in bounds");
        encoder
            .encode_handle(Handle::invalid(), ObjectType::VMO, Rights::READ, 4)
            .expect("in bounds");
        assert_eq!(&encoder.bytes()[0..4], &HANDLE_PRESENT.to_le_bytes());
        assert_eq!(&encoder.bytes()[4..8], &[0, 0, 0, 0]);
        assert_eq!(encoder.handle_count(), 1);
        assert!(encoder
            .encode_handle(Handle::from_raw(1), ObjectType::NONE, Rights::NONE, 6)
            .is_err());
    }

    #[test]
    fn test_reset_and_get_message() {
        let mut encoder = Encoder::new();
        encoder.reset(77);
        assert_eq!(encoder.len(), Encoder::body_offset());
        encoder.alloc(4).expect("small");
        let message = encoder.get_message();
        assert_eq!(message.bytes.len(), 24);
        assert_eq!(message.header().map(|h| h.ordinal), Ok(77));
        assert!(encoder.is_empty());
        assert_eq!(encoder.handle_count(), 0);
    }
}
