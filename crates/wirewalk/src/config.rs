// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire constants and codec limits.
//!
//! Every layout constant of the wire format lives here.
//! **Do not hardcode sizes or sentinels elsewhere.**
//!
//! # Architecture
//!
//! - **Level 1 (Static)**: wire-format constants (alignment, header, sentinels)
//! - **Level 2 (Dynamic)**: [`CodecConfig`] for per-codec limits (depth, bytes, handles)

// =======================================================================
// Layout
// =======================================================================

/// Alignment unit of every out-of-line object and of the primary object.
pub const ALIGNMENT: u32 = 8;

/// Size of the transaction header that starts every message.
pub const MESSAGE_HEADER_SIZE: u32 = 16;

/// Magic number carried in byte 7 of the transaction header.
pub const MAGIC_NUMBER_INITIAL: u8 = 1;

/// Size of an envelope record: `num_bytes: u32`, `num_handles: u32`, `presence: u64`.
pub const ENVELOPE_SIZE: u32 = 16;

/// Size of a string/vector header: `count: u64`, `presence: u64`.
pub const VECTOR_HEADER_SIZE: u32 = 16;

/// Size of a union: `tag: u64` followed by one envelope.
pub const UNION_SIZE: u32 = 8 + ENVELOPE_SIZE;

/// Size of a table: a vector header over the envelope array.
pub const TABLE_SIZE: u32 = VECTOR_HEADER_SIZE;

/// Inline size of a struct pointer slot.
pub const POINTER_SIZE: u32 = 8;

/// Inline size of a handle slot.
pub const HANDLE_SIZE: u32 = 4;

// =======================================================================
// Sentinels
// =======================================================================

/// Pointer slot value announcing an out-of-line object on the wire.
pub const ALLOC_PRESENT: u64 = u64::MAX;

/// Pointer slot value for an absent object (wire and in-memory form).
pub const ALLOC_ABSENT: u64 = 0;

/// Handle slot value announcing a handle in the handle table.
pub const HANDLE_PRESENT: u32 = u32::MAX;

/// Handle slot value for an absent (or invalid) handle.
pub const HANDLE_ABSENT: u32 = 0;

/// Most significant bit of a string/vector count, reserved for zero-copy
/// view wrappers to track buffer ownership. Never part of the length.
pub const VECTOR_OWNERSHIP_MASK: u64 = 1 << 63;

// =======================================================================
// Limits
// =======================================================================

/// Largest message accepted or produced by default.
pub const MAX_MESSAGE_BYTES: u32 = 65536;

/// Largest handle table accepted or produced by default.
pub const MAX_MESSAGE_HANDLES: u32 = 64;

/// Default bound on nested out-of-line objects.
pub const MAX_DEPTH: u32 = 32;

/// Per-codec limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Maximum nesting of out-of-line objects followed by the walker.
    pub max_depth: u32,
    /// Maximum size of a message buffer, header included.
    pub max_message_bytes: u32,
    /// Maximum number of handles travelling with a message.
    pub max_message_handles: u32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            max_message_bytes: MAX_MESSAGE_BYTES,
            max_message_handles: MAX_MESSAGE_HANDLES,
        }
    }
}

impl CodecConfig {
    /// Set the depth limit.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the byte limit.
    #[must_use]
    pub fn with_max_message_bytes(mut self, max_message_bytes: u32) -> Self {
        self.max_message_bytes = max_message_bytes;
        self
    }

    /// Set the handle limit.
    #[must_use]
    pub fn with_max_message_handles(mut self, max_message_handles: u32) -> Self {
        self.max_message_handles = max_message_handles;
        self
    }
}
