// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-memory form of a message.
//!
//! An [`ObjectGraph`] is a list of byte segments. Segment 0 holds the
//! primary object; out-of-line objects are addressed by [`ObjectRef`]s
//! stored in pointer slots. Handle slots carry raw handle values instead of
//! presence markers.
//!
//! Graphs come from two places: [`Codec::decode`](crate::Codec::decode)
//! rewrites a received message in place (a single segment whose pointers
//! refer back into it), and callers author graphs for encoding with the
//! `set_*` helpers, one segment per out-of-line object.

use crate::config::{ALLOC_ABSENT, POINTER_SIZE, VECTOR_OWNERSHIP_MASK};
use crate::error::{Error, Result};
use crate::handle::{Handle, HandleInfo, ObjectType, Rights};
use crate::position::{Advance, Memory, MemoryMut, Position, Scalar};
use std::collections::BTreeMap;

/// Reference to an object inside an [`ObjectGraph`].
///
/// Packed into a pointer slot as `((segment + 1) << 32) | offset`, so a
/// reference is never mistaken for an absent pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub segment: u32,
    pub offset: u32,
}

impl ObjectRef {
    pub const fn new(segment: u32, offset: u32) -> Self {
        Self { segment, offset }
    }

    pub fn pack(self) -> u64 {
        ((u64::from(self.segment) + 1) << 32) | u64::from(self.offset)
    }

    /// `None` for an absent slot.
    pub fn unpack(raw: u64) -> Option<Self> {
        let segment = u32::try_from((raw >> 32).checked_sub(1)?).ok()?;
        Some(Self::new(segment, raw as u32))
    }

    pub fn position(self) -> Position {
        Position::new(self.segment, self.offset)
    }
}

/// Segmented, pointer-linked message objects.
#[derive(Debug, Default, PartialEq)]
pub struct ObjectGraph {
    segments: Vec<Vec<u8>>,
    unknown_handles: Vec<HandleInfo>,
    rights: BTreeMap<u32, (ObjectType, Rights)>,
}

impl ObjectGraph {
    /// Graph with a zeroed primary object of `primary_size` bytes.
    pub fn new(primary_size: u32) -> Self {
        Self::from_primary(vec![0u8; primary_size as usize])
    }

    pub fn from_primary(bytes: Vec<u8>) -> Self {
        Self {
            segments: vec![bytes],
            unknown_handles: Vec::new(),
            rights: BTreeMap::new(),
        }
    }

    pub fn primary(&self) -> &[u8] {
        self.segments.first().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn segment(&self, index: u32) -> Option<&[u8]> {
        self.segments.get(index as usize).map(Vec::as_slice)
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Append an out-of-line object and return its reference.
    pub fn push_segment(&mut self, bytes: Vec<u8>) -> ObjectRef {
        if self.segments.is_empty() {
            self.segments.push(Vec::new());
        }
        let segment = self.segments.len() as u32;
        self.segments.push(bytes);
        ObjectRef::new(segment, 0)
    }

    pub fn read<T: Scalar>(&self, position: Position) -> Option<T> {
        position.read(self)
    }

    pub fn write<T: Scalar>(&mut self, position: Position, value: T) -> Result<()> {
        position.write(self, value).ok_or_else(|| out_of_bounds(position, T::SIZE))
    }

    /// Point `slot` at `target`, or mark it absent.
    pub fn set_pointer(&mut self, slot: Position, target: Option<ObjectRef>) -> Result<()> {
        self.write(slot, target.map_or(ALLOC_ABSENT, ObjectRef::pack))
    }

    /// Follow the pointer stored at `slot`.
    pub fn pointer_at(&self, slot: Position) -> Option<Position> {
        self.read::<u64>(slot)
            .and_then(ObjectRef::unpack)
            .map(ObjectRef::position)
    }

    /// Fill the string header at `slot`; `None` writes an absent string.
    pub fn set_string(&mut self, slot: Position, value: Option<&str>) -> Result<()> {
        match value {
            Some(text) => self.set_vector(slot, text.len() as u32, Some(text.as_bytes().to_vec())),
            None => self.set_vector(slot, 0, None),
        }
    }

    /// Fill the vector header at `slot` with `count` elements stored in `body`.
    pub fn set_vector(&mut self, slot: Position, count: u32, body: Option<Vec<u8>>) -> Result<()> {
        let data_slot = data_slot(slot)?;
        if self.slice(data_slot, POINTER_SIZE).is_none() {
            return Err(out_of_bounds(slot, 16));
        }
        self.write(slot, u64::from(count))?;
        let target = body.map(|bytes| self.push_segment(bytes));
        self.set_pointer(data_slot, target)
    }

    /// Decoded string at `slot`; `None` when absent, dangling or not UTF-8.
    pub fn string_at(&self, slot: Position) -> Option<&str> {
        let (body, len) = self.vector_at(slot)?;
        let bytes = self.slice(body, len)?;
        std::str::from_utf8(bytes).ok()
    }

    /// Body position and element count of the vector at `slot`.
    pub fn vector_at(&self, slot: Position) -> Option<(Position, u32)> {
        let count = self.read::<u64>(slot)? & !VECTOR_OWNERSHIP_MASK;
        let body = self.pointer_at(data_slot(slot).ok()?)?;
        Some((body, u32::try_from(count).ok()?))
    }

    pub fn set_handle(&mut self, slot: Position, handle: Handle) -> Result<()> {
        self.write(slot, handle.into_raw())
    }

    pub fn handle_at(&self, slot: Position) -> Option<u32> {
        self.read::<u32>(slot)
    }

    /// Move the handle out of `slot`, leaving it absent.
    pub fn take_handle(&mut self, slot: Position) -> Result<Handle> {
        let raw = self
            .read::<u32>(slot)
            .ok_or_else(|| out_of_bounds(slot, 4))?;
        self.write(slot, 0u32)?;
        self.rights.remove(&raw);
        Ok(Handle::from_raw(raw))
    }

    /// Type and rights a decoded handle was received with, after reduction.
    pub fn handle_rights(&self, raw: u32) -> Option<(ObjectType, Rights)> {
        self.rights.get(&raw).copied()
    }

    pub(crate) fn record_rights(&mut self, raw: u32, object_type: ObjectType, rights: Rights) {
        self.rights.insert(raw, (object_type, rights));
    }

    /// Handles carried by envelopes whose ordinal the schema does not know.
    pub fn unknown_handles(&self) -> &[HandleInfo] {
        &self.unknown_handles
    }

    pub fn take_unknown_handles(&mut self) -> Vec<HandleInfo> {
        std::mem::take(&mut self.unknown_handles)
    }

    pub(crate) fn keep_unknown_handle(&mut self, info: HandleInfo) {
        self.unknown_handles.push(info);
    }
}

fn data_slot(slot: Position) -> Result<Position> {
    slot.advance(POINTER_SIZE).ok_or_else(|| out_of_bounds(slot, 16))
}

fn out_of_bounds(position: Position, len: u32) -> Error {
    Error::Memory(format!(
        "{} bytes at segment {} offset {} fall outside the object graph",
        len, position.segment, position.offset
    ))
}

impl Memory for ObjectGraph {
    fn slice(&self, position: Position, len: u32) -> Option<&[u8]> {
        let segment = self.segments.get(position.segment as usize)?;
        let start = position.offset as usize;
        segment.get(start..start.checked_add(len as usize)?)
    }
}

impl MemoryMut for ObjectGraph {
    fn slice_mut(&mut self, position: Position, len: u32) -> Option<&mut [u8]> {
        let segment = self.segments.get_mut(position.segment as usize)?;
        let start = position.offset as usize;
        segment.get_mut(start..start.checked_add(len as usize)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_ref_packing() {
        let reference = ObjectRef::new(0, 0);
        assert_ne!(reference.pack(), ALLOC_ABSENT);
        assert_eq!(ObjectRef::unpack(reference.pack()), Some(reference));
        let far = ObjectRef::new(u32::MAX - 1, u32::MAX);
        assert_eq!(ObjectRef::unpack(far.pack()), Some(far));
        assert_eq!(ObjectRef::unpack(0), None);
        assert_eq!(ObjectRef::unpack(0xFFFF_FFFF), None);
    }

    #[test]
    fn test_string_authoring() {
        let mut graph = ObjectGraph::new(32);
        graph.set_string(Position::inline(0), Some("hello")).expect("fits");
        graph.set_string(Position::inline(16), None).expect("fits");
        assert_eq!(graph.segment_count(), 2);
        assert_eq!(graph.string_at(Position::inline(0)), Some("hello"));
        assert_eq!(graph.string_at(Position::inline(16)), None);
        assert_eq!(graph.read::<u64>(Position::inline(24)), Some(ALLOC_ABSENT));
        assert!(graph.set_string(Position::inline(24), Some("x")).is_err());
    }

    #[test]
    fn test_vector_count_masks_ownership_bit() {
        let mut graph = ObjectGraph::new(16);
        graph
            .set_vector(Position::inline(0), 2, Some(vec![1, 0, 2, 0]))
            .expect("fits");
        graph
            .write(Position::inline(0), 2u64 | VECTOR_OWNERSHIP_MASK)
            .expect("fits");
        let (body, count) = graph.vector_at(Position::inline(0)).expect("present");
        assert_eq!(count, 2);
        assert_eq!(graph.read::<u16>(Position::new(body.segment, 2)), Some(2));
    }

    #[test]
    fn test_take_handle_leaves_slot_absent() {
        let mut graph = ObjectGraph::new(8);
        graph
            .set_handle(Position::inline(4), Handle::from_raw(0x77))
            .expect("fits");
        graph.record_rights(0x77, ObjectType::VMO, Rights::READ);
        assert_eq!(graph.handle_rights(0x77), Some((ObjectType::VMO, Rights::READ)));
        let handle = graph.take_handle(Position::inline(4)).expect("fits");
        assert_eq!(handle.raw(), 0x77);
        assert_eq!(graph.handle_at(Position::inline(4)), Some(0));
        assert_eq!(graph.handle_rights(0x77), None);
        assert!(graph.take_handle(Position::inline(6)).is_err());
    }
}
