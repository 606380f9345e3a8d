// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Linearization of an [`ObjectGraph`] into wire bytes.

use crate::config::{ALLOC_PRESENT, VECTOR_OWNERSHIP_MASK};
use crate::encoder::Encoder;
use crate::error::{self, Diagnostics, Error, Status, Violation};
use crate::graph::{ObjectGraph, ObjectRef};
use crate::handle::{ObjectType, Rights};
use crate::position::{Advance, Memory, MemoryMut, Position, Scalar};
use crate::schema::TypeId;
use crate::walker::{Envelope, PointeeKind, Visitor};

/// A location in the source graph paired with its image in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodePosition {
    pub source: Position,
    /// Offset in the encoder's buffer.
    pub dest: u32,
}

impl Advance for EncodePosition {
    fn advance(self, delta: u32) -> Option<Self> {
        Some(Self {
            source: self.source.advance(delta)?,
            dest: self.dest.checked_add(delta)?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct EnvelopeFrame {
    bytes_start: u32,
    handles_start: u32,
}

/// Copies each out-of-line object of the source graph into a fresh aligned
/// allocation, moving handles into the encoder as it goes.
///
/// The inline image of every object is copied verbatim first; hooks then
/// patch what differs on the wire: presence markers, counts without the
/// ownership bit, zeroed padding and envelope byte/handle totals.
pub struct EncodeVisitor<'a> {
    encoder: &'a mut Encoder,
    graph: &'a mut ObjectGraph,
    frames: Vec<EnvelopeFrame>,
    diagnostics: Diagnostics,
    alloc_error: Option<Error>,
}

impl<'a> EncodeVisitor<'a> {
    pub fn new(encoder: &'a mut Encoder, graph: &'a mut ObjectGraph) -> Self {
        Self {
            encoder,
            graph,
            frames: Vec::new(),
            diagnostics: Diagnostics::new(),
            alloc_error: None,
        }
    }

    /// First failure of the walk. An allocation refused by the encoder is
    /// returned as the encoder reported it.
    pub fn into_result(self) -> error::Result<()> {
        match self.alloc_error {
            Some(err) => Err(err),
            None => self.diagnostics.into_result(),
        }
    }

    fn fail(&mut self, violation: Violation, message: &str) -> Violation {
        self.diagnostics.report(violation, message);
        violation
    }

    fn store<T: Scalar>(&mut self, dest: u32, value: T) -> Status {
        match Position::inline(dest).write(self.encoder.bytes_mut(), value) {
            Some(()) => Ok(()),
            None => Err(self.fail(Violation::Memory, "write outside encoded message")),
        }
    }
}

impl Visitor for EncodeVisitor<'_> {
    type Position = EncodePosition;

    const CONTINUE_AFTER_CONSTRAINT_VIOLATION: bool = false;
    const ALLOW_NON_NULLABLE_COLLECTIONS_TO_BE_ABSENT: bool = true;

    fn load<T: Scalar>(&self, position: EncodePosition) -> Option<T> {
        self.graph.read(position.source)
    }

    fn on_error(&mut self, violation: Violation, message: &str) {
        self.diagnostics.report(violation, message);
    }

    fn visit_pointer(
        &mut self,
        slot: EncodePosition,
        _: PointeeKind,
        size: u32,
    ) -> Result<EncodePosition, Violation> {
        let Some(raw) = self.graph.read::<u64>(slot.source) else {
            return Err(self.fail(Violation::Memory, "read outside object graph"));
        };

        // The source must hold `size` bytes before anything is reserved. An
        // absent source is a non-nullable collection encoded as empty.
        let source = match ObjectRef::unpack(raw) {
            None => None,
            Some(object) if self.graph.slice(object.position(), size).is_some() => {
                Some(object.position())
            }
            Some(_) => {
                return Err(self.fail(Violation::Memory, "pointer refers outside object graph"));
            }
        };
        let offset = match self.encoder.alloc(size) {
            Ok(offset) => offset,
            Err(err) => {
                self.diagnostics.report(Violation::Memory, err.to_string());
                self.alloc_error = Some(err);
                return Err(Violation::Memory);
            }
        };

        if let Some(source) = source {
            let dest = Position::inline(offset);
            let copied = match (
                self.graph.slice(source, size),
                self.encoder.bytes_mut().slice_mut(dest, size),
            ) {
                (Some(bytes), Some(out)) => {
                    out.copy_from_slice(bytes);
                    true
                }
                _ => false,
            };
            if !copied {
                return Err(self.fail(Violation::Memory, "write outside encoded message"));
            }
        }
        self.store(slot.dest, ALLOC_PRESENT)?;
        Ok(EncodePosition {
            source: source.unwrap_or_default(),
            dest: offset,
        })
    }

    fn visit_handle(&mut self, slot: EncodePosition, rights: Rights, subtype: ObjectType) -> Status {
        let Ok(handle) = self.graph.take_handle(slot.source) else {
            return Err(self.fail(Violation::Memory, "read outside object graph"));
        };
        if self
            .encoder
            .encode_handle(handle, subtype, rights, slot.dest)
            .is_err()
        {
            return Err(self.fail(Violation::Memory, "write outside encoded message"));
        }
        Ok(())
    }

    fn visit_vector_or_string_count(&mut self, count_slot: EncodePosition) -> Status {
        let Some(count) = self.graph.read::<u64>(count_slot.source) else {
            return Err(self.fail(Violation::Memory, "read outside object graph"));
        };
        self.store(count_slot.dest, count & !VECTOR_OWNERSHIP_MASK)
    }

    fn visit_internal_padding(&mut self, position: EncodePosition, len: u32) -> Status {
        match self.encoder.bytes_mut().slice_mut(Position::inline(position.dest), len) {
            Some(padding) => {
                padding.fill(0);
                Ok(())
            }
            None => Err(self.fail(Violation::Memory, "write outside encoded message")),
        }
    }

    fn enter_envelope(&mut self, _: EncodePosition, _: &Envelope, _: Option<TypeId>) -> Status {
        self.frames.push(EnvelopeFrame {
            bytes_start: self.encoder.len(),
            handles_start: self.encoder.handle_count(),
        });
        Ok(())
    }

    fn leave_envelope(&mut self, position: EncodePosition, _: &Envelope) -> Status {
        let Some(frame) = self.frames.pop() else {
            return Err(self.fail(Violation::Memory, "unbalanced envelope"));
        };
        let num_bytes = self.encoder.len() - frame.bytes_start;
        let num_handles = self.encoder.handle_count() - frame.handles_start;
        self.store(position.dest, num_bytes)?;
        let Some(handles_at) = position.dest.checked_add(4) else {
            return Err(self.fail(Violation::Memory, "write outside encoded message"));
        };
        self.store(handles_at, num_handles)
    }
}
