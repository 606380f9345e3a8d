// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Handle release over an object graph.

use crate::error::{Status, Violation};
use crate::graph::{ObjectGraph, ObjectRef};
use crate::handle::{Handle, ObjectType, Rights};
use crate::position::{Memory, Position, Scalar};
use crate::schema::{Schema, TypeId};
use crate::walker::{walk, Envelope, PointeeKind, Visitor};

/// Takes every reachable handle out of a graph. Validation is skipped
/// wherever possible so that as many handles as possible are found.
pub struct HandleReleaseVisitor<'a> {
    graph: &'a mut ObjectGraph,
    released: Vec<Handle>,
}

impl<'a> HandleReleaseVisitor<'a> {
    pub fn new(graph: &'a mut ObjectGraph) -> Self {
        Self {
            graph,
            released: Vec::new(),
        }
    }

    pub fn into_released(self) -> Vec<Handle> {
        self.released
    }
}

impl Visitor for HandleReleaseVisitor<'_> {
    type Position = Position;

    const CONTINUE_AFTER_CONSTRAINT_VIOLATION: bool = true;
    const ALLOW_NON_NULLABLE_COLLECTIONS_TO_BE_ABSENT: bool = true;

    fn load<T: Scalar>(&self, position: Position) -> Option<T> {
        self.graph.read(position)
    }

    fn on_error(&mut self, violation: Violation, message: &str) {
        log::trace!("[release] ignoring {}: {}", violation, message);
    }

    fn visit_pointer(&mut self, slot: Position, _: PointeeKind, size: u32) -> Result<Position, Violation> {
        let object = self.graph.read::<u64>(slot).and_then(ObjectRef::unpack);
        match object {
            // Absent collection with nothing in it.
            None => Ok(Position::default()),
            Some(object) if self.graph.slice(object.position(), size).is_some() => {
                Ok(object.position())
            }
            // Skip the dangling object but keep looking elsewhere.
            Some(_) => Err(Violation::Constraint),
        }
    }

    fn visit_handle(&mut self, slot: Position, _: Rights, _: ObjectType) -> Status {
        let handle = self.graph.take_handle(slot).map_err(|_| Violation::Memory)?;
        if handle.is_valid() {
            self.released.push(handle);
        }
        Ok(())
    }

    fn visit_vector_or_string_count(&mut self, _: Position) -> Status {
        Ok(())
    }

    fn visit_internal_padding(&mut self, _: Position, _: u32) -> Status {
        Ok(())
    }

    fn enter_envelope(&mut self, _: Position, _: &Envelope, _: Option<TypeId>) -> Status {
        Ok(())
    }

    fn leave_envelope(&mut self, _: Position, _: &Envelope) -> Status {
        Ok(())
    }
}

/// Take every handle reachable from the primary object of type `ty`, plus
/// those kept aside from unknown envelopes. Slots are left absent.
pub fn release_handles(schema: &Schema, ty: TypeId, graph: &mut ObjectGraph, max_depth: u32) -> Vec<Handle> {
    let unknown = graph.take_unknown_handles();
    let mut visitor = HandleReleaseVisitor::new(graph);
    walk(schema, &mut visitor, ty, Position::inline(0), max_depth);
    let mut released = visitor.into_released();
    released.extend(unknown.into_iter().map(|info| info.handle));
    if !released.is_empty() {
        log::debug!("[release] released {} handles", released.len());
    }
    released
}
