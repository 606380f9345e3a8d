// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-place decoding of a received message into an [`ObjectGraph`].

use super::wire::WireState;
use crate::error::{Diagnostics, Status, Violation};
use crate::graph::{ObjectGraph, ObjectRef};
use crate::handle::{Handle, HandleInfo, ObjectType, Rights};
use crate::position::{Position, Scalar};
use crate::schema::TypeId;
use crate::walker::{Envelope, PointeeKind, Visitor, WalkResult};

/// Validates like [`Validator`](super::Validator) and, as it goes, rewrites
/// pointer slots to [`ObjectRef`]s and handle slots to the handles they
/// stand for.
#[derive(Debug)]
pub struct DecodeVisitor {
    graph: ObjectGraph,
    handles: Vec<HandleInfo>,
    moved: Vec<u32>,
    state: WireState,
}

impl DecodeVisitor {
    pub fn new(bytes: Vec<u8>, handles: Vec<HandleInfo>, first_out_of_line: u32) -> Self {
        let state = WireState::new(bytes.len() as u32, handles.len() as u32, first_out_of_line);
        Self {
            graph: ObjectGraph::from_primary(bytes),
            handles,
            moved: Vec::new(),
            state,
        }
    }

    /// The decoded graph, or the diagnostics together with every handle
    /// the message carried, so the caller can release them.
    pub fn finish(mut self, result: WalkResult) -> Result<ObjectGraph, (Diagnostics, Vec<Handle>)> {
        if result == WalkResult::Continue {
            self.state.finish();
        }
        if self.state.diagnostics.is_empty() {
            return Ok(self.graph);
        }

        let mut released: Vec<Handle> = self.moved.into_iter().map(Handle::from_raw).collect();
        released.extend(
            self.handles
                .into_iter()
                .map(|info| info.handle)
                .filter(Handle::is_valid),
        );
        released.extend(
            self.graph
                .take_unknown_handles()
                .into_iter()
                .map(|info| info.handle),
        );
        Err((self.state.diagnostics, released))
    }

    fn fail(&mut self, violation: Violation, message: &str) -> Violation {
        self.state.report(violation, message);
        violation
    }

    fn handle_info(&mut self, index: u32) -> Result<&mut HandleInfo, Violation> {
        if index as usize >= self.handles.len() {
            return Err(self.fail(Violation::Memory, "handle index out of range"));
        }
        Ok(&mut self.handles[index as usize])
    }
}

impl Visitor for DecodeVisitor {
    type Position = Position;

    const CONTINUE_AFTER_CONSTRAINT_VIOLATION: bool = false;
    const ALLOW_NON_NULLABLE_COLLECTIONS_TO_BE_ABSENT: bool = false;

    fn load<T: Scalar>(&self, position: Position) -> Option<T> {
        self.graph.read(position)
    }

    fn on_error(&mut self, violation: Violation, message: &str) {
        self.state.report(violation, message);
    }

    fn visit_pointer(&mut self, slot: Position, _: PointeeKind, size: u32) -> Result<Position, Violation> {
        let offset = self.state.claim(&self.graph, slot, size)?;
        let object = ObjectRef::new(0, offset);
        if self.graph.set_pointer(slot, Some(object)).is_err() {
            return Err(self.fail(Violation::Memory, "pointer slot outside message bounds"));
        }
        Ok(object.position())
    }

    fn visit_handle(&mut self, slot: Position, required: Rights, subtype: ObjectType) -> Status {
        let Some(presence) = self.graph.handle_at(slot) else {
            return Err(self.fail(Violation::Memory, "read outside message bounds"));
        };
        let index = self.state.claim_handle(presence)?;
        let info = self.handle_info(index)?;

        if subtype != ObjectType::NONE && info.object_type != subtype {
            return Err(self.fail(
                Violation::Constraint,
                "decoded handle object type does not match expected type",
            ));
        }
        let rights = if required == Rights::SAME_RIGHTS {
            info.rights
        } else if !info.rights.contains(required) {
            return Err(self.fail(Violation::Constraint, "decoded handle has insufficient rights"));
        } else {
            // Surplus rights are dropped.
            required
        };

        let object_type = info.object_type;
        let handle = info.handle.take();
        let raw = handle.into_raw();
        if self.graph.write(slot, raw).is_err() {
            return Err(self.fail(Violation::Memory, "handle slot outside message bounds"));
        }
        self.graph.record_rights(raw, object_type, rights);
        self.moved.push(raw);
        Ok(())
    }

    fn visit_vector_or_string_count(&mut self, _: Position) -> Status {
        Ok(())
    }

    fn visit_internal_padding(&mut self, position: Position, len: u32) -> Status {
        self.state.check_padding(&self.graph, position, len)
    }

    fn enter_envelope(&mut self, _: Position, envelope: &Envelope, payload: Option<TypeId>) -> Status {
        let skipped = self.state.enter_envelope(envelope, payload.is_some())?;
        for index in skipped {
            let info = self.handle_info(index)?;
            let kept = HandleInfo::new(info.handle.take(), info.object_type, info.rights);
            self.graph.keep_unknown_handle(kept);
        }
        Ok(())
    }

    fn leave_envelope(&mut self, _: Position, _: &Envelope) -> Status {
        self.state.leave_envelope()
    }
}
