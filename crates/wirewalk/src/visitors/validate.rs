// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Read-only validation of a received message.

use super::wire::WireState;
use crate::error::{Diagnostics, Status, Violation};
use crate::handle::{ObjectType, Rights};
use crate::position::{Position, Scalar};
use crate::schema::TypeId;
use crate::walker::{Envelope, PointeeKind, Visitor, WalkResult};

/// Checks a flat message without modifying it.
///
/// With `EXHAUSTIVE` set, the walk keeps going past constraint violations
/// and every problem is collected.
#[derive(Debug)]
pub struct ValidateVisitor<'a, const EXHAUSTIVE: bool> {
    bytes: &'a [u8],
    state: WireState,
}

/// Validator that stops at the first violation.
pub type Validator<'a> = ValidateVisitor<'a, false>;

/// Validator that collects every violation.
pub type ExhaustiveValidator<'a> = ValidateVisitor<'a, true>;

impl<'a, const EXHAUSTIVE: bool> ValidateVisitor<'a, EXHAUSTIVE> {
    /// `first_out_of_line` is the aligned end of the primary object.
    pub fn new(bytes: &'a [u8], num_handles: u32, first_out_of_line: u32) -> Self {
        Self {
            bytes,
            state: WireState::new(bytes.len() as u32, num_handles, first_out_of_line),
        }
    }

    /// Conclude the walk: a clean walk must have consumed the whole message.
    pub fn finish(mut self, result: WalkResult) -> Diagnostics {
        if result == WalkResult::Continue {
            self.state.finish();
        }
        self.state.diagnostics
    }
}

impl<const EXHAUSTIVE: bool> Visitor for ValidateVisitor<'_, EXHAUSTIVE> {
    type Position = Position;

    const CONTINUE_AFTER_CONSTRAINT_VIOLATION: bool = EXHAUSTIVE;
    const ALLOW_NON_NULLABLE_COLLECTIONS_TO_BE_ABSENT: bool = false;

    fn load<T: Scalar>(&self, position: Position) -> Option<T> {
        position.read(self.bytes)
    }

    fn on_error(&mut self, violation: Violation, message: &str) {
        self.state.report(violation, message);
    }

    fn visit_pointer(&mut self, slot: Position, _: PointeeKind, size: u32) -> Result<Position, Violation> {
        self.state.claim(self.bytes, slot, size).map(Position::inline)
    }

    fn visit_handle(&mut self, slot: Position, _: Rights, _: ObjectType) -> Status {
        let Some(presence) = slot.read::<u32, _>(self.bytes) else {
            self.state.report(Violation::Memory, "read outside message bounds");
            return Err(Violation::Memory);
        };
        self.state.claim_handle(presence).map(|_| ())
    }

    fn visit_vector_or_string_count(&mut self, _: Position) -> Status {
        Ok(())
    }

    fn visit_internal_padding(&mut self, position: Position, len: u32) -> Status {
        self.state.check_padding(self.bytes, position, len)
    }

    fn enter_envelope(&mut self, _: Position, envelope: &Envelope, payload: Option<TypeId>) -> Status {
        self.state.enter_envelope(envelope, payload.is_some()).map(|_| ())
    }

    fn leave_envelope(&mut self, _: Position, _: &Envelope) -> Status {
        self.state.leave_envelope()
    }
}
