// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema-driven traversal engine.
//!
//! The [`Walker`] interprets a message according to a [`Schema`] node and
//! calls [`Visitor`] hooks at every point where a policy has to act: out-of-line
//! pointers, handles, vector/string counts, struct padding and envelopes. The
//! walker itself never touches memory directly; every read goes through
//! [`Visitor::load`], so the same traversal serves flat wire buffers and
//! in-memory object graphs alike.
//!
//! # Error protocol
//!
//! Hooks return [`Status`]. A [`Violation::Memory`] always ends the walk. A
//! [`Violation::Constraint`] ends it unless the visitor sets
//! [`Visitor::CONTINUE_AFTER_CONSTRAINT_VIOLATION`], in which case the
//! offending node is abandoned and traversal resumes with its next sibling.
//! Hooks report their own diagnostics through [`Visitor::on_error`]; checks
//! performed by the walker report through the same hook.

use crate::config::{
    ALLOC_ABSENT, ENVELOPE_SIZE, HANDLE_ABSENT, MAX_DEPTH, POINTER_SIZE, VECTOR_OWNERSHIP_MASK,
};
use crate::error::{Status, Violation};
use crate::handle::{ObjectType, Rights};
use crate::position::{checked_mul, Advance, Scalar};
use crate::schema::{
    ArrayDescriptor, BitsDescriptor, EnumDescriptor, HandleDescriptor, PrimitiveKind, Schema,
    Strictness, StringDescriptor, StructDescriptor, StructPointerDescriptor, TableDescriptor,
    TypeDescriptor, TypeId, UnionDescriptor, VectorDescriptor,
};

/// Outcome of a traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkResult {
    /// The walk reached the end (possibly after recoverable violations).
    Continue,
    /// The walk stopped early.
    Exit,
}

/// What an out-of-line pointer refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointeeKind {
    VectorOrString,
    Other,
}

/// Inline envelope header: `num_bytes: u32`, `num_handles: u32`, presence `u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Envelope {
    pub num_bytes: u32,
    pub num_handles: u32,
    pub presence: u64,
}

impl Envelope {
    pub fn is_present(&self) -> bool {
        self.presence != ALLOC_ABSENT
    }

    /// No data, no bytes, no handles.
    pub fn is_empty(&self) -> bool {
        !self.is_present() && self.num_bytes == 0 && self.num_handles == 0
    }
}

/// Policy hooks driven by the [`Walker`].
///
/// Positions passed to pointer hooks always address the pointer (presence)
/// slot itself: the data word of a string/vector/table header, the
/// presence word of an envelope, or a struct pointer.
pub trait Visitor {
    type Position: Advance;

    /// Keep walking past recoverable violations to collect every diagnostic.
    const CONTINUE_AFTER_CONSTRAINT_VIOLATION: bool;

    /// Treat absent non-nullable strings, vectors and tables as empty.
    const ALLOW_NON_NULLABLE_COLLECTIONS_TO_BE_ABSENT: bool;

    /// Read a scalar, `None` when out of bounds.
    fn load<T: Scalar>(&self, position: Self::Position) -> Option<T>;

    fn on_error(&mut self, violation: Violation, message: &str);

    /// Resolve the `size`-byte object the pointer at `slot` refers to.
    fn visit_pointer(
        &mut self,
        slot: Self::Position,
        pointee: PointeeKind,
        size: u32,
    ) -> Result<Self::Position, Violation>;

    /// Validate or take the (present) handle at `slot`.
    fn visit_handle(&mut self, slot: Self::Position, rights: Rights, subtype: ObjectType) -> Status;

    fn visit_vector_or_string_count(&mut self, count_slot: Self::Position) -> Status;

    fn visit_internal_padding(&mut self, position: Self::Position, len: u32) -> Status;

    /// Called before the payload of every envelope; `payload` is `None` for
    /// unknown ordinals.
    fn enter_envelope(
        &mut self,
        position: Self::Position,
        envelope: &Envelope,
        payload: Option<TypeId>,
    ) -> Status;

    /// Called after every envelope whose [`enter_envelope`](Self::enter_envelope) succeeded.
    fn leave_envelope(&mut self, position: Self::Position, envelope: &Envelope) -> Status;
}

/// Stop the current node on a hook failure, yielding the hook's value otherwise.
macro_rules! guard {
    ($self:ident, $status:expr) => {
        match $status {
            Ok(value) => value,
            Err(violation) => return $self.stop(violation),
        }
    };
}

/// Return early when a nested walk exited.
macro_rules! propagate {
    ($result:expr) => {
        if let WalkResult::Exit = $result {
            return WalkResult::Exit;
        }
    };
}

macro_rules! load {
    ($self:ident, $ty:ty, $position:expr) => {
        match $self.visitor.load::<$ty>($position) {
            Some(value) => value,
            None => return $self.bail(Violation::Memory, "read outside message bounds"),
        }
    };
}

macro_rules! advance {
    ($self:ident, $position:expr, $delta:expr) => {
        match $position.advance($delta) {
            Some(position) => position,
            None => return $self.bail(Violation::Memory, "position overflows 32 bits"),
        }
    };
}

/// Depth-first traversal over one message.
pub struct Walker<'a, V: Visitor> {
    schema: &'a Schema,
    visitor: &'a mut V,
    depth: u32,
    max_depth: u32,
}

impl<'a, V: Visitor> Walker<'a, V> {
    pub fn new(schema: &'a Schema, visitor: &'a mut V) -> Self {
        Self {
            schema,
            visitor,
            depth: 0,
            max_depth: MAX_DEPTH,
        }
    }

    /// Limit the number of nested out-of-line descents.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Walk the node `ty` stored at `position`.
    pub fn walk(&mut self, ty: TypeId, position: V::Position) -> WalkResult {
        let schema = self.schema;
        let Some(descriptor) = schema.get(ty) else {
            return self.bail(Violation::Memory, "unknown type descriptor");
        };
        match descriptor {
            TypeDescriptor::Primitive(_) => WalkResult::Continue,
            TypeDescriptor::Enum(d) => self.walk_enum(d, position),
            TypeDescriptor::Bits(d) => self.walk_bits(d, position),
            TypeDescriptor::Struct(d) => self.walk_struct(d, position),
            TypeDescriptor::StructPointer(d) => self.walk_struct_pointer(d, position),
            TypeDescriptor::Table(d) => self.walk_table(d, position),
            TypeDescriptor::Union(d) => self.walk_union(d, position),
            TypeDescriptor::Array(d) => self.walk_array(d, position),
            TypeDescriptor::String(d) => self.walk_string(d, position),
            TypeDescriptor::Vector(d) => self.walk_vector(d, position),
            TypeDescriptor::Handle(d) => self.walk_handle(d, position),
        }
    }

    fn stop(&self, violation: Violation) -> WalkResult {
        match violation {
            Violation::Constraint if V::CONTINUE_AFTER_CONSTRAINT_VIOLATION => WalkResult::Continue,
            _ => WalkResult::Exit,
        }
    }

    fn bail(&mut self, violation: Violation, message: &str) -> WalkResult {
        self.visitor.on_error(violation, message);
        self.stop(violation)
    }

    /// Run `body` one out-of-line level deeper.
    fn nested(&mut self, body: impl FnOnce(&mut Self) -> WalkResult) -> WalkResult {
        if self.depth >= self.max_depth {
            return self.bail(Violation::Constraint, "recursion depth exceeded");
        }
        self.depth += 1;
        let result = body(self);
        self.depth -= 1;
        result
    }

    fn descend(&mut self, ty: TypeId, position: V::Position) -> WalkResult {
        self.nested(|walker| walker.walk(ty, position))
    }

    fn read_integer(&mut self, kind: PrimitiveKind, position: V::Position) -> Result<u64, WalkResult> {
        let value = match kind {
            PrimitiveKind::U8 => self.visitor.load::<u8>(position).map(u64::from),
            PrimitiveKind::U16 => self.visitor.load::<u16>(position).map(u64::from),
            PrimitiveKind::U32 => self.visitor.load::<u32>(position).map(u64::from),
            PrimitiveKind::U64 => self.visitor.load::<u64>(position),
            // Sign-extended so negative members compare as in the descriptor.
            PrimitiveKind::I8 => self.visitor.load::<i8>(position).map(|v| i64::from(v) as u64),
            PrimitiveKind::I16 => self.visitor.load::<i16>(position).map(|v| i64::from(v) as u64),
            PrimitiveKind::I32 => self.visitor.load::<i32>(position).map(|v| i64::from(v) as u64),
            PrimitiveKind::I64 => self.visitor.load::<i64>(position).map(|v| v as u64),
            PrimitiveKind::Bool | PrimitiveKind::F32 | PrimitiveKind::F64 => {
                return Err(self.bail(Violation::Constraint, "underlying type is not an integer"));
            }
        };
        value.ok_or_else(|| self.bail(Violation::Memory, "read outside message bounds"))
    }

    fn read_envelope(&mut self, position: V::Position) -> Result<Envelope, WalkResult> {
        let fields = position.advance(4).zip(position.advance(8));
        let read = fields.and_then(|(handles_at, presence_at)| {
            Some(Envelope {
                num_bytes: self.visitor.load::<u32>(position)?,
                num_handles: self.visitor.load::<u32>(handles_at)?,
                presence: self.visitor.load::<u64>(presence_at)?,
            })
        });
        read.ok_or_else(|| self.bail(Violation::Memory, "read outside message bounds"))
    }

    fn walk_enum(&mut self, descriptor: &EnumDescriptor, position: V::Position) -> WalkResult {
        let value = match self.read_integer(descriptor.underlying, position) {
            Ok(value) => value,
            Err(result) => return result,
        };
        if !descriptor.contains(value) {
            return self.bail(Violation::Constraint, "not a valid enum member");
        }
        WalkResult::Continue
    }

    fn walk_bits(&mut self, descriptor: &BitsDescriptor, position: V::Position) -> WalkResult {
        let value = match self.read_integer(descriptor.underlying, position) {
            Ok(value) => value,
            Err(result) => return result,
        };
        if value & !descriptor.mask != 0 {
            return self.bail(Violation::Constraint, "not a valid bits member");
        }
        WalkResult::Continue
    }

    fn walk_struct(&mut self, descriptor: &StructDescriptor, position: V::Position) -> WalkResult {
        for field in &descriptor.fields {
            let field_position = advance!(self, position, field.offset);
            if field.padding > 0 {
                let padding_position = match field.payload {
                    Some(payload) => advance!(self, field_position, self.schema.type_size(payload)),
                    None => field_position,
                };
                guard!(
                    self,
                    self.visitor
                        .visit_internal_padding(padding_position, u32::from(field.padding))
                );
            }
            if let Some(payload) = field.payload {
                propagate!(self.walk(payload, field_position));
            }
        }
        WalkResult::Continue
    }

    fn walk_struct_pointer(
        &mut self,
        descriptor: &StructPointerDescriptor,
        position: V::Position,
    ) -> WalkResult {
        if load!(self, u64, position) == ALLOC_ABSENT {
            return WalkResult::Continue;
        }
        let schema = self.schema;
        let Some(target) = schema.struct_descriptor(descriptor.struct_type) else {
            return self.bail(Violation::Memory, "struct pointer does not target a struct");
        };
        let object = guard!(
            self,
            self.visitor.visit_pointer(position, PointeeKind::Other, target.size)
        );
        self.nested(|walker| walker.walk_struct(target, object))
    }

    fn walk_table(&mut self, descriptor: &TableDescriptor, position: V::Position) -> WalkResult {
        let count = load!(self, u64, position);
        let data_slot = advance!(self, position, POINTER_SIZE);
        if load!(self, u64, data_slot) == ALLOC_ABSENT {
            if !V::ALLOW_NON_NULLABLE_COLLECTIONS_TO_BE_ABSENT {
                return self.bail(Violation::Constraint, "table data cannot be absent");
            }
            if count != 0 {
                return self.bail(
                    Violation::Constraint,
                    "table envelope vector data absent but non-zero count",
                );
            }
        }
        let count = match u32::try_from(count) {
            Ok(count) => count,
            Err(_) => return self.bail(Violation::Memory, "integer overflow calculating table size"),
        };
        let Some(size) = checked_mul(count, ENVELOPE_SIZE) else {
            return self.bail(Violation::Memory, "integer overflow calculating table size");
        };
        let envelopes = guard!(
            self,
            self.visitor.visit_pointer(data_slot, PointeeKind::Other, size)
        );

        let mut known = descriptor.fields.iter().peekable();
        for index in 0..count {
            let ordinal = index + 1;
            // index * ENVELOPE_SIZE < size, which fits in 32 bits.
            let envelope_position = advance!(self, envelopes, index * ENVELOPE_SIZE);
            let payload = known.next_if(|field| field.ordinal == ordinal).map(|field| field.payload);

            let envelope = match self.read_envelope(envelope_position) {
                Ok(envelope) => envelope,
                Err(result) => return result,
            };
            if payload.is_none()
                && envelope.is_present()
                && descriptor.strictness == Strictness::Strict
            {
                return self.bail(Violation::Constraint, "strict table has unknown ordinal");
            }
            guard!(
                self,
                self.visitor.enter_envelope(envelope_position, &envelope, payload)
            );
            if envelope.is_present() {
                propagate!(self.walk_envelope_payload(envelope_position, &envelope, payload));
            }
            guard!(self, self.visitor.leave_envelope(envelope_position, &envelope));
        }
        WalkResult::Continue
    }

    fn walk_union(&mut self, descriptor: &UnionDescriptor, position: V::Position) -> WalkResult {
        let tag = load!(self, u64, position);
        let envelope_position = advance!(self, position, POINTER_SIZE);
        let envelope = match self.read_envelope(envelope_position) {
            Ok(envelope) => envelope,
            Err(result) => return result,
        };

        if tag == 0 {
            if !envelope.is_empty() {
                return self.bail(Violation::Constraint, "union with zero as ordinal must be empty");
            }
            if !descriptor.nullable {
                return self.bail(Violation::Constraint, "non-nullable union is absent");
            }
            return WalkResult::Continue;
        }

        let payload = descriptor.variant_for(tag).map(|field| field.payload);
        if payload.is_none() && descriptor.strictness == Strictness::Strict {
            return self.bail(Violation::Constraint, "strict union has unknown ordinal");
        }

        guard!(
            self,
            self.visitor.enter_envelope(envelope_position, &envelope, payload)
        );
        if envelope.is_present() {
            propagate!(self.walk_envelope_payload(envelope_position, &envelope, payload));
        } else {
            propagate!(self.bail(Violation::Constraint, "empty union must have zero as ordinal"));
        }
        guard!(self, self.visitor.leave_envelope(envelope_position, &envelope));
        WalkResult::Continue
    }

    /// Resolve a present envelope's data and walk it when its type is known.
    fn walk_envelope_payload(
        &mut self,
        envelope_position: V::Position,
        envelope: &Envelope,
        payload: Option<TypeId>,
    ) -> WalkResult {
        let data_slot = advance!(self, envelope_position, POINTER_SIZE);
        let size = match payload {
            Some(payload) => self.schema.type_size(payload),
            None => envelope.num_bytes,
        };
        let object = guard!(
            self,
            self.visitor.visit_pointer(data_slot, PointeeKind::Other, size)
        );
        match payload {
            Some(payload) if !self.schema.is_primitive(payload) => self.descend(payload, object),
            _ => WalkResult::Continue,
        }
    }

    fn walk_array(&mut self, descriptor: &ArrayDescriptor, position: V::Position) -> WalkResult {
        let Some(element) = descriptor.element else {
            return WalkResult::Continue;
        };
        for index in 0..descriptor.count {
            let Some(delta) = checked_mul(index, descriptor.element_size) else {
                return self.bail(Violation::Memory, "integer overflow calculating array offset");
            };
            let element_position = advance!(self, position, delta);
            propagate!(self.walk(element, element_position));
        }
        WalkResult::Continue
    }

    fn walk_string(&mut self, descriptor: &StringDescriptor, position: V::Position) -> WalkResult {
        let size = load!(self, u64, position) & !VECTOR_OWNERSHIP_MASK;
        guard!(self, self.visitor.visit_vector_or_string_count(position));
        let data_slot = advance!(self, position, POINTER_SIZE);

        if load!(self, u64, data_slot) == ALLOC_ABSENT {
            if !descriptor.nullable && !V::ALLOW_NON_NULLABLE_COLLECTIONS_TO_BE_ABSENT {
                return self.bail(Violation::Constraint, "non-nullable string is absent");
            }
            if size != 0 {
                return self.bail(Violation::Constraint, "string is absent but length is not zero");
            }
            if descriptor.nullable || !V::ALLOW_NON_NULLABLE_COLLECTIONS_TO_BE_ABSENT {
                return WalkResult::Continue;
            }
        }

        let Ok(size) = u32::try_from(size) else {
            return self.bail(Violation::Memory, "string size overflows 32 bits");
        };
        if size > descriptor.max_size {
            return self.bail(Violation::Constraint, "bounded string too large");
        }
        guard!(
            self,
            self.visitor
                .visit_pointer(data_slot, PointeeKind::VectorOrString, size)
        );
        WalkResult::Continue
    }

    fn walk_vector(&mut self, descriptor: &VectorDescriptor, position: V::Position) -> WalkResult {
        let count = load!(self, u64, position) & !VECTOR_OWNERSHIP_MASK;
        guard!(self, self.visitor.visit_vector_or_string_count(position));
        let data_slot = advance!(self, position, POINTER_SIZE);

        if load!(self, u64, data_slot) == ALLOC_ABSENT {
            if !descriptor.nullable && !V::ALLOW_NON_NULLABLE_COLLECTIONS_TO_BE_ABSENT {
                return self.bail(Violation::Constraint, "non-nullable vector is absent");
            }
            if count != 0 {
                return self.bail(Violation::Constraint, "absent vector of non-zero elements");
            }
            if descriptor.nullable || !V::ALLOW_NON_NULLABLE_COLLECTIONS_TO_BE_ABSENT {
                return WalkResult::Continue;
            }
        }

        if count > u64::from(descriptor.max_count) {
            return self.bail(Violation::Constraint, "bounded vector too large");
        }
        // count <= max_count, so it fits in 32 bits.
        let count = count as u32;
        let Some(size) = checked_mul(count, descriptor.element_size) else {
            return self.bail(Violation::Memory, "integer overflow calculating vector size");
        };
        let body = guard!(
            self,
            self.visitor
                .visit_pointer(data_slot, PointeeKind::VectorOrString, size)
        );
        let Some(element) = descriptor.element else {
            return WalkResult::Continue;
        };
        let stride = descriptor.element_size;
        self.nested(|walker| {
            for index in 0..count {
                let element_position = advance!(walker, body, index * stride);
                propagate!(walker.walk(element, element_position));
            }
            WalkResult::Continue
        })
    }

    fn walk_handle(&mut self, descriptor: &HandleDescriptor, position: V::Position) -> WalkResult {
        if load!(self, u32, position) == HANDLE_ABSENT {
            if !descriptor.nullable {
                return self.bail(Violation::Constraint, "message is missing a non-nullable handle");
            }
            return WalkResult::Continue;
        }
        guard!(
            self,
            self.visitor
                .visit_handle(position, descriptor.rights, descriptor.subtype)
        );
        WalkResult::Continue
    }
}

/// Walk `ty` at `position` with `visitor`, descending at most `max_depth`
/// out-of-line levels.
pub fn walk<V: Visitor>(
    schema: &Schema,
    visitor: &mut V,
    ty: TypeId,
    position: V::Position,
    max_depth: u32,
) -> WalkResult {
    Walker::new(schema, visitor)
        .with_max_depth(max_depth)
        .walk(ty, position)
}
