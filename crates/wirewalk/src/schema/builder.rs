// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Builder for [`Schema`] arenas.

use super::descriptor::{PrimitiveKind, TypeDescriptor, TypeId};
use super::{inline_size, Schema};
use std::collections::HashMap;
use thiserror::Error;

/// Descriptor-tree construction failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("type {0} was declared but never defined")]
    Undefined(TypeId),

    #[error("type {0} was not declared by this builder")]
    NotDeclared(TypeId),

    #[error("type {0} is already defined")]
    AlreadyDefined(TypeId),

    #[error("type {from} refers to unknown type {to}")]
    UnknownReference { from: TypeId, to: TypeId },

    #[error("struct pointer {from} targets {to}, which is not a struct")]
    NotAStruct { from: TypeId, to: TypeId },

    #[error("struct {name}: field at offset {offset} does not fit in {size} bytes")]
    FieldOutOfBounds { name: String, offset: u32, size: u32 },

    #[error("table {name}: ordinal {ordinal} is zero or out of order")]
    TableOrdinal { name: String, ordinal: u32 },

    #[error("union {name}: ordinal {ordinal} is zero or duplicated")]
    UnionOrdinal { name: String, ordinal: u32 },

    #[error("array {0}: element size does not match the array layout")]
    ArrayLayout(TypeId),

    #[error("vector {0}: element size does not match the element type")]
    VectorLayout(TypeId),

    #[error("{name}: {kind:?} is not a valid underlying type")]
    Underlying { name: String, kind: PrimitiveKind },

    #[error("type {0} contains itself without a struct pointer")]
    Cycle(TypeId),
}

/// Incrementally assembles descriptor nodes, then validates them into a
/// [`Schema`].
///
/// Recursive types reserve an id with [`declare`](Self::declare) and fill it
/// in later with [`define`](Self::define).
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    nodes: Vec<Option<TypeDescriptor>>,
    primitives: HashMap<PrimitiveKind, TypeId>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the primitive node for `kind`, created on first use.
    pub fn primitive(&mut self, kind: PrimitiveKind) -> TypeId {
        if let Some(id) = self.primitives.get(&kind) {
            return *id;
        }
        let id = self.add(kind);
        self.primitives.insert(kind, id);
        id
    }

    pub fn add(&mut self, descriptor: impl Into<TypeDescriptor>) -> TypeId {
        let id = self.next_id();
        self.nodes.push(Some(descriptor.into()));
        id
    }

    /// Reserve an id to be defined later.
    pub fn declare(&mut self) -> TypeId {
        let id = self.next_id();
        self.nodes.push(None);
        id
    }

    pub fn define(&mut self, id: TypeId, descriptor: impl Into<TypeDescriptor>) -> Result<(), SchemaError> {
        match self.nodes.get_mut(id.index()) {
            None => Err(SchemaError::NotDeclared(id)),
            Some(Some(_)) => Err(SchemaError::AlreadyDefined(id)),
            Some(slot) => {
                *slot = Some(descriptor.into());
                Ok(())
            }
        }
    }

    /// Validate every node and freeze the arena.
    pub fn build(self) -> Result<Schema, SchemaError> {
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for (index, node) in self.nodes.into_iter().enumerate() {
            match node {
                Some(descriptor) => nodes.push(descriptor),
                None => return Err(SchemaError::Undefined(TypeId(index as u32))),
            }
        }

        for (index, descriptor) in nodes.iter().enumerate() {
            check_node(&nodes, TypeId(index as u32), descriptor)?;
        }
        check_cycles(&nodes)?;

        log::debug!("[schema] built {} type descriptors", nodes.len());
        Ok(Schema::from_nodes(nodes))
    }

    fn next_id(&self) -> TypeId {
        TypeId(self.nodes.len() as u32)
    }
}

fn check_node(nodes: &[TypeDescriptor], id: TypeId, descriptor: &TypeDescriptor) -> Result<(), SchemaError> {
    for (target, _) in descriptor.references() {
        if target.index() >= nodes.len() {
            return Err(SchemaError::UnknownReference { from: id, to: target });
        }
    }
    let size_of = |target: TypeId| inline_size(&nodes[target.index()]);

    match descriptor {
        TypeDescriptor::Primitive(_) | TypeDescriptor::String(_) | TypeDescriptor::Handle(_) => {}
        TypeDescriptor::Enum(d) => {
            if !d.underlying.is_integer() {
                return Err(SchemaError::Underlying {
                    name: d.name.clone(),
                    kind: d.underlying,
                });
            }
        }
        TypeDescriptor::Bits(d) => {
            if !d.underlying.is_unsigned() {
                return Err(SchemaError::Underlying {
                    name: d.name.clone(),
                    kind: d.underlying,
                });
            }
        }
        TypeDescriptor::Struct(d) => {
            for field in &d.fields {
                let payload = field.payload.map(size_of).unwrap_or(0);
                let end = field
                    .offset
                    .checked_add(payload)
                    .and_then(|end| end.checked_add(u32::from(field.padding)));
                if !matches!(end, Some(end) if end <= d.size) {
                    return Err(SchemaError::FieldOutOfBounds {
                        name: d.name.clone(),
                        offset: field.offset,
                        size: d.size,
                    });
                }
            }
        }
        TypeDescriptor::StructPointer(d) => {
            if !matches!(nodes[d.struct_type.index()], TypeDescriptor::Struct(_)) {
                return Err(SchemaError::NotAStruct {
                    from: id,
                    to: d.struct_type,
                });
            }
        }
        TypeDescriptor::Table(d) => {
            let mut previous = 0;
            for field in &d.fields {
                if field.ordinal <= previous {
                    return Err(SchemaError::TableOrdinal {
                        name: d.name.clone(),
                        ordinal: field.ordinal,
                    });
                }
                previous = field.ordinal;
            }
        }
        TypeDescriptor::Union(d) => {
            for (position, field) in d.fields.iter().enumerate() {
                let duplicate = d.fields[..position].iter().any(|f| f.ordinal == field.ordinal);
                if field.ordinal == 0 || duplicate {
                    return Err(SchemaError::UnionOrdinal {
                        name: d.name.clone(),
                        ordinal: field.ordinal,
                    });
                }
            }
        }
        TypeDescriptor::Array(d) => {
            let covers = d.element.map_or(true, |element| size_of(element) <= d.element_size);
            if d.element_size == 0 || d.array_size().is_none() || !covers {
                return Err(SchemaError::ArrayLayout(id));
            }
        }
        TypeDescriptor::Vector(d) => {
            let matches = d.element.map_or(true, |element| size_of(element) == d.element_size);
            if d.element_size == 0 || !matches {
                return Err(SchemaError::VectorLayout(id));
            }
        }
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Reject any cycle made only of inline (non-pointer) edges.
fn check_cycles(nodes: &[TypeDescriptor]) -> Result<(), SchemaError> {
    let mut marks = vec![Mark::Unvisited; nodes.len()];
    for root in 0..nodes.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        // (node, next reference to explore)
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        marks[root] = Mark::InProgress;
        while let Some(frame) = stack.last_mut() {
            let (node, cursor) = *frame;
            let edges = nodes[node].references();
            match edges.get(cursor) {
                None => {
                    marks[node] = Mark::Done;
                    stack.pop();
                }
                Some(&(target, via_pointer)) => {
                    frame.1 += 1;
                    if via_pointer {
                        continue;
                    }
                    match marks[target.index()] {
                        Mark::InProgress => return Err(SchemaError::Cycle(target)),
                        Mark::Done => {}
                        Mark::Unvisited => {
                            marks[target.index()] = Mark::InProgress;
                            stack.push((target.index(), 0));
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        ArrayDescriptor, BitsDescriptor, EnumDescriptor, StructDescriptor, StructField,
        StructPointerDescriptor, TableDescriptor, UnionDescriptor, Strictness, VectorDescriptor,
    };

    #[test]
    fn test_primitive_is_deduplicated() {
        let mut builder = SchemaBuilder::new();
        let a = builder.primitive(PrimitiveKind::U32);
        let b = builder.primitive(PrimitiveKind::U32);
        let c = builder.primitive(PrimitiveKind::U8);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(builder.build().expect("valid").len(), 2);
    }

    #[test]
    fn test_recursive_struct_through_pointer() {
        let mut builder = SchemaBuilder::new();
        let u64_t = builder.primitive(PrimitiveKind::U64);
        let node = builder.declare();
        let next = builder.add(StructPointerDescriptor { struct_type: node });
        builder
            .define(
                node,
                StructDescriptor::new("Node", 16)
                    .field(StructField::new(0, u64_t))
                    .field(StructField::new(8, next)),
            )
            .expect("first definition");
        let schema = builder.build().expect("pointer breaks the cycle");
        assert_eq!(schema.type_size(node), 16);
        assert_eq!(schema.find("Node"), Some(node));
    }

    #[test]
    fn test_inline_cycle_rejected() {
        let mut builder = SchemaBuilder::new();
        let outer = builder.declare();
        let array = builder.add(ArrayDescriptor::new(Some(outer), 8, 1));
        builder
            .define(outer, StructDescriptor::new("Outer", 8).field(StructField::new(0, array)))
            .expect("defined once");
        assert!(matches!(builder.build(), Err(SchemaError::Cycle(_))));
    }

    #[test]
    fn test_undefined_and_redefined() {
        let mut builder = SchemaBuilder::new();
        let pending = builder.declare();
        assert!(matches!(builder.build(), Err(SchemaError::Undefined(id)) if id == pending));

        let mut builder = SchemaBuilder::new();
        let id = builder.primitive(PrimitiveKind::U8);
        assert_eq!(
            builder.define(id, PrimitiveKind::U16),
            Err(SchemaError::AlreadyDefined(id))
        );
        assert_eq!(
            builder.define(TypeId(9), PrimitiveKind::U16),
            Err(SchemaError::NotDeclared(TypeId(9)))
        );
    }

    #[test]
    fn test_layout_checks() {
        let mut builder = SchemaBuilder::new();
        let u32_t = builder.primitive(PrimitiveKind::U32);
        builder.add(StructDescriptor::new("Short", 4).field(StructField::new(2, u32_t)));
        assert!(matches!(builder.build(), Err(SchemaError::FieldOutOfBounds { .. })));

        let mut builder = SchemaBuilder::new();
        let u32_t = builder.primitive(PrimitiveKind::U32);
        builder.add(VectorDescriptor::unbounded(Some(u32_t), 8));
        assert!(matches!(builder.build(), Err(SchemaError::VectorLayout(_))));

        let mut builder = SchemaBuilder::new();
        builder.add(ArrayDescriptor::new(None, 0, 4));
        assert!(matches!(builder.build(), Err(SchemaError::ArrayLayout(_))));

        // 3 * 2^31 does not fit in 32 bits.
        let mut builder = SchemaBuilder::new();
        let u8_t = builder.primitive(PrimitiveKind::U8);
        builder.add(ArrayDescriptor::new(Some(u8_t), 3, 0x8000_0000));
        assert!(matches!(builder.build(), Err(SchemaError::ArrayLayout(_))));
    }

    #[test]
    fn test_ordinal_checks() {
        let mut builder = SchemaBuilder::new();
        let u8_t = builder.primitive(PrimitiveKind::U8);
        builder.add(TableDescriptor::new("T").field(2, u8_t).field(1, u8_t));
        assert!(matches!(
            builder.build(),
            Err(SchemaError::TableOrdinal { ordinal: 1, .. })
        ));

        let mut builder = SchemaBuilder::new();
        let u8_t = builder.primitive(PrimitiveKind::U8);
        builder.add(
            UnionDescriptor::new("U", Strictness::Strict)
                .variant(1, u8_t)
                .variant(1, u8_t),
        );
        assert!(matches!(
            builder.build(),
            Err(SchemaError::UnionOrdinal { ordinal: 1, .. })
        ));
    }

    #[test]
    fn test_underlying_checks() {
        let mut builder = SchemaBuilder::new();
        builder.add(BitsDescriptor::new("Flags", PrimitiveKind::I32, 0b11));
        assert!(matches!(builder.build(), Err(SchemaError::Underlying { .. })));

        let mut builder = SchemaBuilder::new();
        builder.add(EnumDescriptor::with_members("Ratio", PrimitiveKind::F32, &[1]));
        assert!(matches!(builder.build(), Err(SchemaError::Underlying { .. })));
    }

    #[test]
    fn test_pointer_must_target_struct() {
        let mut builder = SchemaBuilder::new();
        let u8_t = builder.primitive(PrimitiveKind::U8);
        builder.add(StructPointerDescriptor { struct_type: u8_t });
        assert!(matches!(builder.build(), Err(SchemaError::NotAStruct { .. })));
    }
}
