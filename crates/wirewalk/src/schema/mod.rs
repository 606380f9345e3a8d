// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type descriptor trees.
//!
//! A [`Schema`] is an immutable arena of [`TypeDescriptor`] nodes addressed
//! by [`TypeId`]. It is built once with a [`SchemaBuilder`] and may be shared
//! by any number of concurrent walks. Recursive types are only possible
//! through a struct pointer, which the walker follows after an explicit
//! presence check.
//!
//! # Example
//!
//! ```rust
//! use wirewalk::schema::{PrimitiveKind, SchemaBuilder, StructDescriptor, StructField};
//!
//! let mut builder = SchemaBuilder::new();
//! let u32_t = builder.primitive(PrimitiveKind::U32);
//! // struct { u8 x; 3 bytes padding; u32 y }
//! let point = builder.add(
//!     StructDescriptor::new("Point", 8)
//!         .field(StructField::padding(1, 3))
//!         .field(StructField::new(4, u32_t)),
//! );
//! let schema = builder.build().unwrap();
//! assert_eq!(schema.type_size(point), 8);
//! ```

mod builder;
mod descriptor;

pub use builder::{SchemaBuilder, SchemaError};
pub use descriptor::{
    ArrayDescriptor, BitsDescriptor, EnumDescriptor, HandleDescriptor, MemberPredicate,
    PrimitiveKind, Strictness, StringDescriptor, StructDescriptor, StructField,
    StructPointerDescriptor, TableDescriptor, TableField, TypeDescriptor, TypeId,
    UnionDescriptor, UnionField, VectorDescriptor,
};

use crate::config::{HANDLE_SIZE, POINTER_SIZE, TABLE_SIZE, UNION_SIZE, VECTOR_HEADER_SIZE};
use crate::error::{Error, Result};

/// Immutable, validated descriptor arena.
#[derive(Debug, Clone)]
pub struct Schema {
    nodes: Vec<TypeDescriptor>,
}

impl Schema {
    pub(crate) fn from_nodes(nodes: Vec<TypeDescriptor>) -> Self {
        Self { nodes }
    }

    pub fn get(&self, id: TypeId) -> Option<&TypeDescriptor> {
        self.nodes.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look a named node up (enums, bits, structs, tables, unions).
    pub fn find(&self, name: &str) -> Option<TypeId> {
        self.nodes
            .iter()
            .position(|node| node.name() == Some(name))
            .map(|index| TypeId(index as u32))
    }

    /// Inline size of a node; 0 for an id this schema does not hold.
    pub fn type_size(&self, id: TypeId) -> u32 {
        match self.get(id) {
            Some(descriptor) => inline_size(descriptor),
            None => 0,
        }
    }

    pub fn is_primitive(&self, id: TypeId) -> bool {
        self.get(id).is_some_and(TypeDescriptor::is_primitive)
    }

    pub fn struct_descriptor(&self, id: TypeId) -> Option<&StructDescriptor> {
        match self.get(id) {
            Some(TypeDescriptor::Struct(descriptor)) => Some(descriptor),
            _ => None,
        }
    }

    /// Size of the primary object of a message of type `id`.
    ///
    /// The primary object must be a struct or a table.
    pub fn primary_object_size(&self, id: TypeId) -> Result<u32> {
        match self.get(id) {
            Some(TypeDescriptor::Struct(descriptor)) => Ok(descriptor.size),
            Some(TypeDescriptor::Table(_)) => Ok(TABLE_SIZE),
            Some(other) => Err(Error::PrimaryObject(format!(
                "primary object must be a struct or table, found {}",
                other.kind_name()
            ))),
            None => Err(Error::PrimaryObject(format!("unknown type {}", id))),
        }
    }
}

pub(crate) fn inline_size(descriptor: &TypeDescriptor) -> u32 {
    match descriptor {
        TypeDescriptor::Primitive(kind) => kind.size(),
        TypeDescriptor::Enum(d) => d.underlying.size(),
        TypeDescriptor::Bits(d) => d.underlying.size(),
        TypeDescriptor::Struct(d) => d.size,
        TypeDescriptor::StructPointer(_) => POINTER_SIZE,
        TypeDescriptor::Table(_) => TABLE_SIZE,
        TypeDescriptor::Union(_) => UNION_SIZE,
        // Checked when the schema is built.
        TypeDescriptor::Array(d) => d.array_size().unwrap_or(0),
        TypeDescriptor::String(_) | TypeDescriptor::Vector(_) => VECTOR_HEADER_SIZE,
        TypeDescriptor::Handle(_) => HANDLE_SIZE,
    }
}

#[cfg(test)]
mod tests;
