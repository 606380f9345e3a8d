// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type descriptors: the wire layout of every node in a schema.

use crate::handle::{ObjectType, Rights};
use std::fmt;
use std::sync::Arc;

/// Index of a descriptor node inside its [`Schema`](super::Schema).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Primitive kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl PrimitiveKind {
    /// Inline size in bytes.
    pub fn size(&self) -> u32 {
        match self {
            Self::Bool | Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    pub fn is_integer(&self) -> bool {
        !matches!(self, Self::Bool | Self::F32 | Self::F64)
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(self, Self::U8 | Self::U16 | Self::U32 | Self::U64)
    }
}

/// Whether unknown ordinals are rejected or tolerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strictness {
    Strict,
    Flexible,
}

/// Membership test for enum values (signed values arrive sign-extended).
#[derive(Clone)]
pub struct MemberPredicate(Arc<dyn Fn(u64) -> bool + Send + Sync>);

impl MemberPredicate {
    pub fn new(predicate: impl Fn(u64) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(predicate))
    }

    pub fn contains(&self, value: u64) -> bool {
        (self.0)(value)
    }
}

impl fmt::Debug for MemberPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MemberPredicate(..)")
    }
}

/// Enumeration.
#[derive(Debug, Clone)]
pub struct EnumDescriptor {
    pub name: String,
    pub underlying: PrimitiveKind,
    pub members: MemberPredicate,
}

impl EnumDescriptor {
    /// Enum with a closed member list. Negative members of signed enums are
    /// given sign-extended, e.g. `(-1i64) as u64`.
    pub fn with_members(name: impl Into<String>, underlying: PrimitiveKind, members: &[u64]) -> Self {
        let members = members.to_vec();
        Self::with_predicate(name, underlying, move |value| members.contains(&value))
    }

    pub fn with_predicate(
        name: impl Into<String>,
        underlying: PrimitiveKind,
        predicate: impl Fn(u64) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            underlying,
            members: MemberPredicate::new(predicate),
        }
    }

    pub fn contains(&self, value: u64) -> bool {
        self.members.contains(value)
    }
}

/// Bit set over an unsigned integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitsDescriptor {
    pub name: String,
    pub underlying: PrimitiveKind,
    pub mask: u64,
}

impl BitsDescriptor {
    pub fn new(name: impl Into<String>, underlying: PrimitiveKind, mask: u64) -> Self {
        Self {
            name: name.into(),
            underlying,
            mask,
        }
    }
}

/// Struct member.
///
/// With a payload, `offset` is the member's offset and its trailing padding
/// starts right after the payload. Without one, the member has nothing to
/// visit and `offset` is where the padding starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructField {
    pub offset: u32,
    pub payload: Option<TypeId>,
    pub padding: u8,
}

impl StructField {
    pub fn new(offset: u32, payload: TypeId) -> Self {
        Self {
            offset,
            payload: Some(payload),
            padding: 0,
        }
    }

    /// Padding-only entry starting at `offset`.
    pub fn padding(offset: u32, padding: u8) -> Self {
        Self {
            offset,
            payload: None,
            padding,
        }
    }

    #[must_use]
    pub fn with_padding(mut self, padding: u8) -> Self {
        self.padding = padding;
        self
    }
}

/// Fixed inline layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDescriptor {
    pub name: String,
    pub size: u32,
    pub fields: Vec<StructField>,
}

impl StructDescriptor {
    pub fn new(name: impl Into<String>, size: u32) -> Self {
        Self {
            name: name.into(),
            size,
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, field: StructField) -> Self {
        self.fields.push(field);
        self
    }
}

/// Indirection to a struct stored out of line.
///
/// Struct pointers are always nullable: an absent pointer is accepted
/// whatever the target, which is what lets a struct refer to itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructPointerDescriptor {
    pub struct_type: TypeId,
}

/// Table member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableField {
    pub ordinal: u32,
    pub payload: TypeId,
}

/// Table: one envelope per ordinal, fields sorted by ordinal.
///
/// Tables are flexible unless made [`strict`](Self::strict): a strict table
/// rejects a present envelope whose ordinal has no declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub name: String,
    pub fields: Vec<TableField>,
    pub strictness: Strictness,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            strictness: Strictness::Flexible,
        }
    }

    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strictness = Strictness::Strict;
        self
    }

    #[must_use]
    pub fn field(mut self, ordinal: u32, payload: TypeId) -> Self {
        self.fields.push(TableField { ordinal, payload });
        self
    }
}

/// Union variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnionField {
    pub ordinal: u32,
    pub payload: TypeId,
}

/// Extensible union: a tag followed by one envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionDescriptor {
    pub name: String,
    pub fields: Vec<UnionField>,
    pub nullable: bool,
    pub strictness: Strictness,
}

impl UnionDescriptor {
    pub fn new(name: impl Into<String>, strictness: Strictness) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            nullable: false,
            strictness,
        }
    }

    #[must_use]
    pub fn variant(mut self, ordinal: u32, payload: TypeId) -> Self {
        self.fields.push(UnionField { ordinal, payload });
        self
    }

    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn variant_for(&self, tag: u64) -> Option<&UnionField> {
        self.fields.iter().find(|f| u64::from(f.ordinal) == tag)
    }
}

/// Fixed-count inline array. `element` is `None` when elements carry
/// nothing to visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayDescriptor {
    pub element: Option<TypeId>,
    pub element_size: u32,
    pub count: u32,
}

impl ArrayDescriptor {
    pub fn new(element: Option<TypeId>, element_size: u32, count: u32) -> Self {
        Self {
            element,
            element_size,
            count,
        }
    }

    /// Inline size, `None` when it does not fit in 32 bits.
    pub fn array_size(&self) -> Option<u32> {
        self.element_size.checked_mul(self.count)
    }
}

/// UTF-8 bytes stored out of line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringDescriptor {
    pub max_size: u32,
    pub nullable: bool,
}

impl StringDescriptor {
    pub fn unbounded() -> Self {
        Self::bounded(u32::MAX)
    }

    pub fn bounded(max_size: u32) -> Self {
        Self {
            max_size,
            nullable: false,
        }
    }

    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// Variable-count elements stored out of line. `element` is `None` when
/// elements carry nothing to visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorDescriptor {
    pub element: Option<TypeId>,
    pub max_count: u32,
    pub element_size: u32,
    pub nullable: bool,
}

impl VectorDescriptor {
    pub fn unbounded(element: Option<TypeId>, element_size: u32) -> Self {
        Self::bounded(element, element_size, u32::MAX)
    }

    pub fn bounded(element: Option<TypeId>, element_size: u32, max_count: u32) -> Self {
        Self {
            element,
            max_count,
            element_size,
            nullable: false,
        }
    }

    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// Handle slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleDescriptor {
    pub subtype: ObjectType,
    pub rights: Rights,
    pub nullable: bool,
}

impl HandleDescriptor {
    pub fn new(subtype: ObjectType, rights: Rights) -> Self {
        Self {
            subtype,
            rights,
            nullable: false,
        }
    }

    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// A schema node.
#[derive(Debug, Clone)]
pub enum TypeDescriptor {
    Primitive(PrimitiveKind),
    Enum(EnumDescriptor),
    Bits(BitsDescriptor),
    Struct(StructDescriptor),
    StructPointer(StructPointerDescriptor),
    Table(TableDescriptor),
    Union(UnionDescriptor),
    Array(ArrayDescriptor),
    String(StringDescriptor),
    Vector(VectorDescriptor),
    Handle(HandleDescriptor),
}

impl TypeDescriptor {
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Enum(d) => Some(&d.name),
            Self::Bits(d) => Some(&d.name),
            Self::Struct(d) => Some(&d.name),
            Self::Table(d) => Some(&d.name),
            Self::Union(d) => Some(&d.name),
            _ => None,
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Primitive(_))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Primitive(_) => "primitive",
            Self::Enum(_) => "enum",
            Self::Bits(_) => "bits",
            Self::Struct(_) => "struct",
            Self::StructPointer(_) => "struct pointer",
            Self::Table(_) => "table",
            Self::Union(_) => "union",
            Self::Array(_) => "array",
            Self::String(_) => "string",
            Self::Vector(_) => "vector",
            Self::Handle(_) => "handle",
        }
    }

    /// Descriptors this node refers to, paired with whether the reference
    /// goes through a struct-pointer indirection.
    pub(crate) fn references(&self) -> Vec<(TypeId, bool)> {
        match self {
            Self::Struct(d) => d.fields.iter().filter_map(|f| f.payload).map(|t| (t, false)).collect(),
            Self::StructPointer(d) => vec![(d.struct_type, true)],
            Self::Table(d) => d.fields.iter().map(|f| (f.payload, false)).collect(),
            Self::Union(d) => d.fields.iter().map(|f| (f.payload, false)).collect(),
            Self::Array(d) => d.element.map(|t| (t, false)).into_iter().collect(),
            Self::Vector(d) => d.element.map(|t| (t, false)).into_iter().collect(),
            Self::Primitive(_) | Self::Enum(_) | Self::Bits(_) | Self::String(_) | Self::Handle(_) => {
                Vec::new()
            }
        }
    }
}

macro_rules! impl_from_descriptor {
    ($($variant:ident($type:ty)),* $(,)?) => {
        $(
            impl From<$type> for TypeDescriptor {
                fn from(descriptor: $type) -> Self {
                    TypeDescriptor::$variant(descriptor)
                }
            }
        )*
    };
}

impl_from_descriptor!(
    Primitive(PrimitiveKind),
    Enum(EnumDescriptor),
    Bits(BitsDescriptor),
    Struct(StructDescriptor),
    StructPointer(StructPointerDescriptor),
    Table(TableDescriptor),
    Union(UnionDescriptor),
    Array(ArrayDescriptor),
    String(StringDescriptor),
    Vector(VectorDescriptor),
    Handle(HandleDescriptor),
);
