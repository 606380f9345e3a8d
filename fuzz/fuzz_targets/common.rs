// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema shared by the fuzz targets: one primary struct reaching every
//! descriptor kind.

use wirewalk::schema::{
    ArrayDescriptor, BitsDescriptor, EnumDescriptor, HandleDescriptor, PrimitiveKind,
    SchemaBuilder, Strictness, StringDescriptor, StructDescriptor, StructField,
    StructPointerDescriptor, TableDescriptor, UnionDescriptor, VectorDescriptor,
};
use wirewalk::{ObjectType, Rights, Schema, TypeId};

/// ```text
/// struct Fuzz {            // 112 bytes
///     kind: Kind,          // u16 enum, 6 bytes padding
///     flags: Flags,        // u32 bits, 4 bytes padding
///     name: string:64?,
///     items: vector<Item>:16,
///     shape: Shape,        // flexible union
///     extra: Extra,        // table
///     next: Fuzz?,         // struct pointer
///     event: handle<EVENT>?,
///     triple: array<u8, 3>,
/// }
/// ```
pub fn fuzz_schema() -> (Schema, TypeId) {
    let mut builder = SchemaBuilder::new();
    let u8_t = builder.primitive(PrimitiveKind::U8);
    let u32_t = builder.primitive(PrimitiveKind::U32);
    let u64_t = builder.primitive(PrimitiveKind::U64);
    let kind = builder.add(EnumDescriptor::with_members("Kind", PrimitiveKind::U16, &[1, 2, 3]));
    let flags = builder.add(BitsDescriptor::new("Flags", PrimitiveKind::U32, 0b1011));
    let name = builder.add(StringDescriptor::bounded(64).nullable());
    let event = builder.add(HandleDescriptor::new(ObjectType::EVENT, Rights::WAIT).nullable());
    let item = builder.add(
        StructDescriptor::new("Item", 8)
            .field(StructField::new(0, u32_t))
            .field(StructField::new(4, event)),
    );
    let items = builder.add(VectorDescriptor::bounded(Some(item), 8, 16));
    let label = builder.add(StringDescriptor::unbounded());
    let shape = builder.add(
        UnionDescriptor::new("Shape", Strictness::Flexible)
            .variant(1, u64_t)
            .variant(2, label)
            .variant(3, item),
    );
    let extra = builder.add(TableDescriptor::new("Extra").field(1, u32_t).field(2, items).field(4, shape));
    let triple = builder.add(ArrayDescriptor::new(Some(u8_t), 1, 3));

    let fuzz = builder.declare();
    let next = builder.add(StructPointerDescriptor { struct_type: fuzz });
    builder
        .define(
            fuzz,
            StructDescriptor::new("Fuzz", 112)
                .field(StructField::new(0, kind).with_padding(6))
                .field(StructField::new(8, flags).with_padding(4))
                .field(StructField::new(16, name))
                .field(StructField::new(32, items))
                .field(StructField::new(48, shape))
                .field(StructField::new(72, extra))
                .field(StructField::new(88, next))
                .field(StructField::new(96, event))
                .field(StructField::new(100, triple).with_padding(9)),
        )
        .expect("define Fuzz");
    (builder.build().expect("fuzz schema"), fuzz)
}
