// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::*;
use crate::handle::{ObjectType, Rights};

fn sample() -> (Schema, Vec<TypeId>) {
    let mut builder = SchemaBuilder::new();
    let u8_t = builder.primitive(PrimitiveKind::U8);
    let u16_t = builder.primitive(PrimitiveKind::U16);
    let header = builder.add(
        StructDescriptor::new("Header", 4)
            .field(StructField::new(0, u16_t).with_padding(2)),
    );
    let ptr = builder.add(StructPointerDescriptor { struct_type: header });
    let table = builder.add(TableDescriptor::new("Options").field(1, u8_t));
    let union = builder.add(UnionDescriptor::new("Choice", Strictness::Flexible).variant(1, u8_t));
    let array = builder.add(ArrayDescriptor::new(Some(header), 4, 3));
    let string = builder.add(StringDescriptor::bounded(32));
    let vector = builder.add(VectorDescriptor::unbounded(Some(u8_t), 1));
    let handle = builder.add(HandleDescriptor::new(ObjectType::VMO, Rights::READ));
    let flags = builder.add(BitsDescriptor::new("Flags", PrimitiveKind::U32, 0b101));
    let schema = builder.build().expect("valid schema");
    (
        schema,
        vec![u8_t, u16_t, header, ptr, table, union, array, string, vector, handle, flags],
    )
}

#[test]
fn test_type_sizes() {
    let (schema, ids) = sample();
    let sizes: Vec<u32> = ids.iter().map(|id| schema.type_size(*id)).collect();
    assert_eq!(sizes, vec![1, 2, 4, 8, 16, 24, 12, 16, 16, 4, 4]);
    assert_eq!(schema.type_size(TypeId(999)), 0);
}

#[test]
fn test_lookup_helpers() {
    let (schema, ids) = sample();
    assert_eq!(schema.find("Header"), Some(ids[2]));
    assert_eq!(schema.find("Missing"), None);
    assert!(schema.is_primitive(ids[0]));
    assert!(!schema.is_primitive(ids[2]));
    assert_eq!(schema.struct_descriptor(ids[2]).map(|s| s.size), Some(4));
    assert!(schema.struct_descriptor(ids[4]).is_none());
    assert!(!schema.is_empty());
}

#[test]
fn test_primary_object_size() {
    let (schema, ids) = sample();
    assert_eq!(schema.primary_object_size(ids[2]), Ok(4));
    assert_eq!(schema.primary_object_size(ids[4]), Ok(16));
    assert!(matches!(
        schema.primary_object_size(ids[5]),
        Err(Error::PrimaryObject(_))
    ));
    assert!(schema.primary_object_size(TypeId(999)).is_err());
}

#[test]
fn test_schema_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Schema>();
}
