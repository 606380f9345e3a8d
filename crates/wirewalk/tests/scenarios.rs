// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Reference scenarios: padded struct, bounded vector, unknown union ordinal,
// encoder allocation. Each walks a hand-assembled buffer through the codec.

#![allow(clippy::unreadable_literal)]

use wirewalk::config::ALLOC_PRESENT;
use wirewalk::schema::{
    EnumDescriptor, PrimitiveKind, SchemaBuilder, Strictness, StructDescriptor, StructField,
    UnionDescriptor, VectorDescriptor,
};
use wirewalk::{Codec, Encoder, Error, Violation};

fn put_u32(bytes: &mut [u8], at: usize, value: u32) {
    bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn put_u64(bytes: &mut [u8], at: usize, value: u64) {
    bytes[at..at + 8].copy_from_slice(&value.to_le_bytes());
}

#[test]
fn test_padded_struct_is_valid() {
    let mut builder = SchemaBuilder::new();
    let u8_t = builder.primitive(PrimitiveKind::U8);
    let u32_t = builder.primitive(PrimitiveKind::U32);
    let ty = builder.add(
        StructDescriptor::new("Padded", 8)
            .field(StructField::new(0, u8_t).with_padding(3))
            .field(StructField::new(4, u32_t)),
    );
    let schema = builder.build().expect("schema");
    let codec = Codec::new(&schema);

    let mut bytes = vec![0u8; 8];
    bytes[0] = 0x11;
    put_u32(&mut bytes, 4, 42);
    assert_eq!(codec.validate(ty, &bytes, 0), Ok(()));
    assert!(codec.diagnose(ty, &bytes, 0).is_empty());

    bytes[2] = 0x01;
    assert_eq!(
        codec.validate(ty, &bytes, 0),
        Err(Error::ConstraintViolation("non-zero padding bytes detected".into()))
    );
}

#[test]
fn test_bounded_vector_too_large() {
    let mut builder = SchemaBuilder::new();
    let u8_t = builder.primitive(PrimitiveKind::U8);
    let bytes_t = builder.add(VectorDescriptor::bounded(Some(u8_t), 1, 4));
    let ty = builder.add(StructDescriptor::new("Bytes", 16).field(StructField::new(0, bytes_t)));
    let schema = builder.build().expect("schema");
    let codec = Codec::new(&schema);

    let mut bytes = vec![0u8; 24];
    put_u64(&mut bytes, 0, 5);
    put_u64(&mut bytes, 8, ALLOC_PRESENT);
    bytes[16..21].copy_from_slice(b"abcde");

    assert_eq!(
        codec.validate(ty, &bytes, 0),
        Err(Error::ConstraintViolation("bounded vector too large".into()))
    );
    let diagnostics = codec.diagnose(ty, &bytes, 0);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].violation, Violation::Constraint);
    assert_eq!(diagnostics[0].message, "bounded vector too large");

    // Four elements fit the bound.
    put_u64(&mut bytes, 0, 4);
    bytes[20] = 0;
    assert_eq!(codec.validate(ty, &bytes, 0), Ok(()));
}

#[test]
fn test_exhaustive_diagnostics_continue_past_violations() {
    let mut builder = SchemaBuilder::new();
    let u8_t = builder.primitive(PrimitiveKind::U8);
    let bytes_t = builder.add(VectorDescriptor::bounded(Some(u8_t), 1, 4));
    let ty = builder.add(
        StructDescriptor::new("TwoVectors", 32)
            .field(StructField::new(0, bytes_t))
            .field(StructField::new(16, bytes_t)),
    );
    let schema = builder.build().expect("schema");
    let codec = Codec::new(&schema);

    let mut bytes = vec![0u8; 32];
    for slot in [0, 16] {
        put_u64(&mut bytes, slot, 5);
        put_u64(&mut bytes, slot + 8, ALLOC_PRESENT);
    }

    let messages: Vec<String> = codec
        .diagnose(ty, &bytes, 0)
        .into_iter()
        .map(|d| d.message)
        .collect();
    assert_eq!(
        messages,
        vec!["bounded vector too large", "bounded vector too large"]
    );
    assert_eq!(
        codec.validate(ty, &bytes, 0),
        Err(Error::ConstraintViolation("bounded vector too large".into()))
    );
}

#[test]
fn test_enum_members_in_sibling_fields() {
    let mut builder = SchemaBuilder::new();
    let color = builder.add(EnumDescriptor::with_members("Color", PrimitiveKind::U32, &[1, 2]));
    let ty = builder.add(
        StructDescriptor::new("Pair", 8)
            .field(StructField::new(0, color))
            .field(StructField::new(4, color)),
    );
    let schema = builder.build().expect("schema");
    let codec = Codec::new(&schema);

    let mut bytes = vec![0u8; 8];
    put_u32(&mut bytes, 0, 9);
    put_u32(&mut bytes, 4, 10);
    let diagnostics = codec.diagnose(ty, &bytes, 0);
    assert_eq!(diagnostics.len(), 2);
    assert!(diagnostics.iter().all(|d| d.message == "not a valid enum member"));

    put_u32(&mut bytes, 0, 1);
    put_u32(&mut bytes, 4, 2);
    assert!(codec.diagnose(ty, &bytes, 0).is_empty());
}

fn union_schema(strictness: Strictness) -> (wirewalk::Schema, wirewalk::TypeId) {
    let mut builder = SchemaBuilder::new();
    let u32_t = builder.primitive(PrimitiveKind::U32);
    let u64_t = builder.primitive(PrimitiveKind::U64);
    let union = builder.add(
        UnionDescriptor::new("Choice", strictness)
            .variant(1, u32_t)
            .variant(2, u64_t)
            .variant(3, u32_t),
    );
    let ty = builder.add(StructDescriptor::new("Carrier", 24).field(StructField::new(0, union)));
    (builder.build().expect("schema"), ty)
}

fn unknown_variant_message() -> Vec<u8> {
    let mut bytes = vec![0u8; 32];
    put_u64(&mut bytes, 0, 7);
    put_u32(&mut bytes, 8, 8);
    put_u32(&mut bytes, 12, 0);
    put_u64(&mut bytes, 16, ALLOC_PRESENT);
    put_u64(&mut bytes, 24, 0xDEAD_BEEF);
    bytes
}

#[test]
fn test_unknown_union_ordinal_strict_vs_flexible() {
    let bytes = unknown_variant_message();

    let (strict, ty) = union_schema(Strictness::Strict);
    match Codec::new(&strict).validate(ty, &bytes, 0) {
        Err(Error::ConstraintViolation(message)) => assert!(message.contains("unknown ordinal")),
        other => panic!("expected a constraint violation, got {:?}", other),
    }

    let (flexible, ty) = union_schema(Strictness::Flexible);
    assert_eq!(Codec::new(&flexible).validate(ty, &bytes, 0), Ok(()));
}

#[test]
fn test_union_envelope_byte_count_must_match() {
    let (flexible, ty) = union_schema(Strictness::Flexible);
    let codec = Codec::new(&flexible);

    // Known variant 1 (u32) occupies one aligned 8-byte block.
    let mut bytes = unknown_variant_message();
    put_u64(&mut bytes, 0, 1);
    assert_eq!(codec.validate(ty, &bytes, 0), Ok(()));

    put_u32(&mut bytes, 8, 16);
    assert_eq!(
        codec.validate(ty, &bytes, 0),
        Err(Error::ConstraintViolation(
            "envelope has an incorrect number of bytes".into()
        ))
    );
}

#[test]
fn test_encoder_alloc_rounds_to_alignment() {
    let mut encoder = Encoder::new();
    assert_eq!(encoder.alloc(12), Ok(0));
    assert_eq!(encoder.len(), 16);
}
