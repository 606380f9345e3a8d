// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Encode -> decode -> re-encode over a message that exercises strings,
// vectors, struct padding, handles and a sparse table. Re-encoding a decoded
// message must reproduce the original bytes.

#![allow(clippy::unreadable_literal)]

use wirewalk::config::{ALLOC_PRESENT, HANDLE_PRESENT, VECTOR_OWNERSHIP_MASK};
use wirewalk::schema::{
    HandleDescriptor, PrimitiveKind, SchemaBuilder, StringDescriptor, StructDescriptor,
    StructField, TableDescriptor, VectorDescriptor,
};
use wirewalk::{
    Codec, Handle, HandleInfo, Message, ObjectGraph, ObjectType, Position, Rights, Schema, TypeId,
};

const ORDINAL: u64 = 0x5EED_0001;

/// `Record { name: string:32, values: vector<u32>:8, flag: u8, event: handle?, options: Options }`
/// with `table Options { 1: u64, 3: string }`.
fn record_schema() -> (Schema, TypeId) {
    let mut builder = SchemaBuilder::new();
    let u8_t = builder.primitive(PrimitiveKind::U8);
    let u32_t = builder.primitive(PrimitiveKind::U32);
    let u64_t = builder.primitive(PrimitiveKind::U64);
    let name_t = builder.add(StringDescriptor::bounded(32));
    let values_t = builder.add(VectorDescriptor::bounded(Some(u32_t), 4, 8));
    let event_t = builder.add(HandleDescriptor::new(ObjectType::EVENT, Rights::SAME_RIGHTS).nullable());
    let label_t = builder.add(StringDescriptor::unbounded());
    let options_t = builder.add(TableDescriptor::new("Options").field(1, u64_t).field(3, label_t));
    let record = builder.add(
        StructDescriptor::new("Record", 56)
            .field(StructField::new(0, name_t))
            .field(StructField::new(16, values_t))
            .field(StructField::new(32, u8_t).with_padding(3))
            .field(StructField::new(36, event_t))
            .field(StructField::new(40, options_t)),
    );
    (builder.build().expect("schema"), record)
}

fn authored_record() -> ObjectGraph {
    let mut graph = ObjectGraph::new(56);
    graph.set_string(Position::inline(0), Some("walker")).expect("name");

    let mut values = Vec::new();
    for value in [1u32, 2, 3] {
        values.extend_from_slice(&value.to_le_bytes());
    }
    graph
        .set_vector(Position::inline(16), 3, Some(values))
        .expect("values");
    graph.write(Position::inline(32), 7u8).expect("flag");
    // Garbage in struct padding must not reach the wire.
    graph.write(Position::inline(33), 0xAAu8).expect("padding");
    graph
        .set_handle(Position::inline(36), Handle::from_raw(0x10))
        .expect("event");

    let answer = graph.push_segment(42u64.to_le_bytes().to_vec());
    let label = graph.push_segment(vec![0u8; 16]);
    graph.set_string(label.position(), Some("opt")).expect("label");
    let envelopes = graph.push_segment(vec![0u8; 48]);
    graph
        .set_pointer(Position::new(envelopes.segment, 8), Some(answer))
        .expect("envelope 1");
    graph
        .set_pointer(Position::new(envelopes.segment, 40), Some(label))
        .expect("envelope 3");
    graph.write(Position::inline(40), 3u64).expect("table count");
    graph
        .set_pointer(Position::inline(48), Some(envelopes))
        .expect("table data");
    graph
}

/// Handles as the receiving end would observe them.
fn received_handles(message: &mut Message) -> Vec<HandleInfo> {
    message
        .handles
        .drain(..)
        .map(|disposition| {
            HandleInfo::new(disposition.handle, ObjectType::EVENT, Rights::READ | Rights::WRITE)
        })
        .collect()
}

#[test]
fn test_encoded_layout() {
    let (schema, record) = record_schema();
    let codec = Codec::new(&schema);
    let mut graph = authored_record();
    let message = codec.encode_message(ORDINAL, record, &mut graph).expect("encode");

    assert_eq!(message.header().map(|h| h.ordinal), Ok(ORDINAL));
    let body = message.body();
    assert_eq!(body.len(), 160);
    assert_eq!(body.len() % 8, 0);

    let u64_at = |at: usize| u64::from_le_bytes(body[at..at + 8].try_into().expect("8 bytes"));
    let u32_at = |at: usize| u32::from_le_bytes(body[at..at + 4].try_into().expect("4 bytes"));

    // name
    assert_eq!(u64_at(0), 6);
    assert_eq!(u64_at(8), ALLOC_PRESENT);
    assert_eq!(&body[56..62], b"walker");
    assert_eq!(&body[62..64], &[0, 0]);
    // values
    assert_eq!(u64_at(16), 3);
    assert_eq!(u32_at(64 + 4), 2);
    // flag, zeroed padding, handle marker
    assert_eq!(body[32], 7);
    assert_eq!(&body[33..36], &[0, 0, 0]);
    assert_eq!(u32_at(36), HANDLE_PRESENT);
    // table: three envelopes at 80, payloads after them
    assert_eq!(u64_at(40), 3);
    assert_eq!((u32_at(80), u32_at(84)), (8, 0));
    assert_eq!(u64_at(88), ALLOC_PRESENT);
    assert_eq!((u32_at(96), u32_at(100), u64_at(104)), (0, 0, 0));
    assert_eq!((u32_at(112), u32_at(116)), (24, 0));
    assert_eq!(u64_at(128), 42);
    assert_eq!(u64_at(136), 3);
    assert_eq!(&body[152..155], b"opt");

    assert_eq!(message.handles.len(), 1);
    assert_eq!(message.handles[0].handle.raw(), 0x10);
    assert_eq!(message.handles[0].object_type, ObjectType::EVENT);
    // The handle moved out of the graph.
    assert_eq!(graph.handle_at(Position::inline(36)), Some(0));
}

#[test]
fn test_decode_reads_back_authored_values() {
    let (schema, record) = record_schema();
    let codec = Codec::new(&schema);
    let mut message = codec
        .encode_message(ORDINAL, record, &mut authored_record())
        .expect("encode");
    let handles = received_handles(&mut message);

    let (header, graph) = codec
        .decode_message(record, message.bytes, handles)
        .expect("decode");
    assert_eq!(header.ordinal, ORDINAL);
    assert_eq!(graph.string_at(Position::inline(0)), Some("walker"));

    let (values, count) = graph.vector_at(Position::inline(16)).expect("values");
    assert_eq!(count, 3);
    let read: Vec<u32> = (0..count)
        .filter_map(|i| graph.read::<u32>(Position::new(values.segment, values.offset + 4 * i)))
        .collect();
    assert_eq!(read, vec![1, 2, 3]);

    assert_eq!(graph.read::<u8>(Position::inline(32)), Some(7));
    assert_eq!(graph.handle_at(Position::inline(36)), Some(0x10));
    // SAME_RIGHTS keeps what the handle arrived with.
    assert_eq!(
        graph.handle_rights(0x10),
        Some((ObjectType::EVENT, Rights::READ | Rights::WRITE))
    );

    let envelopes = graph.pointer_at(Position::inline(48)).expect("table data");
    let answer = graph
        .pointer_at(Position::new(envelopes.segment, envelopes.offset + 8))
        .expect("field 1");
    assert_eq!(graph.read::<u64>(answer), Some(42));
    assert_eq!(
        graph.pointer_at(Position::new(envelopes.segment, envelopes.offset + 24)),
        None
    );
    let label = graph
        .pointer_at(Position::new(envelopes.segment, envelopes.offset + 40))
        .expect("field 3");
    assert_eq!(graph.string_at(label), Some("opt"));
}

#[test]
fn test_reencode_is_byte_identical() {
    let (schema, record) = record_schema();
    let codec = Codec::new(&schema);
    let mut first = codec
        .encode_message(ORDINAL, record, &mut authored_record())
        .expect("encode");
    let original = first.bytes.clone();
    let handles = received_handles(&mut first);

    let (_, mut graph) = codec
        .decode_message(record, first.bytes, handles)
        .expect("decode");
    let second = codec.encode_message(ORDINAL, record, &mut graph).expect("re-encode");

    assert_eq!(second.bytes, original);
    let raws: Vec<u32> = second.handles.iter().map(|d| d.handle.raw()).collect();
    assert_eq!(raws, vec![0x10]);
}

#[test]
fn test_ownership_bit_never_reaches_the_wire() {
    let (schema, record) = record_schema();
    let codec = Codec::new(&schema);
    let mut graph = authored_record();
    graph
        .write(Position::inline(0), 6u64 | VECTOR_OWNERSHIP_MASK)
        .expect("name count");
    assert_eq!(graph.string_at(Position::inline(0)), Some("walker"));

    let message = codec.encode_message(ORDINAL, record, &mut graph).expect("encode");
    let body = message.body();
    assert_eq!(u64::from_le_bytes(body[0..8].try_into().expect("8 bytes")), 6);

    // A sender that sets the bit still describes a six-byte string.
    let mut flagged = body.to_vec();
    flagged[7] |= 0x80;
    assert_eq!(codec.validate(record, &flagged, 1), Ok(()));
}

#[test]
fn test_absent_non_nullable_collections_encode_as_empty() {
    let (schema, record) = record_schema();
    let codec = Codec::new(&schema);
    // Nothing authored beyond the zeroed primary object.
    let mut graph = ObjectGraph::new(56);
    let message = codec.encode_message(ORDINAL, record, &mut graph).expect("encode");
    let body = message.body();
    assert_eq!(body.len(), 56);
    for header in [0usize, 16, 40] {
        assert_eq!(u64::from_le_bytes(body[header..header + 8].try_into().expect("count")), 0);
        assert_eq!(
            u64::from_le_bytes(body[header + 8..header + 16].try_into().expect("presence")),
            ALLOC_PRESENT
        );
    }
    assert!(message.handles.is_empty());

    let (_, decoded) = codec
        .decode_message(record, message.bytes, Vec::new())
        .expect("decode");
    assert_eq!(decoded.string_at(Position::inline(0)), Some(""));
}
