// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Rot13 protocol.
//!
//! | Method | Ordinal | Request | Response |
//! |--------|---------|---------|----------|
//! | `Encrypt` | 1 | `{ value: string }` | `{ value: string }` |
//! | `Checksum` | 2 | `{ value: string }` | `{ checksum: u32 }` |

use crate::{RequestHandler, ServiceError, ServiceResult};
use wirewalk::schema::{PrimitiveKind, SchemaBuilder, StringDescriptor, StructDescriptor, StructField};
use wirewalk::{Codec, HandleInfo, Message, ObjectGraph, Position, Schema, TransactionHeader, TypeId};

pub const ENCRYPT: u64 = 1;
pub const CHECKSUM: u64 = 2;

/// Longest string accepted or produced.
pub const MAX_VALUE_SIZE: u32 = 4096;

/// Rotate ASCII letters by 13, keeping case; other bytes pass through.
pub fn rot13(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            'a'..='z' => rotate(c, b'a'),
            'A'..='Z' => rotate(c, b'A'),
            _ => c,
        })
        .collect()
}

fn rotate(c: char, base: u8) -> char {
    char::from((c as u8 - base + 13) % 26 + base)
}

/// Wrapping sum of the UTF-8 bytes of `value`.
pub fn checksum(value: &str) -> u32 {
    value
        .bytes()
        .fold(0u32, |sum, byte| sum.wrapping_add(u32::from(byte)))
}

/// Rot13 server and client helpers.
#[derive(Debug)]
pub struct Rot13 {
    schema: Schema,
    text: TypeId,
    sum: TypeId,
}

impl Rot13 {
    pub fn new() -> ServiceResult<Self> {
        let mut builder = SchemaBuilder::new();
        let u32_t = builder.primitive(PrimitiveKind::U32);
        let value = builder.add(StringDescriptor::bounded(MAX_VALUE_SIZE));
        let text = builder.add(StructDescriptor::new("Text", 16).field(StructField::new(0, value)));
        let sum = builder.add(
            StructDescriptor::new("ChecksumResponse", 8).field(StructField::new(0, u32_t).with_padding(4)),
        );
        Ok(Self {
            schema: builder.build()?,
            text,
            sum,
        })
    }

    fn codec(&self) -> Codec<'_> {
        Codec::new(&self.schema)
    }

    fn text_message(&self, ordinal: u64, value: &str) -> ServiceResult<Message> {
        let mut graph = ObjectGraph::new(16);
        graph.set_string(Position::inline(0), Some(value))?;
        Ok(self.codec().encode_message(ordinal, self.text, &mut graph)?)
    }

    pub fn encrypt_request(&self, value: &str) -> ServiceResult<Message> {
        self.text_message(ENCRYPT, value)
    }

    pub fn checksum_request(&self, value: &str) -> ServiceResult<Message> {
        self.text_message(CHECKSUM, value)
    }

    fn read_text(&self, message: Vec<u8>, handles: Vec<HandleInfo>) -> ServiceResult<String> {
        let (_, graph) = self.codec().decode_message(self.text, message, handles)?;
        graph
            .string_at(Position::inline(0))
            .map(str::to_string)
            .ok_or_else(|| ServiceError::InvalidMessage("value is not UTF-8".to_string()))
    }

    pub fn read_encrypt_response(&self, response: Message) -> ServiceResult<String> {
        self.read_text(response.bytes, Vec::new())
    }

    pub fn read_checksum_response(&self, response: Message) -> ServiceResult<u32> {
        let (_, graph) = self
            .codec()
            .decode_message(self.sum, response.bytes, Vec::new())?;
        graph
            .read::<u32>(Position::inline(0))
            .ok_or_else(|| ServiceError::InvalidMessage("missing checksum".to_string()))
    }
}

impl RequestHandler for Rot13 {
    fn handle(&self, request: Vec<u8>, handles: Vec<HandleInfo>) -> ServiceResult<Message> {
        let header = TransactionHeader::parse(&request)?;
        let mut response = match header.ordinal {
            ENCRYPT => {
                let value = self.read_text(request, handles)?;
                log::debug!("[rot13] encrypt {} bytes", value.len());
                self.text_message(ENCRYPT, &rot13(&value))?
            }
            CHECKSUM => {
                let value = self.read_text(request, handles)?;
                let mut graph = ObjectGraph::new(8);
                graph.write(Position::inline(0), checksum(&value))?;
                self.codec().encode_message(CHECKSUM, self.sum, &mut graph)?
            }
            other => {
                log::debug!("[rot13] unknown ordinal {:#x}", other);
                return Err(ServiceError::UnknownOrdinal(other));
            }
        };
        response.set_header(&header)?;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rot13() {
        assert_eq!(rot13("Hello World!"), "Uryyb Jbeyq!");
        assert_eq!(rot13("Uryyb Jbeyq!"), "Hello World!");
        assert_eq!(rot13("az AZ 09 é"), "nm NM 09 é");
    }

    #[test]
    fn test_checksum() {
        assert_eq!(checksum("Hello World!"), 1085);
        assert_eq!(checksum(""), 0);
    }
}
