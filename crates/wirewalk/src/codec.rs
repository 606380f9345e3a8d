// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! High-level entry points over a [`Schema`].

use crate::config::{CodecConfig, MESSAGE_HEADER_SIZE};
use crate::encoder::Encoder;
use crate::error::{Diagnostic, Error, Result};
use crate::graph::ObjectGraph;
use crate::handle::{Handle, HandleInfo};
use crate::message::{Message, TransactionHeader};
use crate::position::{add_out_of_line, Position};
use crate::schema::{Schema, TypeId};
use crate::visitors::{self, DecodeVisitor, ExhaustiveValidator, Validator};
use crate::walker::walk;

/// Aligned end of a primary object of `size` bytes placed at `start`:
/// where the first out-of-line object begins.
pub fn starting_out_of_line_offset(start: u32, size: u32, buffer_len: u32) -> Result<u32> {
    match add_out_of_line(start, size) {
        Some(offset) if offset <= buffer_len => Ok(offset),
        Some(offset) => Err(Error::Memory(format!(
            "first out-of-line offset {} exceeds buffer size {}",
            offset, buffer_len
        ))),
        None => Err(Error::Memory(
            "primary object size overflows 32 bits".into(),
        )),
    }
}

/// Validates, decodes and encodes messages described by one schema.
///
/// # Example
///
/// ```rust
/// use wirewalk::schema::{PrimitiveKind, SchemaBuilder, StructDescriptor, StructField};
/// use wirewalk::Codec;
///
/// let mut builder = SchemaBuilder::new();
/// let u32_t = builder.primitive(PrimitiveKind::U32);
/// let ty = builder.add(StructDescriptor::new("Value", 8).field(StructField::new(0, u32_t).with_padding(4)));
/// let schema = builder.build().unwrap();
///
/// let codec = Codec::new(&schema);
/// let mut bytes = vec![0u8; 8];
/// bytes[0] = 42;
/// assert!(codec.validate(ty, &bytes, 0).is_ok());
/// bytes[6] = 1;
/// assert!(codec.validate(ty, &bytes, 0).is_err());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Codec<'s> {
    schema: &'s Schema,
    config: CodecConfig,
}

impl<'s> Codec<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self::with_config(schema, CodecConfig::default())
    }

    pub fn with_config(schema: &'s Schema, config: CodecConfig) -> Self {
        Self { schema, config }
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    fn check_limits(&self, num_bytes: usize, num_handles: usize) -> Result<()> {
        if num_bytes > self.config.max_message_bytes as usize {
            return Err(Error::Limit(format!(
                "{} bytes, limit is {}",
                num_bytes, self.config.max_message_bytes
            )));
        }
        if num_handles > self.config.max_message_handles as usize {
            return Err(Error::Limit(format!(
                "{} handles, limit is {}",
                num_handles, self.config.max_message_handles
            )));
        }
        Ok(())
    }

    /// Bytes and handle count must be within limits; returns the first
    /// out-of-line offset.
    fn prepare(&self, ty: TypeId, num_bytes: usize, num_handles: usize) -> Result<u32> {
        self.check_limits(num_bytes, num_handles)?;
        let size = self.schema.primary_object_size(ty)?;
        // Limits keep num_bytes well inside 32 bits.
        starting_out_of_line_offset(0, size, num_bytes as u32)
    }

    /// Check a message body (no header) carrying `num_handles` handles.
    pub fn validate(&self, ty: TypeId, bytes: &[u8], num_handles: u32) -> Result<()> {
        let first_out_of_line = self.prepare(ty, bytes.len(), num_handles as usize)?;
        log::trace!(
            "[validate] {} bytes, {} handles",
            bytes.len(),
            num_handles
        );
        let mut visitor = Validator::new(bytes, num_handles, first_out_of_line);
        let result = walk(self.schema, &mut visitor, ty, Position::inline(0), self.config.max_depth);
        visitor.finish(result).into_result().map_err(|err| {
            log::debug!("[validate] rejected message: {}", err);
            err
        })
    }

    /// Every problem in a message body, in traversal order. Empty when the
    /// message is valid.
    pub fn diagnose(&self, ty: TypeId, bytes: &[u8], num_handles: u32) -> Vec<Diagnostic> {
        let first_out_of_line = match self.prepare(ty, bytes.len(), num_handles as usize) {
            Ok(offset) => offset,
            Err(err) => return vec![Diagnostic::from_error(&err)],
        };
        let mut visitor = ExhaustiveValidator::new(bytes, num_handles, first_out_of_line);
        let result = walk(self.schema, &mut visitor, ty, Position::inline(0), self.config.max_depth);
        visitor.finish(result).into_entries()
    }

    /// Decode a message body in place. On failure every handle is released.
    pub fn decode(&self, ty: TypeId, bytes: Vec<u8>, handles: Vec<HandleInfo>) -> Result<ObjectGraph> {
        let first_out_of_line = match self.prepare(ty, bytes.len(), handles.len()) {
            Ok(offset) => offset,
            Err(err) => {
                log::debug!("[decode] rejected message: {}", err);
                release(handles.into_iter().map(|info| info.handle).collect());
                return Err(err);
            }
        };
        log::trace!(
            "[decode] {} bytes, {} handles",
            bytes.len(),
            handles.len()
        );
        let mut visitor = DecodeVisitor::new(bytes, handles, first_out_of_line);
        let result = walk(self.schema, &mut visitor, ty, Position::inline(0), self.config.max_depth);
        match visitor.finish(result) {
            Ok(graph) => Ok(graph),
            Err((diagnostics, handles)) => {
                let err = match diagnostics.into_result() {
                    Err(err) => err,
                    Ok(()) => Error::Memory("decode failed without a diagnostic".into()),
                };
                log::debug!("[decode] rejected message: {}", err);
                release(handles);
                Err(err)
            }
        }
    }

    /// Decode a full message: header, then a body of type `ty`.
    pub fn decode_message(
        &self,
        ty: TypeId,
        mut bytes: Vec<u8>,
        handles: Vec<HandleInfo>,
    ) -> Result<(TransactionHeader, ObjectGraph)> {
        let header = match TransactionHeader::parse(&bytes) {
            Ok(header) => header,
            Err(err) => {
                log::debug!("[decode] rejected message: {}", err);
                release(handles.into_iter().map(|info| info.handle).collect());
                return Err(err);
            }
        };
        let body = bytes.split_off(MESSAGE_HEADER_SIZE as usize);
        let graph = self.decode(ty, body, handles)?;
        Ok((header, graph))
    }

    /// Encode `graph` as the body of a message for `ordinal`.
    ///
    /// Handles are moved out of the graph. On failure, every handle still in
    /// the graph and every handle already moved is released.
    pub fn encode_message(&self, ordinal: u64, ty: TypeId, graph: &mut ObjectGraph) -> Result<Message> {
        let mut encoder = Encoder::new();
        encoder.reset(ordinal);
        match encoder.encode(self.schema, ty, graph, &self.config) {
            Ok(()) => Ok(encoder.get_message()),
            Err(err) => {
                log::debug!("[encode] failed: {}", err);
                let mut handles = encoder.take_handles();
                handles.extend(self.release_handles(ty, graph));
                release(handles);
                Err(err)
            }
        }
    }

    /// Take every handle out of a decoded or authored graph.
    pub fn release_handles(&self, ty: TypeId, graph: &mut ObjectGraph) -> Vec<Handle> {
        visitors::release_handles(self.schema, ty, graph, self.config.max_depth)
    }
}

/// Handles have no transport here; releasing means dropping them.
fn release(handles: Vec<Handle>) {
    if !handles.is_empty() {
        log::debug!("[codec] released {} handles", handles.len());
    }
}
