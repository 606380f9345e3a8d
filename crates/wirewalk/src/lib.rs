// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # wirewalk - schema-driven binary message walker
//!
//! Validates, decodes and encodes messages whose layout is described at
//! runtime by a tree of type descriptors. Messages consist of an inline
//! primary object followed by out-of-line objects laid out depth-first,
//! each aligned to 8 bytes, plus a table of capability handles carried
//! alongside the bytes.
//!
//! ## Quick Start
//!
//! ```rust
//! use wirewalk::schema::{SchemaBuilder, StringDescriptor, StructDescriptor, StructField};
//! use wirewalk::{Codec, ObjectGraph, Position};
//!
//! # fn main() -> wirewalk::Result<()> {
//! let mut builder = SchemaBuilder::new();
//! let name = builder.add(StringDescriptor::bounded(64));
//! let greeting = builder.add(StructDescriptor::new("Greeting", 16).field(StructField::new(0, name)));
//! let schema = builder.build().expect("valid schema");
//! let codec = Codec::new(&schema);
//!
//! let mut graph = ObjectGraph::new(16);
//! graph.set_string(Position::inline(0), Some("hello"))?;
//! let message = codec.encode_message(1, greeting, &mut graph)?;
//!
//! let (header, decoded) = codec.decode_message(greeting, message.bytes, Vec::new())?;
//! assert_eq!(header.ordinal, 1);
//! assert_eq!(decoded.string_at(Position::inline(0)), Some("hello"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +----------------------------------------------------------------+
//! |  Codec            validate | diagnose | decode | encode        |
//! +----------------------------------------------------------------+
//! |  Visitor policies Validator | DecodeVisitor | EncodeVisitor    |
//! |                   HandleReleaseVisitor                         |
//! +----------------------------------------------------------------+
//! |  Walker           depth-first traversal, error protocol        |
//! +----------------------------------------------------------------+
//! |  Schema           type descriptor arena    Position / Memory   |
//! +----------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Schema`] | Immutable arena of type descriptors |
//! | [`Walker`] | Traversal engine generic over a [`Visitor`] |
//! | [`Codec`] | Validate/decode/encode entry points for one schema |
//! | [`ObjectGraph`] | In-memory (decoded or authored) form of a message |
//! | [`Encoder`] | Output buffer allocator and handle list |

/// Wire constants and codec limits.
pub mod config;
/// Error types shared by the walker, policies and codec.
pub mod error;
/// Capability handles, object types and rights.
pub mod handle;
/// Positions, bounds-checked access and checked size arithmetic.
pub mod position;
/// Type descriptor trees and their builder.
pub mod schema;
/// The traversal engine.
pub mod walker;
/// Visitor policies: validate, decode, encode, release.
pub mod visitors;

mod codec;
mod encoder;
mod graph;
mod message;

pub use codec::{starting_out_of_line_offset, Codec};
pub use config::CodecConfig;
pub use encoder::Encoder;
pub use error::{Diagnostic, Error, Result, Status, Violation};
pub use graph::{ObjectGraph, ObjectRef};
pub use handle::{Handle, HandleDisposition, HandleInfo, ObjectType, Rights};
pub use message::{Message, TransactionHeader};
pub use position::Position;
pub use schema::{Schema, SchemaBuilder, SchemaError, TypeId};
pub use walker::{walk, Envelope, PointeeKind, Visitor, WalkResult, Walker};
