// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Calculator protocol.
//!
//! | Method | Ordinal | Request | Response |
//! |--------|---------|---------|----------|
//! | `DoBinaryOp` | 1 | `{ op: BinaryOp, a: f64, b: f64 }` | `{ result: Result }` |
//! | `DoUnaryOp` | 2 | `{ op: UnaryOp, a: f64 }` | `{ result: Result }` |
//!
//! `Result` is a strict union: `1: f64` or `2: Error { message: string }`.

use crate::{RequestHandler, ServiceError, ServiceResult};
use wirewalk::schema::{
    EnumDescriptor, PrimitiveKind, SchemaBuilder, Strictness, StringDescriptor, StructDescriptor,
    StructField, UnionDescriptor,
};
use wirewalk::{Codec, HandleInfo, Message, ObjectGraph, Position, Schema, TransactionHeader, TypeId};

pub const DO_BINARY_OP: u64 = 1;
pub const DO_UNARY_OP: u64 = 2;

const RESULT_NUMBER: u64 = 1;
const RESULT_ERROR: u64 = 2;

/// Longest error message carried in a response.
const MAX_ERROR_MESSAGE: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum BinaryOp {
    Addition = 1,
    Subtraction = 2,
    Multiplication = 3,
    Division = 4,
}

impl BinaryOp {
    pub fn from_wire(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Addition),
            2 => Some(Self::Subtraction),
            3 => Some(Self::Multiplication),
            4 => Some(Self::Division),
            _ => None,
        }
    }

    pub fn apply(self, a: f64, b: f64) -> Result<f64, String> {
        match self {
            Self::Addition => Ok(a + b),
            Self::Subtraction => Ok(a - b),
            Self::Multiplication => Ok(a * b),
            Self::Division if b == 0.0 => Err("division by zero".to_string()),
            Self::Division => Ok(a / b),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum UnaryOp {
    Negation = 1,
}

impl UnaryOp {
    pub fn from_wire(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Negation),
            _ => None,
        }
    }

    pub fn apply(self, a: f64) -> f64 {
        match self {
            Self::Negation => -a,
        }
    }
}

/// Decoded `Result` union.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Number(f64),
    Error(String),
}

/// Type ids of the calculator messages.
#[derive(Debug, Clone, Copy)]
struct CalculatorTypes {
    binary_request: TypeId,
    unary_request: TypeId,
    response: TypeId,
}

/// Calculator server, also usable as a client to build requests and read
/// responses.
#[derive(Debug)]
pub struct Calculator {
    schema: Schema,
    types: CalculatorTypes,
}

impl Calculator {
    pub fn new() -> ServiceResult<Self> {
        let mut builder = SchemaBuilder::new();
        let f64_t = builder.primitive(PrimitiveKind::F64);
        let binary_op = builder.add(EnumDescriptor::with_members(
            "BinaryOp",
            PrimitiveKind::U32,
            &[1, 2, 3, 4],
        ));
        let unary_op = builder.add(EnumDescriptor::with_members("UnaryOp", PrimitiveKind::U32, &[1]));
        let message = builder.add(StringDescriptor::bounded(MAX_ERROR_MESSAGE));
        let error = builder.add(StructDescriptor::new("Error", 16).field(StructField::new(0, message)));
        let result = builder.add(
            UnionDescriptor::new("Result", Strictness::Strict)
                .variant(RESULT_NUMBER as u32, f64_t)
                .variant(RESULT_ERROR as u32, error),
        );
        let binary_request = builder.add(
            StructDescriptor::new("DoBinaryOpRequest", 24)
                .field(StructField::new(0, binary_op).with_padding(4))
                .field(StructField::new(8, f64_t))
                .field(StructField::new(16, f64_t)),
        );
        let unary_request = builder.add(
            StructDescriptor::new("DoUnaryOpRequest", 16)
                .field(StructField::new(0, unary_op).with_padding(4))
                .field(StructField::new(8, f64_t)),
        );
        let response = builder.add(
            StructDescriptor::new("CalculatorResponse", 24).field(StructField::new(0, result)),
        );

        Ok(Self {
            schema: builder.build()?,
            types: CalculatorTypes {
                binary_request,
                unary_request,
                response,
            },
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn codec(&self) -> Codec<'_> {
        Codec::new(&self.schema)
    }

    pub fn binary_op_request(&self, op: BinaryOp, a: f64, b: f64) -> ServiceResult<Message> {
        let mut graph = ObjectGraph::new(24);
        graph.write(Position::inline(0), op as u32)?;
        graph.write(Position::inline(8), a)?;
        graph.write(Position::inline(16), b)?;
        Ok(self
            .codec()
            .encode_message(DO_BINARY_OP, self.types.binary_request, &mut graph)?)
    }

    pub fn unary_op_request(&self, op: UnaryOp, a: f64) -> ServiceResult<Message> {
        let mut graph = ObjectGraph::new(16);
        graph.write(Position::inline(0), op as u32)?;
        graph.write(Position::inline(8), a)?;
        Ok(self
            .codec()
            .encode_message(DO_UNARY_OP, self.types.unary_request, &mut graph)?)
    }

    /// Decode a response into its `Result` variant.
    pub fn read_response(&self, response: Message) -> ServiceResult<Outcome> {
        let (_, graph) = self
            .codec()
            .decode_message(self.types.response, response.bytes, Vec::new())?;
        let tag = graph.read::<u64>(Position::inline(0));
        let data = graph.pointer_at(Position::inline(16));
        match (tag, data) {
            (Some(RESULT_NUMBER), Some(data)) => graph
                .read::<f64>(data)
                .map(Outcome::Number)
                .ok_or_else(|| invalid("number variant outside response")),
            (Some(RESULT_ERROR), Some(data)) => graph
                .string_at(data)
                .map(|message| Outcome::Error(message.to_string()))
                .ok_or_else(|| invalid("error variant without a message")),
            _ => Err(invalid("response carries no result")),
        }
    }

    fn do_binary_op(&self, request: Vec<u8>, handles: Vec<HandleInfo>) -> ServiceResult<Result<f64, String>> {
        let (_, graph) = self
            .codec()
            .decode_message(self.types.binary_request, request, handles)?;
        let op = graph
            .read::<u32>(Position::inline(0))
            .and_then(BinaryOp::from_wire)
            .ok_or_else(|| invalid("unknown binary operation"))?;
        let (Some(a), Some(b)) = (
            graph.read::<f64>(Position::inline(8)),
            graph.read::<f64>(Position::inline(16)),
        ) else {
            return Err(invalid("missing operands"));
        };
        log::debug!("[calculator] {:?}({}, {})", op, a, b);
        Ok(op.apply(a, b))
    }

    fn do_unary_op(&self, request: Vec<u8>, handles: Vec<HandleInfo>) -> ServiceResult<Result<f64, String>> {
        let (_, graph) = self
            .codec()
            .decode_message(self.types.unary_request, request, handles)?;
        let op = graph
            .read::<u32>(Position::inline(0))
            .and_then(UnaryOp::from_wire)
            .ok_or_else(|| invalid("unknown unary operation"))?;
        let a = graph
            .read::<f64>(Position::inline(8))
            .ok_or_else(|| invalid("missing operand"))?;
        log::debug!("[calculator] {:?}({})", op, a);
        Ok(Ok(op.apply(a)))
    }

    fn encode_response(&self, header: &TransactionHeader, result: Result<f64, String>) -> ServiceResult<Message> {
        let mut graph = ObjectGraph::new(24);
        let payload = match result {
            Ok(value) => {
                graph.write(Position::inline(0), RESULT_NUMBER)?;
                graph.push_segment(value.to_le_bytes().to_vec())
            }
            Err(message) => {
                graph.write(Position::inline(0), RESULT_ERROR)?;
                let error = graph.push_segment(vec![0u8; 16]);
                graph.set_string(error.position(), Some(&message))?;
                error
            }
        };
        graph.set_pointer(Position::inline(16), Some(payload))?;

        let mut response = self
            .codec()
            .encode_message(header.ordinal, self.types.response, &mut graph)?;
        response.set_header(header)?;
        Ok(response)
    }
}

impl RequestHandler for Calculator {
    fn handle(&self, request: Vec<u8>, handles: Vec<HandleInfo>) -> ServiceResult<Message> {
        let header = TransactionHeader::parse(&request)?;
        let result = match header.ordinal {
            DO_BINARY_OP => self.do_binary_op(request, handles)?,
            DO_UNARY_OP => self.do_unary_op(request, handles)?,
            other => {
                log::debug!("[calculator] unknown ordinal {:#x}", other);
                return Err(ServiceError::UnknownOrdinal(other));
            }
        };
        self.encode_response(&header, result)
    }
}

fn invalid(message: &str) -> ServiceError {
    ServiceError::InvalidMessage(message.to_string())
}
