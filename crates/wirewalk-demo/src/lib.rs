// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Demo protocols over wirewalk messages
//!
//! Two small request/response protocols whose messages are described by
//! wirewalk schemas:
//! - [`calculator`]: binary and unary arithmetic answering with a strict
//!   `Result` union (a number or an error message)
//! - [`rot13`]: string rotation and byte checksums
//!
//! Each server implements [`RequestHandler`]: it decodes the request with the
//! codec, computes, and encodes a response carrying the request's ordinal and
//! transaction id. [`call`] loops a request straight into a handler, standing
//! in for a channel.
//!
//! # Quick Start
//!
//! ```rust
//! use wirewalk_demo::calculator::{BinaryOp, Calculator, Outcome};
//!
//! let calculator = Calculator::new().unwrap();
//! let request = calculator.binary_op_request(BinaryOp::Multiplication, 6.0, 7.0).unwrap();
//! let response = wirewalk_demo::call(&calculator, request).unwrap();
//! assert_eq!(calculator.read_response(response).unwrap(), Outcome::Number(42.0));
//! ```

use thiserror::Error;
use wirewalk::{HandleInfo, Message, SchemaError};

pub mod calculator;
pub mod rot13;

pub use calculator::Calculator;
pub use rot13::Rot13;

/// Errors raised while serving or reading a demo message.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Codec error: {0}")]
    Codec(#[from] wirewalk::Error),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Unknown method ordinal {0:#x}")]
    UnknownOrdinal(u64),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Handler for requests of one protocol.
pub trait RequestHandler {
    /// Serve one request (header included) and return the response message.
    fn handle(&self, request: Vec<u8>, handles: Vec<HandleInfo>) -> ServiceResult<Message>;
}

/// Deliver `request` to `handler` as if it had crossed a channel.
pub fn call<H: RequestHandler + ?Sized>(handler: &H, request: Message) -> ServiceResult<Message> {
    let handles = request
        .handles
        .into_iter()
        .map(|disposition| disposition.into_info())
        .collect();
    handler.handle(request.bytes, handles)
}
