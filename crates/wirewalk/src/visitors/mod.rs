// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Visitor policies driven by the [`Walker`](crate::walker::Walker).
//!
//! | Policy | Memory | Continues after violation | Absent collections |
//! |--------|--------|---------------------------|--------------------|
//! | [`Validator`] | `&[u8]` | no | rejected |
//! | [`ExhaustiveValidator`] | `&[u8]` | yes | rejected |
//! | [`DecodeVisitor`] | flat buffer, rewritten in place | no | rejected |
//! | [`EncodeVisitor`] | [`ObjectGraph`](crate::ObjectGraph) to encoder | no | encoded empty |
//! | [`HandleReleaseVisitor`] | [`ObjectGraph`](crate::ObjectGraph) | yes | tolerated |

mod decode;
mod encode;
mod release;
mod validate;
mod wire;

pub use decode::DecodeVisitor;
pub use encode::{EncodePosition, EncodeVisitor};
pub use release::{release_handles, HandleReleaseVisitor};
pub use validate::{ExhaustiveValidator, ValidateVisitor, Validator};
