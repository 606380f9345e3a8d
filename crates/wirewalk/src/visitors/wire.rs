// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bookkeeping shared by the decode-direction policies.

use crate::config::{ALLOC_PRESENT, HANDLE_PRESENT};
use crate::error::{Diagnostics, Status, Violation};
use crate::position::{add_out_of_line, Memory, Position};
use crate::walker::Envelope;
use std::ops::Range;

#[derive(Debug, Clone, Copy)]
struct EnvelopeFrame {
    bytes_start: u32,
    handles_start: u32,
    num_bytes: u32,
    num_handles: u32,
}

/// Out-of-line cursor, handle cursor and envelope stack over a flat
/// received message.
#[derive(Debug)]
pub(crate) struct WireState {
    next_out_of_line: u32,
    buffer_len: u32,
    handle_index: u32,
    num_handles: u32,
    frames: Vec<EnvelopeFrame>,
    pub(crate) diagnostics: Diagnostics,
}

impl WireState {
    pub(crate) fn new(buffer_len: u32, num_handles: u32, first_out_of_line: u32) -> Self {
        Self {
            next_out_of_line: first_out_of_line,
            buffer_len,
            handle_index: 0,
            num_handles,
            frames: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    pub(crate) fn report(&mut self, violation: Violation, message: &str) {
        self.diagnostics.report(violation, message);
    }

    fn fail(&mut self, violation: Violation, message: &str) -> Violation {
        self.report(violation, message);
        violation
    }

    /// Claim the next out-of-line object for the pointer at `slot`.
    ///
    /// Objects are laid out in traversal order, each followed by zeroed
    /// padding up to the next alignment boundary.
    pub(crate) fn claim<M: Memory + ?Sized>(
        &mut self,
        bytes: &M,
        slot: Position,
        size: u32,
    ) -> Result<u32, Violation> {
        let Some(presence) = slot.read::<u64, M>(bytes) else {
            return Err(self.fail(Violation::Memory, "read outside message bounds"));
        };
        if presence != ALLOC_PRESENT {
            return Err(self.fail(Violation::Constraint, "encountered invalid pointer"));
        }
        let start = self.next_out_of_line;
        let Some(end) = add_out_of_line(start, size) else {
            return Err(self.fail(Violation::Memory, "out-of-line offset overflows 32 bits"));
        };
        if end > self.buffer_len {
            return Err(self.fail(Violation::Memory, "pointed offset exceeds buffer size"));
        }
        self.next_out_of_line = end;

        // start + size <= end, so this cannot wrap.
        let padding_at = Position::inline(start + size);
        match bytes.slice(padding_at, end - start - size) {
            Some(padding) if padding.iter().all(|b| *b == 0) => Ok(start),
            Some(_) => Err(self.fail(
                Violation::Constraint,
                "non-zero padding bytes detected at end of out-of-line object",
            )),
            None => Err(self.fail(Violation::Memory, "read outside message bounds")),
        }
    }

    /// Claim the next handle for a slot holding `presence`; returns its index
    /// in the handle table.
    pub(crate) fn claim_handle(&mut self, presence: u32) -> Result<u32, Violation> {
        if presence != HANDLE_PRESENT {
            return Err(self.fail(Violation::Constraint, "invalid handle presence marker"));
        }
        if self.handle_index >= self.num_handles {
            return Err(self.fail(Violation::Constraint, "message has too many handles"));
        }
        let index = self.handle_index;
        self.handle_index += 1;
        Ok(index)
    }

    pub(crate) fn check_padding<M: Memory + ?Sized>(
        &mut self,
        bytes: &M,
        position: Position,
        len: u32,
    ) -> Status {
        match bytes.slice(position, len) {
            Some(padding) if padding.iter().all(|b| *b == 0) => Ok(()),
            Some(_) => Err(self.fail(Violation::Constraint, "non-zero padding bytes detected")),
            None => Err(self.fail(Violation::Memory, "read outside message bounds")),
        }
    }

    /// Open an envelope frame. For a present envelope of unknown type,
    /// returns the handle indices its payload carries; they are skipped.
    pub(crate) fn enter_envelope(
        &mut self,
        envelope: &Envelope,
        known: bool,
    ) -> Result<Range<u32>, Violation> {
        if !envelope.is_present() && (envelope.num_bytes != 0 || envelope.num_handles != 0) {
            return Err(self.fail(
                Violation::Constraint,
                "envelope has absent data pointer, yet has data and/or handles",
            ));
        }
        let remaining = self.num_handles - self.handle_index;
        if envelope.num_handles > remaining {
            return Err(self.fail(
                Violation::Constraint,
                "envelope has more handles than the message",
            ));
        }
        self.frames.push(EnvelopeFrame {
            bytes_start: self.next_out_of_line,
            handles_start: self.handle_index,
            num_bytes: envelope.num_bytes,
            num_handles: envelope.num_handles,
        });

        let start = self.handle_index;
        if !known && envelope.is_present() {
            self.handle_index += envelope.num_handles;
        }
        Ok(start..self.handle_index)
    }

    pub(crate) fn leave_envelope(&mut self) -> Status {
        let Some(frame) = self.frames.pop() else {
            return Err(self.fail(Violation::Memory, "unbalanced envelope"));
        };
        if self.next_out_of_line - frame.bytes_start != frame.num_bytes {
            return Err(self.fail(
                Violation::Constraint,
                "envelope has an incorrect number of bytes",
            ));
        }
        if self.handle_index - frame.handles_start != frame.num_handles {
            return Err(self.fail(
                Violation::Constraint,
                "envelope has an incorrect number of handles",
            ));
        }
        Ok(())
    }

    /// After a clean walk, every byte and handle must have been consumed.
    pub(crate) fn finish(&mut self) {
        if !self.diagnostics.is_empty() {
            return;
        }
        if self.next_out_of_line != self.buffer_len {
            self.report(
                Violation::Constraint,
                "message did not consume all provided bytes",
            );
        } else if self.handle_index != self.num_handles {
            self.report(
                Violation::Constraint,
                "message did not reference all provided handles",
            );
        }
    }
}
