// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Addressing primitives: positions, bounds-checked scalar access and
//! 32-bit checked size arithmetic.
//!
//! All out-of-line offset computations go through [`checked_add`],
//! [`checked_mul`], [`align_up`] or [`add_out_of_line`]. A `None` from any of
//! them is a fatal condition for the caller.

use crate::config::ALIGNMENT;

/// Generate [`Scalar`] impls for the fixed-width little-endian types
macro_rules! impl_scalar {
    ($($type:ty),* $(,)?) => {
        $(
            impl Scalar for $type {
                const SIZE: u32 = std::mem::size_of::<$type>() as u32;

                fn from_le_slice(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$type>()];
                    raw.copy_from_slice(bytes);
                    <$type>::from_le_bytes(raw)
                }

                fn write_le(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

/// Fixed-width value stored little-endian on the wire.
pub trait Scalar: Copy {
    const SIZE: u32;

    /// Decode from exactly `SIZE` bytes.
    fn from_le_slice(bytes: &[u8]) -> Self;

    /// Encode into exactly `SIZE` bytes.
    fn write_le(self, out: &mut [u8]);
}

impl_scalar!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

/// Round `n` up to the next multiple of [`ALIGNMENT`].
///
/// Returns `None` when the result does not fit in 32 bits.
pub fn align_up(n: u32) -> Option<u32> {
    let mask = ALIGNMENT - 1;
    n.checked_add(mask).map(|v| v & !mask)
}

/// 32-bit addition that fails instead of wrapping.
pub fn checked_add(a: u32, b: u32) -> Option<u32> {
    a.checked_add(b)
}

/// 32-bit multiplication that fails instead of wrapping.
pub fn checked_mul(a: u32, b: u32) -> Option<u32> {
    a.checked_mul(b)
}

/// Advance an out-of-line `offset` by `size`, keeping the result aligned.
///
/// A 4-byte object still moves the next out-of-line offset by 8.
pub fn add_out_of_line(offset: u32, size: u32) -> Option<u32> {
    checked_add(offset, size).and_then(align_up)
}

/// Cursor over a message: a base (segment) and a byte offset within it.
///
/// Segment 0 holds the primary object. In a flat wire buffer every
/// out-of-line object also lives in segment 0; in an object graph each
/// out-of-line object has its own segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub segment: u32,
    pub offset: u32,
}

impl Position {
    pub const fn new(segment: u32, offset: u32) -> Self {
        Self { segment, offset }
    }

    /// Position inside the primary (inline) segment.
    pub const fn inline(offset: u32) -> Self {
        Self::new(0, offset)
    }

    pub fn is_inline(&self) -> bool {
        self.segment == 0
    }

    pub fn read<T: Scalar, M: Memory + ?Sized>(self, memory: &M) -> Option<T> {
        memory.slice(self, T::SIZE).map(T::from_le_slice)
    }

    pub fn write<T: Scalar, M: MemoryMut + ?Sized>(self, memory: &mut M, value: T) -> Option<()> {
        value.write_le(memory.slice_mut(self, T::SIZE)?);
        Some(())
    }
}

/// Checked forward movement of a cursor.
pub trait Advance: Copy {
    fn advance(self, delta: u32) -> Option<Self>;
}

impl Advance for Position {
    fn advance(self, delta: u32) -> Option<Self> {
        Some(Self {
            segment: self.segment,
            offset: checked_add(self.offset, delta)?,
        })
    }
}

/// Read access to the bytes a position refers to.
pub trait Memory {
    /// `len` bytes starting at `position`, or `None` when out of bounds.
    fn slice(&self, position: Position, len: u32) -> Option<&[u8]>;
}

/// Write access to the bytes a position refers to.
pub trait MemoryMut: Memory {
    fn slice_mut(&mut self, position: Position, len: u32) -> Option<&mut [u8]>;
}

fn byte_range(position: Position, len: u32, available: usize) -> Option<std::ops::Range<usize>> {
    let start = position.offset as usize;
    let end = start.checked_add(len as usize)?;
    (end <= available).then_some(start..end)
}

impl Memory for [u8] {
    fn slice(&self, position: Position, len: u32) -> Option<&[u8]> {
        if !position.is_inline() {
            return None;
        }
        let range = byte_range(position, len, self.len())?;
        self.get(range)
    }
}

impl MemoryMut for [u8] {
    fn slice_mut(&mut self, position: Position, len: u32) -> Option<&mut [u8]> {
        if !position.is_inline() {
            return None;
        }
        let range = byte_range(position, len, self.len())?;
        self.get_mut(range)
    }
}

impl Memory for Vec<u8> {
    fn slice(&self, position: Position, len: u32) -> Option<&[u8]> {
        self.as_slice().slice(position, len)
    }
}

impl MemoryMut for Vec<u8> {
    fn slice_mut(&mut self, position: Position, len: u32) -> Option<&mut [u8]> {
        self.as_mut_slice().slice_mut(position, len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0), Some(0));
        assert_eq!(align_up(1), Some(8));
        assert_eq!(align_up(8), Some(8));
        assert_eq!(align_up(12), Some(16));
        assert_eq!(align_up(u32::MAX - 7), Some(u32::MAX - 7));
        assert_eq!(align_up(u32::MAX - 6), None);
    }

    #[test]
    fn test_checked_arithmetic_fails_closed() {
        assert_eq!(checked_add(u32::MAX, 1), None);
        assert_eq!(checked_add(7, 9), Some(16));
        assert_eq!(checked_mul(0x1_0000, 0x1_0000), None);
        assert_eq!(checked_mul(5, 16), Some(80));
    }

    #[test]
    fn test_add_out_of_line_keeps_alignment() {
        assert_eq!(add_out_of_line(16, 4), Some(24));
        assert_eq!(add_out_of_line(16, 0), Some(16));
        assert_eq!(add_out_of_line(u32::MAX - 3, 1), None);
        assert_eq!(add_out_of_line(u32::MAX - 8, 4), None);
    }

    #[test]
    fn test_position_read_write_bounds() {
        let mut buffer = vec![0u8; 8];
        let at = Position::inline(4);
        at.write(&mut buffer, 42u32).expect("fits");
        assert_eq!(at.read::<u32, _>(&buffer), Some(42));
        assert_eq!(buffer[4..8], [42, 0, 0, 0]);

        assert_eq!(Position::inline(5).read::<u32, _>(&buffer), None);
        assert!(Position::inline(8).write(&mut buffer, 1u8).is_none());
        assert_eq!(Position::new(1, 0).read::<u8, _>(&buffer), None);
        assert_eq!(Position::inline(u32::MAX).read::<u64, _>(&buffer), None);
    }

    #[test]
    fn test_signed_and_float_scalars() {
        let mut buffer = vec![0u8; 16];
        Position::inline(0).write(&mut buffer, -2i16).expect("fits");
        Position::inline(8).write(&mut buffer, 6.25f64).expect("fits");
        assert_eq!(Position::inline(0).read::<i16, _>(&buffer), Some(-2));
        assert_eq!(Position::inline(0).read::<u16, _>(&buffer), Some(0xFFFE));
        assert_eq!(Position::inline(8).read::<f64, _>(&buffer), Some(6.25));
    }

    #[test]
    fn test_advance_overflow() {
        let at = Position::new(3, u32::MAX - 1);
        assert_eq!(at.advance(1), Some(Position::new(3, u32::MAX)));
        assert_eq!(at.advance(2), None);
    }
}
