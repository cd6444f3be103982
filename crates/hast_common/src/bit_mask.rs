//! Fixed-width unsigned bit vectors with hardware-style arithmetic.
//!
//! A [`BitMask`] models a register of a given width: sums and differences wrap
//! within that width, shifts drop the bits that leave it, and bitwise operators
//! only combine masks of equal size. Width mismatches never fail; they degrade to
//! well-defined results so constant folding always terminates with some value.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, BitAnd, BitOr, BitXor, Not, Shl, Shr, Sub};

/// Number of bits stored per segment.
pub const SEGMENT_BITS: u32 = 32;

/// An arbitrary-width unsigned integer stored as 32-bit segments.
///
/// Segments are ordered least-significant first and there are always exactly
/// `ceil(size / 32)` of them. Bits at index `size` and above in the highest
/// segment are kept at zero.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawBitMask")]
pub struct BitMask {
    size: u32,
    segments: Vec<u32>,
}

/// The serialized form of a [`BitMask`], checked before it becomes one.
#[derive(Deserialize)]
struct RawBitMask {
    size: u32,
    segments: Vec<u32>,
}

/// Error returned when a serialized mask has the wrong number of segments.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("a {size}-bit mask needs {expected} segments, found {found}")]
pub struct InvalidBitMask {
    /// Declared width.
    pub size: u32,
    /// Segments the width requires.
    pub expected: usize,
    /// Segments present.
    pub found: usize,
}

impl TryFrom<RawBitMask> for BitMask {
    type Error = InvalidBitMask;

    fn try_from(raw: RawBitMask) -> Result<Self, Self::Error> {
        let expected = segment_count(raw.size);
        if raw.segments.len() != expected {
            return Err(InvalidBitMask {
                size: raw.size,
                expected,
                found: raw.segments.len(),
            });
        }
        let mut mask = Self {
            size: raw.size,
            segments: raw.segments,
        };
        mask.clear_unused_bits();
        Ok(mask)
    }
}

impl BitMask {
    /// Creates a mask of exactly `size` bits, either all zero or all one.
    pub fn new(size: u32, all_one: bool) -> Self {
        let fill = if all_one { u32::MAX } else { 0 };
        let mut mask = Self {
            size,
            segments: vec![fill; segment_count(size)],
        };
        mask.clear_unused_bits();
        mask
    }

    /// Creates an all-zero mask of `size` bits.
    pub fn zero(size: u32) -> Self {
        Self::new(size, false)
    }

    /// Creates a mask from explicit segments, least-significant first.
    ///
    /// Without a `size` the mask spans every given segment. With a `size` the
    /// segment list is padded with zero words or shortened to fit, but the size
    /// is never made smaller than the position of the highest set bit, so no set
    /// bit is lost.
    pub fn from_segments(segments: &[u32], size: Option<u32>) -> Self {
        let size = match size {
            None => segments.len() as u32 * SEGMENT_BITS,
            Some(size) => size.max(leading_one_position(segments)),
        };
        let mut words = segments.to_vec();
        words.resize(segment_count(size), 0);
        let mut mask = Self {
            size,
            segments: words,
        };
        mask.clear_unused_bits();
        mask
    }

    /// Creates a mask of `size` bits holding `value`.
    pub fn from_u32(value: u32, size: u32) -> Self {
        Self::from_segments(&[value], Some(size))
    }

    /// Returns a mask of `size` bits holding the low `size` bits of `self`.
    ///
    /// Unlike [`from_segments`](Self::from_segments) this truncates.
    pub fn resize(&self, size: u32) -> Self {
        let mut segments = self.segments.clone();
        segments.resize(segment_count(size), 0);
        let mut mask = Self { size, segments };
        mask.clear_unused_bits();
        mask
    }

    /// Returns the width of the mask in bits.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Returns the number of 32-bit segments backing the mask.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Returns the segments, least-significant first.
    pub fn segments(&self) -> &[u32] {
        &self.segments
    }

    /// Returns the segment at `index`, or zero past the last segment.
    pub fn segment(&self, index: usize) -> u32 {
        self.segments.get(index).copied().unwrap_or(0)
    }

    /// Returns a copy with the segment at `index` replaced.
    ///
    /// Out-of-range indices leave the mask unchanged.
    pub fn set_segment(&self, index: usize, value: u32) -> Self {
        let mut mask = self.clone();
        if let Some(segment) = mask.segments.get_mut(index) {
            *segment = value;
            mask.clear_unused_bits();
        }
        mask
    }

    /// Returns the bit at `index`; bits outside the mask read as zero.
    pub fn get_bit(&self, index: u32) -> bool {
        if index >= self.size {
            return false;
        }
        let segment = self.segments[(index / SEGMENT_BITS) as usize];
        segment >> (index % SEGMENT_BITS) & 1 == 1
    }

    /// Returns `true` if no bit is set.
    pub fn is_zero(&self) -> bool {
        self.segments.iter().all(|segment| *segment == 0)
    }

    /// Returns a copy with the bit at `index` set to one.
    ///
    /// Indices above the size return the mask unchanged. The guard admits an
    /// index equal to the size; that bit lies outside the mask and is cleared
    /// again, so the width never grows.
    pub fn set_one(&self, index: u32) -> Self {
        if index > self.size {
            return self.clone();
        }
        let mut mask = self.clone();
        if let Some(segment) = mask.segments.get_mut((index / SEGMENT_BITS) as usize) {
            *segment |= 1 << (index % SEGMENT_BITS);
        }
        mask.clear_unused_bits();
        mask
    }

    /// Returns a copy with the bit at `index` cleared.
    ///
    /// Uses the same inclusive bounds check as [`set_one`](Self::set_one).
    pub fn set_zero(&self, index: u32) -> Self {
        if index > self.size {
            return self.clone();
        }
        let mut mask = self.clone();
        if let Some(segment) = mask.segments.get_mut((index / SEGMENT_BITS) as usize) {
            *segment &= !(1 << (index % SEGMENT_BITS));
        }
        mask.clear_unused_bits();
        mask
    }

    /// Returns the 1-based position of the most significant set bit, or 0 if
    /// the mask is zero.
    pub fn find_leading_one(&self) -> u32 {
        leading_one_position(&self.segments)
    }

    /// Returns the 1-based position of the least significant set bit, or 0 if
    /// the mask is zero.
    pub fn find_trailing_one(&self) -> u32 {
        self.segments
            .iter()
            .enumerate()
            .find(|(_, segment)| **segment != 0)
            .map(|(i, segment)| i as u32 * SEGMENT_BITS + segment.trailing_zeros() + 1)
            .unwrap_or(0)
    }

    /// Shifts the mask right until its lowest bit is one.
    ///
    /// A zero mask is returned unchanged.
    pub fn shift_to_right_end(&self) -> Self {
        if self.is_zero() {
            return self.clone();
        }
        self.shift_right_by(self.find_trailing_one() - 1)
    }

    /// Returns `self + 1`, wrapping within the width.
    pub fn increment(&self) -> Self {
        self.add_u32(1)
    }

    /// Returns `self - 1`, wrapping within the width.
    pub fn decrement(&self) -> Self {
        self.sub_u32(1)
    }

    /// Ripple-carry addition sized to `self`; `rhs` is zero-extended or truncated.
    pub fn wrapping_add(&self, rhs: &BitMask) -> Self {
        self.add_segments(|i| rhs.segment(i))
    }

    /// Subtraction sized to `self`; `rhs` is zero-extended or truncated.
    pub fn wrapping_sub(&self, rhs: &BitMask) -> Self {
        self.sub_segments(|i| rhs.segment(i))
    }

    fn add_u32(&self, value: u32) -> Self {
        self.add_segments(|i| if i == 0 { value } else { 0 })
    }

    fn sub_u32(&self, value: u32) -> Self {
        self.sub_segments(|i| if i == 0 { value } else { 0 })
    }

    fn add_segments(&self, rhs: impl Fn(usize) -> u32) -> Self {
        let mut result = self.clone();
        let mut carry = 0u64;
        for (i, segment) in result.segments.iter_mut().enumerate() {
            let sum = u64::from(*segment) + u64::from(rhs(i)) + carry;
            *segment = sum as u32;
            carry = sum >> SEGMENT_BITS;
        }
        result.clear_unused_bits();
        result
    }

    fn sub_segments(&self, rhs: impl Fn(usize) -> u32) -> Self {
        let mut result = self.clone();
        let mut borrow = 0i64;
        for (i, segment) in result.segments.iter_mut().enumerate() {
            let mut difference = i64::from(*segment) - i64::from(rhs(i)) - borrow;
            borrow = 0;
            if difference < 0 {
                difference += 1 << SEGMENT_BITS;
                borrow = 1;
            }
            *segment = difference as u32;
        }
        result.clear_unused_bits();
        result
    }

    fn combine(&self, rhs: &BitMask, op: impl Fn(u32, u32) -> u32) -> Self {
        if self.size != rhs.size {
            return Self::zero(self.size);
        }
        let segments = self
            .segments
            .iter()
            .zip(&rhs.segments)
            .map(|(left, right)| op(*left, *right))
            .collect();
        let mut result = Self {
            size: self.size,
            segments,
        };
        result.clear_unused_bits();
        result
    }

    /// Shifts left by `amount` bits; a negative amount shifts right.
    pub fn shift_left(&self, amount: i32) -> Self {
        if amount < 0 {
            self.shift_right_by(amount.unsigned_abs())
        } else {
            self.shift_left_by(amount as u32)
        }
    }

    /// Shifts right by `amount` bits; a negative amount shifts left.
    pub fn shift_right(&self, amount: i32) -> Self {
        if amount < 0 {
            self.shift_left_by(amount.unsigned_abs())
        } else {
            self.shift_right_by(amount as u32)
        }
    }

    fn shift_left_by(&self, amount: u32) -> Self {
        let mut result = Self::zero(self.size);
        if amount >= self.size {
            return result;
        }
        for index in (0..self.size - amount).filter(|i| self.get_bit(*i)) {
            result.set_bit_in_place(index + amount);
        }
        result
    }

    fn shift_right_by(&self, amount: u32) -> Self {
        let mut result = Self::zero(self.size);
        if amount >= self.size {
            return result;
        }
        for index in (amount..self.size).filter(|i| self.get_bit(*i)) {
            result.set_bit_in_place(index - amount);
        }
        result
    }

    fn set_bit_in_place(&mut self, index: u32) {
        self.segments[(index / SEGMENT_BITS) as usize] |= 1 << (index % SEGMENT_BITS);
    }

    fn clear_unused_bits(&mut self) {
        let used = self.size % SEGMENT_BITS;
        if used != 0 {
            if let Some(top) = self.segments.last_mut() {
                *top &= (1u32 << used) - 1;
            }
        }
    }
}

impl PartialOrd for BitMask {
    /// Compares segments from most to least significant.
    ///
    /// Masks of different sizes are not comparable.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.size != other.size {
            return None;
        }
        Some(self.segments.iter().rev().cmp(other.segments.iter().rev()))
    }
}

impl fmt::Display for BitMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        if self.segments.is_empty() {
            return write!(f, "0");
        }
        for segment in self.segments.iter().rev() {
            write!(f, "{segment:08X}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for BitMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitMask({}: {self})", self.size)
    }
}

macro_rules! impl_mask_op {
    ($trait:ident, $method:ident, $inner:expr) => {
        impl $trait<&BitMask> for &BitMask {
            type Output = BitMask;

            fn $method(self, rhs: &BitMask) -> BitMask {
                $inner(self, rhs)
            }
        }

        impl $trait<&BitMask> for BitMask {
            type Output = BitMask;

            fn $method(self, rhs: &BitMask) -> BitMask {
                $inner(&self, rhs)
            }
        }

        impl $trait<BitMask> for BitMask {
            type Output = BitMask;

            fn $method(self, rhs: BitMask) -> BitMask {
                $inner(&self, &rhs)
            }
        }
    };
}

macro_rules! impl_scalar_op {
    ($trait:ident, $method:ident, $rhs:ty, $inner:expr) => {
        impl $trait<$rhs> for &BitMask {
            type Output = BitMask;

            fn $method(self, rhs: $rhs) -> BitMask {
                $inner(self, rhs)
            }
        }

        impl $trait<$rhs> for BitMask {
            type Output = BitMask;

            fn $method(self, rhs: $rhs) -> BitMask {
                $inner(&self, rhs)
            }
        }
    };
}

impl_mask_op!(Add, add, BitMask::wrapping_add);
impl_mask_op!(Sub, sub, BitMask::wrapping_sub);
impl_mask_op!(BitAnd, bitand, |l: &BitMask, r: &BitMask| l.combine(r, |a, b| a & b));
impl_mask_op!(BitOr, bitor, |l: &BitMask, r: &BitMask| l.combine(r, |a, b| a | b));
impl_mask_op!(BitXor, bitxor, |l: &BitMask, r: &BitMask| l.combine(r, |a, b| a ^ b));
impl_scalar_op!(Add, add, u32, BitMask::add_u32);
impl_scalar_op!(Sub, sub, u32, BitMask::sub_u32);
impl_scalar_op!(Shl, shl, i32, BitMask::shift_left);
impl_scalar_op!(Shr, shr, i32, BitMask::shift_right);

impl Not for &BitMask {
    type Output = BitMask;

    fn not(self) -> BitMask {
        let mut result = BitMask {
            size: self.size,
            segments: self.segments.iter().map(|segment| !segment).collect(),
        };
        result.clear_unused_bits();
        result
    }
}

impl Not for BitMask {
    type Output = BitMask;

    fn not(self) -> BitMask {
        !&self
    }
}

/// Returns the number of segments needed for `size` bits.
fn segment_count(size: u32) -> usize {
    size.div_ceil(SEGMENT_BITS) as usize
}

fn leading_one_position(segments: &[u32]) -> u32 {
    segments
        .iter()
        .enumerate()
        .rev()
        .find(|(_, segment)| **segment != 0)
        .map(|(i, segment)| i as u32 * SEGMENT_BITS + (SEGMENT_BITS - segment.leading_zeros()))
        .unwrap_or(0)
}
