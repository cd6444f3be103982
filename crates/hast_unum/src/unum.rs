//! Unum values and their arithmetic.

use std::fmt;
use std::ops::{Add, Neg};
use std::sync::Arc;

use hast_common::BitMask;

use crate::metadata::UnumMetadata;

/// One unum value, read in the environment described by its metadata.
///
/// Values are immutable; every operation returns a new `Unum` sharing the same
/// environment.
#[derive(Clone, PartialEq, Eq)]
pub struct Unum {
    metadata: Arc<UnumMetadata>,
    bits: BitMask,
}

impl Unum {
    /// Wraps raw bits. The mask is resized to the environment width.
    pub fn from_bits(metadata: Arc<UnumMetadata>, bits: &BitMask) -> Self {
        let bits = bits.resize(metadata.size);
        Self { metadata, bits }
    }

    /// Exact zero with the smallest exponent and fraction sizes.
    pub fn zero(metadata: Arc<UnumMetadata>) -> Self {
        let bits = metadata.empty_bit_mask.clone();
        Self { metadata, bits }
    }

    /// Encodes a non-negative integer. Values that need more fraction bits
    /// than the environment offers come out inexact.
    pub fn from_u32(metadata: Arc<UnumMetadata>, value: u32) -> Self {
        Self::from_parts(metadata, false, &BitMask::from_u32(value, 32), 0, false)
    }

    /// The environment of this value.
    pub fn metadata(&self) -> &Arc<UnumMetadata> {
        &self.metadata
    }

    /// The raw bits.
    pub fn bits(&self) -> &BitMask {
        &self.bits
    }

    /// `true` when the sign bit is clear.
    pub fn is_positive(&self) -> bool {
        (&self.bits & &self.metadata.sign_bit_mask).is_zero()
    }

    /// `true` when the uncertainty bit is clear.
    pub fn is_exact(&self) -> bool {
        (&self.bits & &self.metadata.uncertainty_bit_mask).is_zero()
    }

    /// Width of the exponent field, 1-based.
    pub fn exponent_size(&self) -> u32 {
        let field = (&self.bits & &self.metadata.exponent_size_mask)
            >> i32::from(self.metadata.fraction_size_size);
        field.segment(0) + 1
    }

    /// Width of the fraction field, 1-based.
    pub fn fraction_size(&self) -> u32 {
        (&self.bits & &self.metadata.fraction_size_mask).segment(0) + 1
    }

    /// Mask selecting this value's exponent field.
    pub fn exponent_mask(&self) -> BitMask {
        let offset = self.metadata.unum_tag_size + self.fraction_size();
        self.low_ones(self.exponent_size()) << offset as i32
    }

    /// Mask selecting this value's fraction field.
    pub fn fraction_mask(&self) -> BitMask {
        self.low_ones(self.fraction_size()) << self.metadata.unum_tag_size as i32
    }

    /// The exponent field shifted to the right end.
    pub fn exponent(&self) -> BitMask {
        let offset = self.metadata.unum_tag_size + self.fraction_size();
        (&self.bits & &self.exponent_mask()) >> offset as i32
    }

    /// The fraction field shifted to the right end.
    pub fn fraction(&self) -> BitMask {
        (&self.bits & &self.fraction_mask()) >> self.metadata.unum_tag_size as i32
    }

    /// Exponent bias, `2^(exponent_size - 1) - 1`.
    pub fn bias(&self) -> i64 {
        (1i64 << (self.exponent_size() - 1)) - 1
    }

    /// The hidden bit is one for every non-zero exponent.
    pub fn hidden_bit_is_one(&self) -> bool {
        !self.exponent().is_zero()
    }

    /// The fraction with the hidden bit placed above it.
    pub fn fraction_with_hidden_bit(&self) -> BitMask {
        let fraction = self.fraction();
        if self.hidden_bit_is_one() {
            fraction.set_one(self.fraction_size())
        } else {
            fraction
        }
    }

    /// `true` for the environment's positive infinity.
    pub fn is_positive_infinity(&self) -> bool {
        self.bits == self.metadata.positive_infinity
    }

    /// `true` for the environment's negative infinity.
    pub fn is_negative_infinity(&self) -> bool {
        self.bits == self.metadata.negative_infinity
    }

    /// `true` for either NaN.
    pub fn is_nan(&self) -> bool {
        self.bits == self.metadata.quiet_not_a_number
            || self.bits == self.metadata.signaling_not_a_number
    }

    /// Flips the sign bit.
    pub fn negate(&self) -> Self {
        Self {
            metadata: Arc::clone(&self.metadata),
            bits: &self.bits ^ &self.metadata.sign_bit_mask,
        }
    }

    /// Converts to an integer, truncating any fraction.
    ///
    /// Returns `None` for NaN, infinities, negative values and magnitudes
    /// that do not fit in 32 bits.
    pub fn to_u32(&self) -> Option<u32> {
        if self.is_nan() || self.is_positive_infinity() || self.is_negative_infinity() {
            return None;
        }

        let (negative, significand, scale) = self.decompose();
        if significand.is_zero() {
            return Some(0);
        }
        if negative {
            return None;
        }

        if scale >= 0 {
            if i64::from(significand.find_leading_one()) + scale > 32 {
                return None;
            }
            Some((significand.resize(32) << scale as i32).segment(0))
        } else {
            let shifted = &significand >> (-scale).min(i64::from(i32::MAX)) as i32;
            if shifted.find_leading_one() > 32 {
                return None;
            }
            Some(shifted.segment(0))
        }
    }

    /// Adds two values of the same environment.
    ///
    /// NaN and infinities propagate. Finite inexact operands contribute their
    /// lower endpoint and mark the sum inexact.
    pub fn add_exact(&self, other: &Unum) -> Unum {
        debug_assert_eq!(self.metadata, other.metadata);
        let metadata = &self.metadata;

        if self.is_nan() || other.is_nan() {
            return self.special(&metadata.quiet_not_a_number);
        }
        let self_infinite = self.is_positive_infinity() || self.is_negative_infinity();
        let other_infinite = other.is_positive_infinity() || other.is_negative_infinity();
        match (self_infinite, other_infinite) {
            (true, true) if self.is_positive() != other.is_positive() => {
                return self.special(&metadata.quiet_not_a_number);
            }
            (true, _) => return self.clone(),
            (false, true) => return other.clone(),
            (false, false) => {}
        }

        let (left_negative, left_significand, left_scale) = self.decompose();
        let (right_negative, right_significand, right_scale) = other.decompose();

        let guard = i64::from(metadata.fraction_size_max) + 2;
        let width = metadata.size + guard as u32 + 2;
        let base = left_scale.max(right_scale) - guard;

        let (left, left_lost) = align(&left_significand, left_scale - base, width);
        let (right, right_lost) = align(&right_significand, right_scale - base, width);

        let (magnitude, negative) = if left_negative == right_negative {
            (&left + &right, left_negative)
        } else if left >= right {
            (&left - &right, left_negative)
        } else {
            (&right - &left, right_negative)
        };

        let inexact = !self.is_exact() || !other.is_exact() || left_lost || right_lost;
        Self::from_parts(Arc::clone(metadata), negative, &magnitude, base, inexact)
    }

    /// Splits a finite value into sign, integer significand and binary scale
    /// so that the magnitude is `significand * 2^scale`.
    fn decompose(&self) -> (bool, BitMask, i64) {
        let exponent = i64::from(self.exponent().segment(0));
        let effective_exponent = if exponent == 0 {
            1 - self.bias()
        } else {
            exponent - self.bias()
        };
        let scale = effective_exponent - i64::from(self.fraction_size());
        (!self.is_positive(), self.fraction_with_hidden_bit(), scale)
    }

    /// Encodes `significand * 2^scale` with the smallest fitting sizes.
    fn from_parts(
        metadata: Arc<UnumMetadata>,
        negative: bool,
        significand: &BitMask,
        scale: i64,
        inexact: bool,
    ) -> Self {
        let leading = significand.find_leading_one();
        if leading == 0 {
            let mut bits = metadata.empty_bit_mask.clone();
            if inexact {
                bits = &bits | &metadata.uncertainty_bit_mask;
            }
            return Self { metadata, bits };
        }

        let fraction_bits = metadata.fraction_size_max;
        let hidden_index = leading - 1;
        let width = significand.size().max(leading + fraction_bits + 1);
        let significand = significand.resize(width);
        let one = BitMask::from_u32(1, width);
        let fraction_field = (&one << fraction_bits as i32).decrement();
        let mut inexact = inexact;

        let aligned = if hidden_index > fraction_bits {
            let dropped = hidden_index - fraction_bits;
            let dropped_mask = (&one << dropped as i32).decrement();
            if !(&significand & &dropped_mask).is_zero() {
                inexact = true;
            }
            (&significand >> dropped as i32) & &fraction_field
        } else {
            (&significand << (fraction_bits - hidden_index) as i32) & &fraction_field
        };

        let trailing = aligned.find_trailing_one();
        let (fraction, fraction_size) = if trailing == 0 {
            (aligned, 1)
        } else {
            (&aligned >> (trailing - 1) as i32, fraction_bits - (trailing - 1))
        };

        let exponent = scale + i64::from(hidden_index);
        let encoding = (1..=metadata.exponent_size_max).find_map(|exponent_size| {
            let biased = exponent + (1i64 << (exponent_size - 1)) - 1;
            (1..(1i64 << exponent_size)).contains(&biased).then_some((exponent_size, biased))
        });

        let Some((exponent_size, biased)) = encoding else {
            let bits = if exponent > 0 {
                metadata.max_real_u.clone()
            } else {
                &metadata.exponent_and_fraction_size_mask | &metadata.uncertainty_bit_mask
            };
            return Self::signed(metadata, bits, negative);
        };

        let bits = Self::assemble(
            &metadata,
            biased as u32,
            &fraction,
            exponent_size,
            fraction_size,
            inexact,
        );
        let clean = &bits & &!&metadata.sign_bit_mask;
        if clean == metadata.positive_infinity
            || clean == (&metadata.positive_infinity | &metadata.uncertainty_bit_mask)
        {
            let bits = metadata.max_real_u.clone();
            return Self::signed(metadata, bits, negative);
        }
        Self::signed(metadata, bits, negative)
    }

    fn assemble(
        metadata: &UnumMetadata,
        exponent: u32,
        fraction: &BitMask,
        exponent_size: u32,
        fraction_size: u32,
        inexact: bool,
    ) -> BitMask {
        let size = metadata.size;
        let tag = metadata.unum_tag_size;
        let mut bits = BitMask::from_u32(exponent_size - 1, size)
            << i32::from(metadata.fraction_size_size);
        bits = bits | BitMask::from_u32(fraction_size - 1, size);
        bits = bits | (fraction.resize(size) << tag as i32);
        bits = bits | (BitMask::from_u32(exponent, size) << (tag + fraction_size) as i32);
        if inexact {
            bits = bits | &metadata.uncertainty_bit_mask;
        }
        bits
    }

    fn signed(metadata: Arc<UnumMetadata>, bits: BitMask, negative: bool) -> Self {
        let bits = if negative {
            &bits | &metadata.sign_bit_mask
        } else {
            bits
        };
        Self { metadata, bits }
    }

    fn special(&self, bits: &BitMask) -> Self {
        Self {
            metadata: Arc::clone(&self.metadata),
            bits: bits.clone(),
        }
    }

    fn low_ones(&self, count: u32) -> BitMask {
        (self.metadata.empty_bit_mask.increment() << count as i32).decrement()
    }
}

/// Places `significand` at `offset` bits above the common base, reporting
/// whether any set bit fell off the right end.
fn align(significand: &BitMask, offset: i64, width: u32) -> (BitMask, bool) {
    let significand = significand.resize(width);
    if offset >= 0 {
        return (significand << offset as i32, false);
    }
    let amount = -offset;
    if amount >= i64::from(width) {
        let lost = !significand.is_zero();
        return (BitMask::zero(width), lost);
    }
    let dropped = (BitMask::from_u32(1, width) << amount as i32).decrement();
    let lost = !(&significand & &dropped).is_zero();
    (significand >> amount as i32, lost)
}

impl Add for &Unum {
    type Output = Unum;

    fn add(self, rhs: &Unum) -> Unum {
        self.add_exact(rhs)
    }
}

impl Neg for &Unum {
    type Output = Unum;

    fn neg(self) -> Unum {
        self.negate()
    }
}

impl fmt::Debug for Unum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unum(({}, {}) {})",
            self.metadata.exponent_size_size, self.metadata.fraction_size_size, self.bits
        )
    }
}
