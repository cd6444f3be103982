//! Environment metadata: field widths and canonical special values.

use hast_common::BitMask;
use serde::{Deserialize, Serialize};

/// Largest supported exponent size size. Exponent values are handled as
/// 64-bit integers, so the exponent field is capped at 32 bits.
pub const MAX_EXPONENT_SIZE_SIZE: u8 = 5;

/// Largest supported fraction size size (fractions up to 2048 bits).
pub const MAX_FRACTION_SIZE_SIZE: u8 = 11;

/// Errors raised when an unum environment cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnumError {
    /// One of the size sizes is zero or above the supported maximum.
    #[error(
        "unsupported unum environment ({exponent_size_size}, {fraction_size_size}): \
         exponent size size must be 1..=5 and fraction size size 1..=11"
    )]
    UnsupportedEnvironment {
        /// The requested exponent size size.
        exponent_size_size: u8,
        /// The requested fraction size size.
        fraction_size_size: u8,
    },
}

/// Derived widths and constants of one unum environment.
///
/// Every field is a pure function of the two size sizes. Build it once and
/// share it (behind an `Arc`) between all values of the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnumMetadata {
    /// Number of bits describing the exponent size.
    pub exponent_size_size: u8,
    /// Number of bits describing the fraction size.
    pub fraction_size_size: u8,
    /// Largest exponent width, `2^exponent_size_size`.
    pub exponent_size_max: u32,
    /// Largest fraction width, `2^fraction_size_size`.
    pub fraction_size_max: u32,
    /// Width of the tag: uncertainty bit plus both size fields.
    pub unum_tag_size: u32,
    /// Total width of a unum in this environment.
    pub size: u32,
    /// An all-zero mask of the environment's width.
    pub empty_bit_mask: BitMask,
    /// The uncertainty bit ("ubit").
    pub uncertainty_bit_mask: BitMask,
    /// The exponent size field.
    pub exponent_size_mask: BitMask,
    /// The fraction size field.
    pub fraction_size_mask: BitMask,
    /// Both size fields.
    pub exponent_and_fraction_size_mask: BitMask,
    /// The whole tag.
    pub unum_tag_mask: BitMask,
    /// The sign bit.
    pub sign_bit_mask: BitMask,
    /// Unit in the last place: the lowest fraction bit at maximal sizes.
    pub ulp: BitMask,
    /// Positive infinity.
    pub positive_infinity: BitMask,
    /// Negative infinity.
    pub negative_infinity: BitMask,
    /// Quiet NaN.
    pub quiet_not_a_number: BitMask,
    /// Signaling NaN.
    pub signaling_not_a_number: BitMask,
    /// Largest exact finite positive value.
    pub largest_positive: BitMask,
    /// Smallest exact positive value.
    pub smallest_positive: BitMask,
    /// Largest-magnitude exact finite negative value.
    pub largest_negative: BitMask,
    /// The open interval between the largest positive value and infinity.
    pub max_real_u: BitMask,
    /// The open interval between negative infinity and the largest negative value.
    pub min_real_u: BitMask,
}

impl UnumMetadata {
    /// Derives the environment for the given size sizes.
    pub fn new(exponent_size_size: u8, fraction_size_size: u8) -> Result<Self, UnumError> {
        if !(1..=MAX_EXPONENT_SIZE_SIZE).contains(&exponent_size_size)
            || !(1..=MAX_FRACTION_SIZE_SIZE).contains(&fraction_size_size)
        {
            return Err(UnumError::UnsupportedEnvironment {
                exponent_size_size,
                fraction_size_size,
            });
        }

        let exponent_size_max = 1u32 << exponent_size_size;
        let fraction_size_max = 1u32 << fraction_size_size;
        let unum_tag_size = 1 + u32::from(exponent_size_size) + u32::from(fraction_size_size);
        let size = 1 + exponent_size_max + fraction_size_max + unum_tag_size;

        let empty_bit_mask = BitMask::zero(size);
        let one = empty_bit_mask.increment();
        let all_ones = BitMask::new(size, true);

        let uncertainty_bit_mask = empty_bit_mask.set_one(unum_tag_size - 1);
        let fraction_size_mask = (&one << i32::from(fraction_size_size)).decrement();
        let exponent_size_mask = (&one << i32::from(exponent_size_size)).decrement()
            << i32::from(fraction_size_size);
        let exponent_and_fraction_size_mask = &exponent_size_mask | &fraction_size_mask;
        let unum_tag_mask = &exponent_and_fraction_size_mask | &uncertainty_bit_mask;
        let sign_bit_mask = empty_bit_mask.set_one(size - 1);
        let ulp = empty_bit_mask.set_one(unum_tag_size);

        let positive_infinity = &(&all_ones - &sign_bit_mask) - &uncertainty_bit_mask;
        let negative_infinity = &all_ones - &uncertainty_bit_mask;
        let quiet_not_a_number = &positive_infinity | &uncertainty_bit_mask;
        let signaling_not_a_number = &quiet_not_a_number | &sign_bit_mask;
        let largest_positive = &positive_infinity - &ulp;
        let smallest_positive = &exponent_and_fraction_size_mask + &ulp;
        let largest_negative = &negative_infinity - &ulp;
        let max_real_u = &largest_positive | &uncertainty_bit_mask;
        let min_real_u = &largest_negative | &uncertainty_bit_mask;

        Ok(Self {
            exponent_size_size,
            fraction_size_size,
            exponent_size_max,
            fraction_size_max,
            unum_tag_size,
            size,
            empty_bit_mask,
            uncertainty_bit_mask,
            exponent_size_mask,
            fraction_size_mask,
            exponent_and_fraction_size_mask,
            unum_tag_mask,
            sign_bit_mask,
            ulp,
            positive_infinity,
            negative_infinity,
            quiet_not_a_number,
            signaling_not_a_number,
            largest_positive,
            smallest_positive,
            largest_negative,
            max_real_u,
            min_real_u,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(value: u32) -> BitMask {
        BitMask::from_u32(value, 19)
    }

    #[test]
    fn widths_for_3_2() {
        let metadata = UnumMetadata::new(3, 2).unwrap();
        assert_eq!(metadata.exponent_size_max, 8);
        assert_eq!(metadata.fraction_size_max, 4);
        assert_eq!(metadata.unum_tag_size, 6);
        assert_eq!(metadata.size, 19);
    }

    #[test]
    fn masks_for_3_2() {
        let metadata = UnumMetadata::new(3, 2).unwrap();
        assert_eq!(metadata.sign_bit_mask, BitMask::from_segments(&[0x40000], Some(19)));
        assert_eq!(metadata.uncertainty_bit_mask, mask(0x20));
        assert_eq!(metadata.exponent_size_mask, mask(0x1C));
        assert_eq!(metadata.fraction_size_mask, mask(0x3));
        assert_eq!(metadata.exponent_and_fraction_size_mask, mask(0x1F));
        assert_eq!(metadata.unum_tag_mask, mask(0x3F));
        assert_eq!(metadata.ulp, mask(0x40));
    }

    #[test]
    fn special_values_for_3_2() {
        let metadata = UnumMetadata::new(3, 2).unwrap();
        assert_eq!(metadata.positive_infinity, mask(0x3FFDF));
        assert_eq!(metadata.negative_infinity, mask(0x7FFDF));
        assert_eq!(metadata.quiet_not_a_number, mask(0x3FFFF));
        assert_eq!(metadata.signaling_not_a_number, mask(0x7FFFF));
        assert_eq!(metadata.largest_positive, mask(0x3FF9F));
        assert_eq!(metadata.smallest_positive, mask(0x5F));
        assert_eq!(metadata.largest_negative, mask(0x7FF9F));
        assert_eq!(metadata.max_real_u, mask(0x3FFBF));
        assert_eq!(metadata.min_real_u, mask(0x7FFBF));
    }

    #[test]
    fn derived_constants_are_deterministic() {
        let a = UnumMetadata::new(4, 5).unwrap();
        let b = UnumMetadata::new(4, 5).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.positive_infinity, b.positive_infinity);
        assert_eq!(a.quiet_not_a_number, b.quiet_not_a_number);
    }

    #[test]
    fn every_constant_has_environment_width() {
        let metadata = UnumMetadata::new(2, 3).unwrap();
        for constant in [
            &metadata.sign_bit_mask,
            &metadata.positive_infinity,
            &metadata.signaling_not_a_number,
            &metadata.smallest_positive,
            &metadata.min_real_u,
        ] {
            assert_eq!(constant.size(), metadata.size);
        }
    }

    #[test]
    fn rejects_unsupported_environments() {
        assert!(UnumMetadata::new(0, 2).is_err());
        assert!(UnumMetadata::new(6, 2).is_err());
        let err = UnumMetadata::new(3, 12).unwrap_err();
        assert!(err.to_string().contains("(3, 12)"));
    }
}
