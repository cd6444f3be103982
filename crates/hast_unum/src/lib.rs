//! Universal numbers (unums) with a configurable bit layout.
//!
//! An unum environment is fixed by two small integers, the exponent size size
//! and the fraction size size. [`UnumMetadata`] derives every field width and
//! canonical bit pattern from them once; [`Unum`] values share that metadata.
//!
//! Layout, most significant bit first: sign, exponent, fraction, uncertainty
//! bit, exponent size minus one, fraction size minus one. The sign always sits
//! at the top bit; exponent and fraction are packed directly above the tag.

#![warn(missing_docs)]

pub mod metadata;
pub mod unum;

pub use metadata::{UnumError, UnumMetadata};
pub use unum::Unum;
