//! Shared foundational types used across the hast hardware generator.
//!
//! This crate provides the fixed-width [`BitMask`] used for every sized-integer
//! constant the generator computes, content hashing for persisted hardware
//! descriptions, and the internal error type.

#![warn(missing_docs)]

pub mod bit_mask;
pub mod hash;
pub mod result;

pub use bit_mask::{BitMask, InvalidBitMask};
pub use hash::{ContentHash, ParseContentHashError};
pub use result::{HastResult, InternalError};
