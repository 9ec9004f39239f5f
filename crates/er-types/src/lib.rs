//! Foundation types for the element registry.
//!
//! - [`BitVector`] -- fixed 4096-bit flag vector with a 512-byte big-endian
//!   canonical encoding and a legacy hex encoding
//! - [`Bit`] -- a position already validated to lie in `0..4096`
//! - [`Element`] -- a named entity owning one vector
//! - [`ErrorKind`] -- the failure taxonomy every crate classifies into

pub mod bits;
pub mod element;
pub mod error;

pub use bits::{Bit, BitOp, BitVector, FLAG_BITS, FLAG_BYTES};
pub use element::{validate_name, Element, ElementView, MAX_NAME_CHARS};
pub use error::{ErrorKind, TypeError, TypeResult};
