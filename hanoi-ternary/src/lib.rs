//! Balanced-ternary numeric types for the HanoiVM.
//!
//! The layer is total: every operation either returns a value or a typed
//! [`NumericError`]. Nothing here wraps silently.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

mod bigint;
mod digit;
mod error;
mod float;
mod fraction;
mod trit;

pub use bigint::T81Big;
pub use digit::{T243Digit, T729Digit, T81Digit};
pub use error::NumericError;
pub use float::T81Float;
pub use fraction::T81Fraction;
pub use trit::Trit;

/// Result alias for numeric operations.
pub type NumericResult<T> = Result<T, NumericError>;
