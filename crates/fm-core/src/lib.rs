//! fm-core: stable foundation for flightmission.
//!
//! Contains:
//! - units (uom SI types, constructors and angle helpers)
//! - numeric (Real + tolerances + float helpers)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{FmError, FmResult};
pub use numeric::*;
pub use units::*;
