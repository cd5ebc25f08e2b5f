//! Errors shared by the numeric foundation.

use thiserror::Error;

pub type FmResult<T> = Result<T, FmError>;

#[derive(Error, Debug)]
pub enum FmError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },
}
