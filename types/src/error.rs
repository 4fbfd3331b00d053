//! Parse errors for the fundamental types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("{0} must not be blank")]
    Blank(&'static str),

    #[error("unknown attempt status: {0}")]
    UnknownStatus(String),
}
