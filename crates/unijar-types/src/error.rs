use thiserror::Error;

/// Errors produced by type construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("entry name must not be empty")]
    EmptyName,

    #[error("entry name contains a NUL byte: {0:?}")]
    NulInName(String),
}
