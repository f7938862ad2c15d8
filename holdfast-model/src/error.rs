use thiserror::Error;

/// Validation failures for the value types in this crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
