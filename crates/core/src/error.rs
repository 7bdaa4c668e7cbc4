// crates/core/src/error.rs
use thiserror::Error;

/// A single field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid email \"{0}\"")]
    InvalidEmail(String),

    #[error("invalid phone \"{0}\"")]
    InvalidPhone(String),

    #[error("invalid birth date \"{0}\"")]
    InvalidBirthDate(String),

    #[error("birth date \"{0}\" is in the future")]
    FutureBirthDate(String),

    #[error("missing identifier (member number, email or national id)")]
    MissingIdentifier,
}

/// Every validation failure of one record, labelled with the record's
/// member number or its 1-based position in the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("member {label}: {}", join_problems(.problems))]
pub struct RecordError {
    pub label: String,
    pub problems: Vec<ValidationError>,
}

fn join_problems(problems: &[ValidationError]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
