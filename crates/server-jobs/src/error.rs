use rollcall_core::RecordError;
use rollcall_db::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("batch of {size} records exceeds the limit of {limit}")]
    BatchTooLarge { size: usize, limit: usize },

    #[error(transparent)]
    Invalid(#[from] RecordError),

    #[error("storage error: {0}")]
    Storage(#[from] DbError),
}

pub type ImportResult<T> = Result<T, ImportError>;
