use thiserror::Error;

/// Raised by repositories inside `anyhow::Error` so callers can tell a
/// conflicting write apart from an infrastructure failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConstraintViolation {
    #[error("unique constraint violated: {0}")]
    Unique(String),
    #[error("foreign key constraint violated: {0}")]
    ForeignKey(String),
}

impl ConstraintViolation {
    pub fn find(err: &anyhow::Error) -> Option<&ConstraintViolation> {
        err.chain().find_map(|cause| cause.downcast_ref::<ConstraintViolation>())
    }
}
