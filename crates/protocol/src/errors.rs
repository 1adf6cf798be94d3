use thiserror::Error;

/// Errors raised while translating a fit configuration into an invocation.
///
/// Every variant is detected before a process is launched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranslateError {
    #[error("malformed field `{field}`: {reason}")]
    MalformedField { field: String, reason: String },

    #[error("stage arity mismatch: `{left}` has {left_len} stages but `{right}` has {right_len}")]
    StageArityMismatch {
        left: String,
        left_len: usize,
        right: String,
        right_len: usize,
    },

    #[error("dataset path not found: {path}")]
    DatasetPathNotFound { path: String },
}

impl TranslateError {
    pub(crate) fn malformed<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        TranslateError::MalformedField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Stable snake_case tag for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            TranslateError::MalformedField { .. } => "malformed_field",
            TranslateError::StageArityMismatch { .. } => "stage_arity_mismatch",
            TranslateError::DatasetPathNotFound { .. } => "dataset_path_not_found",
        }
    }

    /// Name of the field that caused the failure, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            TranslateError::MalformedField { field, .. } => Some(field),
            TranslateError::StageArityMismatch { right, .. } => Some(right),
            TranslateError::DatasetPathNotFound { .. } => Some("localDataPath"),
        }
    }
}

pub type Result<T> = std::result::Result<T, TranslateError>;
