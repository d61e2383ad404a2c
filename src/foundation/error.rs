pub type TimewarpResult<T> = Result<T, TimewarpError>;

/// Failure category, one per failure site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A source or sink could not be opened.
    Open,
    /// A decoded frame's geometry disagrees with the buffer's established shape.
    ShapeMismatch,
    /// Unsupported permutation request.
    InvalidAxis,
    /// The encoder rejected a frame or could not finalize.
    WriteFailure,
    /// Emission input is not a valid 4-D tensor.
    Format,
    /// Bad run configuration.
    Validation,
    /// Anything else bubbled up through `anyhow`.
    Other,
}

#[derive(thiserror::Error, Debug)]
pub enum TimewarpError {
    #[error("open error: {0}")]
    Open(String),

    #[error("shape mismatch: got {got:?}, expected {expected:?}")]
    ShapeMismatch {
        got: (usize, usize, usize),
        expected: (usize, usize, usize),
    },

    #[error("invalid axis '{0}' (expected 'x' or 'y')")]
    InvalidAxis(String),

    #[error("write failure: {0}")]
    WriteFailure(String),

    #[error("format error: {0}")]
    Format(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TimewarpError {
    pub fn open(msg: impl Into<String>) -> Self {
        Self::Open(msg.into())
    }

    pub fn invalid_axis(axis: impl Into<String>) -> Self {
        Self::InvalidAxis(axis.into())
    }

    pub fn write_failure(msg: impl Into<String>) -> Self {
        Self::WriteFailure(msg.into())
    }

    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Open(_) => ErrorKind::Open,
            Self::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            Self::InvalidAxis(_) => ErrorKind::InvalidAxis,
            Self::WriteFailure(_) => ErrorKind::WriteFailure,
            Self::Format(_) => ErrorKind::Format,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Other(_) => ErrorKind::Other,
        }
    }
}
