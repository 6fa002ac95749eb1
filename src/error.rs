use thiserror::Error;

pub type Result<T> = std::result::Result<T, DashboardError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DashboardError {
    #[error("division by zero: revenue is zero at index {index} while deriving '{metric}'")]
    DivideByZero { metric: String, index: usize },

    #[error("cannot format non-finite value {value}")]
    Format { value: f64 },

    #[error("shape mismatch in {context}: expected {expected}, found {found}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        found: usize,
    },

    #[error("invalid dataset: {0}")]
    InvalidDataset(String),
}

impl DashboardError {
    pub(crate) fn shape(context: impl Into<String>, expected: usize, found: usize) -> Self {
        Self::ShapeMismatch {
            context: context.into(),
            expected,
            found,
        }
    }
}
