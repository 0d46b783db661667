use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum MetaError {
    /// A stage that divides by a count or a maximum received nothing to work on.
    EmptyInput { stage: &'static str },
    /// A gold-standard primary key has no row in its collection.
    Lookup { collection: String, key: String },
    /// Two sequences that must be parallel differ in length.
    SizeMismatch { left: usize, right: usize },
    /// Malformed input (out-of-range ids, unknown columns, ...).
    InvariantViolation(String),
}

impl fmt::Display for MetaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput { stage } => write!(f, "{stage}: input is empty"),
            Self::Lookup { collection, key } => {
                write!(f, "collection '{collection}': primary key '{key}' not found")
            }
            Self::SizeMismatch { left, right } => {
                write!(f, "parallel sequences differ in length ({left} vs {right})")
            }
            Self::InvariantViolation(msg) => write!(f, "invariant violation: {msg}"),
        }
    }
}

impl std::error::Error for MetaError {}
