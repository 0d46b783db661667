use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum IoError {
    Read { path: String, message: String },
    Csv(String),
    MissingColumn { file: String, column: String },
    Empty { file: String },
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoError::Read { path, message } => write!(f, "cannot read {path}: {message}"),
            IoError::Csv(msg) => write!(f, "CSV parse error: {msg}"),
            IoError::MissingColumn { file, column } => {
                write!(f, "column '{column}' not found in {file}")
            }
            IoError::Empty { file } => write!(f, "{file} has no header row"),
        }
    }
}

impl std::error::Error for IoError {}
