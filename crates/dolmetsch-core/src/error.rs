use thiserror::Error;

#[derive(Debug, Error)]
pub enum DolmetschError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown mode: {name}")]
    UnknownMode { name: String },

    #[error("Unsupported language code: '{code}'")]
    UnsupportedLanguage { code: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DolmetschError {
    /// Short error code string, used as a structured log field.
    pub fn code(&self) -> &'static str {
        match self {
            DolmetschError::Config(_) => "CONFIG_ERROR",
            DolmetschError::UnknownMode { .. } => "UNKNOWN_MODE",
            DolmetschError::UnsupportedLanguage { .. } => "UNSUPPORTED_LANGUAGE",
            DolmetschError::Serialization(_) => "SERIALIZATION_ERROR",
            DolmetschError::Io(_) => "IO_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, DolmetschError>;
