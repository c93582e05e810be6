use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("failed to extract source '{source_name}': {message}")]
    Extract { source_name: String, message: String },

    #[error("schema error: {0}")]
    Schema(String),

    #[error("destination unreachable: {0}")]
    Connection(String),

    #[error("destination rejected write: {0}")]
    Write(String),

    #[error("destination state unknown after failed commit: {0}")]
    PartialApply(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),
}

impl EtlError {
    pub fn extract(source: impl Into<String>, message: impl ToString) -> Self {
        EtlError::Extract {
            source_name: source.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
