use thiserror::Error;

/// Top-level error type for the Carelog application edge.
///
/// Subsystem crates define their own error types; this one covers what the
/// composition root deals with directly: reading and parsing the config file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CarelogError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for CarelogError {
    fn from(err: toml::de::Error) -> Self {
        CarelogError::Config(err.to_string())
    }
}

/// A specialized `Result` type for Carelog operations.
pub type Result<T> = std::result::Result<T, CarelogError>;
