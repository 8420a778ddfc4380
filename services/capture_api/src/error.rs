//! services/capture_api/src/error.rs
//!
//! Defines the primary error type for the entire capture service.

use crate::config::ConfigError;

/// The primary error type for the `capture_api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind() -> Result<(), ApiError> {
        let listener: Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::AddrInUse,
            "port taken",
        ));
        listener?;
        Ok(())
    }

    #[test]
    fn startup_failures_convert_into_api_error() {
        assert!(matches!(bind(), Err(ApiError::Io(_))));

        let config: ApiError =
            ConfigError::InvalidValue("BIND_ADDRESS".into(), "bad".into()).into();
        assert!(config.to_string().starts_with("Configuration error"));
    }
}
