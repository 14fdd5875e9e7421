//! Error types for configuration loading and validation.

/// Errors that can occur when loading or validating a `sasic.toml` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A required field is missing or empty.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A configuration value is out of range or inconsistent.
    #[error("validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_missing_field() {
        let err = ConfigError::MissingField("design.netlist".to_string());
        assert_eq!(format!("{err}"), "missing required field: design.netlist");
    }

    #[test]
    fn display_validation_error() {
        let err = ConfigError::ValidationError("placement.batch_size must be >= 2".to_string());
        assert_eq!(
            format!("{err}"),
            "validation error: placement.batch_size must be >= 2"
        );
    }

    #[test]
    fn display_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let display = format!("{}", ConfigError::IoError(io_err));
        assert!(display.starts_with("failed to read configuration:"));
    }
}
