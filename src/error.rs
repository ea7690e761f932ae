use thiserror::Error;

/// Result alias used across structeasy
pub type Result<T> = std::result::Result<T, StructeasyError>;

#[derive(Debug, Error)]
pub enum StructeasyError {
    #[error("Input error: {0}")]
    Input(String),

    #[error("Mesh error: {0}")]
    Mesh(String),

    #[error("Solver error: {0}")]
    Solver(String),

    /// An argument outside the accepted set, e.g. an unknown model typology
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Plot error: {0}")]
    Plot(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StructeasyError::Mesh("Point 3 already exists".to_owned());
        assert_eq!(format!("{err}"), "Mesh error: Point 3 already exists");

        let err = StructeasyError::InvalidArgument("tower".to_owned());
        assert!(format!("{err}").contains("tower"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: StructeasyError = io.into();
        assert!(matches!(err, StructeasyError::Io(_)));
    }
}
