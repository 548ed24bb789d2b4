use thiserror::Error;

#[derive(Debug, Error)]
pub enum DesignError {
    #[error("Mismatched '{open}'/'{close}' markers in the sequence. Please ensure both are present.")]
    MalformedAnnotation { open: char, close: char },

    #[error("Could not launch Primer3 executable '{executable}': {message}")]
    EngineLaunchFailure { executable: String, message: String },

    #[error("Primer3 execution failed (status={status:?}): {stderr}")]
    EngineExecutionError {
        executable: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("Primer3 did not finish within {seconds} s and was stopped")]
    EngineTimeout { executable: String, seconds: f64 },

    #[error("No results generated with the provided design: {}", messages.join("; "))]
    EngineReportedError { messages: Vec<String> },

    #[error("Could not decode Primer3 output line {line_number} '{line}': {reason}")]
    Decode {
        line_number: usize,
        line: String,
        reason: String,
    },

    #[error("Invalid parameter {key}='{value}': {reason}")]
    ParameterFile {
        key: String,
        value: String,
        reason: String,
    },

    #[error("{context} '{path}': {source}")]
    Io {
        context: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not handle JSON document '{path}': {source}")]
    State {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl DesignError {
    pub fn io(context: &'static str, path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.into(),
            source,
        }
    }

    /// Fatal errors stop the current run; everything else is reported
    /// alongside whatever was produced.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Io { .. } | Self::State { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_reported_error_joins_messages() {
        let err = DesignError::EngineReportedError {
            messages: vec!["first".to_string(), "second".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "No results generated with the provided design: first; second"
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_io_failure_is_not_fatal() {
        let err = DesignError::io(
            "Could not write input file",
            "/nope/input.txt",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(!err.is_fatal());
        assert!(err.to_string().starts_with("Could not write input file '/nope/input.txt'"));
    }
}
