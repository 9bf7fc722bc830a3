//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Failed to parse manifest document {index} of release {release}: {message}")]
    Parse {
        release: String,
        index: usize,
        message: String,
    },

    #[error("Unknown release '{version}'")]
    UnknownRelease { version: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Invalid formatter '{template}': {message}")]
    Format { template: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Join an error and its sources with " -> "
///
/// Used wherever a failure is surfaced as a status or action message
/// rather than propagated.
pub fn chain_message(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !parts.iter().any(|p| p.contains(&text)) {
            parts.push(text);
        }
        source = inner.source();
    }
    parts.join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("apply failed")]
    struct Outer(#[source] Inner);

    #[derive(Debug, Error)]
    #[error("connection refused")]
    struct Inner;

    #[test]
    fn test_chain_message_joins_sources() {
        let err = Outer(Inner);
        assert_eq!(chain_message(&err), "apply failed -> connection refused");
    }

    #[test]
    fn test_chain_message_single() {
        let err = CoreError::UnknownRelease {
            version: "1.0.0".to_string(),
        };
        assert_eq!(chain_message(&err), "Unknown release '1.0.0'");
    }
}
