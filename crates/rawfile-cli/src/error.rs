//! CLI error types with exit code handling

use miette::Diagnostic;
use rawfile_core::{CoreError, chain_message};
use rawfile_kube::KubeError;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Configuration could not be loaded
    #[error("Configuration error: {message}")]
    #[diagnostic(code(rawfile::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Manifests could not be built
    #[error("Manifest error: {message}")]
    #[diagnostic(code(rawfile::cli::manifest))]
    Manifest {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Cluster access failed
    #[error("Cluster error: {message}")]
    #[diagnostic(code(rawfile::cli::cluster))]
    Cluster {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(rawfile::cli::io))]
    Io { message: String },

    /// Wrapped error for passthrough (stores the formatted message)
    #[error("{message}")]
    #[diagnostic(code(rawfile::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Manifest { .. } => exit_codes::MANIFEST_ERROR,
            CliError::Cluster { .. } => exit_codes::CLUSTER_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn cluster(message: impl Into<String>) -> Self {
        Self::Cluster {
            message: message.into(),
            help: None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let message = chain_message(&err);
        match err {
            CoreError::InvalidConfig { .. } | CoreError::YamlParse(_) => CliError::Config {
                message,
                help: Some("Options are kebab-case, e.g. --set storage-class-name=local".into()),
            },
            CoreError::UnknownRelease { .. } => CliError::Config {
                message,
                help: Some("Run `rawfile-operator list-versions` for bundled releases".into()),
            },
            CoreError::Io(e) => e.into(),
            _ => CliError::Manifest {
                message,
                help: None,
            },
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        let help = if err.is_unauthorized() {
            Some("Check the service account RBAC of the operator".to_string())
        } else {
            None
        };
        let message = chain_message(&err);
        match err {
            KubeError::Io(e) => e.into(),
            KubeError::State(_) => CliError::Other { message },
            _ => CliError::Cluster { message, help },
        }
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        CliError::Other {
            message: format!("Failed to render YAML: {}", err),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::config("x").exit_code(), exit_codes::CONFIG_ERROR);
        assert_eq!(CliError::cluster("x").exit_code(), exit_codes::CLUSTER_ERROR);
        let io: CliError = std::io::Error::other("disk").into();
        assert_eq!(io.exit_code(), exit_codes::IO_ERROR);
    }

    #[test]
    fn test_unknown_release_is_config_error() {
        let err: CliError = CoreError::UnknownRelease {
            version: "9.9.9".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);
        assert!(err.to_string().contains("Unknown release '9.9.9'"));
    }

    #[test]
    fn test_forbidden_gets_rbac_help() {
        let err: CliError = KubeError::api_status(403, "Forbidden", "no").into();
        match err {
            CliError::Cluster { help, .. } => assert!(help.is_some()),
            other => panic!("unexpected error: {other}"),
        }
    }
}
