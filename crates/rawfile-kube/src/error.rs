//! Error types for rawfile-kube

use thiserror::Error;

/// Result type for rawfile-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur during Kubernetes operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Manifest could not be built or converted
    #[error("manifest error: {0}")]
    Manifest(#[from] rawfile_core::CoreError),

    /// A single object could not be applied
    #[error("Failed to apply {resource}")]
    Apply {
        resource: String,
        #[source]
        source: Box<KubeError>,
    },

    /// A single object could not be deleted
    #[error("Failed to delete {resource}")]
    Delete {
        resource: String,
        #[source]
        source: Box<KubeError>,
    },

    /// Resource kind not served by the cluster
    #[error("unknown resource type: {api_version}/{kind}")]
    UnknownKind { api_version: String, kind: String },

    /// Operator state could not be loaded or saved
    #[error("state store error: {0}")]
    State(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid manifest
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for KubeError {
    fn from(e: serde_json::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl KubeError {
    fn api_code(&self) -> Option<u16> {
        match self {
            KubeError::Api(kube::Error::Api(resp)) => Some(resp.code),
            KubeError::Apply { source, .. } | KubeError::Delete { source, .. } => {
                source.api_code()
            }
            _ => None,
        }
    }

    /// Check if this is a Kubernetes 404 Not Found error
    pub fn is_not_found(&self) -> bool {
        self.api_code() == Some(404)
    }

    /// Check if this is a conflict / already exists error (409)
    pub fn is_conflict(&self) -> bool {
        self.api_code() == Some(409)
    }

    /// Check if this is an unauthorized or forbidden error (401/403)
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.api_code(), Some(401) | Some(403))
    }

    /// Build an API error with a status code, as the API server would return it
    pub fn api_status(code: u16, reason: &str, message: impl Into<String>) -> Self {
        KubeError::Api(kube::Error::Api(kube::error::ErrorResponse {
            status: "Failure".to_string(),
            message: message.into(),
            reason: reason.to_string(),
            code,
        }))
    }
}
