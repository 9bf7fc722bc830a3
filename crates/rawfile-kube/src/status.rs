//! Reconciliation status and stage flow

use serde::Serialize;
use std::fmt;

/// Status published at the end of a reconcile cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum Status {
    /// Needs operator intervention (configuration, collisions)
    Blocked(String),
    /// Expected to resolve on a later cycle
    Waiting(String),
    /// Tearing down
    Maintenance(String),
    /// Converged
    Active(String),
}

impl Status {
    pub fn blocked(message: impl Into<String>) -> Self {
        Status::Blocked(message.into())
    }

    pub fn waiting(message: impl Into<String>) -> Self {
        Status::Waiting(message.into())
    }

    pub fn maintenance(message: impl Into<String>) -> Self {
        Status::Maintenance(message.into())
    }

    /// The converged status
    pub fn ready() -> Self {
        Status::Active("Ready".to_string())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Status::Blocked(_) => "Blocked",
            Status::Waiting(_) => "Waiting",
            Status::Maintenance(_) => "Maintenance",
            Status::Active(_) => "Active",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Status::Blocked(m)
            | Status::Waiting(m)
            | Status::Maintenance(m)
            | Status::Active(m) => m,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Status::Active(_))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name(), self.message())
    }
}

/// Outcome of one reconcile stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Move on to the next stage
    Continue,
    /// Stop the cycle and publish this status
    Halt(Status),
}

impl Flow {
    pub fn is_halt(&self) -> bool {
        matches!(self, Flow::Halt(_))
    }
}
