//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Configuration error - unreadable file, unknown option, bad `--set`
pub const CONFIG_ERROR: i32 = 2;

/// Manifest error - a bundled release could not be built
pub const MANIFEST_ERROR: i32 = 3;

/// Cluster error - API server unreachable or refused a request
pub const CLUSTER_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;
