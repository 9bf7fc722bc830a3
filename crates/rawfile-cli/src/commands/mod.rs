//! CLI commands

pub mod reconcile;
pub mod resources;
pub mod template;
pub mod versions;
