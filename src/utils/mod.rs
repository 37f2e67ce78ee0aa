//! File-facing helpers shared by the service and the CLI.
pub mod export;
pub mod upload;
