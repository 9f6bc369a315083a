use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by this crate. Resolver lookups themselves never fail;
/// these come from parsing caller input, probing modules, or query dispatch.
#[derive(Debug, Error)]
pub enum ResolveError {
    // Caller JSON that does not match the expected shape
    #[error("invalid caller: {0}")]
    Parse(#[from] serde_json::Error),

    // Any I/O failure other than "not found" while probing
    #[error("failed to probe {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // package.json exists but cannot be understood
    #[error("invalid package config {}: {reason}", .path.display())]
    InvalidPackage { path: PathBuf, reason: String },

    #[error("invalid module specifier: {0:?}")]
    InvalidSpecifier(String),

    #[error("unknown query: {0}")]
    UnknownQuery(String),
}

pub type Result<T> = std::result::Result<T, ResolveError>;
