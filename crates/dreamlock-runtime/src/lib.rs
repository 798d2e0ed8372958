//! Collaborator backends for the dreamlock packaging pipeline.
//!
//! This crate implements everything that leaves the process: the pluggable
//! `Backend` trait (source fetching, translator discovery and execution, the
//! combined-hash oracle, and build template rendering), a `nix`-driven backend
//! that shells out under explicit timeouts, a deterministic `mock` backend for
//! tests, and the user `Config` that selects and parameterizes them.

pub mod backend;
pub mod config;
pub mod mock;
pub mod nix;
pub mod process;
pub mod translator;

pub use backend::{
    select_backend, Backend, FetchRequest, FetchedSource, HashOracle, SourceFetcher,
    TemplatePaths, TemplateRenderer, TranslatorRegistry, TranslatorRunner,
};
pub use config::Config;
pub use mock::MockBackend;
pub use nix::NixBackend;
pub use translator::{
    ExtraArgKind, ExtraArgSpec, ExtraArgValue, TranslatorDescriptor, TranslatorInput,
    TranslatorKind,
};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("backend '{0}' is not available")]
    BackendUnavailable(String),
    #[error("command '{command}' failed with exit code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },
    #[error("command '{command}' timed out after {secs}s")]
    Timeout { command: String, secs: u64 },
    #[error("hash marker not found in oracle output\n--- stderr ---\n{stderr}\n--- stdout ---\n{stdout}")]
    HashMarkerMissing { stdout: String, stderr: String },
    #[error("translator produced no output at {}", .0.display())]
    TranslatorOutputMissing(PathBuf),
    #[error("invalid response from {context}: {reason}")]
    InvalidResponse { context: String, reason: String },
    #[error("config error: {0}")]
    Config(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("lock error: {0}")]
    Lock(#[from] dreamlock_schema::LockError),
}
