use std::time::Duration;

use thiserror::Error;

use crate::args::ArgsError;
use crate::context::ContextState;

/// Exit status for a clean shutdown.
pub const EXIT_OK: u8 = 0;
/// Exit status for any failure during startup, serving or shutdown.
pub const EXIT_FAILURE: u8 = 1;
/// Exit status for invalid command line arguments or configuration.
pub const EXIT_USAGE: u8 = 2;

/// Everything that can stop an application from starting or shutting down cleanly.
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("invalid command line arguments: {0}")]
    Args(#[from] ArgsError),
    #[error("failed to load configuration from env: {0}")]
    Env(#[from] envconfig::Error),
    #[error("invalid value {value:?} for property {key}: {reason}")]
    InvalidProperty {
        key: String,
        value: String,
        reason: String,
    },
    #[error("failed to build async runtime: {0}")]
    Runtime(std::io::Error),
    #[error("failed to install metrics recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
    #[error("failed to register signal handlers: {0}")]
    Signals(std::io::Error),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error("component '{name}' failed to start: {source:#}")]
    ComponentStart {
        name: String,
        source: anyhow::Error,
    },
    #[error("http server error: {0}")]
    Serve(std::io::Error),
    #[error("graceful shutdown timed out after {0:?}")]
    ShutdownTimeout(Duration),
    #[error("invalid application context transition from {from:?} to {to:?}")]
    InvalidTransition { from: ContextState, to: ContextState },
}

impl BootstrapError {
    pub fn exit_code(&self) -> u8 {
        match self {
            BootstrapError::Args(_)
            | BootstrapError::Env(_)
            | BootstrapError::InvalidProperty { .. } => EXIT_USAGE,
            _ => EXIT_FAILURE,
        }
    }
}

/// Maps the outcome of a bootstrap run to the process exit status.
pub fn exit_code(result: &Result<(), BootstrapError>) -> u8 {
    match result {
        Ok(()) => EXIT_OK,
        Err(e) => e.exit_code(),
    }
}
