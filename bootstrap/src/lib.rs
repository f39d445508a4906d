//! Explicit application bootstrap for axum services.
//!
//! The process hands its raw arguments and an [`Application`] marker to a
//! [`Launcher`]. The bootstrap then builds an [`AppContext`] from env and
//! command line configuration, starts the application's components in the
//! order they are listed, serves HTTP until SIGINT/SIGTERM or a requested
//! shutdown, and stops the components in reverse order.

pub mod application;
pub mod args;
pub mod component;
pub mod config;
pub mod context;
pub mod error;
pub mod launcher;
pub mod logging;
pub mod metrics;
pub mod server;
pub mod shutdown;

pub use application::Application;
pub use args::{ArgsError, CommandLineArgs};
pub use component::{Component, LivenessHeartbeat};
pub use config::{Config, HumanDuration};
pub use context::{AppContext, ContextState};
pub use error::{exit_code, BootstrapError};
pub use launcher::{run, Bootstrap, Launcher};
pub use server::serve;
