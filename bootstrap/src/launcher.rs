use std::ffi::OsString;
use std::process::ExitCode;

use tokio::net::TcpListener;
use tracing::{error, info};

use crate::application::Application;
use crate::args::CommandLineArgs;
use crate::config::Config;
use crate::context::AppContext;
use crate::error::{self, BootstrapError};
use crate::logging;
use crate::metrics::setup_metrics_recorder;
use crate::server;
use crate::shutdown;

/// Hands control of the process to an application.
pub trait Launcher {
    fn launch<A: Application>(&self, args: Vec<OsString>) -> ExitCode;
}

/// Runs the application for real: see [`run`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Bootstrap;

impl Launcher for Bootstrap {
    fn launch<A: Application>(&self, args: Vec<OsString>) -> ExitCode {
        run::<A>(args)
    }
}

/// Parse arguments and configuration, then run the application until it is
/// shut down. Blocks the calling thread for the lifetime of the application.
pub fn run<A: Application>(args: Vec<OsString>) -> ExitCode {
    let prepared = prepare(args);

    let log_level = match &prepared {
        Ok((config, _)) => config.log_level.as_str(),
        Err(_) => logging::DEFAULT_LOG_LEVEL,
    };
    logging::init(log_level);

    let result = prepared.and_then(|(config, args)| {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(BootstrapError::Runtime)?;
        runtime.block_on(launch::<A>(config, args))
    });

    match &result {
        Ok(()) => info!("{} exited cleanly", A::NAME),
        Err(e) => error!("{} failed: {}", A::NAME, e),
    }
    ExitCode::from(error::exit_code(&result))
}

fn prepare(args: Vec<OsString>) -> Result<(Config, CommandLineArgs), BootstrapError> {
    let args = CommandLineArgs::parse(args)?;
    let config = Config::load(&args)?;
    Ok((config, args))
}

async fn launch<A: Application>(
    config: Config,
    args: CommandLineArgs,
) -> Result<(), BootstrapError> {
    let ctx = AppContext::new::<A>(config, args);

    let recorder = if ctx.config().export_prometheus {
        Some(setup_metrics_recorder()?)
    } else {
        None
    };

    let bind = ctx.config().bind();
    let listener = TcpListener::bind(&bind)
        .await
        .map_err(|source| BootstrapError::Bind { addr: bind, source })?;

    let signals = shutdown::trap_signals(&ctx).map_err(BootstrapError::Signals)?;

    let result = server::serve::<A>(ctx, listener, recorder).await;
    signals.abort();
    result
}
