use std::ffi::OsString;
use std::process::ExitCode;

use axum::Router;
use bootstrap::{AppContext, Application, Launcher};

pub mod handlers;

/// The server microservice. Its components and routes are listed here
/// explicitly and wired by the bootstrap.
pub struct ServerMicroserviceApplication;

impl Application for ServerMicroserviceApplication {
    const NAME: &'static str = "server-microservice";

    fn routes() -> Router<AppContext> {
        handlers::add_routes(Router::new())
    }
}

/// Hand the process arguments, untouched, to the launcher.
pub fn start<L: Launcher>(launcher: &L, args: Vec<OsString>) -> ExitCode {
    launcher.launch::<ServerMicroserviceApplication>(args)
}
