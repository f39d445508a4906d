use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Router};
use health::HealthStatus;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::application::Application;
use crate::component::{self, Component, LivenessHeartbeat};
use crate::context::{AppContext, ContextState};
use crate::error::BootstrapError;
use crate::metrics::{self, track_metrics};

async fn readiness(State(ctx): State<AppContext>) -> StatusCode {
    if ctx.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn liveness(State(ctx): State<AppContext>) -> HealthStatus {
    ctx.liveness().get_status()
}

/// The application's routes plus probes, tracing and HTTP metrics.
/// `/metrics` is only served when a recorder handle is given.
pub fn router<A: Application>(ctx: AppContext, recorder: Option<PrometheusHandle>) -> Router {
    let router = A::routes()
        .route("/_readiness", get(readiness))
        .route("/_liveness", get(liveness))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn_with_state(
            ctx.clone(),
            track_metrics,
        ))
        .with_state(ctx);

    match recorder {
        Some(handle) => metrics::add_metrics_route(router, handle),
        None => router,
    }
}

/// Run the application on `listener` until the context's shutdown begins,
/// then tear it down.
///
/// Components start in order (built-in heartbeat first) and stop in reverse.
/// Teardown is bounded by the configured shutdown timeout.
pub async fn serve<A: Application>(
    ctx: AppContext,
    listener: TcpListener,
    recorder: Option<PrometheusHandle>,
) -> Result<(), BootstrapError> {
    ctx.transition(ContextState::Starting)?;

    let mut components: Vec<Box<dyn Component>> = Vec::new();
    components.push(Box::new(LivenessHeartbeat::new()));
    components.extend(A::components(&ctx));

    if let Err(e) = component::start_all(&ctx, &components).await {
        ctx.request_shutdown("startup_failure");
        ctx.transition(ContextState::Failed)?;
        return Err(e);
    }

    let app = router::<A>(ctx.clone(), recorder);

    ctx.transition(ContextState::Running)?;
    let startup_secs = ctx.uptime().as_secs_f64();
    metrics::emit_startup_duration(ctx.name(), startup_secs);
    match listener.local_addr() {
        Ok(addr) => info!(
            "started {} in {:.3}s, listening on {}",
            ctx.name(),
            startup_secs,
            addr
        ),
        Err(_) => info!("started {} in {:.3}s", ctx.name(), startup_secs),
    }
    if !ctx.args().is_empty() {
        debug!(args = ?ctx.args().raw(), "command line arguments");
    }

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(ctx.shutdown_signal())
        .await;
    if let Err(e) = &served {
        error!("http server exited with error: {}", e);
    }
    ctx.request_shutdown("server_exit");

    ctx.transition(ContextState::Stopping)?;
    let shutdown_timeout: Duration = ctx.config().shutdown_timeout.into();
    let stopped =
        tokio::time::timeout(shutdown_timeout, component::stop_all(&ctx, &components)).await;

    match (served, stopped) {
        (_, Err(_)) => {
            warn!(
                timeout_secs = shutdown_timeout.as_secs_f64(),
                "graceful shutdown timed out"
            );
            metrics::emit_shutdown_completed(ctx.name(), false);
            ctx.transition(ContextState::Failed)?;
            Err(BootstrapError::ShutdownTimeout(shutdown_timeout))
        }
        (Err(e), Ok(())) => {
            metrics::emit_shutdown_completed(ctx.name(), false);
            ctx.transition(ContextState::Stopped)?;
            Err(BootstrapError::Serve(e))
        }
        (Ok(()), Ok(())) => {
            metrics::emit_shutdown_completed(ctx.name(), true);
            ctx.transition(ContextState::Stopped)?;
            info!("{} stopped after {:.3}s", ctx.name(), ctx.uptime().as_secs_f64());
            Ok(())
        }
    }
}
