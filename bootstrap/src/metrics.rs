use std::time::Instant;

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::Request,
    middleware::Next,
    response::Response,
    routing::get,
    Router,
};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::context::AppContext;

const METRIC_HTTP_REQUESTS: &str = "http_requests_total";
const METRIC_HTTP_DURATION: &str = "http_requests_duration_seconds";

const METRIC_STARTUP_DURATION: &str = "app_startup_duration_seconds";
const METRIC_COMPONENT_START: &str = "app_component_start_total";
const METRIC_SHUTDOWN_INITIATED: &str = "app_shutdown_initiated_total";
const METRIC_SHUTDOWN_COMPLETED: &str = "app_shutdown_completed_total";

/// Install the global prometheus recorder. Can only succeed once per process.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    const BUCKETS: &[f64] = &[
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    PrometheusBuilder::new()
        .set_buckets(BUCKETS)?
        .install_recorder()
}

/// Add the prometheus endpoint to a router, should be called last.
pub fn add_metrics_route(router: Router, recorder_handle: PrometheusHandle) -> Router {
    router.route(
        "/metrics",
        get(move || std::future::ready(recorder_handle.render())),
    )
}

/// Count and time every request served for the application. Requests are
/// labelled with the route template rather than the raw path when one matched.
pub async fn track_metrics(
    State(ctx): State<AppContext>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = req.method().to_string();
    let route = match req.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_owned(),
        None => req.uri().path().to_owned(),
    };

    let response = next.run(req).await;

    let labels = [
        ("app", ctx.name().to_owned()),
        ("method", method),
        ("path", route),
        ("status", response.status().as_u16().to_string()),
    ];
    metrics::counter!(METRIC_HTTP_REQUESTS, &labels).increment(1);
    metrics::histogram!(METRIC_HTTP_DURATION, &labels).record(started.elapsed().as_secs_f64());

    response
}

pub(crate) fn emit_startup_duration(app: &str, duration_secs: f64) {
    metrics::gauge!(METRIC_STARTUP_DURATION, "app" => app.to_string()).set(duration_secs);
}

pub(crate) fn emit_component_start(app: &str, component: &str, result: &str) {
    metrics::counter!(
        METRIC_COMPONENT_START,
        "app" => app.to_string(),
        "component" => component.to_string(),
        "result" => result.to_string()
    )
    .increment(1);
}

pub(crate) fn emit_shutdown_initiated(app: &str, trigger: &str) {
    metrics::counter!(
        METRIC_SHUTDOWN_INITIATED,
        "app" => app.to_string(),
        "trigger" => trigger.to_string()
    )
    .increment(1);
}

pub(crate) fn emit_shutdown_completed(app: &str, clean: bool) {
    metrics::counter!(
        METRIC_SHUTDOWN_COMPLETED,
        "app" => app.to_string(),
        "clean" => clean.to_string()
    )
    .increment(1);
}
