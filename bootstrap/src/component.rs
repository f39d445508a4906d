use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::context::AppContext;
use crate::error::BootstrapError;
use crate::metrics;

/// A unit of startup and shutdown work owned by the application context.
#[async_trait]
pub trait Component: Send + Sync {
    fn name(&self) -> &str;

    async fn start(&self, ctx: &AppContext) -> anyhow::Result<()>;

    async fn stop(&self, _ctx: &AppContext) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Start components in order. On the first failure the components that
/// already started are stopped, in reverse order, before returning the error.
pub async fn start_all(
    ctx: &AppContext,
    components: &[Box<dyn Component>],
) -> Result<(), BootstrapError> {
    for (index, component) in components.iter().enumerate() {
        let started = Instant::now();
        match component.start(ctx).await {
            Ok(()) => {
                metrics::emit_component_start(ctx.name(), component.name(), "started");
                info!(
                    component = component.name(),
                    duration_secs = started.elapsed().as_secs_f64(),
                    "component started"
                );
            }
            Err(source) => {
                metrics::emit_component_start(ctx.name(), component.name(), "failed");
                error!(
                    component = component.name(),
                    "component failed to start: {source:#}"
                );
                stop_all(ctx, &components[..index]).await;
                return Err(BootstrapError::ComponentStart {
                    name: component.name().to_owned(),
                    source,
                });
            }
        }
    }
    Ok(())
}

/// Stop components in reverse order. A failing stop is logged and does not
/// prevent the remaining components from stopping.
pub async fn stop_all(ctx: &AppContext, components: &[Box<dyn Component>]) {
    for component in components.iter().rev() {
        match component.stop(ctx).await {
            Ok(()) => info!(component = component.name(), "component stopped"),
            Err(e) => warn!(component = component.name(), "component failed to stop: {e:#}"),
        }
    }
}

const MIN_HEARTBEAT_PERIOD: Duration = Duration::from_millis(1);

/// Keeps the liveness registry fed while the runtime is responsive.
pub struct LivenessHeartbeat {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LivenessHeartbeat {
    pub const NAME: &'static str = "heartbeat";

    pub fn new() -> Self {
        Self {
            task: Mutex::new(None),
        }
    }
}

impl Default for LivenessHeartbeat {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Component for LivenessHeartbeat {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn start(&self, ctx: &AppContext) -> anyhow::Result<()> {
        let deadline: Duration = ctx.config().liveness_deadline.into();
        if deadline.is_zero() {
            anyhow::bail!("liveness deadline must be greater than zero");
        }

        let handle = ctx.liveness().register(Self::NAME, deadline);
        handle.report_healthy();

        let shutdown = ctx.shutdown_signal();
        let task = tokio::spawn(async move {
            let period = (deadline / 2).max(MIN_HEARTBEAT_PERIOD);
            let mut interval = tokio::time::interval(period);
            tokio::pin!(shutdown);
            loop {
                tokio::select! {
                    _ = &mut shutdown => break,
                    _ = interval.tick() => handle.report_healthy(),
                }
            }
        });

        let mut slot = self
            .task
            .lock()
            .map_err(|_| anyhow::anyhow!("poisoned heartbeat lock"))?;
        *slot = Some(task);
        Ok(())
    }

    async fn stop(&self, _ctx: &AppContext) -> anyhow::Result<()> {
        let task = self
            .task
            .lock()
            .map_err(|_| anyhow::anyhow!("poisoned heartbeat lock"))?
            .take();
        if let Some(task) = task {
            task.abort();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }
}
