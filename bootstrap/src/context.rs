//! The application context: one explicit handle on the state of the running
//! application, built at startup and passed down to everything that needs it.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use health::HealthRegistry;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::application::Application;
use crate::args::CommandLineArgs;
use crate::config::Config;
use crate::error::BootstrapError;
use crate::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Created,
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
}

impl ContextState {
    pub fn can_transition_to(self, next: ContextState) -> bool {
        use ContextState::{Created, Failed, Running, Starting, Stopped, Stopping};

        matches!(
            (self, next),
            (Created, Starting)
                | (Starting, Running)
                | (Starting, Failed)
                | (Running, Stopping)
                | (Stopping, Stopped)
                | (Stopping, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ContextState::Stopped | ContextState::Failed)
    }
}

#[derive(Clone)]
pub struct AppContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    application: &'static str,
    name: String,
    config: Config,
    args: CommandLineArgs,
    state: watch::Sender<ContextState>,
    shutdown: CancellationToken,
    shutdown_requested: AtomicBool,
    liveness: HealthRegistry,
    created_at: Instant,
}

impl AppContext {
    pub fn new<A: Application>(config: Config, args: CommandLineArgs) -> Self {
        let name = config
            .app_name
            .clone()
            .unwrap_or_else(|| A::NAME.to_owned());
        let (state, _) = watch::channel(ContextState::Created);

        Self {
            inner: Arc::new(ContextInner {
                application: A::NAME,
                liveness: HealthRegistry::new(&format!("{name} liveness")),
                name,
                config,
                args,
                state,
                shutdown: CancellationToken::new(),
                shutdown_requested: AtomicBool::new(false),
                created_at: Instant::now(),
            }),
        }
    }

    /// Name declared by the application marker type.
    pub fn application(&self) -> &'static str {
        self.inner.application
    }

    /// Display name: the configured app name, or the marker's.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn args(&self) -> &CommandLineArgs {
        &self.inner.args
    }

    /// Command line property lookup, including properties the bootstrap config ignores.
    pub fn property(&self, name: &str) -> Option<String> {
        self.inner.args.property(name)
    }

    pub fn liveness(&self) -> &HealthRegistry {
        &self.inner.liveness
    }

    pub fn state(&self) -> ContextState {
        *self.inner.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ContextState> {
        self.inner.state.subscribe()
    }

    /// Time since the context was created.
    pub fn uptime(&self) -> Duration {
        self.inner.created_at.elapsed()
    }

    pub(crate) fn transition(&self, next: ContextState) -> Result<(), BootstrapError> {
        let mut rejected = None;
        self.inner.state.send_if_modified(|state| {
            if state.can_transition_to(next) {
                *state = next;
                true
            } else {
                rejected = Some(*state);
                false
            }
        });

        match rejected {
            Some(from) => Err(BootstrapError::InvalidTransition { from, to: next }),
            None => {
                debug!(app = %self.name(), state = ?next, "application context transition");
                Ok(())
            }
        }
    }

    /// Begin shutdown. Only the first call, across all threads, is logged and
    /// counted; it is the only one returning true.
    pub fn request_shutdown(&self, trigger: &str) -> bool {
        if self.inner.shutdown_requested.swap(true, Ordering::AcqRel) {
            debug!(app = %self.name(), trigger, "shutdown already in progress");
            return false;
        }
        info!(app = %self.name(), trigger, "shutdown initiated");
        metrics::emit_shutdown_initiated(self.name(), trigger);
        self.inner.shutdown.cancel();
        true
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Resolves once shutdown begins; suitable for axum's `with_graceful_shutdown`.
    pub fn shutdown_signal(&self) -> impl Future<Output = ()> + Send + 'static {
        let token = self.inner.shutdown.clone();
        async move { token.cancelled().await }
    }

    /// Ready to take traffic: running and not shutting down.
    pub fn is_ready(&self) -> bool {
        self.state() == ContextState::Running && !self.is_shutting_down()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use envconfig::Envconfig;

    use super::*;

    struct TestApp;

    impl Application for TestApp {
        const NAME: &'static str = "test-app";
    }

    fn context(env: &[(&str, &str)]) -> AppContext {
        let env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let config = Config::init_from_hashmap(&env).unwrap();
        AppContext::new::<TestApp>(config, CommandLineArgs::default())
    }

    #[test]
    fn name_defaults_to_marker() {
        let ctx = context(&[]);
        assert_eq!(ctx.application(), "test-app");
        assert_eq!(ctx.name(), "test-app");

        let ctx = context(&[("APP_NAME", "orders")]);
        assert_eq!(ctx.application(), "test-app");
        assert_eq!(ctx.name(), "orders");
    }

    #[test]
    fn full_lifecycle() {
        let ctx = context(&[]);
        assert_eq!(ctx.state(), ContextState::Created);

        for next in [
            ContextState::Starting,
            ContextState::Running,
            ContextState::Stopping,
            ContextState::Stopped,
        ] {
            ctx.transition(next).unwrap();
            assert_eq!(ctx.state(), next);
        }
        assert!(ctx.state().is_terminal());
    }

    #[test]
    fn invalid_transition_keeps_state() {
        let ctx = context(&[]);
        let err = ctx.transition(ContextState::Running).unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::InvalidTransition {
                from: ContextState::Created,
                to: ContextState::Running
            }
        ));
        assert_eq!(ctx.state(), ContextState::Created);

        ctx.transition(ContextState::Starting).unwrap();
        ctx.transition(ContextState::Failed).unwrap();
        assert!(ctx.transition(ContextState::Starting).is_err());
        assert_eq!(ctx.state(), ContextState::Failed);
    }

    #[test]
    fn readiness_follows_state_and_shutdown() {
        let ctx = context(&[]);
        assert!(!ctx.is_ready());

        ctx.transition(ContextState::Starting).unwrap();
        ctx.transition(ContextState::Running).unwrap();
        assert!(ctx.is_ready());

        assert!(ctx.request_shutdown("test"));
        assert!(ctx.is_shutting_down());
        assert!(!ctx.is_ready());

        // idempotent
        assert!(!ctx.request_shutdown("test"));
        assert!(ctx.is_shutting_down());
    }

    #[test]
    fn racing_triggers_initiate_shutdown_once() {
        let ctx = context(&[]);

        let initiated = std::thread::scope(|scope| {
            let triggers: Vec<_> = (0..16)
                .map(|i| {
                    let ctx = ctx.clone();
                    let trigger = if i % 2 == 0 { "signal" } else { "application" };
                    scope.spawn(move || ctx.request_shutdown(trigger))
                })
                .collect();
            triggers
                .into_iter()
                .map(|t| t.join())
                .filter(|r| matches!(r, Ok(true)))
                .count()
        });

        assert_eq!(initiated, 1);
        assert!(ctx.is_shutting_down());
    }

    #[tokio::test]
    async fn shutdown_signal_resolves_after_request() {
        let ctx = context(&[]);
        let signal = ctx.shutdown_signal();
        let waiter = tokio::spawn(signal);

        ctx.request_shutdown("test");
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("shutdown signal did not resolve")
            .unwrap();
    }

    #[tokio::test]
    async fn state_changes_are_observable() {
        let ctx = context(&[]);
        let mut states = ctx.subscribe_state();

        ctx.transition(ContextState::Starting).unwrap();
        states.changed().await.unwrap();
        assert_eq!(*states.borrow_and_update(), ContextState::Starting);
    }
}
