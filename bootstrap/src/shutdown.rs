use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tracing::info;

use crate::context::AppContext;

/// Install SIGTERM and SIGINT handlers that begin the context's shutdown.
///
/// The handlers are registered before returning, so a signal received right
/// after this call is not missed. The watcher task exits on its own once
/// shutdown has begun for any other reason.
pub fn trap_signals(ctx: &AppContext) -> std::io::Result<JoinHandle<()>> {
    let mut term = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let ctx = ctx.clone();

    Ok(tokio::spawn(async move {
        let received = tokio::select! {
            _ = term.recv() => "SIGTERM",
            _ = interrupt.recv() => "SIGINT",
            _ = ctx.shutdown_signal() => return,
        };
        info!("received {received}, shutting down gracefully...");
        ctx.request_shutdown(received);
    }))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use envconfig::Envconfig;

    use super::*;
    use crate::application::Application;
    use crate::args::CommandLineArgs;
    use crate::config::Config;

    struct SignalApp;

    impl Application for SignalApp {
        const NAME: &'static str = "signal-app";
    }

    fn context() -> AppContext {
        let config = Config::init_from_hashmap(&HashMap::new()).unwrap();
        AppContext::new::<SignalApp>(config, CommandLineArgs::default())
    }

    #[tokio::test]
    async fn watcher_waits_for_a_signal() {
        let ctx = context();
        let watcher = trap_signals(&ctx).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!watcher.is_finished());
        assert!(!ctx.is_shutting_down());
        watcher.abort();
    }

    #[tokio::test]
    async fn watcher_exits_once_shutdown_begins() {
        let ctx = context();
        let watcher = trap_signals(&ctx).unwrap();

        ctx.request_shutdown("test");
        tokio::time::timeout(Duration::from_secs(1), watcher)
            .await
            .expect("signal watcher did not exit")
            .unwrap();
    }
}
