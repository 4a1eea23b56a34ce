//! The signal-driven runtime loop.
//!
//! [`Runtime`] wires an [`Engine`] to the outside world: it installs
//! logging, drives ticks, polls [`EventSource`]s on idle, stops on
//! ctrl-c (or an explicit [`CancellationToken`]), and performs the
//! shutdown sequence — fire `stopped`, drain the queue up to the
//! configured tick limit, then fail every never-satisfied wait.
//!
//! # Example
//!
//! ```rust,ignore
//! use relay_runtime::{Runtime, config::load_config};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = Runtime::from_config(load_config()?);
//!     let root = runtime.engine().root();
//!     // ... attach components under `root` ...
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use relay_core::Engine;

use crate::config::RelayConfig;
use crate::error::RelayResult;
use crate::logging;
use crate::source::EventSource;

/// A configured engine plus the loop that drives it.
pub struct Runtime {
    engine: Engine,
    config: RelayConfig,
    sources: Vec<Arc<dyn EventSource>>,
}

impl Runtime {
    /// Creates a runtime with a fresh engine and installs logging per the
    /// config.
    pub fn from_config(config: RelayConfig) -> Self {
        logging::init_from_config(&config.logging);
        Self {
            engine: Engine::new(),
            config,
            sources: Vec::new(),
        }
    }

    /// Adds an external event source, polled on idle ticks.
    pub fn with_source(mut self, source: Arc<dyn EventSource>) -> Self {
        debug!(source = source.name(), "event source added");
        self.sources.push(source);
        self
    }

    /// The engine handle, for attaching components and firing events.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Runs until ctrl-c.
    pub async fn run(&self) -> RelayResult<()> {
        let token = CancellationToken::new();
        let signal_token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("ctrl-c received, shutting down");
                signal_token.cancel();
            }
        });
        self.run_until(token).await
    }

    /// Runs until `token` is cancelled, then shuts the engine down.
    ///
    /// A critical handler failure exits the loop and is returned after the
    /// shutdown sequence has still been performed.
    pub async fn run_until(&self, token: CancellationToken) -> RelayResult<()> {
        let idle = Duration::from_millis(self.config.engine.idle_backoff_ms);
        self.engine.boot();
        info!("runtime started");

        let result = loop {
            if token.is_cancelled() {
                break Ok(());
            }
            match self.engine.tick().await {
                Ok(true) => {}
                Ok(false) => {
                    let mut injected = false;
                    for source in &self.sources {
                        if source.poll(&self.engine).await {
                            injected = true;
                        }
                    }
                    if !injected {
                        tokio::select! {
                            _ = token.cancelled() => break Ok(()),
                            _ = tokio::time::sleep(idle) => {}
                        }
                    }
                }
                Err(failure) => {
                    error!(%failure, "critical handler failure, stopping");
                    break Err(failure.into());
                }
            }
        };

        self.engine
            .shutdown(self.config.engine.drain_limit_ticks)
            .await;
        info!("runtime stopped");
        result
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("engine", &self.engine)
            .field("sources", &self.sources.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relay_core::{Event, EventError, Flow, on};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[tokio::test]
    async fn cancelled_run_still_drains_queued_events() {
        let runtime = Runtime::from_config(RelayConfig::default());
        let root = runtime.engine().root();

        let handled = Arc::new(AtomicUsize::new(0));
        let handled_inner = Arc::clone(&handled);
        runtime
            .engine()
            .component("worker")
            .handler(on("work"), move |_call| {
                let handled = Arc::clone(&handled_inner);
                async move {
                    handled.fetch_add(1, Ordering::SeqCst);
                    Ok(Flow::Continue)
                }
            })
            .attach(&root)
            .unwrap();

        let work = runtime.engine().fire(Event::new("work")).unwrap();

        let token = CancellationToken::new();
        token.cancel();
        runtime.run_until(token).await.unwrap();

        // The loop never ticked, but the shutdown drain dispatched it.
        assert!(work.is_complete());
        assert_eq!(handled.load(Ordering::SeqCst), 1);
        assert_eq!(runtime.engine().pending_events(), 0);
    }

    struct OneShotSource {
        token: CancellationToken,
        fired: AtomicBool,
    }

    #[async_trait]
    impl EventSource for OneShotSource {
        async fn poll(&self, engine: &Engine) -> bool {
            if !self.fired.swap(true, Ordering::SeqCst) {
                engine.fire(Event::new("external")).is_ok()
            } else {
                // Nothing left to inject; let the loop wind down.
                self.token.cancel();
                false
            }
        }
    }

    #[tokio::test]
    async fn idle_loop_polls_sources_for_events() {
        let token = CancellationToken::new();
        let runtime = Runtime::from_config(RelayConfig::default()).with_source(Arc::new(
            OneShotSource {
                token: token.clone(),
                fired: AtomicBool::new(false),
            },
        ));
        let root = runtime.engine().root();

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_inner = Arc::clone(&seen);
        runtime
            .engine()
            .component("listener")
            .handler(on("external"), move |_call| {
                let seen = Arc::clone(&seen_inner);
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok(Flow::Continue)
                }
            })
            .attach(&root)
            .unwrap();

        runtime.run_until(token).await.unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn shutdown_fails_pending_waits_after_cancellation() {
        let runtime = Runtime::from_config(RelayConfig::default());
        let root = runtime.engine().root();
        let never = Event::new("never");

        let never_inner = never.clone();
        runtime
            .engine()
            .component("waiter")
            .handler(on("start"), move |_call| {
                let never = never_inner.clone();
                async move {
                    Ok(Flow::wait(never, |_done| async {
                        Ok(Flow::value(serde_json::json!("unreachable")))
                    }))
                }
            })
            .attach(&root)
            .unwrap();

        let start = runtime.engine().fire(Event::new("start")).unwrap();

        let token = CancellationToken::new();
        let stopper = token.clone();
        let probe = start.clone();
        // Cancel as soon as the waiter has parked.
        tokio::spawn(async move {
            loop {
                if probe.error().is_some() || probe.is_complete() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
                stopper.cancel();
            }
        });

        runtime.run_until(token).await.unwrap();

        assert!(start.is_complete());
        assert!(matches!(
            start.error(),
            Some(EventError::UnresolvedWait(_))
        ));
    }
}
