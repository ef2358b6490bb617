//! Shutdown coordination between the HTTP server and the dataset refresh task
use std::future::Future;
use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::Duration;

/// Shared shutdown flag for the server and its background tasks
#[derive(Clone)]
pub struct ServiceRuntime {
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl ServiceRuntime {
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Receiver for background tasks; clone one per task
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    pub fn trigger_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Resolves on Ctrl+C or programmatic shutdown; for `with_graceful_shutdown()`
    pub fn create_shutdown_future(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut shutdown_rx = self.shutdown_rx.clone();

        async move {
            if *shutdown_rx.borrow() {
                return;
            }
            tokio::select! {
                _ = signal::ctrl_c() => {
                    eprintln!("\nShutdown signal (Ctrl+C) received...");
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        eprintln!("\nShutdown triggered by background task...");
                    }
                }
            }
        }
    }

    /// Sleep for `period`; returns `false` if shutdown was requested meanwhile
    pub async fn sleep_unless_shutdown(&self, period: Duration) -> bool {
        let mut shutdown_rx = self.shutdown_rx.clone();
        if *shutdown_rx.borrow() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(period) => !*shutdown_rx.borrow(),
            _ = shutdown_rx.changed() => !*shutdown_rx.borrow(),
        }
    }

    /// Signal shutdown to every task, then drain `background_tasks`
    pub async fn wait_for_shutdown_cleanup<T: 'static>(
        &self,
        service_name: &str,
        background_tasks: &mut JoinSet<T>,
    ) {
        self.trigger_shutdown();

        if !background_tasks.is_empty() {
            eprintln!("\nWaiting for background tasks to finish...");
        }

        while let Some(result) = background_tasks.join_next().await {
            if let Err(e) = result
                && !e.is_cancelled()
            {
                eprintln!("Background task error: {}", e);
            }
        }

        eprintln!("{} stopped", service_name);
    }
}

impl Default for ServiceRuntime {
    fn default() -> Self {
        Self::new()
    }
}
