//! Agent — owns the running components and their shutdown.
//!
//! Sensors are spawned as tasks that watch a shared shutdown flag. Passive
//! components (logic blocks, actuators) are only reachable through the
//! router's weak subscriber handles, so the agent keeps them alive until it
//! is shut down.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use edgewire_domain::id::DeviceName;

use crate::router::Router;

/// Time granted to workers to stop before they are aborted.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(5);

pub struct Agent {
    router: Arc<Router>,
    shutdown: watch::Sender<bool>,
    workers: Vec<(DeviceName, JoinHandle<()>)>,
    attached: Vec<Arc<dyn Any + Send + Sync>>,
}

impl Agent {
    #[must_use]
    pub fn new(router: Arc<Router>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            router,
            shutdown,
            workers: Vec::new(),
            attached: Vec::new(),
        }
    }

    #[must_use]
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Spawn a worker. `start` receives the shutdown flag the worker must
    /// watch.
    pub fn spawn<F>(&mut self, name: DeviceName, start: impl FnOnce(watch::Receiver<bool>) -> F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(start(self.shutdown.subscribe()));
        tracing::debug!(worker = %name, "worker spawned");
        self.workers.push((name, handle));
    }

    /// Keep a passive component alive for the lifetime of the agent.
    pub fn attach(&mut self, component: Arc<dyn Any + Send + Sync>) {
        self.attached.push(component);
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    #[must_use]
    pub fn attached_count(&self) -> usize {
        self.attached.len()
    }

    /// Signal every worker, wait up to `grace` for them to finish, abort the
    /// stragglers, then release components and disconnect.
    pub async fn shutdown(self, grace: Duration) {
        self.shutdown.send_replace(true);
        let deadline = tokio::time::Instant::now() + grace;

        for (name, mut handle) in self.workers {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => tracing::debug!(worker = %name, "worker stopped"),
                Ok(Err(err)) => tracing::error!(worker = %name, %err, "worker failed"),
                Err(_) => {
                    tracing::warn!(worker = %name, "worker did not stop in time, aborting");
                    handle.abort();
                }
            }
        }

        drop(self.attached);
        self.router.disconnect_all();
        tracing::info!("agent stopped");
    }
}
