use std::future::Future;
use std::pin::Pin;
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::error::Error;

type Job = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

/// A persistent, dedicated-thread executor: one owned Tokio runtime driving
/// one OS thread for the lifetime of the adapter. Work is submitted via a
/// bounded channel and run on that runtime; callers never spin up their own
/// event loop per call. This replaces the per-call-thread-then-migrate
/// anti-pattern the design notes call out.
pub struct PersistentExecutor {
    tx: mpsc::Sender<Job>,
    handle: Option<JoinHandle<()>>,
}

impl PersistentExecutor {
    /// Spawns a dedicated OS thread hosting its own current-thread Tokio
    /// runtime, and a task loop draining `jobs` for the runtime's lifetime.
    pub fn spawn(name: &'static str, queue_capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<Job>(queue_capacity);

        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed to build persistent executor runtime");

                rt.block_on(async move {
                    while let Some(job) = rx.recv().await {
                        job().await;
                    }
                    tracing::info!(executor = name, "persistent executor shutting down");
                });
            })
            .expect("failed to spawn persistent executor thread");

        Self {
            tx,
            handle: Some(handle),
        }
    }

    /// Submits a unit of work and waits for its result via a one-shot reply
    /// channel, bounded by `deadline`. A missed deadline returns a
    /// `Connectivity` timeout error; the work item may still complete on
    /// the executor later — its effect lands in whatever cache it mutates,
    /// which is acceptable per the concurrency model.
    pub async fn submit<F, T>(&self, deadline: Duration, f: F) -> Result<T, Error>
    where
        F: FnOnce() -> Pin<Box<dyn Future<Output = T> + Send>> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let job: Job = Box::new(move || {
            Box::pin(async move {
                let result = f().await;
                let _ = reply_tx.send(result);
            })
        });

        self.tx
            .send(job)
            .await
            .map_err(|_| Error::Fatal("venue executor has shut down".to_string()))?;

        match tokio::time::timeout(deadline, reply_rx).await {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(_)) => Err(Error::Fatal("venue executor dropped the reply".to_string())),
            Err(_) => Err(Error::Connectivity(format!(
                "venue call exceeded {deadline:?} deadline"
            ))),
        }
    }
}

impl PersistentExecutor {
    /// Closes the work channel and joins the executor thread on a blocking
    /// thread pool, bounded by `deadline`. Used by the adapter's `close`
    /// so shutdown never stalls an async caller indefinitely.
    pub async fn shutdown(mut self, deadline: Duration) {
        let handle = self.handle.take();
        drop(self); // closes `tx`, letting the loop drain and exit

        if let Some(handle) = handle {
            let join = tokio::task::spawn_blocking(move || handle.join());
            let _ = tokio::time::timeout(deadline, join).await;
        }
    }
}

impl Drop for PersistentExecutor {
    fn drop(&mut self) {
        // Dropping `tx` closes the channel so the executor loop exits once
        // drained; the thread is intentionally not joined here (Drop can't
        // be async without risking a worker-thread stall) — use `shutdown`
        // for a bounded, joined teardown.
        let _ = self.handle.take();
    }
}
