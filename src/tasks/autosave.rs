//! Autosave Task
//!
//! Background task that periodically writes a snapshot of the cache.
//!
//! The task is Running until it sees the stop signal, then finishes the current
//! wait and exits without saving; the final save belongs to the cache's close path.
//!
//! Inside a tokio runtime the task is spawned on it. Without one, the task gets a
//! dedicated single-worker runtime owned by the handle, so synchronous embedders
//! get autosave too.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::CacheKey;
use crate::lifecycle::Shared;

// == Autosave Handle ==
/// Owner side of a running autosave task. Dropping it signals the task to stop.
#[derive(Debug)]
pub(crate) struct Autosave {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
    runtime: Handle,
    owned: Option<Runtime>,
}

impl Autosave {
    /// Spawns the autosave loop on the current runtime, or on a dedicated one when
    /// called outside of tokio.
    pub(crate) fn start<K: CacheKey>(
        shared: Arc<Shared<K>>,
        interval: Duration,
    ) -> io::Result<Self> {
        let (runtime, owned) = match Handle::try_current() {
            Ok(handle) => (handle, None),
            Err(_) => {
                let owned = Builder::new_multi_thread()
                    .worker_threads(1)
                    .thread_name("cache-autosave")
                    .enable_all()
                    .build()?;
                debug!("No ambient runtime, autosave runs on a dedicated thread");
                (owned.handle().clone(), Some(owned))
            }
        };

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = runtime.spawn(autosave_loop(shared, interval, stop_rx));
        Ok(Self {
            stop_tx,
            handle,
            runtime,
            owned,
        })
    }

    /// Signals the task to stop and waits up to `timeout` for it to finish.
    ///
    /// Returns false if the bound elapsed; the task is aborted in that case.
    pub(crate) async fn stop(mut self, timeout: Duration) -> bool {
        let _ = self.stop_tx.send(true);

        match tokio::time::timeout(timeout, &mut self.handle).await {
            Ok(_) => true,
            Err(_) => {
                self.handle.abort();
                false
            }
        }
    }

    /// Blocking form of [`Autosave::stop`] for callers outside of tokio.
    ///
    /// From inside a runtime it cannot wait without stalling that runtime, so the
    /// task is aborted right away and false is returned.
    pub(crate) fn stop_blocking(mut self, timeout: Duration) -> bool {
        let _ = self.stop_tx.send(true);

        let finished = if Handle::try_current().is_ok() {
            false
        } else {
            let handle = &mut self.handle;
            self.runtime
                .block_on(async move { tokio::time::timeout(timeout, handle).await.is_ok() })
        };

        if !finished {
            self.handle.abort();
        }
        finished
    }

    #[cfg(test)]
    fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    #[cfg(test)]
    fn owns_runtime(&self) -> bool {
        self.owned.is_some()
    }
}

impl Drop for Autosave {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
        // Never blocks, so the handle can be dropped from async code too
        if let Some(owned) = self.owned.take() {
            owned.shutdown_background();
        }
    }
}

/// Waits for either the interval or the stop signal; only an elapsed interval saves.
///
/// Save failures are logged and swallowed so a transient disk error never takes
/// down the owning application.
async fn autosave_loop<K: CacheKey>(
    shared: Arc<Shared<K>>,
    interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    info!(?interval, "Starting autosave task");

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            // A send or a dropped sender both mean stop
            _ = stop_rx.changed() => break,
        }

        let shared = Arc::clone(&shared);
        match tokio::task::spawn_blocking(move || shared.save()).await {
            Ok(Ok(records)) => debug!(records, "Autosave wrote snapshot"),
            Ok(Err(e)) => warn!(error = %e, "Autosave failed, will retry next interval"),
            Err(e) => error!(error = %e, "Autosave worker panicked"),
        }
    }

    info!("Autosave task stopped");
}
