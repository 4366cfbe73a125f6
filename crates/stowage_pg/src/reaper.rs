// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Background deletion of expired rows.

use std::sync::Arc;
use std::time::Duration;

use anyspawn::{JoinHandle, Spawner};
use futures::StreamExt;
use stowage_tier::{Collection, Error};
use tick::{Clock, PeriodicTimer};
use tokio::sync::oneshot;

/// Decides whether this process may delete expired rows of a collection.
pub(crate) type Authorizer = Arc<dyn Fn(&Collection) -> bool + Send + Sync>;

/// Owns a running reaper task.
#[derive(Debug)]
pub(crate) struct ReaperHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// Signals the reaper to stop and waits for its task to exit.
    pub(crate) async fn shutdown(self) {
        let _ = self.shutdown.send(());
        self.task.await;
    }
}

/// Spawns a reaper that runs `sweep` once right away and then every `period`.
///
/// Every sweep, the first included, only runs while `authorize` approves it. `sweep` returns
/// the number of deleted rows.
pub(crate) fn spawn<F, Fut>(
    spawner: &Spawner,
    clock: &Clock,
    collection: Collection,
    period: Duration,
    authorize: Option<Authorizer>,
    sweep: F,
) -> ReaperHandle
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<u64, Error>> + Send + 'static,
{
    let (shutdown, stopped) = oneshot::channel();
    let reaper = Reaper {
        collection,
        authorize,
        sweep,
    };
    let task = spawner.spawn(reaper.run(clock.clone(), period, stopped));
    ReaperHandle { shutdown, task }
}

struct Reaper<F> {
    collection: Collection,
    authorize: Option<Authorizer>,
    sweep: F,
}

impl<F, Fut> Reaper<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<u64, Error>> + Send + 'static,
{
    async fn run(self, clock: Clock, period: Duration, mut stopped: oneshot::Receiver<()>) {
        tracing::info!(cache.collection = self.collection.name(), reaper.period = ?period, "reaper started");

        self.tick().await;

        let mut timer = PeriodicTimer::new(&clock, period);
        loop {
            tokio::select! {
                _ = &mut stopped => break,
                Some(()) = timer.next() => self.tick().await,
            }
        }

        tracing::info!(cache.collection = self.collection.name(), "reaper stopped");
    }

    async fn tick(&self) {
        let approved = self.authorize.as_ref().is_none_or(|authorize| authorize(&self.collection));
        if approved {
            self.sweep().await;
        } else {
            tracing::debug!(cache.collection = self.collection.name(), "sweep not authorized, skipping");
        }
    }

    async fn sweep(&self) {
        match (self.sweep)().await {
            Ok(deleted) => tracing::debug!(cache.collection = self.collection.name(), reaper.deleted = deleted, "swept expired rows"),
            Err(e) => tracing::error!(cache.collection = self.collection.name(), error = %e, "failed to sweep expired rows"),
        }
    }
}
