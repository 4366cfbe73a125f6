// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The leader election loop.

use std::time::Duration;

use anyspawn::{JoinHandle, Spawner};
use futures::StreamExt;
use stowage_tier::Collection;
use tick::{Clock, PeriodicTimer};
use tokio::sync::{mpsc, oneshot, watch};

use crate::{BoxError, LeaderError, LeaderOperation, LockSession, SessionSource};

const DEFAULT_CHECK_PERIOD: Duration = Duration::from_secs(5);
const DEFAULT_HEARTBEAT_PERIOD: Duration = Duration::from_secs(10);
const ERROR_CHANNEL_CAPACITY: usize = 16;

/// Builder for configuring and starting a [`LeaderElector`].
#[derive(Debug)]
pub struct LeaderElectorBuilder<S> {
    source: S,
    lock_key: i64,
    clock: Clock,
    check_period: Duration,
    heartbeat_period: Duration,
    spawner: Option<Spawner>,
}

impl<S: SessionSource> LeaderElectorBuilder<S> {
    /// How often a follower tries to take the lock. Defaults to 5 seconds.
    #[must_use]
    pub const fn check_period(mut self, period: Duration) -> Self {
        self.check_period = period;
        self
    }

    /// How often a leader confirms it still owns the lock. Defaults to 10 seconds.
    #[must_use]
    pub const fn heartbeat_period(mut self, period: Duration) -> Self {
        self.heartbeat_period = period;
        self
    }

    /// Sets the spawner running the election loop. Defaults to Tokio.
    #[must_use]
    pub fn spawner(mut self, spawner: Spawner) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Pins one session from the source and starts competing for leadership.
    ///
    /// Returns the elector together with the receiving end of its error channel. Errors that
    /// do not fit into the channel are dropped after being logged.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial session cannot be acquired.
    pub async fn start(self) -> Result<(LeaderElector, mpsc::Receiver<LeaderError>), LeaderError> {
        let session = self
            .source
            .acquire()
            .await
            .map_err(|e| LeaderError::during(LeaderOperation::AcquireSession, e))?;

        let (leader_tx, leader_rx) = watch::channel(false);
        let (errors_tx, errors_rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let campaign = Campaign {
            source: self.source,
            session: Some(session),
            lock_key: self.lock_key,
            leader: leader_tx,
            errors: errors_tx,
        };

        tracing::info!(leader.lock_key = self.lock_key, "leader elector started");

        let spawner = self.spawner.unwrap_or_else(Spawner::new_tokio);
        let task = spawner.spawn(campaign.run(self.clock, self.check_period, self.heartbeat_period, shutdown_rx));

        let elector = LeaderElector {
            lock_key: self.lock_key,
            leader: leader_rx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        };
        Ok((elector, errors_rx))
    }
}

/// Competes for leadership among cooperating processes through an advisory lock.
///
/// The elector pins a single database session for its whole lifetime. A follower tries to take
/// the lock every check period; a leader confirms ownership every heartbeat period and becomes a
/// follower as soon as a confirmation fails or the session is lost. A lost session is replaced
/// on the next check.
///
/// Dropping the elector stops the loop in the background; [`stop`](Self::stop) also waits for
/// the lock and session to be released.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
///
/// use stowage_leader::{LeaderElector, PgSessionSource};
/// use tick::Clock;
///
/// # async fn example(pool: deadpool_postgres::Pool) -> Result<(), stowage_leader::LeaderError> {
/// let (elector, mut errors) = LeaderElector::builder(PgSessionSource::new(pool), 4242, Clock::new_tokio())
///     .check_period(Duration::from_secs(1))
///     .heartbeat_period(Duration::from_secs(2))
///     .start()
///     .await?;
///
/// tokio::spawn(async move {
///     while let Some(error) = errors.recv().await {
///         eprintln!("{error}");
///     }
/// });
///
/// if elector.is_leader() {
///     // run maintenance
/// }
///
/// elector.stop().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct LeaderElector {
    lock_key: i64,
    leader: watch::Receiver<bool>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl LeaderElector {
    /// Creates a builder competing for the advisory lock `lock_key`.
    #[must_use]
    pub fn builder<S: SessionSource>(source: S, lock_key: i64, clock: Clock) -> LeaderElectorBuilder<S> {
        LeaderElectorBuilder {
            source,
            lock_key,
            clock,
            check_period: DEFAULT_CHECK_PERIOD,
            heartbeat_period: DEFAULT_HEARTBEAT_PERIOD,
            spawner: None,
        }
    }

    /// The advisory lock key this elector competes for.
    #[must_use]
    pub const fn lock_key(&self) -> i64 {
        self.lock_key
    }

    /// Returns whether this elector currently believes it is the leader.
    #[must_use]
    pub fn is_leader(&self) -> bool {
        *self.leader.borrow()
    }

    /// Returns a receiver that observes every leadership change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.leader.clone()
    }

    /// Returns a callback that approves work only while this elector is the leader.
    ///
    /// The callback matches the reaper authorization hook of the relational cache backend.
    #[must_use]
    pub fn authorizer(&self) -> impl Fn(&Collection) -> bool + Send + Sync + 'static {
        let leader = self.leader.clone();
        move |_| *leader.borrow()
    }

    /// Stops competing, releases the lock if held, and waits until the session is released.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            task.await;
        }
    }
}

struct Campaign<S: SessionSource> {
    source: S,
    session: Option<S::Session>,
    lock_key: i64,
    leader: watch::Sender<bool>,
    errors: mpsc::Sender<LeaderError>,
}

impl<S: SessionSource> Campaign<S> {
    async fn run(mut self, clock: Clock, check_period: Duration, heartbeat_period: Duration, mut shutdown: oneshot::Receiver<()>) {
        let mut check = PeriodicTimer::new(&clock, check_period);
        let mut heartbeat = PeriodicTimer::new(&clock, heartbeat_period);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                Some(()) = check.next() => self.check().await,
                Some(()) = heartbeat.next() => self.heartbeat().await,
            }
        }

        self.release().await;
        tracing::info!(leader.lock_key = self.lock_key, "leader elector stopped");
    }

    fn is_leader(&self) -> bool {
        *self.leader.borrow()
    }

    async fn check(&mut self) {
        if self.is_leader() {
            return;
        }

        if self.session.as_ref().is_none_or(LockSession::is_closed) {
            self.session = None;
            match self.source.acquire().await {
                Ok(session) => self.session = Some(session),
                Err(e) => return self.report(LeaderOperation::AcquireSession, e),
            }
        }

        let Some(session) = self.session.as_mut() else {
            return;
        };

        match session.try_lock(self.lock_key).await {
            Ok(true) => {
                self.leader.send_replace(true);
                tracing::info!(leader.lock_key = self.lock_key, "acquired leadership");
            }
            Ok(false) => tracing::debug!(leader.lock_key = self.lock_key, "advisory lock is held elsewhere"),
            Err(e) => self.report(LeaderOperation::TryLock, e),
        }
    }

    async fn heartbeat(&mut self) {
        if !self.is_leader() {
            return;
        }

        let outcome = match self.session.as_mut() {
            Some(session) if !session.is_closed() => session.holds_lock(self.lock_key).await,
            _ => Err("database session was lost".into()),
        };

        match outcome {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(leader.lock_key = self.lock_key, "advisory lock no longer held");
                self.step_down();
            }
            Err(e) => {
                self.step_down();
                self.report(LeaderOperation::VerifyLock, e);
            }
        }
    }

    // Ends the pinned session so that no lock can outlive leadership; the next check pins a
    // fresh one.
    fn step_down(&mut self) {
        self.leader.send_replace(false);
        if let Some(session) = self.session.take() {
            session.discard();
        }
        tracing::warn!(leader.lock_key = self.lock_key, "lost leadership");
    }

    async fn release(&mut self) {
        let was_leader = self.leader.send_replace(false);
        let Some(mut session) = self.session.take() else {
            return;
        };

        if !was_leader {
            return;
        }

        match session.unlock(self.lock_key).await {
            Ok(_) => drop(session),
            Err(e) => {
                session.discard();
                self.report(LeaderOperation::Unlock, e);
            }
        }
    }

    fn report(&self, operation: LeaderOperation, cause: BoxError) {
        let error = LeaderError::during(operation, cause);
        tracing::error!(leader.lock_key = self.lock_key, error = %error, "leader election error");
        let _ = self.errors.try_send(error);
    }
}
