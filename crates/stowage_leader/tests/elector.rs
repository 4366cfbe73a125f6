// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `LeaderElector` against an in-memory lock server.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use stowage_leader::{BoxError, LeaderElector, LeaderError, LeaderOperation, LockSession, SessionSource};
use tokio::sync::mpsc;
use stowage_tier::{Collection, ValueType};
use tick::ClockControl;

const LOCK_KEY: i64 = 1234;
const CHECK: Duration = Duration::from_secs(1);
const HEARTBEAT: Duration = Duration::from_secs(2);

#[derive(Debug, Default)]
struct ServerState {
    holder: Option<u64>,
    next_id: u64,
    sessions_acquired: usize,
    unlocks: usize,
    fail_acquire: bool,
    fail_verify: bool,
    sessions: Vec<Arc<AtomicBool>>,
}

/// Simulates advisory locks: one holder at a time, released when the holder's session ends.
#[derive(Debug, Clone, Default)]
struct LockServer(Arc<Mutex<ServerState>>);

impl LockServer {
    fn holder(&self) -> Option<u64> {
        self.0.lock().holder
    }

    fn sessions_acquired(&self) -> usize {
        self.0.lock().sessions_acquired
    }

    fn unlocks(&self) -> usize {
        self.0.lock().unlocks
    }

    fn fail_acquire(&self, fail: bool) {
        self.0.lock().fail_acquire = fail;
    }

    fn fail_verify(&self, fail: bool) {
        self.0.lock().fail_verify = fail;
    }

    fn drop_connections(&self) {
        let mut state = self.0.lock();
        for closed in &state.sessions {
            closed.store(true, Ordering::SeqCst);
        }
        state.holder = None;
    }
}

impl SessionSource for LockServer {
    type Session = FakeSession;

    async fn acquire(&self) -> Result<FakeSession, BoxError> {
        let mut state = self.0.lock();
        if state.fail_acquire {
            return Err("pool exhausted".into());
        }
        state.next_id += 1;
        state.sessions_acquired += 1;
        let closed = Arc::new(AtomicBool::new(false));
        state.sessions.push(Arc::clone(&closed));
        Ok(FakeSession {
            id: state.next_id,
            server: self.clone(),
            closed,
        })
    }
}

#[derive(Debug)]
struct FakeSession {
    id: u64,
    server: LockServer,
    closed: Arc<AtomicBool>,
}

impl LockSession for FakeSession {
    async fn try_lock(&mut self, _key: i64) -> Result<bool, BoxError> {
        let mut state = self.server.0.lock();
        match state.holder {
            None => {
                state.holder = Some(self.id);
                Ok(true)
            }
            Some(holder) => Ok(holder == self.id),
        }
    }

    async fn holds_lock(&mut self, _key: i64) -> Result<bool, BoxError> {
        let state = self.server.0.lock();
        if state.fail_verify {
            return Err("verification query failed".into());
        }
        Ok(state.holder == Some(self.id))
    }

    async fn unlock(&mut self, _key: i64) -> Result<bool, BoxError> {
        let mut state = self.server.0.lock();
        state.unlocks += 1;
        if state.holder == Some(self.id) {
            state.holder = None;
            return Ok(true);
        }
        Ok(false)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        let mut state = self.server.0.lock();
        if state.holder == Some(self.id) {
            state.holder = None;
        }
    }
}

async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

/// Lets the election loops register their timers, then moves time forward by `period`.
async fn advance(control: &ClockControl, period: Duration) {
    settle().await;
    control.advance(period);
    settle().await;
}

async fn start(server: &LockServer, control: &ClockControl) -> (LeaderElector, mpsc::Receiver<LeaderError>) {
    LeaderElector::builder(server.clone(), LOCK_KEY, control.to_clock())
        .check_period(CHECK)
        .heartbeat_period(HEARTBEAT)
        .start()
        .await
        .expect("elector should start")
}

#[tokio::test]
async fn starts_as_follower_and_becomes_leader_on_first_check() {
    let server = LockServer::default();
    let control = ClockControl::new();
    let (elector, _errors) = start(&server, &control).await;

    assert!(!elector.is_leader());
    assert_eq!(elector.lock_key(), LOCK_KEY);

    advance(&control, CHECK).await;
    assert!(elector.is_leader());
    assert_eq!(server.holder(), Some(1));

    elector.stop().await;
}

#[tokio::test]
async fn at_most_one_of_two_competitors_leads() {
    let server = LockServer::default();
    let control = ClockControl::new();
    let (first, _e1) = start(&server, &control).await;
    let (second, _e2) = start(&server, &control).await;

    for _ in 0..3 {
        advance(&control, CHECK).await;
        assert!(!(first.is_leader() && second.is_leader()), "two leaders at once");
    }
    assert!(first.is_leader() || second.is_leader(), "nobody took the lock");

    first.stop().await;
    second.stop().await;
}

#[tokio::test]
async fn stopping_the_leader_lets_the_other_take_over() {
    let server = LockServer::default();
    let control = ClockControl::new();
    let (first, _e1) = start(&server, &control).await;
    advance(&control, CHECK).await;
    assert!(first.is_leader());

    let (second, _e2) = start(&server, &control).await;
    advance(&control, CHECK).await;
    assert!(!second.is_leader());

    first.stop().await;
    assert_eq!(server.unlocks(), 1);
    assert_eq!(server.holder(), None);

    for _ in 0..3 {
        advance(&control, CHECK).await;
    }
    assert!(second.is_leader());

    second.stop().await;
}

#[tokio::test]
async fn failed_verification_steps_down_and_reports() {
    let server = LockServer::default();
    let control = ClockControl::new();
    let (elector, mut errors) = start(&server, &control).await;
    advance(&control, CHECK).await;
    assert!(elector.is_leader());

    server.fail_verify(true);
    server.fail_acquire(true);
    for _ in 0..2 {
        advance(&control, CHECK).await;
    }

    assert!(!elector.is_leader());
    assert_eq!(server.holder(), None, "stepping down ends the session holding the lock");

    let error = errors.try_recv().expect("verification error should be reported");
    assert_eq!(error.operation(), LeaderOperation::VerifyLock);
    assert!(error.to_string().contains("verification query failed"), "got: {error}");

    elector.stop().await;
}

#[tokio::test]
async fn lost_session_is_replaced_on_next_check() {
    let server = LockServer::default();
    let control = ClockControl::new();
    let (elector, _errors) = start(&server, &control).await;
    advance(&control, CHECK).await;
    assert!(elector.is_leader());

    server.drop_connections();
    for _ in 0..4 {
        advance(&control, CHECK).await;
    }

    assert!(elector.is_leader());
    assert_eq!(server.sessions_acquired(), 2);

    elector.stop().await;
}

#[tokio::test]
async fn start_fails_when_no_session_is_available() {
    let server = LockServer::default();
    server.fail_acquire(true);

    let error = LeaderElector::builder(server, LOCK_KEY, ClockControl::new().to_clock())
        .start()
        .await
        .expect_err("start should fail");
    assert_eq!(error.operation(), LeaderOperation::AcquireSession);
}

#[tokio::test]
async fn authorizer_and_subscription_follow_leadership() {
    let server = LockServer::default();
    let control = ClockControl::new();
    let (elector, _errors) = start(&server, &control).await;
    let authorize = elector.authorizer();
    let mut changes = elector.subscribe();
    let collection = Collection::new("sessions", ValueType::String);

    assert!(!authorize(&collection));

    advance(&control, CHECK).await;
    assert!(changes.has_changed().unwrap());
    assert!(*changes.borrow_and_update());
    assert!(authorize(&collection));

    elector.stop().await;
    assert!(!authorize(&collection));
}

#[tokio::test]
async fn follower_stop_does_not_unlock() {
    let server = LockServer::default();
    server.0.lock().holder = Some(999);
    let control = ClockControl::new();
    let (elector, _errors) = start(&server, &control).await;

    advance(&control, CHECK).await;
    assert!(!elector.is_leader());

    elector.stop().await;
    assert_eq!(server.unlocks(), 0);
    assert_eq!(server.holder(), Some(999));
}
