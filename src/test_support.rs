/*
 * Created on Tue Jul 28 2026
 *
 * This file is a part of the auto-gc admission controller for a
 * content-addressed, version-controlled SQL storage engine.
 *
 * Copyright (c) 2026, the project authors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! An in-memory [`Host`] used by this crate's own test suite and available to
//! downstream crates under the `test-util` feature, so embedders can drive
//! the controller in their own tests without a real SQL engine or storage
//! layer attached.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::host::{BackgroundScope, BoxFuture, GcMode, Host, ShutdownToken};
use crate::hook::CommitHook;
use crate::size::StoreSize;

/// A database handle in the fake harness: just a name, wrapped so it is the
/// same cheap, cloneable kind of handle a real engine would hand the
/// controller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FakeDb(pub Arc<str>);

impl FakeDb {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }
}

impl std::fmt::Display for FakeDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A trivial `Send + Sync` session: the fake host has nothing for it to hold.
pub struct FakeSession {
    id: u64,
}

impl FakeSession {
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug)]
pub struct FakeError(pub String);

impl std::fmt::Display for FakeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for FakeError {}

/// A single recorded `run_gc` invocation, in the order the worker issued it -
/// used by tests to assert on FIFO dispatch order and argument correctness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcCall {
    pub db: Arc<str>,
    pub name: String,
}

struct Inner {
    sizes: HashMap<Arc<str>, StoreSize>,
    gc_calls: Vec<GcCall>,
    gc_failures: std::collections::HashSet<Arc<str>>,
    size_failures: std::collections::HashSet<Arc<str>>,
    session_failures: bool,
    session_command_begins: u64,
    session_command_ends: u64,
    session_ends: u64,
    gc_delay: Duration,
}

/// An in-memory stand-in for "the SQL engine, session lifecycle, and
/// background-thread registry". Every method a real host would implement is
/// driven by state a test can inspect and mutate directly, rather than by an
/// actual running SQL engine.
///
/// Background tasks registered through [`BackgroundScope::register`] are
/// spawned onto the ambient Tokio runtime immediately; [`FakeHost::join`]
/// awaits all of them, mirroring how the real host awaits its background
/// registry at shutdown.
pub struct FakeHost {
    inner: Mutex<Inner>,
    tasks: Mutex<Vec<tokio::task::JoinHandle<()>>>,
    scope: ShutdownToken,
    gc_started: Notify,
    size_queries: AtomicU64,
    next_session_id: AtomicU64,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                sizes: HashMap::new(),
                gc_calls: Vec::new(),
                gc_failures: Default::default(),
                size_failures: Default::default(),
                session_failures: false,
                session_command_begins: 0,
                session_command_ends: 0,
                session_ends: 0,
                gc_delay: Duration::ZERO,
            }),
            tasks: Mutex::new(Vec::new()),
            scope: ShutdownToken::new(),
            gc_started: Notify::new(),
            size_queries: AtomicU64::new(0),
            next_session_id: AtomicU64::new(0),
        })
    }

    /// Cancel this host's shared background scope - every admission loop and
    /// worker loop registered through it observes `ctx.cancelled()` promptly.
    pub fn cancel(&self) {
        self.scope.cancel();
    }

    /// The shared scope token, for tests that need to pass it to a hook's
    /// `execute` call the same way the host would.
    pub fn scope(&self) -> ShutdownToken {
        self.scope.clone()
    }

    /// Set the store-size snapshot the next `store_size` call for `db` will
    /// observe.
    pub fn set_size(&self, db: &str, size: StoreSize) {
        self.inner.lock().sizes.insert(Arc::from(db), size);
    }

    /// Make `store_size` fail for `db` until cleared.
    pub fn fail_size_for(&self, db: &str) {
        self.inner.lock().size_failures.insert(Arc::from(db));
    }

    /// Make `run_gc` fail for `db` until cleared.
    pub fn fail_gc_for(&self, db: &str) {
        self.inner.lock().gc_failures.insert(Arc::from(db));
    }

    /// Make every subsequent `make_session` call fail.
    pub fn fail_sessions(&self) {
        self.inner.lock().session_failures = true;
    }

    /// Artificially stretch `run_gc`'s duration, to make ordering and
    /// single-flight races observable under test.
    pub fn set_gc_delay(&self, delay: Duration) {
        self.inner.lock().gc_delay = delay;
    }

    /// Total number of times `store_size` has been called, across all
    /// databases.
    pub fn size_query_count(&self) -> u64 {
        self.size_queries.load(Ordering::SeqCst)
    }

    /// The `run_gc` calls the worker has issued so far, in dispatch order.
    pub fn gc_calls(&self) -> Vec<GcCall> {
        self.inner.lock().gc_calls.clone()
    }

    pub fn session_lifecycle_counts(&self) -> (u64, u64, u64) {
        let inner = self.inner.lock();
        (inner.session_command_begins, inner.session_command_ends, inner.session_ends)
    }

    /// Resolves once at least one `run_gc` call has begun - lets a test wait
    /// for the worker to pick up an item without a fixed sleep.
    pub async fn wait_for_gc_start(&self) {
        self.gc_started.notified().await;
    }

    /// Await every background task registered through this host. Mirrors a
    /// real host awaiting its background registry during shutdown.
    pub async fn join(&self) {
        let handles = std::mem::take(&mut *self.tasks.lock());
        for h in handles {
            let _ = h.await;
        }
    }
}

impl BackgroundScope for FakeHost {
    fn register<F>(&self, _name: &'static str, make_task: F)
    where
        F: FnOnce(ShutdownToken) -> BoxFuture<'static, ()> + Send + 'static,
    {
        let task = make_task(self.scope.clone());
        self.tasks.lock().push(tokio::spawn(task));
    }
}

impl Host for FakeHost {
    type Db = FakeDb;
    type Session = FakeSession;
    type SizeError = FakeError;
    type SessionError = FakeError;
    type GcError = FakeError;

    async fn store_size(&self, db: &Self::Db) -> Result<StoreSize, Self::SizeError> {
        self.size_queries.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.lock();
        if inner.size_failures.contains(&db.0) {
            return Err(FakeError(format!("size unavailable for `{}`", db.0)));
        }
        Ok(inner.sizes.get(&db.0).copied().unwrap_or(StoreSize::new(0, 0)))
    }

    async fn make_session(&self, _ctx: ShutdownToken) -> Result<Self::Session, Self::SessionError> {
        if self.inner.lock().session_failures {
            return Err(FakeError("session construction failed".into()));
        }
        Ok(FakeSession { id: self.next_session_id.fetch_add(1, Ordering::SeqCst) })
    }

    fn session_command_begin(&self, _session: &Self::Session) {
        self.inner.lock().session_command_begins += 1;
    }

    fn session_command_end(&self, _session: &Self::Session) {
        self.inner.lock().session_command_ends += 1;
    }

    fn session_end(&self, _session: &Self::Session) {
        self.inner.lock().session_ends += 1;
    }

    async fn run_gc(
        &self,
        _session: &Self::Session,
        db: &Self::Db,
        _mode: GcMode,
        name: &str,
    ) -> Result<(), Self::GcError> {
        // `notify_one`, not `notify_waiters`: it stores a permit for a
        // waiter that hasn't called `wait_for_gc_start` yet, so a test that
        // wins the race and checks before this runs still observes it.
        self.gc_started.notify_one();
        let delay = self.inner.lock().gc_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let mut inner = self.inner.lock();
        inner.gc_calls.push(GcCall { db: db.0.clone(), name: name.to_string() });
        if inner.gc_failures.contains(&db.0) {
            return Err(FakeError(format!("gc failed for `{}`", db.0)));
        }
        Ok(())
    }

    fn prepend_commit_hook(&self, _db: &Self::Db, _hook: CommitHook<Self>) {
        // The fake harness does not model a real commit-hook chain; tests
        // call `CommitHook::execute` directly instead of going through a
        // simulated write path.
    }
}
