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

use crate::{hook::CommitHook, size::StoreSize};

/// The cancellable scope a [`BackgroundScope::register`]ed task runs under.
///
/// Cancelling this token is how the host tells the admission loop and the
/// worker to stop: both select on [`ShutdownToken::cancelled`] alongside
/// their real work and return as soon as it resolves.
pub type ShutdownToken = tokio_util::sync::CancellationToken;

/// A boxed, `'static` future - used where a task needs to be type-erased
/// before it is handed to [`BackgroundScope::register`].
pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// The mode passed to [`Host::run_gc`]. The storage layer's GC protocol may
/// support others; this crate only ever asks for the default one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcMode {
    Default,
}

/// The subset of the host's background-thread registry this crate needs:
/// cancellable task registration.
pub trait BackgroundScope: Send + Sync {
    /// Register a long-running task under the host's cancellation scope.
    ///
    /// `make_task` is handed the scope's [`ShutdownToken`] and must produce
    /// the future to run; the host is responsible for spawning it and for
    /// awaiting its completion as part of its own shutdown sequence.
    /// Registration itself never blocks on the task finishing.
    fn register<F>(&self, name: &'static str, make_task: F)
    where
        F: FnOnce(ShutdownToken) -> BoxFuture<'static, ()> + Send + 'static;
}

/// Stands in for "the SQL engine, session lifecycle, and background-thread
/// registry" - the host this controller is embedded in. The host provides
/// cancellable background-task registration, mints per-task sessions, and
/// performs the one blocking call this crate never implements itself:
/// running an actual GC pass for a database.
///
/// Both the production adapter and the test harness
/// ([`FakeHost`](crate::test_support::FakeHost)) are ordinary `Host`
/// implementations; nothing in `controller`, `hook`, or the worker loop knows
/// or cares which one it is talking to.
pub trait Host: BackgroundScope + Send + Sync + 'static {
    /// A cheap, cloneable, non-owning handle to a database.
    type Db: Clone + Send + Sync + 'static;
    /// A per-task execution context minted by [`Host::make_session`].
    type Session: Send + 'static;
    /// Failure reading a store-size snapshot.
    type SizeError: std::error::Error + Send + Sync + 'static;
    /// Failure constructing a session.
    type SessionError: std::error::Error + Send + Sync + 'static;
    /// Failure running the storage engine's GC pass.
    type GcError: std::error::Error + Send + Sync + 'static;

    /// Read the current store-size snapshot for `db`. Expected to be
    /// bounded-time; this is called on every `Execute` while no request is
    /// already in flight for the database.
    fn store_size(
        &self,
        db: &Self::Db,
    ) -> impl std::future::Future<Output = Result<StoreSize, Self::SizeError>> + Send;

    /// Mint a session rooted at `ctx` for the worker to run one collection
    /// with.
    fn make_session(
        &self,
        ctx: ShutdownToken,
    ) -> impl std::future::Future<Output = Result<Self::Session, Self::SessionError>> + Send;

    /// Paired with [`Host::session_command_end`]; both must bracket any use
    /// of the session, on every exit path.
    fn session_command_begin(&self, session: &Self::Session);
    fn session_command_end(&self, session: &Self::Session);
    /// Tear down a session once the worker is done with it.
    fn session_end(&self, session: &Self::Session);

    /// Run one collection cycle for `db`. Blocking/long-running from the
    /// caller's point of view; the worker is the only task that ever calls
    /// this, one database at a time.
    fn run_gc(
        &self,
        session: &Self::Session,
        db: &Self::Db,
        mode: GcMode,
        name: &str,
    ) -> impl std::future::Future<Output = Result<(), Self::GcError>> + Send;

    /// Install `hook` in front of `db`'s existing commit hooks. Mirrors the
    /// host's `Database.PrependCommitHooks` API.
    fn prepend_commit_hook(&self, db: &Self::Db, hook: CommitHook<Self>)
    where
        Self: Sized;
}
