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

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{
    config::Config,
    hook::CommitHook,
    host::{BoxFuture, Host, ShutdownToken},
    work::AutoGcWork,
    worker::worker_loop,
};

/// Channel depth of one between a hook's `submit` and the admission loop.
/// `mpsc` has no true zero-capacity option; a single-slot handoff cell plus
/// `Sender::reserve` gives the same rendezvous semantics (a send only
/// resolves once the admission loop has actually made room for it) without
/// ever risking the loss of a reserved item if a `select!` branch other than
/// the send is chosen.
const INGRESS_DEPTH: usize = 1;
const WORKER_DEPTH: usize = 1;

/// Builds and wires together the commit hooks, the admission queue, and the
/// GC worker for one host process.
pub struct Controller<H: Host> {
    host: Arc<H>,
    cfg: Config,
    ingress_tx: mpsc::Sender<AutoGcWork<H::Db>>,
    ingress_rx: parking_lot::Mutex<Option<mpsc::Receiver<AutoGcWork<H::Db>>>>,
}

impl<H: Host> Controller<H> {
    /// Build a controller against `host`, using [`Config::default`] for the
    /// trigger thresholds.
    pub fn new(host: Arc<H>) -> Self {
        Self::with_config(host, Config::default())
    }

    /// Build a controller with an explicit [`Config`]. Only hooks created
    /// after this call observe `cfg` - it is captured once, not reloaded.
    pub fn with_config(host: Arc<H>, cfg: Config) -> Self {
        let (ingress_tx, ingress_rx) = mpsc::channel(INGRESS_DEPTH);
        Self { host, cfg, ingress_tx, ingress_rx: parking_lot::Mutex::new(Some(ingress_rx)) }
    }

    /// Construct a hook bound to this controller's ingress queue.
    pub fn new_commit_hook(&self, name: impl Into<Arc<str>>) -> CommitHook<H> {
        CommitHook::new(name, self.cfg, self.host.clone(), self.ingress_tx.clone())
    }

    /// Attach a freshly constructed hook to each named database via the
    /// host's own registration API.
    pub fn apply_commit_hooks(&self, databases: impl IntoIterator<Item = (impl Into<Arc<str>>, H::Db)>) {
        for (name, db) in databases {
            let hook = self.new_commit_hook(name);
            self.host.prepend_commit_hook(&db, hook);
        }
    }

    /// Register the admission loop and the worker loop as two cooperating
    /// background tasks under the host's cancellation scope.
    ///
    /// Returns once registration completes; the tasks themselves keep
    /// running until the host cancels their scope.
    ///
    /// # Panics
    ///
    /// Panics if called more than once on the same controller.
    pub fn start(&self) {
        let ingress_rx =
            self.ingress_rx.lock().take().expect("Controller::start called more than once");

        let (worker_tx, worker_rx) = mpsc::channel::<AutoGcWork<H::Db>>(WORKER_DEPTH);
        let host = self.host.clone();

        self.host.register("autogc-admission", move |ctx: ShutdownToken| -> BoxFuture<'static, ()> {
            Box::pin(admission_loop(ctx, ingress_rx, worker_tx))
        });

        self.host.register("autogc-worker", move |ctx: ShutdownToken| -> BoxFuture<'static, ()> {
            Box::pin(worker_loop(ctx, worker_rx, host))
        });
    }
}

/// Owns `PendingQueue` and hands items to the worker strictly in the order
/// they were admitted, never dropping one except at cancellation.
async fn admission_loop<D: Send + 'static>(
    ctx: ShutdownToken,
    mut ingress_rx: mpsc::Receiver<AutoGcWork<D>>,
    worker_tx: mpsc::Sender<AutoGcWork<D>>,
) {
    let mut queue: VecDeque<AutoGcWork<D>> = VecDeque::new();

    loop {
        tokio::select! {
            biased;

            _ = ctx.cancelled() => {
                // Intentionally drop whatever remains in `queue`: GC is
                // idempotent and will be re-triggered by a later commit.
                return;
            }

            item = ingress_rx.recv() => {
                match item {
                    Some(w) => queue.push_back(w),
                    // Every hook has been dropped; nothing more can ever arrive.
                    None => return,
                }
            }

            // Only a candidate branch while there is something to dispatch -
            // this is what makes "send when both ready" structural rather
            // than a peek-and-retry loop.
            permit = worker_tx.reserve(), if !queue.is_empty() => {
                match permit {
                    Ok(permit) => {
                        let w = queue.pop_front().expect("guarded by !queue.is_empty() above");
                        permit.send(w);
                    }
                    // The worker task is gone; nothing left to dispatch to.
                    Err(_) => return,
                }
            }
        }
    }
}
