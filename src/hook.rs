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

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::{
    config::Config,
    error::{Error, Result},
    host::{Host, ShutdownToken},
    signal::{Closer, DoneSignal},
    size::StoreSize,
    work::AutoGcWork,
};

struct State<D> {
    /// Closed iff no request from this database is currently in flight.
    done: DoneSignal,
    /// Pre-allocated pair handed off whole on the next successful submit.
    next: (Closer, DoneSignal),
    /// Baseline snapshot; non-empty only while `done` is closed.
    last_size: Option<StoreSize>,
}

impl<D> State<D> {
    fn new() -> Self {
        Self { done: DoneSignal::pre_closed(), next: DoneSignal::open_pair(), last_size: None }
    }
}

/// A per-database commit hook. Cheap to clone - every clone shares the same
/// back-pressure state, so installing the same hook value in front of
/// multiple writer paths for one database is safe (though normally a single
/// hook is created per database via [`Controller::new_commit_hook`]).
///
/// [`Controller::new_commit_hook`]: crate::Controller::new_commit_hook
pub struct CommitHook<H: Host> {
    name: Arc<str>,
    cfg: Config,
    host: Arc<H>,
    ingress: mpsc::Sender<AutoGcWork<H::Db>>,
    state: Arc<Mutex<State<H::Db>>>,
}

impl<H: Host> Clone for CommitHook<H> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            cfg: self.cfg,
            host: self.host.clone(),
            ingress: self.ingress.clone(),
            state: self.state.clone(),
        }
    }
}

impl<H: Host> CommitHook<H> {
    pub(crate) fn new(
        name: impl Into<Arc<str>>,
        cfg: Config,
        host: Arc<H>,
        ingress: mpsc::Sender<AutoGcWork<H::Db>>,
    ) -> Self {
        Self { name: name.into(), cfg, host, ingress, state: Arc::new(Mutex::new(State::new())) }
    }

    /// The name this hook was constructed with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Called by the host after a dataset-level write. `_dataset` names the
    /// dataset that was written and is informational only - the trigger
    /// predicate only looks at store size.
    ///
    /// Safe under concurrent calls: while a request from this database is
    /// already in flight, every call is a fast no-op that does not even
    /// query the store size.
    pub async fn execute(&self, ctx: ShutdownToken, _dataset: &str, db: H::Db) -> Result<()> {
        let mut state = self.state.lock().await;

        if !state.done.is_closed() {
            // A request is already pending or running for this database.
            return Ok(());
        }

        let current = self
            .host
            .store_size(&db)
            .await
            .map_err(|e| Error::store_size_unavailable(self.name.as_ref(), e))?;

        if state.last_size.is_none() {
            state.last_size = Some(current);
        }
        let baseline = *state.last_size.as_ref().expect("just set above if it was empty");

        if !current.triggers_gc(&baseline, &self.cfg) {
            return Ok(());
        }

        self.submit(&mut state, ctx, db).await
    }

    async fn submit(&self, state: &mut State<H::Db>, ctx: ShutdownToken, db: H::Db) -> Result<()> {
        let work = AutoGcWork { db, name: self.name.to_string(), done: self.take_next_closer(state) };

        tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                // Roll back: nothing about this hook's state changes on cancellation.
                self.restore_next(state, work);
                Err(Error::context_cancelled(self.name.as_ref()))
            }
            result = self.ingress.send(work) => {
                match result {
                    Ok(()) => {
                        state.last_size = None;
                        Ok(())
                    }
                    Err(_) => {
                        // The admission loop is gone (controller shut down); treat the
                        // same as cancellation from the hook's point of view.
                        Err(Error::context_cancelled(self.name.as_ref()))
                    }
                }
            }
        }
    }

    /// Errors from the write that triggered this hook are not of interest to
    /// auto-GC; always defer to the host's own handling.
    pub fn handle_error(&self, _err: &dyn std::error::Error) -> Option<Error> {
        None
    }

    /// The controller logs through the `log` facade under its own target;
    /// it never adopts a caller-supplied logger.
    pub fn set_logger(&self) -> Option<Error> {
        None
    }

    /// Working-set updates count as commits for auto-GC purposes too.
    pub fn execute_for_working_sets(&self) -> bool {
        true
    }

    /// Take the pre-allocated `next` pair out, leaving a fresh one in its
    /// place, and make `done` watch the reader half that was just handed off.
    fn take_next_closer(&self, state: &mut State<H::Db>) -> Closer {
        let fresh = DoneSignal::open_pair();
        let (closer, reader) = std::mem::replace(&mut state.next, fresh);
        state.done = reader;
        closer
    }

    /// Undo `take_next_closer`'s effect when the send that would have
    /// consumed `work.done` never went through.
    fn restore_next(&self, state: &mut State<H::Db>, work: AutoGcWork<H::Db>) {
        // `done` currently watches the reader half paired with `work.done`;
        // put both back into `next` exactly as they were before the attempt,
        // and restore the pre-closed signal `done` held before the submit.
        state.next = (work.done, std::mem::replace(&mut state.done, DoneSignal::pre_closed()));
    }
}
