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
use std::time::Instant;

use tokio::sync::mpsc;

use crate::{
    error::Error,
    host::{GcMode, Host, ShutdownToken},
    work::AutoGcWork,
};

/// Brackets a session with `session_command_begin`/`session_command_end` and
/// `session_end`, the way [`Closer`](crate::signal::Closer) brackets a
/// request with its completion signal - the matching "end" calls happen in
/// `Drop`, not after a plain `.await`, so they still run if `RunGC` panics
/// instead of just returning an error.
struct SessionGuard<'a, H: Host> {
    host: &'a H,
    session: H::Session,
}

impl<'a, H: Host> SessionGuard<'a, H> {
    fn new(host: &'a H, session: H::Session) -> Self {
        host.session_command_begin(&session);
        Self { host, session }
    }
}

impl<'a, H: Host> Drop for SessionGuard<'a, H> {
    fn drop(&mut self) {
        self.host.session_command_end(&self.session);
        self.host.session_end(&self.session);
    }
}

/// Run one GC at a time, end-to-end, until `ctx` is cancelled.
///
/// On cancellation the loop returns from its idle wait without touching any
/// in-flight item - there is none, by construction, once the select resolves
/// on the cancellation branch rather than the recv branch.
pub(crate) async fn worker_loop<H: Host>(
    ctx: ShutdownToken,
    mut rx: mpsc::Receiver<AutoGcWork<H::Db>>,
    host: Arc<H>,
) {
    loop {
        let work = tokio::select! {
            biased;
            _ = ctx.cancelled() => return,
            item = rx.recv() => match item {
                Some(w) => w,
                // Every CommitHook and the admission loop are gone; nothing left to serve.
                None => return,
            },
        };
        run_one(&host, &ctx, work).await;
    }
}

async fn run_one<H: Host>(host: &Arc<H>, ctx: &ShutdownToken, work: AutoGcWork<H::Db>) {
    let AutoGcWork { db, name, done } = work;

    log::trace!(target: crate::LOG_TARGET, "starting auto-gc for `{name}`");
    let started = Instant::now();

    let session = match host.make_session(ctx.clone()).await {
        Ok(session) => session,
        Err(e) => {
            let err = Error::session_construction_failed(name.clone(), e);
            log::warn!(target: crate::LOG_TARGET, "{err}");
            done.close();
            return;
        }
    };

    let result = {
        let guard = SessionGuard::new(host.as_ref(), session);
        host.run_gc(&guard.session, &db, GcMode::Default, &name).await
        // `guard` drops here - on a normal return and on a panic unwind alike -
        // closing out the session command before `result` is matched below.
    };

    match result {
        Ok(()) => {
            log::info!(
                target: crate::LOG_TARGET,
                "auto-gc for `{name}` completed in {:?}",
                started.elapsed()
            );
        }
        Err(e) => {
            let err = Error::gc_failed(name, e);
            log::warn!(target: crate::LOG_TARGET, "{err}");
        }
    }

    done.close();
}
