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

use tokio::sync::broadcast;

/// The writer half of a one-shot completion signal. Closing it is the only
/// way its paired [`DoneSignal`] ever transitions from open to closed.
///
/// The actual send happens in `Drop`, not in `close` - so the signal closes
/// on every exit path out of the worker, including a panicking one, without
/// needing an explicit `catch_unwind` guard.
pub(crate) struct Closer(broadcast::Sender<()>);

impl Closer {
    /// Close the signal. Equivalent to dropping it; spelled out at call
    /// sites where "the worker is done with this request" should be explicit.
    pub(crate) fn close(self) {
        drop(self)
    }
}

impl Drop for Closer {
    fn drop(&mut self) {
        // Nothing is listening once every DoneSignal handle has been dropped;
        // that's fine, the transition to closed still happened.
        let _ = self.0.send(());
    }
}

/// A one-shot completion signal: starts open, transitions to closed exactly
/// once, and is cheap to poll synchronously (no `.await` needed) so it can be
/// checked under a held mutex.
///
/// `done` closed means "no request from this database is in flight"; a fresh,
/// open `DoneSignal` is handed off the moment a request is submitted, and the
/// worker closes it unconditionally once it is done with that request -
/// whether or not `RunGC` actually ran.
pub(crate) struct DoneSignal {
    recv: broadcast::Receiver<()>,
    closed: bool,
}

impl DoneSignal {
    /// A signal that starts already closed: "no outstanding request".
    pub(crate) fn pre_closed() -> Self {
        let (tx, rx) = broadcast::channel(1);
        drop(tx);
        Self { recv: rx, closed: true }
    }

    /// A fresh open signal paired with the [`Closer`] that can close it.
    pub(crate) fn open_pair() -> (Closer, Self) {
        let (tx, rx) = broadcast::channel(1);
        (Closer(tx), Self { recv: rx, closed: false })
    }

    /// Non-blocking: has this signal been closed yet?
    pub(crate) fn is_closed(&mut self) -> bool {
        if self.closed {
            return true;
        }
        match self.recv.try_recv() {
            Ok(()) => self.closed = true,
            Err(broadcast::error::TryRecvError::Closed) => self.closed = true,
            Err(broadcast::error::TryRecvError::Empty) => {}
            // A lagged receiver has definitely missed the single close message
            // that could ever be sent on this channel, which only happens
            // after it fired - so it's closed too.
            Err(broadcast::error::TryRecvError::Lagged(_)) => self.closed = true,
        }
        self.closed
    }
}
