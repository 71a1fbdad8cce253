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

//! Auto-GC admission controller.
//!
//! Table data in this engine lives in a content-addressed store backed by an
//! append-only journal plus packed chunk files. Left alone, the journal and
//! dead chunks accumulate without bound, so every database periodically needs
//! a garbage collection pass. This crate decides *when* a database wants one,
//! serializes collection so at most one runs at a time for the whole process,
//! dispatches the work to a long-lived background worker, and throttles each
//! database so it cannot ask again until its previous request has finished.
//!
//! The controller never talks to the SQL engine, the session registry, or the
//! storage layer's actual GC algorithm directly - those are modeled by the
//! [`Host`] trait, so the same controller code runs against the real engine
//! and against the in-memory [`FakeHost`](test_support::FakeHost) used by this
//! crate's own tests.

mod config;
mod controller;
mod error;
mod hook;
mod host;
mod signal;
mod size;
mod work;
mod worker;

#[cfg(any(test, feature = "test-util"))]
pub mod test_support;

pub use config::Config;
pub use controller::Controller;
pub use error::{Error, Result};
pub use hook::CommitHook;
pub use host::{BackgroundScope, BoxFuture, GcMode, Host, ShutdownToken};
pub use size::StoreSize;

/// Logging target every log line this crate emits is tagged with.
pub const LOG_TARGET: &str = "sqle/auto_gc";
