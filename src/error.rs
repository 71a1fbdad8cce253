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

use core::fmt;

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors an auto-GC commit hook can surface to the host's commit path, or
/// that the worker logs when it cannot finish a collection.
///
/// By the time [`CommitHook::execute`](crate::CommitHook::execute) returns,
/// only [`Error::StoreSizeUnavailable`] and [`Error::ContextCancelled`] can
/// ever reach the caller - the worker-side kinds never escape the background
/// task that produced them, they are only logged.
#[derive(Debug)]
pub enum Error {
    /// The store-size reader failed for a database; the hook did not enqueue.
    StoreSizeUnavailable { db: String, source: Box<dyn std::error::Error + Send + Sync> },
    /// The scope was cancelled before a hook's enqueue could complete.
    ContextCancelled { db: String },
    /// The worker could not obtain a session to run GC with.
    SessionConstructionFailed { db: String, source: Box<dyn std::error::Error + Send + Sync> },
    /// The storage engine's GC pass returned an error.
    GCFailed { db: String, source: Box<dyn std::error::Error + Send + Sync> },
}

impl Error {
    pub(crate) fn store_size_unavailable(
        db: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::StoreSizeUnavailable { db: db.into(), source: source.into() }
    }

    pub(crate) fn context_cancelled(db: impl Into<String>) -> Self {
        Self::ContextCancelled { db: db.into() }
    }

    pub(crate) fn session_construction_failed(
        db: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::SessionConstructionFailed { db: db.into(), source: source.into() }
    }

    pub(crate) fn gc_failed(
        db: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::GCFailed { db: db.into(), source: source.into() }
    }

    /// The database name this error is about, when one is known.
    pub fn db(&self) -> &str {
        match self {
            Self::StoreSizeUnavailable { db, .. }
            | Self::ContextCancelled { db }
            | Self::SessionConstructionFailed { db, .. }
            | Self::GCFailed { db, .. } => db,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StoreSizeUnavailable { db, source } => {
                write!(f, "auto-gc: failed to read store size for `{db}`: {source}")
            }
            Self::ContextCancelled { db } => {
                write!(f, "auto-gc: enqueue for `{db}` cancelled, controller is shutting down")
            }
            Self::SessionConstructionFailed { db, source } => {
                write!(f, "auto-gc: failed to construct a session for `{db}`: {source}")
            }
            Self::GCFailed { db, source } => {
                write!(f, "auto-gc: collection failed for `{db}`: {source}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::StoreSizeUnavailable { source, .. }
            | Self::SessionConstructionFailed { source, .. }
            | Self::GCFailed { source, .. } => Some(source.as_ref()),
            Self::ContextCancelled { .. } => None,
        }
    }
}
