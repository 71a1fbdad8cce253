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

use crate::signal::Closer;

/// A single GC request in flight between a commit hook and the worker.
///
/// `db` is a cheap, cloneable, non-owning handle - the controller never
/// outlives the host's own ownership of the database. `done` is closed by
/// the worker on every exit path, success or failure, exactly once.
pub(crate) struct AutoGcWork<D> {
    pub(crate) db: D,
    pub(crate) name: String,
    pub(crate) done: Closer,
}
