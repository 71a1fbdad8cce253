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

use crate::config::Config;

/// A store-size snapshot for a single database, as reported by the storage
/// layer: the size of the append-only journal, and the total on-disk size
/// (journal plus packed chunks).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSize {
    pub journal_bytes: u64,
    pub total_bytes: u64,
}

impl StoreSize {
    pub const fn new(journal_bytes: u64, total_bytes: u64) -> Self {
        Self { journal_bytes, total_bytes }
    }

    /// Evaluate the trigger predicate: fire if the journal alone has grown
    /// past `cfg.thresh_journal`, or if total size has grown by more than
    /// `cfg.thresh_growth` since `baseline`.
    pub(crate) fn triggers_gc(&self, baseline: &StoreSize, cfg: &Config) -> bool {
        self.journal_bytes > cfg.thresh_journal
            || self.total_bytes.saturating_sub(baseline.total_bytes) > cfg.thresh_growth
    }
}
