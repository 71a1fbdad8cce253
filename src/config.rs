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

/// Tunable thresholds for the commit hook's trigger predicate.
///
/// The defaults match the constants the storage layer's own GC protocol was
/// designed against (§6 of the controller's design doc): a 128 MiB journal
/// bound limits recovery work and read amplification for uncompacted writes,
/// and a 256 MiB absolute-growth bound catches steady writers whose packed
/// set has doubled since the last compaction even though the journal never
/// grew past the first bound.
///
/// A `Config` only affects hooks created after it is supplied to
/// [`Controller::new`](crate::Controller::new) - it is read once per hook and
/// is not a live, reloadable setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Fire if the journal alone exceeds this many bytes.
    pub thresh_journal: u64,
    /// Fire if total store size has grown by this many bytes since the last
    /// observed baseline.
    pub thresh_growth: u64,
}

impl Config {
    /// `THRESH_JOURNAL` from the design doc: 128 MiB.
    pub const DEFAULT_THRESH_JOURNAL: u64 = 128 * 1024 * 1024;
    /// `THRESH_GROWTH` from the design doc: 256 MiB.
    pub const DEFAULT_THRESH_GROWTH: u64 = 256 * 1024 * 1024;

    /// Environment variable read by [`Config::from_env`] to override
    /// [`Config::thresh_journal`].
    pub const ENV_THRESH_JOURNAL: &'static str = "AUTOGC_THRESH_JOURNAL_BYTES";
    /// Environment variable read by [`Config::from_env`] to override
    /// [`Config::thresh_growth`].
    pub const ENV_THRESH_GROWTH: &'static str = "AUTOGC_THRESH_GROWTH_BYTES";

    /// Build a config, falling back to the documented defaults for any
    /// environment variable that is unset or fails to parse as a `u64`.
    ///
    /// A malformed value (present but not a valid byte count) is logged and
    /// ignored rather than treated as fatal - auto-GC tuning is not worth
    /// refusing to start the host process over.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = Self::read_env_u64(Self::ENV_THRESH_JOURNAL) {
            cfg.thresh_journal = v;
        }
        if let Some(v) = Self::read_env_u64(Self::ENV_THRESH_GROWTH) {
            cfg.thresh_growth = v;
        }
        cfg
    }

    fn read_env_u64(key: &str) -> Option<u64> {
        match std::env::var(key) {
            Ok(raw) => match raw.parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    log::warn!(target: crate::LOG_TARGET, "ignoring invalid value for `{key}`: {raw:?}");
                    None
                }
            },
            Err(std::env::VarError::NotPresent) => None,
            Err(std::env::VarError::NotUnicode(_)) => {
                log::warn!(target: crate::LOG_TARGET, "ignoring non-unicode value for `{key}`");
                None
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thresh_journal: Self::DEFAULT_THRESH_JOURNAL,
            thresh_growth: Self::DEFAULT_THRESH_GROWTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_design_doc_constants() {
        let cfg = Config::default();
        assert_eq!(cfg.thresh_journal, 128 * 1024 * 1024);
        assert_eq!(cfg.thresh_growth, 256 * 1024 * 1024);
    }
}
