//! Baseline calculation and verification runs.
//!
//! Both modes walk the same file listing and mutate a [`ChecksumStore`] in
//! memory. The store is written after every computed digest when
//! `save_often` is set, and always once more when the run ends, including
//! when it ends early because of an interrupt.

use crate::config::Config;
use crate::digest::DigestProvider;
use crate::interrupt::CancelToken;
use crate::max_age::MaxAge;
use crate::store::{ChecksumStore, Record, StoreError};
use crate::timestamp::{self, elapsed_days, format_timestamp, parse_timestamp};
use crate::walk::{TreeFile, list_files};
use chrono::NaiveDateTime;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Database error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculateSummary {
    /// Digests computed, including failed computations.
    pub calculated: usize,
    /// Of `calculated`, how many failed and were recorded as absent.
    pub failed: usize,
    /// Files that already had a baseline.
    pub skipped: usize,
    pub forced: bool,
    pub interrupted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckSummary {
    pub ok: usize,
    pub wrong: usize,
    /// Files whose last OK observation is younger than the max age.
    pub skipped_recent: usize,
    /// Records in the database when the run started.
    pub total_in_db: usize,
    pub max_age_days: i64,
    pub interrupted: bool,
}

impl CheckSummary {
    /// Database files that were found in the tree.
    pub fn found(&self) -> usize {
        self.ok + self.wrong + self.skipped_recent
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Nothing to verify; the database was not written.
    EmptyDatabase,
    Checked(CheckSummary),
}

/// Whether a file's last successful verification is recent enough to skip it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    Fresh { days: i64 },
    Due,
}

/// Applies the max-age policy to a record's most recent OK observation.
///
/// A record without OK observations is due. So is one whose latest OK key
/// does not parse as a timestamp: an unreadable history never suppresses a
/// check.
pub fn staleness(record: &Record, now: NaiveDateTime, max_age: MaxAge) -> Staleness {
    let Some(last_ok) = record.last_ok().and_then(|(key, _)| parse_timestamp(key)) else {
        return Staleness::Due;
    };

    let days = elapsed_days(last_ok, now);
    if days < max_age.days() {
        Staleness::Fresh { days }
    } else {
        Staleness::Due
    }
}

pub struct ScanEngine<'a> {
    config: &'a Config,
    provider: &'a dyn DigestProvider,
    cancel: CancelToken,
}

impl<'a> ScanEngine<'a> {
    pub fn new(config: &'a Config, provider: &'a dyn DigestProvider, cancel: CancelToken) -> Self {
        ScanEngine {
            config,
            provider,
            cancel,
        }
    }

    fn files(&self) -> Vec<TreeFile> {
        list_files(&self.config.target, &self.config.db_path)
    }

    fn digest(&self, path: &Path) -> Option<String> {
        match self.provider.compute(path, self.config.algorithm) {
            Ok(digest) => Some(digest),
            Err(e) => {
                warn!(
                    "Could not compute {} checksum of {}: {}",
                    self.config.algorithm,
                    path.display(),
                    e
                );
                None
            }
        }
    }

    fn save_often(&self, store: &ChecksumStore) -> Result<(), StoreError> {
        if self.config.save_often {
            store.save(&self.config.db_path)?;
        }
        Ok(())
    }

    /// Computes baselines for files that lack one for the configured
    /// algorithm, or for every file when `force` is set.
    ///
    /// A baseline recorded as absent (a failed earlier computation) still
    /// counts as present; only `force` recomputes it.
    pub fn calculate(&self, store: &mut ChecksumStore) -> Result<CalculateSummary, ScanError> {
        let algorithm = self.config.algorithm.as_str();
        let mut summary = CalculateSummary {
            forced: self.config.force,
            ..CalculateSummary::default()
        };

        for file in self.files() {
            if self.cancel.is_cancelled() {
                summary.interrupted = true;
                break;
            }

            let has_baseline = store
                .get(&file.key)
                .is_some_and(|record| record.has_baseline_entry(algorithm));

            if has_baseline && !self.config.force {
                info!("Skipping {} - checksum already calculated", file.key);
                summary.skipped += 1;
                continue;
            }

            let digest = self.digest(&file.path);
            match &digest {
                Some(d) => info!("{} - {}: {}", file.key, algorithm, d),
                None => summary.failed += 1,
            }
            store.record_mut(&file.key).set_baseline(algorithm, digest);
            summary.calculated += 1;

            self.save_often(store)?;
        }

        store.save(&self.config.db_path)?;
        Ok(summary)
    }

    /// Verifies files that have a baseline entry for the configured
    /// algorithm.
    ///
    /// Files not yet in the database are ignored; this never creates
    /// baselines. Each verified file gains exactly one OK or WRONG entry.
    /// An absent baseline only matches an absent fresh digest.
    pub fn check(&self, store: &mut ChecksumStore) -> Result<CheckOutcome, ScanError> {
        if store.is_empty() {
            return Ok(CheckOutcome::EmptyDatabase);
        }

        let algorithm = self.config.algorithm.as_str();
        let mut summary = CheckSummary {
            total_in_db: store.len(),
            max_age_days: self.config.max_age.days(),
            ..CheckSummary::default()
        };

        info!("Checking {} files found in database", summary.total_in_db);

        for file in self.files() {
            if self.cancel.is_cancelled() {
                summary.interrupted = true;
                break;
            }

            let Some(record) = store.get_mut(&file.key) else {
                continue;
            };
            let Some(expected) = record.baseline.get(algorithm).cloned() else {
                debug!("No {} baseline for {}", algorithm, file.key);
                continue;
            };

            let now = timestamp::now();
            if let Staleness::Fresh { days } = staleness(record, now, self.config.max_age) {
                info!(
                    "Only {} days since last check of {} - skipping file",
                    days, file.key
                );
                summary.skipped_recent += 1;
                continue;
            }

            let actual = self.digest(&file.path);
            let checked_at = format_timestamp(now);

            if actual == expected {
                info!("Checksum for {} - OK", file.key);
                record.record_ok(&checked_at, algorithm, actual);
                summary.ok += 1;
            } else {
                warn!(
                    "Checksum for {} - WRONG - expected {} but calculated {}",
                    file.key,
                    expected.as_deref().unwrap_or("nothing"),
                    actual.as_deref().unwrap_or("nothing")
                );
                record.record_wrong(&checked_at, algorithm, actual);
                summary.wrong += 1;
            }

            self.save_often(store)?;
        }

        store.save(&self.config.db_path)?;
        Ok(CheckOutcome::Checked(summary))
    }
}
