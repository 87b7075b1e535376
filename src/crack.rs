use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::CrackError;
use crate::progress::{ProgressCadence, ProgressSnapshot, ProgressWriter};
use crate::report::{Outcome, RunReport};
use crate::validator::{ArchiveValidator, Trial};
use crate::wordlist::{Password, WordSource};

/// Everything the trial loop keeps track of during one run.
#[derive(Debug)]
pub struct RunStats {
    pub tested_words: u64,
    pub total_words: u64,
    pub start_time: Instant,
    /// When progress was last emitted
    pub last_update: Instant,
    password_found: Option<Vec<u8>>,
}

impl RunStats {
    pub fn new(total_words: u64, start_time: Instant) -> Self {
        Self {
            tested_words: 0,
            total_words,
            start_time,
            last_update: start_time,
            password_found: None,
        }
    }

    pub fn record_trial(&mut self) {
        debug_assert!(self.tested_words < self.total_words);
        self.tested_words += 1;
    }

    /// Records the password. Only the first one sticks.
    pub fn record_found(&mut self, password: &Password) {
        debug_assert!(self.password_found.is_none());
        self.password_found.get_or_insert_with(|| password.to_vec());
    }

    pub fn found(&self) -> bool {
        self.password_found.is_some()
    }

    pub fn password_found(&self) -> Option<&Password> {
        self.password_found.as_deref()
    }

    pub fn snapshot(&self, now: Instant, candidate: &Password) -> ProgressSnapshot {
        ProgressSnapshot::compute(
            self.tested_words,
            self.total_words,
            now.saturating_duration_since(self.start_time),
            candidate,
        )
    }
}

/// Tries the candidates of a word source against an archive, one at a time, until
/// one of them opens it.
pub struct Cracker<'a, V> {
    validator: V,
    cadence: ProgressCadence,
    cancel: Option<&'a AtomicBool>,
}

impl<'a, V: ArchiveValidator> Cracker<'a, V> {
    pub fn new(validator: V) -> Self {
        Self {
            validator,
            cadence: ProgressCadence::default(),
            cancel: None,
        }
    }

    pub fn with_cadence(mut self, cadence: ProgressCadence) -> Self {
        self.cadence = cadence;
        self
    }

    /// The run stops while counting or before the next trial once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.map_or(false, |flag| flag.load(Ordering::Relaxed))
    }

    pub fn run<W: Write>(
        &self,
        archive: &Path,
        words: &impl WordSource,
        progress: &mut ProgressWriter<W>,
    ) -> RunReport {
        progress.info(format_args!(
            "Cracking {} with word list {}",
            archive.display(),
            words.describe()
        ));

        let total_words = match words.count(self.cancel) {
            Ok(total_words) => total_words,
            Err(CrackError::Interrupted { counted }) => {
                progress.info(format_args!("Interrupted after counting {} words", counted));
                return RunReport {
                    outcome: Outcome::NotFound,
                    execution_time: Duration::ZERO,
                    tested_words: 0,
                    total_words: counted,
                };
            }
            Err(e) => {
                progress.info(&e);
                return RunReport::word_list_unreadable(&e, e.counted());
            }
        };
        progress.info(format_args!("{} words in the list", total_words));

        let candidates = match words.candidates() {
            Ok(candidates) => candidates,
            Err(e) => {
                progress.info(&e);
                return RunReport::word_list_unreadable(&e, total_words);
            }
        };

        if let Some(warning) = self.validator.inspect(archive) {
            progress.info(format_args!("Warning: {}", warning));
        }

        let mut stats = RunStats::new(total_words, Instant::now());
        let mut last_candidate = Vec::new();
        let mut archive_error_reported = false;
        // Entries appended after counting are ignored
        let limit = usize::try_from(total_words).unwrap_or(usize::MAX);
        for candidate in candidates.take(limit) {
            if self.cancelled() {
                progress.info(format_args!("Interrupted after {} words", stats.tested_words));
                break;
            }
            let candidate = match candidate {
                Ok(candidate) => candidate,
                Err(source) => {
                    let e = CrackError::WordListUnreadable {
                        name: words.describe(),
                        counted: stats.tested_words,
                        source,
                    };
                    progress.finish();
                    progress.info(&e);
                    return RunReport {
                        outcome: Outcome::Failed(e.to_string()),
                        execution_time: stats.start_time.elapsed(),
                        tested_words: stats.tested_words,
                        total_words,
                    };
                }
            };

            stats.record_trial();
            let now = Instant::now();
            if self
                .cadence
                .due(now.saturating_duration_since(stats.last_update), stats.tested_words)
            {
                progress.progress(&stats.snapshot(now, &candidate));
                stats.last_update = now;
            }

            match self.validator.trial(archive, &candidate) {
                Trial::Correct => stats.record_found(&candidate),
                Trial::Wrong => {}
                Trial::ArchiveError(e) => {
                    if !archive_error_reported {
                        archive_error_reported = true;
                        progress.info(format_args!(
                            "Warning: {}, every password will be reported as wrong",
                            e
                        ));
                    }
                }
            }
            last_candidate = candidate;
            if stats.found() {
                break;
            }
        }

        progress.progress(&ProgressSnapshot::finished(&last_candidate));
        progress.finish();
        let execution_time = stats.start_time.elapsed();

        let outcome = match stats.password_found() {
            Some(password) => {
                let password = String::from_utf8_lossy(password).into_owned();
                progress.info(format_args!("Password found: {}", password));
                Outcome::Found(password)
            }
            None => {
                progress.info(format_args!(
                    "Password not found after {} words",
                    stats.tested_words
                ));
                Outcome::NotFound
            }
        };
        RunReport {
            outcome,
            execution_time,
            tested_words: stats.tested_words,
            total_words,
        }
    }
}
