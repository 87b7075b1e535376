use std::path::Path;

use crate::decrypt::entry_decodes;
use crate::error::ArchiveError;
use crate::wordlist::Password;
use crate::zipfile::open_first_entry;

/// Outcome of testing one password against an archive.
#[derive(Debug)]
pub enum Trial {
    Correct,
    Wrong,
    /// The archive couldn't be tested at all, whatever the password.
    ArchiveError(ArchiveError),
}

pub trait ArchiveValidator {
    fn trial(&self, archive: &Path, password: &Password) -> Trial;

    /// Looks at the archive once before any trial. Returns a warning when the
    /// results of the trials will be misleading.
    fn inspect(&self, _archive: &Path) -> Option<String> {
        None
    }

    /// Whether the password opens the archive.
    ///
    /// An archive that can't be opened reports `false` like a wrong password does,
    /// so a broken archive looks the same as an exhausted word list.
    #[cfg(test)]
    fn try_password(&self, archive: &Path, password: &Password) -> bool {
        matches!(self.trial(archive, password), Trial::Correct)
    }
}

/// Tests passwords by decoding the first entry of a traditionally encrypted ZIP
/// archive.
///
/// The archive is opened anew for every trial and nothing is held between
/// trials. Only the end of the archive and the first entry are read.
///
/// Only the first entry is checked, so a password that happens to decode it
/// counts as correct even if other entries disagree.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZipValidator;

impl ZipValidator {
    fn check(&self, archive: &Path, password: &Password) -> Result<bool, ArchiveError> {
        let entry = open_first_entry(archive)?;
        entry_decodes(&entry, password)
    }
}

impl ArchiveValidator for ZipValidator {
    fn trial(&self, archive: &Path, password: &Password) -> Trial {
        match self.check(archive, password) {
            Ok(true) => Trial::Correct,
            Ok(false) => Trial::Wrong,
            Err(e) => Trial::ArchiveError(e),
        }
    }

    // Errors are left to the trials, which report them
    fn inspect(&self, archive: &Path) -> Option<String> {
        let entry = open_first_entry(archive).ok()?;
        if entry.is_encrypted() {
            return None;
        }
        Some(format!(
            "the first entry of {} ({}) is not encrypted, any password will open it",
            archive.display(),
            entry.file_name
        ))
    }
}
