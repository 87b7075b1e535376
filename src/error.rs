use std::io;

use thiserror::Error;

/// Errors that end a run early.
#[derive(Debug, Error)]
pub enum CrackError {
    /// The word list could not be opened or read to the end.
    /// `counted` is the number of entries seen before the failure.
    #[error("Could not read word list {name}: {source}")]
    WordListUnreadable {
        name: String,
        counted: u64,
        #[source]
        source: io::Error,
    },

    #[error("Interrupted after counting {counted} words")]
    Interrupted { counted: u64 },
}

impl CrackError {
    pub fn counted(&self) -> u64 {
        match self {
            CrackError::WordListUnreadable { counted, .. } => *counted,
            CrackError::Interrupted { counted } => *counted,
        }
    }
}

/// Reasons why an archive can't be tested at all, independent of the password.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("could not read archive: {0}")]
    Io(#[from] io::Error),

    #[error("malformed archive: {0}")]
    Malformed(String),

    #[error("archive has no entries")]
    Empty,

    #[error("unsupported compression method {0}")]
    UnsupportedMethod(u16),
}
