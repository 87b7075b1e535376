use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::CrackError;

/// A candidate password. Word lists are not always UTF-8, so candidates are
/// kept as raw bytes.
pub type Password = [u8];

pub type Candidates = Box<dyn Iterator<Item = io::Result<Vec<u8>>>>;

/// An ordered, finite and restartable sequence of candidate passwords.
pub trait WordSource {
    /// Name for diagnostics and error messages.
    fn describe(&self) -> String;

    /// Counts the entries, giving up once `cancel` is set. On failure or
    /// interruption, the error carries the count reached so far.
    fn count(&self, cancel: Option<&AtomicBool>) -> Result<u64, CrackError>;

    /// Starts a new pass over the entries, from the first one.
    fn candidates(&self) -> Result<Candidates, CrackError>;
}

/// A word list file with one candidate per line.
///
/// A trailing `\r` is removed from each line. The last line counts even without
/// a line terminator.
pub struct FileWordList {
    path: PathBuf,
}

impl FileWordList {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn unreadable(&self, counted: u64, source: io::Error) -> CrackError {
        CrackError::WordListUnreadable {
            name: self.describe(),
            counted,
            source,
        }
    }

    fn open(&self) -> Result<BufReader<File>, CrackError> {
        File::open(&self.path)
            .map(BufReader::new)
            .map_err(|e| self.unreadable(0, e))
    }
}

fn strip_line_ending(mut line: Vec<u8>) -> Vec<u8> {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    line
}

impl WordSource for FileWordList {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn count(&self, cancel: Option<&AtomicBool>) -> Result<u64, CrackError> {
        let mut counted = 0;
        for line in self.open()?.split(b'\n') {
            if cancel.map_or(false, |flag| flag.load(Ordering::Relaxed)) {
                return Err(CrackError::Interrupted { counted });
            }
            if let Err(e) = line {
                return Err(self.unreadable(counted, e));
            }
            counted += 1;
        }
        Ok(counted)
    }

    fn candidates(&self) -> Result<Candidates, CrackError> {
        let lines = self.open()?.split(b'\n');
        Ok(Box::new(lines.map(|line| line.map(strip_line_ending))))
    }
}

/// Candidates held in memory.
#[cfg(test)]
#[derive(Clone, Debug, Default)]
pub struct MemoryWordList {
    words: Vec<String>,
}

#[cfg(test)]
impl MemoryWordList {
    pub fn new<S: Into<String>>(words: impl IntoIterator<Item = S>) -> Self {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
impl WordSource for MemoryWordList {
    fn describe(&self) -> String {
        format!("<{} words in memory>", self.words.len())
    }

    fn count(&self, _cancel: Option<&AtomicBool>) -> Result<u64, CrackError> {
        Ok(self.words.len() as u64)
    }

    fn candidates(&self) -> Result<Candidates, CrackError> {
        let words = self.words.clone();
        Ok(Box::new(words.into_iter().map(|w| Ok(w.into_bytes()))))
    }
}
