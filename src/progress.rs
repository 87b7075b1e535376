use std::fmt;
use std::io::Write;
use std::time::Duration;

use crossterm::{
    cursor::{Hide, Show},
    queue,
    terminal::{Clear, ClearType},
};

use crate::wordlist::Password;

/// When to emit progress: after `interval` has passed since the last emission, or
/// whenever the number of tested words is a multiple of `every`.
#[derive(Clone, Copy, Debug)]
pub struct ProgressCadence {
    pub interval: Duration,
    pub every: u64,
}

impl Default for ProgressCadence {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            every: 100,
        }
    }
}

impl ProgressCadence {
    pub fn due(&self, since_last_emission: Duration, tested_words: u64) -> bool {
        since_last_emission >= self.interval || tested_words % self.every.max(1) == 0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProgressSnapshot {
    pub percent: f64,
    pub remaining_secs: f64,
    pub candidate: String,
}

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

impl ProgressSnapshot {
    pub fn compute(
        tested_words: u64,
        total_words: u64,
        elapsed: Duration,
        candidate: &Password,
    ) -> Self {
        let candidate = String::from_utf8_lossy(candidate).into_owned();
        if total_words == 0 || tested_words == 0 {
            // Nothing to extrapolate from
            return Self {
                percent: if total_words == 0 { 100.0 } else { 0.0 },
                remaining_secs: 0.0,
                candidate,
            };
        }
        let elapsed = elapsed.as_secs_f64();
        let percent = tested_words as f64 / total_words as f64 * 100.0;
        let estimated_total = elapsed / percent * 100.0;
        Self {
            percent: finite_or_zero(percent),
            remaining_secs: finite_or_zero(estimated_total - elapsed).max(0.0),
            candidate,
        }
    }

    /// The closing snapshot, shown once the loop is over.
    pub fn finished(last_candidate: &Password) -> Self {
        Self {
            percent: 100.0,
            remaining_secs: 0.0,
            candidate: String::from_utf8_lossy(last_candidate).into_owned(),
        }
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Progress: {:.2}%, remaining: {:.2}s, trying: {}",
            self.percent, self.remaining_secs, self.candidate
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Style {
    /// One line per emission
    Lines,
    /// A single terminal line redrawn in place
    StatusLine,
}

// Diagnostics are best effort: after the first failed write, stop writing.
macro_rules! handle_err {
    ($self:ident, $result:expr) => {
        if $result.is_err() {
            $self.broken = true;
            return;
        }
    };
}

/// Writes progress and informational lines to the diagnostic channel.
pub struct ProgressWriter<W: Write> {
    out: W,
    style: Style,
    status_line_shown: bool,
    broken: bool,
}

impl<W: Write> ProgressWriter<W> {
    pub fn new(out: W, style: Style) -> Self {
        Self {
            out,
            style,
            status_line_shown: false,
            broken: false,
        }
    }

    /// Moves off the status line so that the next output starts on a fresh line.
    fn leave_status_line(&mut self) {
        if self.status_line_shown {
            self.status_line_shown = false;
            handle_err!(self, writeln!(self.out));
        }
    }

    pub fn info(&mut self, message: impl fmt::Display) {
        if self.broken {
            return;
        }
        self.leave_status_line();
        handle_err!(self, writeln!(self.out, "{}", message));
        handle_err!(self, self.out.flush());
    }

    pub fn progress(&mut self, snapshot: &ProgressSnapshot) {
        if self.broken {
            return;
        }
        match self.style {
            Style::Lines => {
                handle_err!(self, writeln!(self.out, "{}", snapshot));
            }
            Style::StatusLine => {
                if !self.status_line_shown {
                    handle_err!(self, queue!(self.out, Hide));
                    self.status_line_shown = true;
                }
                handle_err!(self, queue!(self.out, Clear(ClearType::CurrentLine)));
                handle_err!(self, write!(self.out, "\r{}", snapshot));
            }
        }
        handle_err!(self, self.out.flush());
    }

    /// Ends the status line and shows the cursor again.
    pub fn finish(&mut self) {
        if self.broken || self.style != Style::StatusLine {
            return;
        }
        self.leave_status_line();
        handle_err!(self, queue!(self.out, Show));
        handle_err!(self, self.out.flush());
    }
}
