use std::path::PathBuf;
use std::time::Duration;

use structopt::StructOpt;

use crate::progress::ProgressCadence;

#[derive(Clone, StructOpt)]
#[structopt(
    name = "wordcrack",
    about = "Recovers a ZIP archive's password by trying each word of a word list."
)]
pub struct Opt {
    /// Encrypted ZIP archive. Only its first entry is used to check passwords.
    #[structopt(parse(from_os_str))]
    pub archive: PathBuf,

    /// Word list with one candidate password per line
    #[structopt(parse(from_os_str))]
    pub wordlist: PathBuf,

    /// Emit progress when this many milliseconds passed since the last update
    #[structopt(long, default_value = "100")]
    pub progress_interval_ms: u64,

    /// Also emit progress every time this many words have been tested
    #[structopt(long, default_value = "100", parse(try_from_str = parse_every))]
    pub progress_every: u64,

    /// Redraws progress on a single terminal line instead of printing one line per update
    #[structopt(long)]
    pub status_line: bool,

    /// Prints the first entry of the archive before cracking
    #[structopt(long)]
    pub show_entry: bool,
}

fn parse_every(s: &str) -> Result<u64, String> {
    match s.parse::<u64>() {
        Ok(0) => Err("must be at least 1".to_owned()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

impl Opt {
    pub fn cadence(&self) -> ProgressCadence {
        ProgressCadence {
            interval: Duration::from_millis(self.progress_interval_ms),
            every: self.progress_every,
        }
    }
}
