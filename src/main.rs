use std::io::{stderr, stdout, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use crossterm::tty::IsTty;
use structopt::StructOpt;

mod crack;
mod decrypt;
mod error;
#[cfg(test)]
mod fixture;
mod opt;
mod progress;
mod report;
mod validator;
mod wordlist;
mod zipfile;

use crack::Cracker;
use error::ArchiveError;
use progress::{ProgressWriter, Style};
use validator::ZipValidator;
use wordlist::FileWordList;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

fn describe_first_entry(archive: &Path) -> Result<String, ArchiveError> {
    Ok(zipfile::open_first_entry(archive)?.to_string())
}

fn result_main() -> Result<()> {
    let opt = opt::Opt::from_args();
    let style = if opt.status_line && stderr().is_tty() {
        Style::StatusLine
    } else {
        Style::Lines
    };
    let mut progress = ProgressWriter::new(stderr(), style);

    if opt.show_entry {
        match describe_first_entry(&opt.archive) {
            Ok(description) => progress.info(description),
            Err(e) => progress.info(format_args!("Could not show the first entry: {}", e)),
        }
    }

    // Stop while counting or between two trials, so that the report still gets written
    ctrlc::set_handler(|| INTERRUPTED.store(true, Ordering::Relaxed))
        .context("Error setting Ctrl-C handler")?;

    let cracker = Cracker::new(ZipValidator)
        .with_cadence(opt.cadence())
        .with_cancel_flag(&INTERRUPTED);
    let report = cracker.run(
        &opt.archive,
        &FileWordList::new(&opt.wordlist),
        &mut progress,
    );

    let stdout = stdout();
    let mut stdout = stdout.lock();
    writeln!(stdout, "{}", report.to_json()).context("Could not write the result")?;
    stdout.flush().context("Could not write the result")?;
    Ok(())
}

fn main() {
    if let Err(e) = result_main() {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
