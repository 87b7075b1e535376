#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

#[path = "../../src/fixture.rs"]
mod fixture;

pub use fixture::{FixtureEntry, ZipBuilder};

pub struct TestEnv {
    tmp: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            tmp: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.tmp.path().join(name)
    }

    pub fn archive(&self, builder: ZipBuilder) -> PathBuf {
        let path = self.path("archive.zip");
        builder.write(&path);
        path
    }

    /// An archive whose first entry is encrypted with `password`.
    pub fn encrypted_archive(&self, password: &str) -> PathBuf {
        self.archive(
            ZipBuilder::new()
                .entry(
                    FixtureEntry::deflated("notes.txt", b"meet at the usual place")
                        .encrypted(password),
                )
                .entry(FixtureEntry::stored("readme.txt", b"nothing to see")),
        )
    }

    pub fn word_list(&self, words: &[&str]) -> PathBuf {
        let path = self.path("words.txt");
        let mut contents = words.join("\n");
        if !words.is_empty() {
            contents.push('\n');
        }
        fs::write(&path, contents).expect("write word list");
        path
    }
}

pub fn cmd() -> Command {
    Command::cargo_bin("wordcrack").expect("binary is built")
}

/// Parses the last stdout line, which must be the JSON report.
pub fn report(stdout: &[u8]) -> Value {
    let text = String::from_utf8_lossy(stdout);
    let last = text.lines().last().expect("report line");
    serde_json::from_str(last).expect("report is JSON")
}
