use std::time::Duration;

use serde_json as json;

use crate::error::CrackError;

#[derive(Debug, PartialEq)]
pub enum Outcome {
    Found(String),
    NotFound,
    /// The run could not complete, with a message for the report.
    Failed(String),
}

/// The single machine-readable result of a run.
#[derive(Debug)]
pub struct RunReport {
    pub outcome: Outcome,
    pub execution_time: Duration,
    pub tested_words: u64,
    pub total_words: u64,
}

impl RunReport {
    /// The report for a word list that couldn't be read before any trial.
    pub fn word_list_unreadable(error: &CrackError, total_words: u64) -> Self {
        Self {
            outcome: Outcome::Failed(error.to_string()),
            execution_time: Duration::ZERO,
            tested_words: 0,
            total_words,
        }
    }

    pub fn success(&self) -> bool {
        matches!(self.outcome, Outcome::Found(_))
    }

    pub fn password(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Found(password) => Some(password),
            _ => None,
        }
    }

    pub fn to_json(&self) -> json::Value {
        let execution_time = u64::try_from(self.execution_time.as_millis()).unwrap_or(u64::MAX);
        match &self.outcome {
            Outcome::Failed(error) => json::json!({
                "success": false,
                "error": error,
                "executionTime": execution_time,
                "testedWords": self.tested_words,
                "totalWords": self.total_words,
            }),
            _ => json::json!({
                "success": self.success(),
                "password": self.password(),
                "executionTime": execution_time,
                "testedWords": self.tested_words,
                "totalWords": self.total_words,
            }),
        }
    }
}
