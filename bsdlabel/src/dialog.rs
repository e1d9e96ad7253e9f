// SPDX-License-Identifier: MIT

//! Seams toward the interactive shell: a prompt service and an info sink.
//! The driver only ever talks to these traits; the real UI, localization
//! and formatting live outside.

use std::collections::VecDeque;

use crate::errors::{LabelError, LabelResult};

/// Prompt service. Every method may fail with [`LabelError::Cancelled`],
/// which callers propagate without changing any state.
pub trait Dialog {
    /// Asks for a number within `[low, high]`, offering `default`.
    fn ask_number(&mut self, low: u64, default: u64, high: u64, query: &str) -> LabelResult<u64>;

    fn ask_yesno(&mut self, query: &str) -> LabelResult<bool>;

    /// Asks for a free-form string; an empty answer means "keep the
    /// default" wherever one exists.
    fn ask_string(&mut self, query: &str) -> LabelResult<String>;

    /// Asks for a 0-based partition index below `max`.
    fn ask_partnum(&mut self, max: usize, query: &str) -> LabelResult<usize>;
}

/// One pre-planned answer for a [`Scripted`] dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Number(u64),
    YesNo(bool),
    Text(String),
    PartNum(usize),
}

/// A dialog answering from a fixed script, for non-interactive use.
/// Running out of answers, a type mismatch or an out-of-range number all
/// behave like a cancelled prompt.
#[derive(Debug, Default)]
pub struct Scripted {
    answers: VecDeque<Answer>,
}

impl Scripted {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
        }
    }

    fn next(&mut self, query: &str) -> LabelResult<Answer> {
        self.answers.pop_front().ok_or_else(|| {
            log::debug!("scripted dialog exhausted at {query:?}");
            LabelError::Cancelled
        })
    }
}

impl Dialog for Scripted {
    fn ask_number(&mut self, low: u64, _default: u64, high: u64, query: &str) -> LabelResult<u64> {
        match self.next(query)? {
            Answer::Number(n) if (low..=high).contains(&n) => Ok(n),
            _ => Err(LabelError::Cancelled),
        }
    }

    fn ask_yesno(&mut self, query: &str) -> LabelResult<bool> {
        match self.next(query)? {
            Answer::YesNo(v) => Ok(v),
            _ => Err(LabelError::Cancelled),
        }
    }

    fn ask_string(&mut self, query: &str) -> LabelResult<String> {
        match self.next(query)? {
            Answer::Text(s) => Ok(s),
            _ => Err(LabelError::Cancelled),
        }
    }

    fn ask_partnum(&mut self, max: usize, query: &str) -> LabelResult<usize> {
        match self.next(query)? {
            Answer::PartNum(i) if i < max => Ok(i),
            _ => Err(LabelError::Cancelled),
        }
    }
}

/// Info sink for user-visible messages, keyed by device path.
pub trait Report {
    fn info(&mut self, dev: &str, msg: &str);
    fn warn(&mut self, dev: &str, msg: &str);
    fn success(&mut self, dev: &str, msg: &str);
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullReport;

impl Report for NullReport {
    fn info(&mut self, _dev: &str, _msg: &str) {}
    fn warn(&mut self, _dev: &str, _msg: &str) {}
    fn success(&mut self, _dev: &str, _msg: &str) {}
}

/// Collects messages instead of printing them; embedders and tests read
/// them back.
#[derive(Debug, Default)]
pub struct Recorder {
    pub infos: Vec<String>,
    pub warnings: Vec<String>,
    pub successes: Vec<String>,
}

impl Report for Recorder {
    fn info(&mut self, _dev: &str, msg: &str) {
        self.infos.push(msg.to_string());
    }

    fn warn(&mut self, dev: &str, msg: &str) {
        log::warn!("{dev}: {msg}");
        self.warnings.push(msg.to_string());
    }

    fn success(&mut self, _dev: &str, msg: &str) {
        self.successes.push(msg.to_string());
    }
}
