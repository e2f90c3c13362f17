//! Progress reporting contract.
//!
//! The executor and validator never write to standard streams; every piece
//! of operator-visible traffic flows through a [`ProgressSink`] so front
//! ends can render it and tests can capture it.

use genesis_types::{CheckStatus, GenesisError, Result};
use std::collections::VecDeque;

/// Counts of per-item outcomes for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Items that completed cleanly
    pub ok: usize,
    /// Items that completed with caveats
    pub warn: usize,
    /// Items that are absent
    pub missing: usize,
    /// Items that failed
    pub error: usize,
    /// Items skipped (declined interactively, or nothing to do)
    pub skipped: usize,
    /// The run stopped before finishing
    pub aborted: bool,
}

impl Summary {
    /// Record one item outcome.
    pub fn record(&mut self, status: CheckStatus) {
        match status {
            CheckStatus::Ok => self.ok += 1,
            CheckStatus::Warn => self.warn += 1,
            CheckStatus::Missing => self.missing += 1,
            CheckStatus::Error => self.error += 1,
        }
    }

    /// Total items accounted for.
    pub fn total(&self) -> usize {
        self.ok + self.warn + self.missing + self.error + self.skipped
    }

    /// Whether the run should be considered a failure.
    pub fn failed(&self) -> bool {
        self.error > 0 || self.missing > 0 || self.aborted
    }

    /// Process exit code for a front end: 0 on success, 1 on any
    /// error-level outcome or an aborted run.
    pub fn exit_code(&self) -> i32 {
        if self.failed() {
            1
        } else {
            0
        }
    }
}

/// One progress event, tagged by kind.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A long operation started (e.g. talking to the store)
    Wait {
        /// What we're waiting on
        msg: String,
    },
    /// The awaited operation finished
    WaitDone,
    /// A run over `total` items is starting
    Init {
        /// Label of the run (a lifecycle action, `check`, or `validate`)
        action: String,
        /// Number of items
        total: usize,
    },
    /// Work on one item is starting
    StartItem {
        /// 1-based position
        index: usize,
        /// Number of items
        total: usize,
        /// Plan path
        path: String,
        /// Human description of the plan
        label: String,
    },
    /// Work on the current item finished
    DoneItem {
        /// Outcome
        status: CheckStatus,
        /// Optional detail (e.g. "expires in 364 days")
        msg: Option<String>,
    },
    /// Out-of-band information
    Notify {
        /// The message
        msg: String,
    },
    /// The run is stopping early
    Abort {
        /// Why
        msg: String,
    },
    /// There was nothing to do
    Empty {
        /// Explanation
        msg: String,
    },
    /// The run finished
    Completed {
        /// Outcome counts
        summary: Summary,
    },
}

/// Abstract sink for progress events and operator interaction.
pub trait ProgressSink: Send {
    /// Receive one fire-and-forget event.
    fn event(&mut self, event: ProgressEvent);

    /// Block for a free-form answer. `sensitive` hides the echo.
    fn prompt(&mut self, msg: &str, sensitive: bool) -> Result<String>;

    /// Block for a multiline answer, terminated by EOF.
    fn prompt_multiline(&mut self, msg: &str) -> Result<String>;

    /// Block for a single keypress out of `choices`.
    fn inline_prompt(&mut self, msg: &str, choices: &[char]) -> Result<char>;
}

/// A sink that records events and replays scripted answers; used by tests
/// and CI front ends.
#[derive(Debug, Default)]
pub struct BufferedSink {
    /// Rendered events, in arrival order
    pub events: Vec<String>,
    answers: VecDeque<String>,
}

impl BufferedSink {
    /// An interaction-free sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that answers prompts from a script, in order.
    pub fn with_answers(answers: Vec<&str>) -> Self {
        Self {
            events: Vec::new(),
            answers: answers.into_iter().map(String::from).collect(),
        }
    }

    /// Whether any recorded event starts with the given prefix.
    pub fn saw(&self, prefix: &str) -> bool {
        self.events.iter().any(|e| e.starts_with(prefix))
    }
}

impl ProgressSink for BufferedSink {
    fn event(&mut self, event: ProgressEvent) {
        let rendered = match event {
            ProgressEvent::Wait { msg } => format!("wait {}", msg),
            ProgressEvent::WaitDone => "wait-done".to_string(),
            ProgressEvent::Init { action, total } => format!("init {} {}", action, total),
            ProgressEvent::StartItem { index, total, path, .. } => {
                format!("start-item [{}/{}] {}", index, total, path)
            }
            ProgressEvent::DoneItem { status, msg } => match msg {
                Some(msg) => format!("done-item {} {}", status, msg),
                None => format!("done-item {}", status),
            },
            ProgressEvent::Notify { msg } => format!("notify {}", msg),
            ProgressEvent::Abort { msg } => format!("abort {}", msg),
            ProgressEvent::Empty { msg } => format!("empty {}", msg),
            ProgressEvent::Completed { summary } => format!(
                "completed ok={} warn={} missing={} error={} skipped={}",
                summary.ok, summary.warn, summary.missing, summary.error, summary.skipped
            ),
        };
        self.events.push(rendered);
    }

    fn prompt(&mut self, msg: &str, _sensitive: bool) -> Result<String> {
        self.events.push(format!("prompt {}", msg));
        self.answers
            .pop_front()
            .ok_or_else(|| GenesisError::Abort("no scripted answer left".to_string()))
    }

    fn prompt_multiline(&mut self, msg: &str) -> Result<String> {
        self.events.push(format!("prompt-multiline {}", msg));
        self.answers
            .pop_front()
            .ok_or_else(|| GenesisError::Abort("no scripted answer left".to_string()))
    }

    fn inline_prompt(&mut self, msg: &str, choices: &[char]) -> Result<char> {
        self.events.push(format!("inline-prompt {}", msg));
        let answer = self
            .answers
            .pop_front()
            .ok_or_else(|| GenesisError::Abort("no scripted answer left".to_string()))?;
        let c = answer.chars().next().unwrap_or_default();
        if choices.contains(&c) {
            Ok(c)
        } else {
            Err(GenesisError::Abort(format!("scripted answer '{}' not in choices", answer)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_exit_codes() {
        let mut summary = Summary::default();
        summary.record(CheckStatus::Ok);
        assert_eq!(summary.exit_code(), 0);

        summary.record(CheckStatus::Error);
        assert_eq!(summary.exit_code(), 1);

        let aborted = Summary { aborted: true, ..Default::default() };
        assert_eq!(aborted.exit_code(), 1);
    }

    #[test]
    fn test_buffered_sink_records_and_answers() {
        let mut sink = BufferedSink::with_answers(vec!["y"]);
        sink.event(ProgressEvent::Init { action: "add".to_string(), total: 2 });
        assert!(sink.saw("init add 2"));

        let c = sink.inline_prompt("continue?", &['y', 'n']).unwrap();
        assert_eq!(c, 'y');
        assert!(sink.inline_prompt("again?", &['y', 'n']).is_err());
    }
}
