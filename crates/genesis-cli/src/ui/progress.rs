//! Terminal progress rendering.

use colored::Colorize;
use dialoguer::console::Term;
use dialoguer::{Input, Password};
use genesis_core::term::in_controlling_terminal;
use genesis_secrets::progress::{ProgressEvent, ProgressSink};
use genesis_types::{CheckStatus, GenesisError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Read;

/// Create a spinner for long-running operations.
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap()
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Renders progress events to the terminal and handles operator prompts.
#[derive(Default)]
pub struct TerminalSink {
    spinner: Option<ProgressBar>,
    quiet: bool,
}

impl TerminalSink {
    /// Create a terminal sink.
    pub fn new(quiet: bool) -> Self {
        Self {
            spinner: None,
            quiet,
        }
    }

    fn say(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }

    fn require_tty(&self, what: &str) -> Result<()> {
        if in_controlling_terminal() {
            Ok(())
        } else {
            Err(GenesisError::NoTty(format!(
                "{} requires a controlling terminal",
                what
            )))
        }
    }
}

fn status_word(status: CheckStatus) -> String {
    match status {
        CheckStatus::Ok => "done".green().to_string(),
        CheckStatus::Warn => "warn".yellow().to_string(),
        CheckStatus::Missing => "missing".red().to_string(),
        CheckStatus::Error => "failed".red().bold().to_string(),
    }
}

impl ProgressSink for TerminalSink {
    fn event(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::Wait { msg } => {
                if !self.quiet {
                    self.spinner = Some(spinner(&msg));
                }
            }
            ProgressEvent::WaitDone => {
                if let Some(spinner) = self.spinner.take() {
                    spinner.finish_and_clear();
                }
            }
            ProgressEvent::Init { action, total } => {
                self.say(&format!(
                    "{} {} secret{}",
                    action.cyan().bold(),
                    total,
                    if total == 1 { "" } else { "s" }
                ));
            }
            ProgressEvent::StartItem { index, total, path, label } => {
                self.say(&format!(
                    "  [{:>3}/{}] {} {}",
                    index,
                    total,
                    path.cyan(),
                    format!("({})", label).dimmed()
                ));
            }
            ProgressEvent::DoneItem { status, msg } => {
                let line = match msg {
                    Some(msg) => format!("          {} {}", status_word(status), msg.dimmed()),
                    None => format!("          {}", status_word(status)),
                };
                self.say(&line);
            }
            ProgressEvent::Notify { msg } => self.say(&msg),
            ProgressEvent::Abort { msg } => {
                self.say(&format!("{} {}", "aborted:".red().bold(), msg));
            }
            ProgressEvent::Empty { msg } => self.say(&msg.dimmed().to_string()),
            ProgressEvent::Completed { summary } => {
                let mut parts = vec![format!("{} ok", summary.ok)];
                if summary.warn > 0 {
                    parts.push(format!("{} warned", summary.warn).yellow().to_string());
                }
                if summary.missing > 0 {
                    parts.push(format!("{} missing", summary.missing).red().to_string());
                }
                if summary.error > 0 {
                    parts.push(format!("{} failed", summary.error).red().to_string());
                }
                if summary.skipped > 0 {
                    parts.push(format!("{} skipped", summary.skipped));
                }
                self.say(&format!("{} {}", "⇒".bold(), parts.join(", ")));
            }
        }
    }

    fn prompt(&mut self, msg: &str, sensitive: bool) -> Result<String> {
        self.require_tty("prompting for a secret value")?;
        let value = if sensitive {
            Password::new()
                .with_prompt(msg)
                .interact()
                .map_err(|e| GenesisError::Other(format!("prompt failed: {}", e)))?
        } else {
            Input::new()
                .with_prompt(msg)
                .interact_text()
                .map_err(|e| GenesisError::Other(format!("prompt failed: {}", e)))?
        };
        Ok(value)
    }

    fn prompt_multiline(&mut self, msg: &str) -> Result<String> {
        self.require_tty("prompting for a secret value")?;
        println!("{} (end with EOF / Ctrl-D):", msg);
        let mut value = String::new();
        std::io::stdin()
            .read_to_string(&mut value)
            .map_err(GenesisError::Io)?;
        Ok(value)
    }

    fn inline_prompt(&mut self, msg: &str, choices: &[char]) -> Result<char> {
        self.require_tty("interactive confirmation")?;
        let term = Term::stderr();
        loop {
            eprint!("{} ", msg);
            let c = term
                .read_char()
                .map_err(|e| GenesisError::Other(format!("prompt failed: {}", e)))?;
            eprintln!("{}", c);
            if choices.contains(&c.to_ascii_lowercase()) {
                return Ok(c.to_ascii_lowercase());
            }
        }
    }
}
