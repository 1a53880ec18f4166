// src/engine/operator.rs

//! Operator interaction.
//!
//! The engine never touches stdin/stdout directly; it asks an [`Operator`].
//! [`TerminalOperator`] is the production implementation.

use std::io::{self, BufRead, Write};

use tracing::warn;

use crate::errors::Result;
use crate::script::{render_lines, Line};
use crate::types::ResumeChoice;

pub trait Operator: Send {
    /// Pick what to do with an existing checkpoint for an unchanged script.
    ///
    /// `all_succeeded` tells whether continuing is meaningful.
    fn choose_resume(&mut self, all_succeeded: bool) -> Result<ResumeChoice>;

    /// The checkpoint belongs to an edited script; start over?
    fn confirm_fresh_run(&mut self, difference: &str) -> Result<bool>;

    /// Interactive mode: execute (`true`) or skip (`false`) this line.
    fn confirm_line(&mut self, line: &Line) -> Result<bool>;

    /// Show the current state of every line.
    fn display(&mut self, lines: &[Line]);
}

/// Prompts on stdout, answers from stdin.
#[derive(Debug, Default)]
pub struct TerminalOperator;

impl TerminalOperator {
    pub fn new() -> Self {
        Self
    }

    fn ask(&self, prompt: &str) -> Result<String> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{prompt}")?;
        stdout.flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(answer.trim().to_string())
    }
}

impl Operator for TerminalOperator {
    fn choose_resume(&mut self, all_succeeded: bool) -> Result<ResumeChoice> {
        println!("Previous execution found for script (script is unchanged).");
        if all_succeeded {
            println!("Previous execution was completed successfully.");
        } else {
            println!("c Continue");
        }
        println!("f Re-run failed");
        println!("a Re-run all");
        println!("d Display state");
        println!("q Abort");

        let answer = self.ask(">> ")?;
        Ok(answer.parse().unwrap_or_else(|e| {
            warn!(error = %e, "unrecognised resume choice; aborting");
            ResumeChoice::Abort
        }))
    }

    fn confirm_fresh_run(&mut self, difference: &str) -> Result<bool> {
        println!("Previous state found for script, but script has changed ({difference}).");
        let answer = self.ask("Execute new script? [y/n] ")?;
        Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
    }

    fn confirm_line(&mut self, line: &Line) -> Result<bool> {
        println!();
        println!("Going to execute line {}. Execute or skip? [e/s]", line.index);
        let answer = self.ask(">> ")?;
        Ok(matches!(answer.to_lowercase().as_str(), "e" | "execute"))
    }

    fn display(&mut self, lines: &[Line]) {
        println!();
        print!("{}", render_lines(lines));
    }
}
