// src/exec/backend.rs

//! Pluggable command runner abstraction.

use std::future::Future;
use std::pin::Pin;

use anyhow::Result;

/// What running one command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    /// Interleaved stdout and stderr.
    pub output: String,
}

/// Trait abstracting how a line's command is executed.
///
/// Production code uses [`super::ShellSession`]; tests provide their own
/// implementation. An `Err` means the runner itself broke (the shell died, a
/// pipe closed), not that the command exited nonzero.
pub trait CommandRunner: Send {
    fn run<'a>(
        &'a mut self,
        command: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<CommandOutput>> + Send + 'a>>;
}

/// Lets a caller lend its runner to a worker and keep ownership, e.g. to
/// close a shell session afterwards.
impl<R: CommandRunner + ?Sized> CommandRunner for &mut R {
    fn run<'a>(
        &'a mut self,
        command: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<CommandOutput>> + Send + 'a>> {
        (**self).run(command)
    }
}
