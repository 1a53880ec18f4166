use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use exectr::exec::{CommandOutput, CommandRunner};

#[derive(Debug, Default)]
struct FakeState {
    exit_codes: HashMap<String, i32>,
    broken: HashSet<String>,
    executed: Vec<String>,
}

/// A fake command runner that:
/// - records every command it was asked to run
/// - answers with a configured exit code (0 by default) and the command text
///   as output
/// - optionally sleeps first, so concurrent workers interleave.
///
/// Clones share their state, so several workers can be checked together.
#[derive(Debug, Clone, Default)]
pub struct FakeRunner {
    state: Arc<Mutex<FakeState>>,
    delay: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exit_code(self, command: &str, code: i32) -> Self {
        self.state
            .lock()
            .unwrap()
            .exit_codes
            .insert(command.to_string(), code);
        self
    }

    /// Make the runner itself fail on `command`.
    pub fn with_error(self, command: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .broken
            .insert(command.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.state.lock().unwrap().executed.clone()
    }

    pub fn count(&self, command: &str) -> usize {
        self.executed().iter().filter(|c| *c == command).count()
    }

    /// Highest number of commands that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl CommandRunner for FakeRunner {
    fn run<'a>(
        &'a mut self,
        command: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<CommandOutput>> + Send + 'a>> {
        Box::pin(async move {
            let (exit_code, broken) = {
                let mut state = self.state.lock().unwrap();
                state.executed.push(command.to_string());
                (
                    state.exit_codes.get(command).copied().unwrap_or(0),
                    state.broken.contains(command),
                )
            };

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if broken {
                return Err(anyhow!("fake runner broke on {command:?}"));
            }
            Ok(CommandOutput {
                exit_code,
                output: format!("{command}\n"),
            })
        })
    }
}
