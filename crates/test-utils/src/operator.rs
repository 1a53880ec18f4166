use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use exectr::engine::Operator;
use exectr::errors::Result;
use exectr::script::{Line, LineIndex};
use exectr::types::ResumeChoice;

#[derive(Debug, Default)]
struct Answers {
    resume: VecDeque<ResumeChoice>,
    fresh_run: bool,
    lines: HashMap<LineIndex, bool>,
    resume_prompts: usize,
    line_prompts: Vec<LineIndex>,
    displays: usize,
}

/// Operator with canned answers.
///
/// - resume prompts pop the queued choices, then answer `Abort`;
/// - line prompts answer "execute" unless told otherwise;
/// - the drift prompt answers `fresh_run`.
///
/// Clones share answers and the record of prompts.
#[derive(Debug, Clone, Default)]
pub struct ScriptedOperator {
    inner: Arc<Mutex<Answers>>,
}

impl ScriptedOperator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resume_with(self, choices: impl IntoIterator<Item = ResumeChoice>) -> Self {
        self.inner.lock().unwrap().resume.extend(choices);
        self
    }

    pub fn fresh_run(self, answer: bool) -> Self {
        self.inner.lock().unwrap().fresh_run = answer;
        self
    }

    pub fn skip_line(self, index: LineIndex) -> Self {
        self.inner.lock().unwrap().lines.insert(index, false);
        self
    }

    pub fn resume_prompts(&self) -> usize {
        self.inner.lock().unwrap().resume_prompts
    }

    pub fn line_prompts(&self) -> Vec<LineIndex> {
        self.inner.lock().unwrap().line_prompts.clone()
    }

    pub fn displays(&self) -> usize {
        self.inner.lock().unwrap().displays
    }

    pub fn boxed(&self) -> Box<dyn Operator> {
        Box::new(self.clone())
    }
}

impl Operator for ScriptedOperator {
    fn choose_resume(&mut self, _all_succeeded: bool) -> Result<ResumeChoice> {
        let mut inner = self.inner.lock().unwrap();
        inner.resume_prompts += 1;
        Ok(inner.resume.pop_front().unwrap_or(ResumeChoice::Abort))
    }

    fn confirm_fresh_run(&mut self, _difference: &str) -> Result<bool> {
        Ok(self.inner.lock().unwrap().fresh_run)
    }

    fn confirm_line(&mut self, line: &Line) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        inner.line_prompts.push(line.index);
        Ok(inner.lines.get(&line.index).copied().unwrap_or(true))
    }

    fn display(&mut self, _lines: &[Line]) {
        self.inner.lock().unwrap().displays += 1;
    }
}
