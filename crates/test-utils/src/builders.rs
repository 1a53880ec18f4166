#![allow(dead_code)]

use std::path::Path;

use exectr::fs::MockFileSystem;
use exectr::script::Script;

/// Builder for script text, with helpers for the `# executor` directives.
#[derive(Debug, Clone, Default)]
pub struct ScriptBuilder {
    lines: Vec<String>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(mut self, text: &str) -> Self {
        self.lines.push(text.to_string());
        self
    }

    pub fn lines<'a>(mut self, texts: impl IntoIterator<Item = &'a str>) -> Self {
        self.lines.extend(texts.into_iter().map(str::to_string));
        self
    }

    pub fn blank(self) -> Self {
        self.line("")
    }

    pub fn directive(self, directive: &str) -> Self {
        self.line(&format!("# executor {directive}"))
    }

    pub fn tag(self, name: &str) -> Self {
        self.directive(&format!("tag {name}"))
    }

    /// `# executor if TARGET`, where `TARGET` is a line number or a tag.
    pub fn after(self, target: &str) -> Self {
        self.directive(&format!("if {target}"))
    }

    pub fn always(self) -> Self {
        self.directive("always")
    }

    pub fn always_try(self) -> Self {
        self.directive("always-try")
    }

    pub fn set_dependent(self) -> Self {
        self.directive("set-dependent")
    }

    pub fn set_independent(self) -> Self {
        self.directive("set-independent")
    }

    /// Number of physical lines so far; the next line gets `len() + 1`.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn build(&self, path: &str) -> Script {
        Script::parse(path, &self.text()).expect("Failed to parse script from builder")
    }

    /// Store the script in `fs` and parse it back through the loader.
    pub fn install(&self, fs: &MockFileSystem, path: &str) -> Script {
        fs.add_file(path, self.text());
        Script::load(fs, Path::new(path)).expect("Failed to load script from mock filesystem")
    }
}
