// src/script/validate.rs

use std::sync::LazyLock;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use regex::Regex;

use crate::errors::{ExectrError, Result};
use crate::script::line::{Line, LineIndex};

/// `set -e`, `set -x` (alone or in a flag group such as `-eux`) and their
/// `-o errexit` / `-o xtrace` spellings. Both break exit-code probing in the
/// shell session.
static FORBIDDEN_SET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*set\s+(?:-[A-Za-z]*[ex][A-Za-z]*\b|-o\s+(?:errexit|xtrace)\b)")
        .expect("static regex")
});

pub fn validate_lines(lines: &[Line]) -> Result<()> {
    validate_commands(lines)?;
    validate_dependencies(lines)?;
    Ok(())
}

fn validate_commands(lines: &[Line]) -> Result<()> {
    for line in lines.iter().filter(|l| l.is_runnable()) {
        let Some(command) = line.command.as_deref() else {
            continue;
        };
        if FORBIDDEN_SET.is_match(command) {
            return Err(ExectrError::ValidationError {
                line: line.index,
                text: command.to_string(),
                message: "set -e / set -x is not supported".to_string(),
            });
        }
    }
    Ok(())
}

fn validate_dependencies(lines: &[Line]) -> Result<()> {
    // Edge direction: dependency -> dependent.
    let mut graph: DiGraphMap<LineIndex, ()> = DiGraphMap::new();

    for line in lines {
        graph.add_node(line.index);
    }
    for line in lines {
        for dep in &line.dependencies {
            if !graph.contains_node(*dep) {
                return Err(ExectrError::directive(
                    line.index,
                    &line.original_text,
                    format!("depends on line {dep}, which does not exist"),
                ));
            }
            graph.add_edge(*dep, line.index, ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let index = cycle.node_id();
            let text = lines
                .get(index.saturating_sub(1))
                .map(|l| l.original_text.as_str())
                .unwrap_or_default();
            Err(ExectrError::directive(
                index,
                text,
                "dependency cycle involving this line",
            ))
        }
    }
}
