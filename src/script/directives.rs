// src/script/directives.rs

//! `# executor <directive> [args...]` comments.
//!
//! Directives are resolved once, left to right, when the script is loaded.
//! They only change the static shape of later lines (dependencies, tags,
//! always mode); nothing here looks at execution state.

use std::collections::BTreeMap;

use tracing::warn;

use crate::errors::{ExectrError, Result};
use crate::script::line::{AlwaysMode, Line, LineIndex};

const DIRECTIVE_PREFIX: &str = "executor";

/// Parsed directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `tag NAME`: label the next line.
    Tag(String),
    /// `if NUMBER|TAG`: the next line depends on the target line.
    If(DependencyTarget),
    /// `always`: the next line runs regardless of dependencies and aborts the
    /// run when it fails.
    Always,
    /// `always-try`: like `always`, but failures do not abort.
    AlwaysTry,
    /// `set-dependent`: every later line depends on its predecessor.
    SetDependent,
    /// `set-independent`: every later line loses its dependencies.
    SetIndependent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyTarget {
    Index(LineIndex),
    Tag(String),
}

/// Parse the directive carried by `line`, if any.
///
/// A line carries a directive iff it is a comment whose text, after the
/// leading `#`s and whitespace, starts with the word `executor`.
pub fn parse_directive(line: &Line) -> Result<Option<Directive>> {
    if !line.is_comment() {
        return Ok(None);
    }
    let Some(command) = line.command.as_deref() else {
        return Ok(None);
    };

    let body = command.trim_start_matches(|c: char| c == '#' || c.is_whitespace());
    let mut words = body.split_whitespace();
    if words.next() != Some(DIRECTIVE_PREFIX) {
        return Ok(None);
    }

    let err = |msg: &str| ExectrError::directive(line.index, &line.original_text, msg);

    let name = words
        .next()
        .ok_or_else(|| err("executor directive not specified"))?;

    let directive = match name {
        "tag" => {
            let tag = words
                .next()
                .ok_or_else(|| err("tag not specified (# executor tag TAG)"))?;
            Directive::Tag(tag.to_string())
        }
        "if" => {
            let target = words
                .next()
                .ok_or_else(|| err("if condition not specified (# executor if NUMBER|TAG)"))?;
            match target.parse::<LineIndex>() {
                Ok(index) => Directive::If(DependencyTarget::Index(index)),
                Err(_) => Directive::If(DependencyTarget::Tag(target.to_string())),
            }
        }
        "always" => Directive::Always,
        "always-try" => Directive::AlwaysTry,
        "set-dependent" => Directive::SetDependent,
        "set-independent" => Directive::SetIndependent,
        other => return Err(err(&format!("unknown directive '{other}'"))),
    };

    let extra: Vec<&str> = words.collect();
    if !extra.is_empty() {
        warn!(
            line = line.index,
            ?extra,
            "ignoring extra arguments after executor directive"
        );
    }

    Ok(Some(directive))
}

/// Apply every directive in `lines`, returning the tag → line index map.
pub fn resolve_directives(lines: &mut [Line]) -> Result<BTreeMap<String, LineIndex>> {
    let mut tags: BTreeMap<String, LineIndex> = BTreeMap::new();
    let count = lines.len();

    for i in 0..count {
        let Some(directive) = parse_directive(&lines[i])? else {
            continue;
        };

        let (index, text) = (lines[i].index, lines[i].original_text.clone());
        if i + 1 >= count {
            warn!(
                line = index,
                "executor directive specified as last line; ignoring"
            );
            break;
        }

        match directive {
            Directive::Tag(name) => {
                if let Some(previous) = tags.get(&name) {
                    return Err(ExectrError::directive(
                        index,
                        &text,
                        format!("tag '{name}' already exists (line {previous})"),
                    ));
                }
                let next = &mut lines[i + 1];
                if let Some(existing) = &next.tag {
                    return Err(ExectrError::directive(
                        index,
                        &text,
                        format!("line {} is already tagged '{existing}'", next.index),
                    ));
                }
                next.tag = Some(name.clone());
                tags.insert(name, next.index);
            }
            Directive::If(target) => {
                let dependency = match target {
                    DependencyTarget::Index(n) if (1..=count).contains(&n) => n,
                    DependencyTarget::Index(n) => {
                        return Err(ExectrError::directive(
                            index,
                            &text,
                            format!("if directive: no line {n} (script has {count} lines)"),
                        ));
                    }
                    DependencyTarget::Tag(tag) => match tags.get(&tag) {
                        Some(n) => *n,
                        None => {
                            return Err(ExectrError::directive(
                                index,
                                &text,
                                format!("if directive: tag '{tag}' not found (tags must be declared before use)"),
                            ));
                        }
                    },
                };
                lines[i + 1].dependencies.insert(dependency);
            }
            Directive::Always => lines[i + 1].always = AlwaysMode::Always,
            Directive::AlwaysTry => lines[i + 1].always = AlwaysMode::AlwaysTry,
            Directive::SetDependent => {
                for k in (i + 2)..count {
                    let predecessor = lines[k - 1].index;
                    lines[k].dependencies.insert(predecessor);
                }
            }
            Directive::SetIndependent => {
                for line in lines[i + 1..].iter_mut() {
                    line.dependencies.clear();
                }
            }
        }
    }

    Ok(tags)
}
