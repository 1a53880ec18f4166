// src/script/loader.rs

use std::path::Path;

use crate::errors::{ExectrError, Result};
use crate::fs::FileSystem;
use crate::script::line::Line;

/// Read a script through `fs`.
///
/// This is the only place a `ParseError` originates: a script that can be
/// read always splits into lines.
pub fn read_script(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    fs.read_to_string(path)
        .map_err(|e| ExectrError::ParseError(format!("{}: {e:#}", path.display())))
}

/// Split script text into one [`Line`] per physical line.
///
/// A line ending in `\` absorbs the next physical line, exactly like the
/// shell would: the backslash is dropped and the next line is appended
/// verbatim. The absorbed line stays in the list as a placeholder without a
/// command so that indices keep matching the file.
pub fn split_lines(text: &str) -> Vec<Line> {
    if text.is_empty() {
        return Vec::new();
    }

    let body = text.strip_suffix('\n').unwrap_or(text);
    let physical: Vec<&str> = body
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();

    let mut logical: Vec<Option<String>> = physical.iter().map(|l| Some(l.to_string())).collect();

    // Walk backwards so a chain of continuations collapses into its first line.
    for i in (0..logical.len()).rev() {
        let Some(current) = logical[i].as_deref() else {
            continue;
        };
        let Some(stripped) = current.strip_suffix('\\') else {
            continue;
        };
        let stripped = stripped.to_string();
        let next = logical
            .get_mut(i + 1)
            .and_then(Option::take)
            .unwrap_or_default();
        logical[i] = Some(stripped + &next);
    }

    physical
        .iter()
        .zip(logical)
        .enumerate()
        .map(|(i, (original, command))| {
            let command = command.filter(|c| !c.trim().is_empty());
            Line::new(i + 1, command, *original)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commands(lines: &[Line]) -> Vec<Option<&str>> {
        lines.iter().map(|l| l.command.as_deref()).collect()
    }

    #[test]
    fn keeps_one_line_per_physical_line() {
        let lines = split_lines("echo a\n\n# comment\necho b\n");
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines.iter().map(|l| l.index).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
        assert_eq!(
            commands(&lines),
            vec![Some("echo a"), None, Some("# comment"), Some("echo b")]
        );
    }

    #[test]
    fn continuation_chain_collapses_into_first_line() {
        let lines = split_lines("echo a \\\n  b \\\n  c\necho d");
        assert_eq!(lines.len(), 4);
        assert_eq!(
            commands(&lines),
            vec![Some("echo a   b   c"), None, None, Some("echo d")]
        );
        assert_eq!(lines[1].original_text, "  b \\");
        assert_eq!(lines[2].original_text, "  c");
    }

    #[test]
    fn trailing_continuation_on_last_line_is_dropped() {
        let lines = split_lines("echo a \\");
        assert_eq!(commands(&lines), vec![Some("echo a ")]);
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let lines = split_lines("echo a\r\necho b\r\n");
        assert_eq!(commands(&lines), vec![Some("echo a"), Some("echo b")]);
        assert_eq!(lines[0].original_text, "echo a");
    }

    #[test]
    fn empty_text_has_no_lines() {
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn unreadable_script_is_a_parse_error() {
        let fs = crate::fs::MockFileSystem::new();
        let err = read_script(&fs, Path::new("/nope.sh")).unwrap_err();
        assert!(matches!(err, ExectrError::ParseError(_)));
    }
}
