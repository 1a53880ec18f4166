// tests/error_handling.rs

mod common;
use crate::common::init_tracing;

use std::io::Write;
use std::path::Path;

use tempfile::{tempdir, NamedTempFile};

use exectr::config::loader::{load_and_validate, load_optional};
use exectr::errors::ExectrError;
use exectr::fs::RealFileSystem;
use exectr::script::Script;

fn script_file(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    write!(file, "{text}").expect("Failed to write script");
    file
}

fn load(text: &str) -> Result<Script, ExectrError> {
    let file = script_file(text);
    Script::load(&RealFileSystem, file.path())
}

#[test]
fn missing_script_is_a_parse_error() {
    init_tracing();
    let dir = tempdir().unwrap();
    let err = Script::load(&RealFileSystem, dir.path().join("nope.sh")).unwrap_err();
    assert!(matches!(err, ExectrError::ParseError(msg) if msg.contains("nope.sh")));
}

#[test]
fn forward_tag_reference_is_rejected() {
    init_tracing();
    let err = load("# executor if LATER\necho a\n# executor tag LATER\necho b\n").unwrap_err();
    match err {
        ExectrError::DirectiveError { line, message, .. } => {
            assert_eq!(line, 1);
            assert!(message.contains("LATER"));
        }
        other => panic!("Expected DirectiveError, got {other:?}"),
    }
}

#[test]
fn duplicate_tag_is_rejected() {
    init_tracing();
    let err = load("# executor tag A\necho a\n# executor tag A\necho b").unwrap_err();
    assert!(matches!(err, ExectrError::DirectiveError { line: 3, .. }));
}

#[test]
fn unknown_directive_is_rejected() {
    init_tracing();
    let err = load("# executor sometimes\necho a").unwrap_err();
    assert!(matches!(err, ExectrError::DirectiveError { line: 1, .. }));
}

#[test]
fn errexit_and_xtrace_are_rejected() {
    init_tracing();
    for text in ["echo a\nset -e", "set -eux", "echo a\n  set -o xtrace"] {
        let err = load(text).unwrap_err();
        assert!(
            matches!(err, ExectrError::ValidationError { .. }),
            "{text:?} was accepted"
        );
    }
    // Other flags are fine.
    load("set -u\nset +e\necho 'set -e'").unwrap();
}

#[test]
fn directive_on_last_line_is_ignored() {
    init_tracing();
    let script = load("echo a\n# executor always\n").unwrap();
    assert_eq!(script.len(), 2);
    assert!(script.lines().iter().all(|l| !l.always.is_always()));
}

#[test]
fn config_with_unknown_key_is_rejected() {
    init_tracing();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[engine]\nshel = \"/bin/sh\"").unwrap();

    let err = load_and_validate(&RealFileSystem, file.path()).unwrap_err();
    assert!(matches!(err, ExectrError::TomlError(_)));
}

#[test]
fn config_with_zero_poll_interval_is_rejected() {
    init_tracing();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[engine]\nlock_poll_interval_ms = 0").unwrap();

    let err = load_and_validate(&RealFileSystem, file.path()).unwrap_err();
    assert!(matches!(err, ExectrError::ConfigError(_)));
}

#[test]
fn config_values_reach_the_engine() {
    init_tracing();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[engine]\nshell = \"/bin/sh\"\nmax_idle_sweeps = 7\n\n[paths]\nstate_dir = \"/var/lib/exectr\""
    )
    .unwrap();

    let cfg = load_optional(&RealFileSystem, Some(file.path())).unwrap();
    let opts = exectr::engine::EngineOptions::from_config(&cfg);
    assert_eq!(opts.shell, "/bin/sh");
    assert_eq!(opts.max_idle_sweeps, Some(7));
    assert_eq!(opts.state_dir.as_deref(), Some(Path::new("/var/lib/exectr")));
    assert!(opts.checkpoint_every_line);
}
