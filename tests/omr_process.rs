//! Drives the real child-process code paths against shell-script stand-ins
//! for the Python interpreter.
#![cfg(unix)]

use serial_test::serial;
use sheet_player::{
    config::EngineConfig,
    core::notation::{Music21Renderer, ScoreRenderer},
    discover_output,
    omr::{oemer::OemerEngine, relocate::locate_package},
    OmrEngine, OmrOptions, PlayerError,
};
use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};
use tempfile::tempdir;

fn script(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

fn engine(python: String, search_dir: &Path) -> OemerEngine {
    let cfg = EngineConfig {
        python,
        ..EngineConfig::default()
    };
    OemerEngine::new(&cfg, search_dir)
}

fn options(dir: &Path) -> OmrOptions {
    OmrOptions {
        output_dir: dir.to_path_buf(),
        without_deskew: false,
        use_tf: false,
    }
}

// Invoked as: python -m oemer.ete <image> -o <dir>
const WRITES_SUBSTITUTED_NAME: &str = r#"name=$(basename "$3")
echo "$PYTHONPATH" > "$5/pythonpath.txt"
echo "$CUDA_VISIBLE_DEVICES" > "$5/cuda.txt"
echo "<score-partwise/>" > "$5/${name%.*}.musicxml""#;

#[test]
#[serial]
fn clean_exit_with_output_is_discovered() {
    let tmp = tempdir().unwrap();
    let python = script(tmp.path(), "python", WRITES_SUBSTITUTED_NAME);
    let image = tmp.path().join("input_score.png");
    fs::write(&image, b"png").unwrap();
    let search_dir = tmp.path().join("oemer_local");

    engine(python, &search_dir)
        .recognize(&image, options(tmp.path()))
        .unwrap();

    assert_eq!(
        discover_output(&image).unwrap(),
        tmp.path().join("input_score.musicxml")
    );
    let pp = fs::read_to_string(tmp.path().join("pythonpath.txt")).unwrap();
    assert!(pp.starts_with(&search_dir.to_string_lossy().into_owned()));
    assert_eq!(fs::read_to_string(tmp.path().join("cuda.txt")).unwrap().trim(), "-1");
}

#[test]
#[serial]
fn clean_exit_without_output_fails_closed() {
    let tmp = tempdir().unwrap();
    let python = script(tmp.path(), "python", "exit 0");
    let image = tmp.path().join("input_score.png");

    engine(python, tmp.path())
        .recognize(&image, options(tmp.path()))
        .unwrap();
    assert!(matches!(
        discover_output(&image),
        Err(PlayerError::NoSymbolicOutput)
    ));
}

#[test]
#[serial]
fn crash_carries_original_message() {
    let tmp = tempdir().unwrap();
    let python = script(
        tmp.path(),
        "python",
        "echo 'Traceback (most recent call last):' >&2\necho 'RuntimeError: staff lines not found' >&2\nexit 1",
    );

    let err = engine(python, tmp.path())
        .recognize(&tmp.path().join("x.png"), options(tmp.path()))
        .unwrap_err();
    assert_eq!(err.to_string(), "OMR Crash: RuntimeError: staff lines not found");
}

#[test]
#[serial]
fn missing_interpreter_is_tool_error() {
    let tmp = tempdir().unwrap();
    let err = engine(tmp.path().join("nope").to_string_lossy().into_owned(), tmp.path())
        .recognize(&tmp.path().join("x.png"), options(tmp.path()))
        .unwrap_err();
    assert!(matches!(err, PlayerError::Tool { .. }));
}

#[test]
#[serial]
fn locate_package_reads_interpreter_answer() {
    let tmp = tempdir().unwrap();
    let found = script(tmp.path(), "found", "echo /opt/site-packages/oemer");
    let missing = script(tmp.path(), "missing", "echo");

    assert_eq!(
        locate_package(&found, "oemer").unwrap(),
        PathBuf::from("/opt/site-packages/oemer")
    );
    assert!(matches!(
        locate_package(&missing, "oemer"),
        Err(PlayerError::EngineNotInstalled(_))
    ));
}

#[test]
#[serial]
fn renderer_failure_collapses_to_parse_error() {
    let tmp = tempdir().unwrap();
    let python = script(tmp.path(), "python", "echo 'MusicXMLImportException: bad' >&2\nexit 1");
    let xml = tmp.path().join("s.musicxml");
    fs::write(&xml, "<nope/>").unwrap();

    let err = Music21Renderer::new(python)
        .render_midi(&xml, &tmp.path().join("s.mid"))
        .unwrap_err();
    assert!(matches!(err, PlayerError::NotationParse));
}

#[test]
#[serial]
fn renderer_success_requires_midi_on_disk() {
    let tmp = tempdir().unwrap();
    // Invoked as: python -c <code> <xml> <midi>
    let writes = script(tmp.path(), "writes", "printf 'MThd' > \"$4\"");
    let silent = script(tmp.path(), "silent", "exit 0");
    let xml = tmp.path().join("s.musicxml");
    let midi = tmp.path().join("s.mid");

    Music21Renderer::new(writes).render_midi(&xml, &midi).unwrap();
    assert_eq!(fs::read(&midi).unwrap(), b"MThd");

    let other = tmp.path().join("t.mid");
    assert!(matches!(
        Music21Renderer::new(silent).render_midi(&xml, &other),
        Err(PlayerError::NotationParse)
    ));
}
