use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use pretty_assertions::assert_eq;
use subblock::{
    Defines, FileSystem, Line, LineSource, Location, Pass, PassContext, PassFactory, Preprocessor,
    preprocess_file, preprocess_str,
};
use tempfile::TempDir;

fn texts(lines: Vec<Line>) -> Vec<String> {
    lines.into_iter().map(Line::into_text).collect()
}

fn workspace(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
    dir
}

fn run_in(dir: &Path, text: &str) -> Vec<Line> {
    preprocess_str(PassContext::new(dir), "main.puml", text).unwrap()
}

const LIB: &str = "header\n!startsub B\ncontent\n!endsub\nfooter\n";

#[test]
fn includes_a_block_from_another_file() {
    let dir = workspace(&[("lib.puml", LIB)]);
    let out = texts(run_in(dir.path(), "start\n!includesub lib.puml!B\nend"));
    assert_eq!(out, vec!["start", "content", "end"]);
}

#[test]
fn included_file_is_unaffected_by_the_nested_drain() {
    let dir = workspace(&[("lib.puml", LIB)]);
    let _ = run_in(dir.path(), "!includesub lib.puml!B");
    let direct = preprocess_file(PassContext::new(dir.path()), &dir.path().join("lib.puml")).unwrap();
    assert_eq!(texts(direct), vec!["header", "content", "footer"]);
}

#[test]
fn external_block_may_be_defined_after_its_use_in_that_file() {
    let dir = workspace(&[("late.puml", "!includesub B\n!startsub B\nz\n!endsub\n")]);
    let out = texts(run_in(dir.path(), "!includesub \"late.puml!B\""));
    assert_eq!(out, vec!["z"]);
}

#[test]
fn external_unknown_block_is_empty() {
    let dir = workspace(&[("lib.puml", LIB)]);
    let out = texts(run_in(dir.path(), "a\n!includesub lib.puml!Nope\nb"));
    assert_eq!(out, vec!["a", "b"]);
}

#[test]
fn nested_files_resolve_their_own_includes() {
    let dir = workspace(&[
        ("lib.puml", LIB),
        ("mid.puml", "!startsub M\n!includesub lib.puml!B\nmid\n!endsub\n"),
    ]);
    let out = texts(run_in(dir.path(), "!includesub mid.puml!M"));
    assert_eq!(out, vec!["content", "mid"]);
}

#[test]
fn external_lines_keep_their_origin() {
    let dir = workspace(&[("lib.puml", LIB)]);
    let lines = run_in(dir.path(), "start\n!includesub lib.puml!B");
    let included = &lines[1];
    assert!(included.location().source.ends_with("lib.puml"));
    assert_eq!(included.location().line, 3);
    let parent = included.location().parent.as_deref().unwrap();
    assert_eq!(&*parent.source, "main.puml");
    assert_eq!(parent.line, 2);
}

#[test]
fn external_blocks_can_be_captured_locally() {
    let dir = workspace(&[("lib.puml", LIB)]);
    let out = texts(run_in(
        dir.path(),
        "!startsub L\n!includesub lib.puml!B\nlocal\n!endsub\n!includesub L",
    ));
    assert_eq!(out, vec!["content", "local", "content", "local"]);
}

#[test]
fn missing_file_yields_one_error_line() {
    let dir = workspace(&[]);
    let lines = run_in(dir.path(), "a\n!includesub missing.puml!B\nb");
    assert_eq!(lines.len(), 3);
    assert!(!lines[0].is_error());
    assert_eq!(lines[2].text(), "b");

    let error = lines[1].error().expect("error line");
    let expected = dir.path().join("missing.puml");
    assert!(error.starts_with("Cannot include "), "{error}");
    assert!(error.ends_with(&*expected.to_string_lossy()), "{error}");
    assert_eq!(lines[1].location().line, 2);
}

#[test]
fn directory_is_not_includable() {
    let dir = workspace(&[("nested/lib.puml", LIB)]);
    let lines = run_in(dir.path(), "!includesub nested!B");
    assert_eq!(lines.len(), 1);
    assert!(lines[0].error().unwrap().starts_with("Cannot include"));
}

#[test]
fn error_line_is_not_captured() {
    let dir = workspace(&[]);
    let lines = run_in(dir.path(), "!startsub X\n!includesub gone.puml!B\n!endsub\n!includesub X");
    assert_eq!(lines.len(), 1);
    assert!(lines[0].is_error());
}

#[test]
fn unknown_charset_is_reported_in_band() {
    let dir = workspace(&[("lib.puml", LIB)]);
    let ctx = PassContext::new(dir.path()).with_charset(Some("klingon".into()));
    let lines = preprocess_str(ctx, "main.puml", "!includesub lib.puml!B\nafter").unwrap();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].error().unwrap().contains("klingon"));
    assert_eq!(lines[1].text(), "after");
}

#[test]
fn recursive_file_inclusion_terminates() {
    let dir = workspace(&[("self.puml", "!startsub X\nx1\n!endsub\n!includesub self.puml!X\n")]);
    let ctx = PassContext::new(dir.path());
    let out = texts(preprocess_file(ctx, &dir.path().join("self.puml")).unwrap());
    assert_eq!(out, vec!["x1", "x1"]);
}

#[test]
fn path_spec_expands_environment_variables() {
    let dir = workspace(&[("vendor/lib.puml", LIB)]);
    // SAFETY: the variable name is unique to this test.
    unsafe {
        std::env::set_var("SUBBLOCK_TEST_VENDOR", dir.path().join("vendor"));
    }
    let out = texts(run_in(dir.path(), "!includesub %SUBBLOCK_TEST_VENDOR%/lib.puml!B"));
    assert_eq!(out, vec!["content"]);
}

struct Aliases {
    files: HashMap<String, PathBuf>,
}

impl FileSystem for Aliases {
    fn resolve(&self, spec: &str) -> PathBuf {
        self.files
            .get(spec)
            .cloned()
            .unwrap_or_else(|| PathBuf::from("/nonexistent").join(spec))
    }
}

#[test]
fn file_system_collaborator_is_pluggable() {
    let dir = workspace(&[("real-name.puml", LIB)]);
    let aliases = Aliases {
        files: HashMap::from([("@lib".to_string(), dir.path().join("real-name.puml"))]),
    };
    let ctx = PassContext::new(".").with_file_system(Rc::new(aliases));
    let out = texts(preprocess_str(ctx, "main.puml", "!includesub @lib!B\n!includesub other!B").unwrap());
    assert_eq!(out.len(), 2);
    assert_eq!(out[0], "content");
}

type Seen = Rc<RefCell<Vec<(Vec<String>, Option<String>, Option<String>)>>>;

struct Recording {
    seen: Seen,
}

impl PassFactory for Recording {
    fn open(&self, context: PassContext, source: Box<dyn LineSource>) -> Box<dyn Pass> {
        self.seen.borrow_mut().push((
            context.config.clone(),
            context.charset.clone(),
            context.defines.get("THEME").map(str::to_string),
        ));
        Box::new(Preprocessor::new(context, source))
    }
}

#[test]
fn nested_pass_shares_the_run_configuration() {
    let dir = workspace(&[("lib.puml", LIB)]);
    let seen = Seen::default();
    let mut defines = Defines::new();
    defines.define("THEME", "dark");
    let ctx = PassContext::new(dir.path())
        .with_config(vec!["skinparam monochrome true".into()])
        .with_charset(Some("utf-8".into()))
        .with_defines(defines)
        .with_pass_factory(Rc::new(Recording {
            seen: Rc::clone(&seen),
        }));

    let out = texts(preprocess_str(ctx, "main.puml", "!includesub lib.puml!B").unwrap());
    assert_eq!(out, vec!["content"]);

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(
        seen[0],
        (
            vec!["skinparam monochrome true".to_string()],
            Some("utf-8".to_string()),
            Some("dark".to_string()),
        )
    );
}

#[test]
fn nested_registry_is_not_shared() {
    let dir = workspace(&[("lib.puml", LIB)]);
    let mut pass = Preprocessor::new(
        PassContext::new(dir.path()),
        Box::new(linesrc::ReaderSource::from_text("main.puml", "!includesub lib.puml!B")),
    );
    pass.drain().unwrap();
    pass.close().unwrap();
    assert!(!pass.registry().contains("B"));
    assert!(pass.sub("B").is_empty());
}

#[test]
fn open_failure_is_replayed_like_content() {
    let dir = workspace(&[("lib.puml", LIB)]);
    let ctx = PassContext::new(dir.path()).with_charset(Some("klingon".into()));
    let lines = preprocess_str(
        ctx,
        "main.puml",
        "!startsub X\n!includesub lib.puml!B\n!endsub\n!includesub X",
    )
    .unwrap();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(Line::is_error));
}

#[test]
fn read_failure_in_included_file_is_replayed_like_content() {
    let dir = workspace(&[]);
    fs::write(dir.path().join("bad.puml"), b"!startsub B\nok\n\xff\xfe\n!endsub\n").unwrap();
    let lines = run_in(
        dir.path(),
        "!startsub X\n!includesub bad.puml!B\n!endsub\n!includesub X\nafter",
    );
    assert_eq!(lines.len(), 3);

    let direct = &lines[0];
    let replayed = &lines[1];
    assert!(direct.error().unwrap().contains("valid UTF-8"));
    assert_eq!(direct.location(), &Location::new("main.puml", 2));
    assert_eq!(replayed.error(), direct.error());
    assert_eq!(
        replayed.location().to_string(),
        "main.puml:2 (included from main.puml:4)"
    );
    assert!(!lines[2].is_error());
    assert_eq!(lines[2].text(), "after");
}
