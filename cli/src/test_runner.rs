use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use linesrc::ReaderSource;
use subblock::{Line, LineSource, Preprocessor};

use crate::config::PreprocConfig;

const TEST_SUFFIX: &str = ".test.puml";

#[derive(Debug, Deserialize)]
pub struct ExpectedError {
    /// Substring that must appear in the error message.
    pub contains: String,

    /// If set, the error must be reported on this 1-based line of the document.
    #[serde(default)]
    pub line: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Charset used for included files.
    #[serde(default)]
    pub charset: Option<String>,

    /// Predefined symbols for the run.
    #[serde(default)]
    pub defines: BTreeMap<String, String>,

    /// Expected output, compared after trimming both sides.
    #[serde(default)]
    pub expect_output: Option<String>,

    /// Expected error lines. If present (even empty), count and content are checked.
    #[serde(default)]
    pub expect_errors: Option<Vec<ExpectedError>>,

    /// Expected sub-blocks of the document and their line counts.
    #[serde(default)]
    pub expect_subs: Option<BTreeMap<String, usize>>,
}

/// Split a `.test.puml` file into its TOML front matter and the document.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');

    let after_open = content
        .strip_prefix("---")
        .ok_or("missing opening --- frontmatter delimiter")?;
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest = &after_open[close_pos + 4..];
    let source = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, source))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

impl TestResult {
    fn label(&self) -> &str {
        self.description.as_deref().unwrap_or_else(|| {
            self.path
                .file_name()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_suffix(TEST_SUFFIX))
                .unwrap_or("?")
        })
    }
}

fn run_single_test(path: &Path) -> TestResult {
    let (description, outcome) = match evaluate(path) {
        Ok((description, None)) => (description, TestOutcome::Pass),
        Ok((description, Some(reason))) => (description, TestOutcome::Fail(reason)),
        Err(reason) => (None, TestOutcome::Fail(reason)),
    };
    TestResult {
        path: path.to_path_buf(),
        description,
        outcome,
    }
}

/// Run one test file. `Ok((description, Some(reason)))` is a failed expectation.
fn evaluate(path: &Path) -> Result<(Option<String>, Option<String>), String> {
    let content =
        std::fs::read_to_string(path).map_err(|e| format!("cannot read file: {}", e))?;
    let (config, source) =
        parse_test_file(&content).map_err(|e| format!("frontmatter error: {}", e))?;

    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let context = PreprocConfig {
        charset: config.charset.clone(),
        defines: config.defines.clone(),
        ..PreprocConfig::default()
    }
    .into_context(base_dir);

    let name = path.display().to_string();
    let mut pass = Preprocessor::new(context, Box::new(ReaderSource::from_text(name, source)));
    let lines = drain_run(&mut pass)?;

    let (errors, output): (Vec<Line>, Vec<Line>) = lines.into_iter().partition(Line::is_error);

    let failure = config
        .expect_output
        .as_deref()
        .and_then(|expected| check_output(expected, &output))
        .or_else(|| {
            config
                .expect_errors
                .as_deref()
                .and_then(|expected| check_errors(&errors, expected))
        })
        .or_else(|| {
            config.expect_subs.as_ref().and_then(|expected| {
                let actual: BTreeMap<String, usize> = pass
                    .registry()
                    .sorted()
                    .into_iter()
                    .map(|sub| (sub.name().to_string(), sub.len()))
                    .collect();
                (&actual != expected).then(|| {
                    format!(
                        "sub-block mismatch\n  expected: {:?}\n  actual:   {:?}",
                        expected, actual
                    )
                })
            })
        });

    Ok((config.description, failure))
}

/// Pull every line of a run, then close it. Either failure fails the test.
fn drain_run(pass: &mut impl LineSource) -> Result<Vec<Line>, String> {
    let lines = pass.collect_lines();
    let closed = pass.close();
    let lines = lines.map_err(|e| format!("unexpected I/O error: {}", e))?;
    closed.map_err(|e| format!("closing the run failed: {}", e))?;
    Ok(lines)
}

fn check_output(expected: &str, output: &[Line]) -> Option<String> {
    let actual = output
        .iter()
        .map(Line::text)
        .collect::<Vec<_>>()
        .join("\n");
    let (actual, expected) = (actual.trim(), expected.trim());
    (actual != expected).then(|| {
        format!(
            "output mismatch\n  expected:\n{}\n  actual:\n{}",
            indent(expected),
            indent(actual)
        )
    })
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|l| format!("    | {}", l))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Check that actual error lines match expectations. Returns `Some(reason)` on mismatch.
fn check_errors(actual: &[Line], expected: &[ExpectedError]) -> Option<String> {
    if actual.len() != expected.len() {
        let actual_msgs: Vec<String> = actual
            .iter()
            .map(|l| format!("  - {}: {}", l.location(), l.error().unwrap_or_default()))
            .collect();
        return Some(format!(
            "expected {} error(s), got {}\n  actual errors:\n{}",
            expected.len(),
            actual.len(),
            if actual_msgs.is_empty() {
                "    (none)".to_string()
            } else {
                actual_msgs.join("\n")
            }
        ));
    }

    for (i, (actual, expected)) in actual.iter().zip(expected).enumerate() {
        let msg = actual.error().unwrap_or_default();
        if !msg.contains(&expected.contains) {
            return Some(format!(
                "error[{}]: expected message containing \"{}\", got: {}",
                i, expected.contains, msg
            ));
        }
        if let Some(expected_line) = expected.line {
            let actual_line = actual.location().line;
            if actual_line != expected_line {
                return Some(format!(
                    "error[{}]: expected on line {}, but reported on line {}",
                    i, expected_line, actual_line
                ));
            }
        }
    }

    None
}

fn is_test_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(TEST_SUFFIX))
}

/// Category of a test file: its directory relative to `root`, with `/`
/// separators. Files directly under `root` have the empty category.
fn category_of(file: &Path, root: &Path) -> String {
    file.parent()
        .and_then(|dir| dir.strip_prefix(root).ok())
        .map(|rel| {
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default()
}

/// Every test file below `root`, grouped by category, each group sorted.
/// Unreadable directories are skipped.
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut found: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for path in entries.flatten().map(|entry| entry.path()) {
            if path.is_dir() {
                pending.push(path);
            } else if is_test_file(&path) {
                found.entry(category_of(&path, root)).or_default().push(path);
            }
        }
    }
    found.values_mut().for_each(|files| files.sort());
    found
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

/// Print each category under `path` with its test count.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("{} is a single test; it has no categories", path.display());
        return;
    }
    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no {} files found in {}", TEST_SUFFIX, path.display());
        return;
    }
    eprintln!("categories under {}:", path.display());
    for (category, files) in &categories {
        let noun = if files.len() == 1 { "test" } else { "tests" };
        eprintln!("  {:<24} {} {}", category_label(category), files.len(), noun);
    }
}

fn paint(text: &str, ansi: &str, no_color: bool) -> String {
    if no_color {
        text.to_string()
    } else {
        format!("\x1b[{}m{}\x1b[0m", ansi, text)
    }
}

/// Select the categories to run. Unknown names are warned about and skipped.
fn filter_categories<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a Vec<PathBuf>> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v)).collect();
    }

    let mut filtered = BTreeMap::new();
    for requested in requested {
        let req = requested.trim_matches('/');
        let prefix = format!("{}/", req);
        let before = filtered.len();
        for (cat, files) in all {
            if cat == req || cat.starts_with(&prefix) {
                filtered.insert(cat.as_str(), files);
            }
        }
        if filtered.len() == before {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all.keys()
                    .map(|k| category_label(k))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    filtered
}

/// Run all test files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let groups: Vec<(String, Vec<PathBuf>)> = if path.is_file() {
        vec![(String::new(), vec![path.to_path_buf()])]
    } else {
        let all = discover_categorized(path);
        if all.is_empty() {
            eprintln!("no {} files found in {}", TEST_SUFFIX, path.display());
            return 1;
        }
        let selected = filter_categories(&all, categories);
        if selected.is_empty() {
            eprintln!("no matching categories found");
            return 1;
        }
        selected
            .into_iter()
            .map(|(cat, files)| (cat.to_string(), files.clone()))
            .collect()
    };

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (cat, files) in &groups {
        if !path.is_file() {
            eprintln!();
            eprintln!("{}", paint(category_label(cat), "1", no_color));
        }
        for file in files {
            let result = run_single_test(file);
            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", paint("PASS", "32", no_color), result.label());
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", paint("FAIL", "31", no_color), result.label());
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for f in &failures {
            eprintln!();
            eprintln!("  --- {} ---", f.path.display());
            if let TestOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    let failed = failures.len();
    if failed == 0 {
        eprintln!("test result: {}. {} passed, 0 failed", paint("ok", "32", no_color), passed);
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            paint("FAILED", "31", no_color),
            passed,
            failed,
            passed + failed
        );
        1
    }
}
