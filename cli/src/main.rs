mod config;
mod diagnostics;
mod test_runner;

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing::{Level, warn};

use subblock::{LineSource, Preprocessor};

use crate::config::PreprocConfig;
use crate::diagnostics::Reporter;

const SUBCOMMANDS: &[&str] = &["run", "test", "help"];

/// Flags whose value is the following argument.
const VALUE_FLAGS: &[&str] = &["--config", "--charset", "-D", "-c", "--category"];

#[derive(Parser)]
#[command(name = "subpp", version, about = "Sub-block preprocessor for diagram sources")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log directive handling to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Preprocess a file and print the result
    Run(RunArgs),

    /// Run .test.puml conformance files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Source file to preprocess
    file: PathBuf,

    /// TOML file with charset, config lines and defines
    #[arg(long)]
    config: Option<PathBuf>,

    /// Charset of included files (overrides the config file)
    #[arg(long)]
    charset: Option<String>,

    /// Define a symbol: NAME=VALUE. Repeatable.
    #[arg(short = 'D', value_name = "NAME=VALUE")]
    define: Vec<String>,

    /// After the output, list the sub-blocks the run registered
    #[arg(long)]
    list_subs: bool,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.puml file or directory containing them
    path: PathBuf,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    let args = with_default_subcommand(std::env::args().collect());
    let cli = Cli::parse_from(&args);

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_ansi(!cli.no_color)
        .init();

    match cli.command {
        Command::Run(run_args) => process::exit(do_run(run_args, cli.no_color)),
        Command::Test(test_args) => {
            if test_args.list_categories {
                test_runner::list_categories(&test_args.path);
                return;
            }
            let exit_code = test_runner::run_tests(&test_args.path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

/// `subpp [flags] file.puml` is shorthand for `subpp run [flags] file.puml`:
/// if the first positional argument is not a subcommand, `run` is inserted
/// right after the program name.
fn with_default_subcommand(mut args: Vec<String>) -> Vec<String> {
    let mut rest = args.iter().skip(1);
    let mut first_positional = None;
    while let Some(arg) = rest.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            rest.next();
        } else if !arg.starts_with('-') {
            first_positional = Some(arg.as_str());
            break;
        }
    }
    if first_positional.is_some_and(|arg| !SUBCOMMANDS.contains(&arg)) {
        args.insert(1, "run".to_string());
    }
    args
}

/// Returns the exit code: 0 clean, 1 if any error lines were produced,
/// 2 if the run could not complete.
fn do_run(args: RunArgs, no_color: bool) -> i32 {
    let mut config = match &args.config {
        Some(path) => match PreprocConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: {}", e);
                return 2;
            }
        },
        None => PreprocConfig::default(),
    };
    if args.charset.is_some() {
        config.charset = args.charset.clone();
    }
    config.define_all(&args.define);

    let base_dir = args
        .file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let context = config.into_context(base_dir);

    let mut pass = match Preprocessor::open_file(context, &args.file) {
        Ok(pass) => pass,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", args.file.display(), e);
            return 2;
        }
    };

    let mut reporter = Reporter::new(no_color);
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut errors = 0usize;

    let outcome = loop {
        match pass.next_line() {
            Ok(Some(line)) if line.is_error() => {
                errors += 1;
                // Keep stdout and stderr interleaved in source order.
                if let Err(e) = out.flush() {
                    warn!(error = %e, "cannot flush output");
                }
                reporter.report(&line);
            }
            Ok(Some(line)) => {
                if let Err(e) = writeln!(out, "{}", line) {
                    break Err(e.to_string());
                }
            }
            Ok(None) => break Ok(()),
            Err(e) => break Err(e.to_string()),
        }
    };
    let closed = pass.close();
    if let Err(e) = out.flush() {
        warn!(error = %e, "cannot flush output");
    }
    drop(out);

    if let Err(message) = outcome {
        eprintln!("error: {}", message);
        return 2;
    }
    if let Err(e) = closed {
        eprintln!("error: {}", e);
        return 2;
    }

    if args.list_subs {
        for sub in pass.registry().sorted() {
            println!("{} ({} lines)", sub.name(), sub.len());
        }
    }

    if errors > 0 { 1 } else { 0 }
}
