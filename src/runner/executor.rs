use crate::parser::parse_totals;
use crate::runner::discovery::{discover_tests, TestFile, TEST_SUFFIX};
use crate::runner::reporter::{
    ConsoleReporter, JsonFormatter, OutputFormat, OutputFormatter, Palette, Reporter, RunSummary,
    Status, TestRecord, TestRunOutput, TextFormatter,
};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

pub const DEFAULT_INTERPRETER: &str = "node";

#[derive(Debug, Clone, Default)]
pub struct RunnerOptions {
    pub interpreter: Option<String>,
    pub verbose: bool,
    pub output_format: OutputFormat,
    pub color: bool,
}

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("failed to run {interpreter} on {path}: {source}")]
    Launch {
        interpreter: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write log file {path}: {source}")]
    LogWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Runs every test under `root`, strictly sequentially: each test is
/// executed, its log written and its result reported before the next one
/// starts. Returns the run output; the caller decides the exit code from
/// `has_failures()`.
pub async fn run_tests(root: PathBuf, options: RunnerOptions) -> anyhow::Result<TestRunOutput> {
    let start_time = std::time::Instant::now();
    let palette = Palette::new(options.color);
    let reporter = ConsoleReporter::new(options.verbose, options.output_format, palette);
    let interpreter = options
        .interpreter
        .clone()
        .unwrap_or_else(|| DEFAULT_INTERPRETER.to_string());

    let files = discover_tests(&root)?;

    if files.is_empty() {
        reporter.on_warning(&format!(
            "No {} files found under {}",
            TEST_SUFFIX,
            root.display()
        ));
    }

    let mut records = Vec::with_capacity(files.len());
    for file in &files {
        let record = run_one(file, &interpreter, &reporter).await?;
        records.push(record);
    }

    let passed = records.iter().filter(|r| r.status == Status::Passed).count();
    let failed = records.iter().filter(|r| r.status == Status::Failed).count();
    let no_totals = records
        .iter()
        .filter(|r| r.status == Status::NoTotals)
        .count();
    let failures = records
        .iter()
        .filter_map(|r| r.totals)
        .map(|t| t.failures)
        .sum();
    let errors = records
        .iter()
        .filter_map(|r| r.totals)
        .map(|t| t.errors)
        .sum();

    let output = TestRunOutput {
        summary: RunSummary {
            tests: records.len(),
            passed,
            failed,
            no_totals,
            failures,
            errors,
            duration_ms: start_time.elapsed().as_millis() as u64,
        },
        tests: records,
    };

    match options.output_format {
        OutputFormat::Json => {
            println!("{}", JsonFormatter.format(&output));
        }
        OutputFormat::Text => {
            let formatter = TextFormatter { palette };
            println!();
            println!("{}", formatter.format(&output));
        }
    }

    Ok(output)
}

async fn run_one(
    file: &TestFile,
    interpreter: &str,
    reporter: &impl Reporter,
) -> anyhow::Result<TestRecord> {
    reporter.on_test_start(&file.relative);
    tracing::debug!(test = %file.relative, interpreter, "running test");

    // Stdout is the only captured channel; stderr passes through to ours.
    let child = Command::new(interpreter)
        .arg(&file.path)
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|source| HarnessError::Launch {
            interpreter: interpreter.to_string(),
            path: file.path.clone(),
            source,
        })?;

    // The exit code is not inspected; a crashed test surfaces through its
    // missing totals line.
    let captured = child
        .wait_with_output()
        .await
        .map_err(|source| HarnessError::Launch {
            interpreter: interpreter.to_string(),
            path: file.path.clone(),
            source,
        })?;

    let log_path = log_path_for(&file.path);
    tokio::fs::write(&log_path, &captured.stdout)
        .await
        .map_err(|source| HarnessError::LogWrite {
            path: log_path.clone(),
            source,
        })?;
    tracing::debug!(log = %log_path.display(), bytes = captured.stdout.len(), "wrote test log");

    let text = String::from_utf8_lossy(&captured.stdout);
    let record = match parse_totals(&text) {
        Some(line) => {
            let status = if line.totals.is_clean() {
                Status::Passed
            } else {
                Status::Failed
            };
            reporter.on_totals(&line);
            if status == Status::Failed {
                reporter.on_failing_output(&text);
            }
            TestRecord {
                file: file.relative.clone(),
                log: log_path.to_string_lossy().into_owned(),
                status,
                totals: Some(line.totals),
            }
        }
        None => {
            reporter.on_no_totals(&text);
            TestRecord {
                file: file.relative.clone(),
                log: log_path.to_string_lossy().into_owned(),
                status: Status::NoTotals,
                totals: None,
            }
        }
    };

    Ok(record)
}

/// Log path convention: the `.log` suffix is appended to the full test file
/// name, so `a.test.js` logs to `a.test.js.log`.
fn log_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".log");
    PathBuf::from(name)
}
