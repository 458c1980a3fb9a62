use clap::Parser;
use retest::{run_tests, run_watch_mode, OutputFormat, RunnerOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "retest")]
#[command(about = "A regression test harness for script-based test suites")]
#[command(version)]
struct Cli {
    /// Root directory to scan for test files
    #[arg(value_name = "ROOT", default_value = ".")]
    root: PathBuf,

    /// Interpreter command used to execute each test file
    #[arg(long)]
    interpreter: Option<String>,

    /// Print the full styled output of failing tests
    #[arg(long, short)]
    verbose: bool,

    /// Output format
    #[arg(long = "output-format", value_enum, default_value = "text")]
    output_format: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Watch mode: re-run tests when test files change
    #[arg(long, short)]
    watch: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Styling is resolved exactly once; Windows consoles get plain text.
    let color = !cli.no_color && !cfg!(windows);

    let options = RunnerOptions {
        interpreter: cli.interpreter,
        verbose: cli.verbose,
        output_format: cli.output_format,
        color,
    };

    if cli.watch {
        run_watch_mode(cli.root, options).await?;
        Ok(())
    } else {
        let results = run_tests(cli.root, options).await?;
        std::process::exit(if results.has_failures() { 1 } else { 0 });
    }
}
