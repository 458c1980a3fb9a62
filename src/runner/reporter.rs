use crate::parser::{scan_status, StatusNode, Totals, TotalsLine};
use owo_colors::{OwoColorize, Style};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Outcome of one test file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Passed,
    Failed,
    /// The captured output contained no totals line at all. Kept distinct
    /// from numeric failures; such a test carries no fabricated counts.
    NoTotals,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestRecord {
    pub file: String,
    pub log: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totals: Option<Totals>,
}

impl TestRecord {
    pub fn failure_clause(&self) -> String {
        match self.totals {
            Some(totals) => failure_clause(totals.failures, totals.errors),
            None => "no totals".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub tests: usize,
    pub passed: usize,
    pub failed: usize,
    pub no_totals: usize,
    pub failures: u64,
    pub errors: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestRunOutput {
    pub tests: Vec<TestRecord>,
    pub summary: RunSummary,
}

impl TestRunOutput {
    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0 || self.summary.no_totals > 0
    }

    /// The failing tests in run order, for the end-of-run summary.
    pub fn failing_tests(&self) -> impl Iterator<Item = &TestRecord> {
        self.tests.iter().filter(|t| t.status != Status::Passed)
    }
}

fn count_noun(count: u64, noun: &str) -> String {
    if count == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

/// Builds the parenthesized clause for a failing test, omitting zero-valued
/// categories: "1 failure", "2 errors", "1 failure, 3 errors".
pub fn failure_clause(failures: u64, errors: u64) -> String {
    let mut parts = Vec::new();
    if failures > 0 {
        parts.push(count_noun(failures, "failure"));
    }
    if errors > 0 {
        parts.push(count_noun(errors, "error"));
    }
    parts.join(", ")
}

/// The fixed style table, gated on the color flag resolved once at startup.
/// Every paint method is a no-op when styling is disabled, so rendering
/// reconstructs its input exactly.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.enabled {
            text.style(style).to_string()
        } else {
            text.to_string()
        }
    }

    /// `OK` / `passed` tokens, and the passing run verdict mark.
    pub fn good(&self, text: &str) -> String {
        self.paint(text, Style::new().green())
    }

    /// `--` / `failed.` tokens.
    pub fn warn_token(&self, text: &str) -> String {
        self.paint(text, Style::new().yellow())
    }

    /// `!!` / `error.` tokens, error-block text, failing totals lines and
    /// the end-of-run warning block.
    pub fn bad(&self, text: &str) -> String {
        self.paint(text, Style::new().red().bold())
    }

    /// `Expected:` / `Actual:` labels.
    pub fn label(&self, text: &str) -> String {
        self.paint(text, Style::new().cyan())
    }

    /// Plain region text inside `[OK]` and `[--]` regions, and brackets.
    pub fn body(&self, text: &str) -> String {
        self.paint(text, Style::new().bright_white())
    }

    /// `Testcase:` header lines.
    pub fn header(&self, text: &str) -> String {
        self.paint(text, Style::new().underline())
    }

    pub fn separator(&self, text: &str) -> String {
        self.paint(text, Style::new().dimmed())
    }

    /// Watch-mode status tag.
    pub fn accent(&self, text: &str) -> String {
        self.paint(text, Style::new().cyan().bold())
    }
}

/// Splits a marker detail into the text before its trailing keyword and the
/// whitespace after it. The scanner guarantees the keyword is present.
fn split_keyword<'a>(detail: &'a str, keyword: &str) -> (&'a str, &'a str) {
    let trimmed_len = detail.trim_end().len();
    (&detail[..trimmed_len - keyword.len()], &detail[trimmed_len..])
}

/// Re-renders scanned status nodes with the fixed style table. With styling
/// disabled the result is byte-identical to the scanned text (modulo a
/// guaranteed trailing newline).
pub fn render_status(nodes: &[StatusNode], palette: &Palette) -> String {
    let mut out = String::new();

    for node in nodes {
        match node {
            StatusNode::Header { indent, rest } => {
                out.push_str(indent);
                out.push_str(&palette.header(&format!("Testcase:{}", rest)));
            }
            StatusNode::Pass { indent, detail } => {
                let (head, tail) = split_keyword(detail, "passed");
                out.push_str(indent);
                out.push_str(&palette.body("["));
                out.push_str(&palette.good("OK"));
                out.push_str(&palette.body("]"));
                out.push_str(&palette.body(head));
                out.push_str(&palette.good("passed"));
                out.push_str(tail);
            }
            StatusNode::Fail {
                indent,
                detail,
                expected,
                actual,
            } => {
                let (head, tail) = split_keyword(detail, "failed.");
                out.push_str(indent);
                out.push_str(&palette.body("["));
                out.push_str(&palette.warn_token("--"));
                out.push_str(&palette.body("]"));
                out.push_str(&palette.body(head));
                out.push_str(&palette.warn_token("failed."));
                out.push_str(tail);
                out.push('\n');
                out.push_str(&expected.indent);
                out.push_str(&palette.label("Expected:"));
                out.push_str(&palette.body(&expected.text));
                out.push('\n');
                out.push_str(&actual.indent);
                out.push_str(&palette.label("Actual:"));
                out.push_str(&palette.body(&actual.text));
            }
            StatusNode::Error {
                indent,
                detail,
                trailing,
            } => {
                let (head, tail) = split_keyword(detail, "error.");
                out.push_str(indent);
                out.push_str(&palette.bad("["));
                out.push_str(&palette.bad("!!"));
                out.push_str(&palette.bad("]"));
                out.push_str(&palette.bad(head));
                out.push_str(&palette.bad("error."));
                out.push_str(tail);
                for line in trailing {
                    out.push('\n');
                    out.push_str(&palette.bad(line));
                }
            }
            StatusNode::Separator { line } => {
                out.push_str(&palette.separator(line));
            }
            StatusNode::Plain { line } => {
                out.push_str(line);
            }
        }
        out.push('\n');
    }

    out
}

/// Streaming per-test console output. All diagnostics stream in real time;
/// only the end-of-run summary is deferred to the formatters below.
pub trait Reporter {
    fn on_test_start(&self, relative_path: &str);
    fn on_totals(&self, line: &TotalsLine);
    fn on_failing_output(&self, raw: &str);
    fn on_no_totals(&self, raw: &str);
    fn on_warning(&self, message: &str);
}

pub struct ConsoleReporter {
    verbose: bool,
    output_format: OutputFormat,
    palette: Palette,
}

impl ConsoleReporter {
    pub fn new(verbose: bool, output_format: OutputFormat, palette: Palette) -> Self {
        Self {
            verbose,
            output_format,
            palette,
        }
    }

    fn is_json(&self) -> bool {
        self.output_format == OutputFormat::Json
    }
}

impl Reporter for ConsoleReporter {
    fn on_test_start(&self, relative_path: &str) {
        if self.is_json() {
            return;
        }
        println!("{}", relative_path);
    }

    fn on_totals(&self, line: &TotalsLine) {
        if self.is_json() {
            return;
        }
        if line.totals.is_clean() {
            println!("\t{}", line.text);
        } else {
            println!("\t{}", self.palette.bad(&line.text));
        }
    }

    fn on_failing_output(&self, raw: &str) {
        if self.is_json() || !self.verbose {
            return;
        }
        let nodes = scan_status(raw);
        print!("{}", render_status(&nodes, &self.palette));
    }

    fn on_no_totals(&self, raw: &str) {
        if self.is_json() {
            return;
        }
        println!(
            "\t{}",
            self.palette.bad("No totals returned by test! Full output:")
        );
        print!("{}", raw);
        if !raw.ends_with('\n') {
            println!();
        }
    }

    fn on_warning(&self, message: &str) {
        if self.is_json() {
            return;
        }
        eprintln!("{} {}", self.palette.warn_token("Warning:"), message);
    }
}

pub trait OutputFormatter {
    fn format(&self, output: &TestRunOutput) -> String;
}

pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format(&self, output: &TestRunOutput) -> String {
        serde_json::to_string_pretty(output).unwrap_or_else(|e| {
            // Use serde_json to properly escape the error message
            let escaped = serde_json::to_string(&e.to_string())
                .unwrap_or_else(|_| "\"serialization error\"".to_string());
            format!("{{\"error\": {}}}", escaped)
        })
    }
}

pub struct TextFormatter {
    pub palette: Palette,
}

impl OutputFormatter for TextFormatter {
    fn format(&self, output: &TestRunOutput) -> String {
        let mut result = String::new();

        let failing: Vec<&TestRecord> = output.failing_tests().collect();
        if !failing.is_empty() {
            result.push_str(&self.palette.bad("WARNING! There were failed tests:"));
            result.push('\n');
            for test in &failing {
                result.push_str(&format!(
                    "\t{:<30}  ({})\n",
                    test.file,
                    test.failure_clause()
                ));
            }
            result.push('\n');
        }

        let duration_secs = output.summary.duration_ms as f64 / 1000.0;
        if output.has_failures() {
            result.push_str(&format!(
                "{} Failed {}/{} tests in {:.2}s",
                self.palette.bad("✗"),
                output.summary.failed + output.summary.no_totals,
                output.summary.tests,
                duration_secs
            ));
        } else {
            result.push_str(&format!(
                "{} Passed {}/{} tests in {:.2}s",
                self.palette.good("✓"),
                output.summary.passed,
                output.summary.tests,
                duration_secs
            ));
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::scan_status;

    fn plain_palette() -> Palette {
        Palette::new(false)
    }

    fn record(file: &str, status: Status, totals: Option<Totals>) -> TestRecord {
        TestRecord {
            file: file.to_string(),
            log: format!("{}.log", file),
            status,
            totals,
        }
    }

    fn make_output(tests: Vec<TestRecord>) -> TestRunOutput {
        let passed = tests.iter().filter(|t| t.status == Status::Passed).count();
        let failed = tests.iter().filter(|t| t.status == Status::Failed).count();
        let no_totals = tests
            .iter()
            .filter(|t| t.status == Status::NoTotals)
            .count();
        let failures = tests
            .iter()
            .filter_map(|t| t.totals)
            .map(|t| t.failures)
            .sum();
        let errors = tests.iter().filter_map(|t| t.totals).map(|t| t.errors).sum();
        let summary = RunSummary {
            tests: tests.len(),
            passed,
            failed,
            no_totals,
            failures,
            errors,
            duration_ms: 0,
        };
        TestRunOutput { tests, summary }
    }

    #[test]
    fn test_failure_clause_single_failure() {
        assert_eq!(failure_clause(1, 0), "1 failure");
    }

    #[test]
    fn test_failure_clause_errors_only() {
        assert_eq!(failure_clause(0, 2), "2 errors");
    }

    #[test]
    fn test_failure_clause_both() {
        assert_eq!(failure_clause(2, 1), "2 failures, 1 error");
        assert_eq!(failure_clause(1, 3), "1 failure, 3 errors");
    }

    #[test]
    fn test_no_totals_clause() {
        let test = record("a.test.js", Status::NoTotals, None);
        assert_eq!(test.failure_clause(), "no totals");
    }

    #[test]
    fn test_has_failures_all_passing() {
        let output = make_output(vec![record(
            "a.test.js",
            Status::Passed,
            Some(Totals {
                total: 5,
                failures: 0,
                errors: 0,
            }),
        )]);
        assert!(!output.has_failures());
    }

    #[test]
    fn test_has_failures_with_failed_test() {
        let output = make_output(vec![record(
            "a.test.js",
            Status::Failed,
            Some(Totals {
                total: 3,
                failures: 1,
                errors: 2,
            }),
        )]);
        assert!(output.has_failures());
    }

    #[test]
    fn test_has_failures_with_missing_totals() {
        let output = make_output(vec![record("a.test.js", Status::NoTotals, None)]);
        assert!(output.has_failures());
    }

    #[test]
    fn test_has_failures_empty_run() {
        let output = make_output(vec![]);
        assert!(!output.has_failures());
    }

    #[test]
    fn test_text_formatter_lists_failing_tests() {
        let output = make_output(vec![
            record(
                "ok.test.js",
                Status::Passed,
                Some(Totals {
                    total: 2,
                    failures: 0,
                    errors: 0,
                }),
            ),
            record(
                "bad.test.js",
                Status::Failed,
                Some(Totals {
                    total: 3,
                    failures: 1,
                    errors: 2,
                }),
            ),
            record("silent.test.js", Status::NoTotals, None),
        ]);

        let formatter = TextFormatter {
            palette: plain_palette(),
        };
        let text = formatter.format(&output);
        assert!(text.contains("WARNING! There were failed tests:"));
        assert!(text.contains("(1 failure, 2 errors)"));
        assert!(text.contains("(no totals)"));
        assert!(!text.contains("ok.test.js"));
        assert!(text.contains("✗ Failed 2/3 tests"));
    }

    #[test]
    fn test_text_formatter_passing_run() {
        let output = make_output(vec![record(
            "ok.test.js",
            Status::Passed,
            Some(Totals {
                total: 2,
                failures: 0,
                errors: 0,
            }),
        )]);
        let formatter = TextFormatter {
            palette: plain_palette(),
        };
        let text = formatter.format(&output);
        assert!(!text.contains("WARNING"));
        assert!(text.contains("✓ Passed 1/1 tests"));
    }

    #[test]
    fn test_json_formatter_emits_valid_json() {
        let output = make_output(vec![
            record(
                "a.test.js",
                Status::Passed,
                Some(Totals {
                    total: 5,
                    failures: 0,
                    errors: 0,
                }),
            ),
            record("b.test.js", Status::NoTotals, None),
        ]);

        let json = JsonFormatter.format(&output);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["summary"]["tests"], 2);
        assert_eq!(parsed["summary"]["no_totals"], 1);
        assert_eq!(parsed["tests"][0]["status"], "passed");
        assert_eq!(parsed["tests"][0]["totals"]["total"], 5);
        assert_eq!(parsed["tests"][1]["status"], "no_totals");
    }

    #[test]
    fn test_render_without_color_reconstructs_input() {
        let input = "Testcase: template loader\n\
                     \x20 [OK] loads from disk passed\n\
                     \x20 [--] renders include failed.\n\
                     \x20 Expected: <p>hi</p>\n\
                     \x20 Actual: <p></p>\n\
                     \x20 [!!] recursive include error.\n\
                     RangeError: call stack exceeded\n\
                     ----\n\
                     some plain trailing line\n";
        let nodes = scan_status(input);
        let rendered = render_status(&nodes, &plain_palette());
        assert_eq!(rendered, input);
    }

    #[test]
    fn test_render_with_color_styles_markers() {
        let input = "  [!!] widget error.\nstack line\n";
        let nodes = scan_status(input);
        let rendered = render_status(&nodes, &Palette::new(true));
        assert!(rendered.contains("\x1b["));
        assert!(rendered.contains("error."));
        assert!(rendered.contains("stack line"));
    }

    #[test]
    fn test_render_plain_text_untouched_even_with_color() {
        let input = "nothing structured here\n";
        let nodes = scan_status(input);
        let rendered = render_status(&nodes, &Palette::new(true));
        assert_eq!(rendered, input);
    }
}
