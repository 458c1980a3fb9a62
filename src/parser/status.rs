//! Scanner for the structured status lines a test may print alongside its
//! totals: `Testcase:` headers, bracketed per-check markers and the `----`
//! separator. The scanner only feeds the styled re-rendering of failing
//! output; aggregate counts always come from the totals line.

/// A labelled single-content line inside a fail block (`Expected:` / `Actual:`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledLine {
    pub indent: String,
    /// Everything after the label, verbatim.
    pub text: String,
}

/// One recognized region of a test's captured output.
///
/// Variants hold the raw pieces of the region so a rendering pass can
/// reconstruct the input exactly when styling is disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusNode {
    /// `Testcase: <name>` header. `rest` is everything after the colon.
    Header { indent: String, rest: String },
    /// `[OK] ... passed` line. `detail` is everything after the closing bracket.
    Pass { indent: String, detail: String },
    /// `[--] ... failed.` line with its two label lines.
    Fail {
        indent: String,
        detail: String,
        expected: LabeledLine,
        actual: LabeledLine,
    },
    /// `[!!] ... error.` line plus the trailing context lines that follow it.
    Error {
        indent: String,
        detail: String,
        trailing: Vec<String>,
    },
    /// A bare line of exactly four hyphens.
    Separator { line: String },
    /// Anything the grammar does not recognize, passed through untouched.
    Plain { line: String },
}

impl StatusNode {
    /// Display name of a header, without the surrounding whitespace.
    pub fn header_name(&self) -> Option<&str> {
        match self {
            StatusNode::Header { rest, .. } => Some(rest.trim()),
            _ => None,
        }
    }
}

fn split_indent(line: &str) -> (&str, &str) {
    let start = line.len() - line.trim_start().len();
    line.split_at(start)
}

/// Trailing-context rule for error blocks: a line continues the block unless
/// it could begin a new region. Marker lines are indented or bracketed, and
/// the separator opens with two hyphens, so a continuation line is one whose
/// first character is neither a space nor `[`, and that does not start `--`.
fn is_trailing_context(line: &str) -> bool {
    let mut chars = line.chars();
    match chars.next() {
        Some('-') => chars.next().is_some_and(|c| c != '-'),
        Some(c) => c != ' ' && c != '[',
        None => false,
    }
}

fn labeled_line(line: Option<&&str>, label: &str) -> Option<LabeledLine> {
    let (indent, body) = split_indent(line?);
    let text = body.strip_prefix(label)?;
    Some(LabeledLine {
        indent: indent.to_string(),
        text: text.to_string(),
    })
}

/// Scans captured output top to bottom into a sequence of status nodes.
///
/// At each line the variants are attempted in fixed priority order: header,
/// error block, fail block, pass line, separator. A fail marker whose
/// `Expected:`/`Actual:` lines are missing degrades to plain text, as does
/// anything else the grammar does not recognize. The scan never fails.
pub fn scan_status(output: &str) -> Vec<StatusNode> {
    let lines: Vec<&str> = output.lines().collect();
    let mut nodes = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let (indent, body) = split_indent(line);

        if let Some(rest) = body.strip_prefix("Testcase:") {
            nodes.push(StatusNode::Header {
                indent: indent.to_string(),
                rest: rest.to_string(),
            });
            i += 1;
            continue;
        }

        if let Some(detail) = body
            .strip_prefix("[!!]")
            .filter(|d| d.trim_end().ends_with("error."))
        {
            let mut trailing = Vec::new();
            let mut next = i + 1;
            while next < lines.len() && is_trailing_context(lines[next]) {
                trailing.push(lines[next].to_string());
                next += 1;
            }
            nodes.push(StatusNode::Error {
                indent: indent.to_string(),
                detail: detail.to_string(),
                trailing,
            });
            i = next;
            continue;
        }

        if let Some(detail) = body
            .strip_prefix("[--]")
            .filter(|d| d.trim_end().ends_with("failed."))
        {
            let expected = labeled_line(lines.get(i + 1), "Expected:");
            let actual = labeled_line(lines.get(i + 2), "Actual:");
            if let (Some(expected), Some(actual)) = (expected, actual) {
                nodes.push(StatusNode::Fail {
                    indent: indent.to_string(),
                    detail: detail.to_string(),
                    expected,
                    actual,
                });
                i += 3;
                continue;
            }
        }

        if let Some(detail) = body
            .strip_prefix("[OK]")
            .filter(|d| d.trim_end().ends_with("passed"))
        {
            nodes.push(StatusNode::Pass {
                indent: indent.to_string(),
                detail: detail.to_string(),
            });
            i += 1;
            continue;
        }

        if line.trim() == "----" {
            nodes.push(StatusNode::Separator {
                line: line.to_string(),
            });
            i += 1;
            continue;
        }

        nodes.push(StatusNode::Plain {
            line: line.to_string(),
        });
        i += 1;
    }

    nodes
}
