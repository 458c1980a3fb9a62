use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Aggregate counts reported by a single test process on its totals line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub total: u64,
    pub failures: u64,
    pub errors: u64,
}

impl Totals {
    pub fn is_clean(&self) -> bool {
        self.failures == 0 && self.errors == 0
    }
}

/// The totals line as it appeared in the captured output, plus its parsed counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalsLine {
    pub totals: Totals,
    /// The matched line, trimmed, kept for display.
    pub text: String,
}

fn totals_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?im)^\s*Total:\s*(\d+),\s*Failures:\s*(\d+),\s*Errors:\s*(\d+)\s*$")
            .expect("totals regex is valid")
    })
}

/// Extracts the first totals line from captured test output.
///
/// Returns `None` when the text contains no totals line anywhere; that is a
/// reportable per-test outcome, not an error. The keywords match
/// case-insensitively and surrounding whitespace is ignored.
pub fn parse_totals(output: &str) -> Option<TotalsLine> {
    for caps in totals_re().captures_iter(output) {
        let parsed = (
            caps[1].parse::<u64>(),
            caps[2].parse::<u64>(),
            caps[3].parse::<u64>(),
        );
        if let (Ok(total), Ok(failures), Ok(errors)) = parsed {
            return Some(TotalsLine {
                totals: Totals {
                    total,
                    failures,
                    errors,
                },
                text: caps[0].trim().to_string(),
            });
        }
        // A count too large for u64 is treated as no match for that line.
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_totals_line() {
        let line = parse_totals("Total: 5, Failures: 0, Errors: 0\n").unwrap();
        assert_eq!(
            line.totals,
            Totals {
                total: 5,
                failures: 0,
                errors: 0
            }
        );
        assert_eq!(line.text, "Total: 5, Failures: 0, Errors: 0");
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let line = parse_totals("TOTAL: 3, failures: 1, ErRoRs: 2\n").unwrap();
        assert_eq!(
            line.totals,
            Totals {
                total: 3,
                failures: 1,
                errors: 2
            }
        );
    }

    #[test]
    fn test_parse_ignores_surrounding_whitespace() {
        let line = parse_totals("   Total: 12,   Failures: 4,\tErrors: 1   \n").unwrap();
        assert_eq!(
            line.totals,
            Totals {
                total: 12,
                failures: 4,
                errors: 1
            }
        );
        assert_eq!(line.text, "Total: 12,   Failures: 4,\tErrors: 1");
    }

    #[test]
    fn test_parse_skips_surrounding_noise() {
        let output = "starting up\nsome log line\nTotal: 7, Failures: 2, Errors: 0\ngoodbye\n";
        let line = parse_totals(output).unwrap();
        assert_eq!(line.totals.total, 7);
        assert_eq!(line.totals.failures, 2);
    }

    #[test]
    fn test_first_match_wins() {
        let output = "Total: 1, Failures: 0, Errors: 0\nTotal: 9, Failures: 9, Errors: 9\n";
        let line = parse_totals(output).unwrap();
        assert_eq!(line.totals.total, 1);
        assert!(line.totals.is_clean());
    }

    #[test]
    fn test_no_totals_line_yields_none() {
        assert_eq!(parse_totals(""), None);
        assert_eq!(parse_totals("all went fine, trust me\n"), None);
        assert_eq!(parse_totals("Totals: 5, Failures: 0, Errors: 0\n"), None);
    }

    #[test]
    fn test_line_must_match_fully() {
        // Trailing junk after the counts disqualifies the line.
        assert_eq!(
            parse_totals("Total: 5, Failures: 0, Errors: 0 and then some\n"),
            None
        );
        assert_eq!(
            parse_totals("prefix Total: 5, Failures: 0, Errors: 0\n"),
            None
        );
    }

    #[test]
    fn test_overflowing_count_is_not_a_match() {
        let output = "Total: 99999999999999999999999999, Failures: 0, Errors: 0\n";
        assert_eq!(parse_totals(output), None);
    }

    #[test]
    fn test_overflow_line_does_not_shadow_later_match() {
        let output = "Total: 99999999999999999999999999, Failures: 0, Errors: 0\n\
                      Total: 2, Failures: 1, Errors: 0\n";
        let line = parse_totals(output).unwrap();
        assert_eq!(line.totals.total, 2);
    }

    #[test]
    fn test_is_clean() {
        let clean = Totals {
            total: 4,
            failures: 0,
            errors: 0,
        };
        let failing = Totals {
            total: 4,
            failures: 1,
            errors: 0,
        };
        let erroring = Totals {
            total: 4,
            failures: 0,
            errors: 3,
        };
        assert!(clean.is_clean());
        assert!(!failing.is_clean());
        assert!(!erroring.is_clean());
    }
}
