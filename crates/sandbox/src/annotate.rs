//! Renders a code snippet with per-line markers for inclusion in the
//! follow-up model turn after an execution error.

/// Source name attributed to every compiled snippet so a traceback's
/// frame always points back here, regardless of which agent generated it.
pub const AGENT_GENERATED_CODE_SENTINEL: &str = "<agent_generated_code>";

/// Annotate `code` with one marker line per source line: an error
/// indicator, the 1-based line number, the line's byte length, and its
/// content. `error_line` (1-based) receives the indicator when present.
pub fn annotate_code(code: &str, error_line: Option<usize>) -> String {
    code.lines()
        .enumerate()
        .map(|(i, line)| {
            let line_no = i + 1;
            let marker = if Some(line_no) == error_line { ">>" } else { "  " };
            format!("{marker} {line_no:>4} {:>4} | {line}", line.len())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_the_failing_line() {
        let code = "let x = 1;\nlet y = x / 0;\nprint(y);";
        let annotated = annotate_code(code, Some(2));
        let lines: Vec<&str> = annotated.lines().collect();
        assert!(lines[0].starts_with("  "));
        assert!(lines[1].starts_with(">>"));
        assert!(lines[1].contains("let y = x / 0;"));
    }

    #[test]
    fn no_error_line_marks_nothing() {
        let code = "let x = 1;\nlet y = 2;";
        let annotated = annotate_code(code, None);
        assert!(annotated.lines().all(|l| l.starts_with("  ")));
    }

    #[test]
    fn records_byte_length_per_line() {
        let code = "abc";
        let annotated = annotate_code(code, None);
        assert!(annotated.contains("   3 | abc"));
    }
}
