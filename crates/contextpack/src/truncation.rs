/// The largest byte index `<= idx` that lands on a UTF-8 char boundary of
/// `s`. A stable-safe stand-in for the nightly-only `str::floor_char_boundary`.
fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// A text block being accumulated for total-cap processing — one HUD
/// section, tool output, or conversation record rendering.
pub struct Block {
    pub label: String,
    pub content: String,
    pub raw_chars: usize,
    pub truncated_per_block: bool,
    pub truncated_total_cap: bool,
    pub included: bool,
}

/// Per-block truncation.
///
/// If `content` exceeds `max_chars`, truncate to the first `max_chars`
/// characters (at a valid UTF-8 boundary) and append `\n\n[TRUNCATED]\n`.
pub fn truncate_per_block(content: &str, max_chars: usize) -> (String, bool) {
    if content.len() <= max_chars {
        return (content.to_string(), false);
    }
    let boundary = floor_char_boundary(content, max_chars);
    let mut result = content[..boundary].to_string();
    result.push_str("\n\n[TRUNCATED]\n");
    (result, true)
}

/// Apply a total cap across accumulated blocks in order, so that once the
/// running total is exhausted, later blocks are truncated and then dropped
/// rather than silently reordered.
pub fn apply_total_cap(blocks: &mut [Block], total_max_chars: usize) {
    let mut accumulated: usize = 0;

    for block in blocks.iter_mut() {
        if !block.included {
            continue;
        }

        let block_len = block.content.len();

        if accumulated + block_len <= total_max_chars {
            accumulated += block_len;
        } else if accumulated < total_max_chars {
            let remaining = total_max_chars - accumulated;
            let boundary = floor_char_boundary(&block.content, remaining);
            block.content = format!(
                "{}\n\n[TRUNCATED_TOTAL_CAP]\n",
                &block.content[..boundary]
            );
            block.truncated_total_cap = true;
            accumulated = total_max_chars;
        } else {
            block.content.clear();
            block.included = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_truncation_when_under_limit() {
        let (result, truncated) = truncate_per_block("hello world", 100);
        assert_eq!(result, "hello world");
        assert!(!truncated);
    }

    #[test]
    fn truncates_at_limit() {
        let content = "abcdefghij";
        let (result, truncated) = truncate_per_block(content, 5);
        assert!(truncated);
        assert!(result.starts_with("abcde"));
        assert!(result.contains("[TRUNCATED]"));
    }

    #[test]
    fn total_cap_excludes_overflow() {
        let mut blocks = vec![
            Block {
                label: "a".into(),
                content: "aaaa".into(),
                raw_chars: 4,
                truncated_per_block: false,
                truncated_total_cap: false,
                included: true,
            },
            Block {
                label: "b".into(),
                content: "bbbbbb".into(),
                raw_chars: 6,
                truncated_per_block: false,
                truncated_total_cap: false,
                included: true,
            },
            Block {
                label: "c".into(),
                content: "cccc".into(),
                raw_chars: 4,
                truncated_per_block: false,
                truncated_total_cap: false,
                included: true,
            },
        ];

        apply_total_cap(&mut blocks, 8);

        assert!(blocks[0].included);
        assert!(!blocks[0].truncated_total_cap);
        assert!(blocks[1].included);
        assert!(blocks[1].truncated_total_cap);
        assert!(!blocks[2].included);
    }
}
