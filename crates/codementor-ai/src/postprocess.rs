//! Helpers for tidying and comparing generated code.

use similar::TextDiff;

/// Lines of unchanged context around each diff hunk.
const DIFF_CONTEXT: usize = 3;

/// Drop repeated `#` comment lines, keeping the first occurrence of each.
pub fn remove_duplicate_comments(code: &str) -> String {
    let mut seen: Vec<&str> = Vec::new();
    code.lines()
        .filter(|line| {
            let s = line.trim();
            if !s.starts_with('#') {
                return true;
            }
            if seen.contains(&s) {
                false
            } else {
                seen.push(s);
                true
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove the leading whitespace shared by every non-blank line.
///
/// Whitespace-only lines become empty.
pub fn normalize_indentation(code: &str) -> String {
    let margin = code
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| &line[..line.len() - line.trim_start().len()])
        .reduce(common_prefix)
        .unwrap_or("");

    let mut result = code
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                ""
            } else {
                &line[margin.len()..]
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    if code.ends_with('\n') {
        result.push('\n');
    }
    result
}

fn common_prefix<'a>(a: &'a str, b: &'a str) -> &'a str {
    let len = a
        .char_indices()
        .zip(b.chars())
        .take_while(|((_, x), y)| x == y)
        .last()
        .map(|((i, c), _)| i + c.len_utf8())
        .unwrap_or(0);
    &a[..len]
}

/// Unified diff between two versions of a snippet.
///
/// Returns an empty string when both versions are identical.
pub fn compare_versions(original: &str, refactored: &str) -> String {
    let diff = TextDiff::from_lines(original, refactored);
    diff.unified_diff()
        .context_radius(DIFF_CONTEXT)
        .missing_newline_hint(false)
        .header("original.py", "refactored.py")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_duplicate_comments() {
        let code = "# sum\nx = 1\n  # sum\n# other\ny = 2\n# other";
        assert_eq!(
            remove_duplicate_comments(code),
            "# sum\nx = 1\n# other\ny = 2"
        );
    }

    #[test]
    fn test_normalize_indentation() {
        let code = "    def f():\n        return 1\n  \n    f()\n";
        assert_eq!(
            normalize_indentation(code),
            "def f():\n    return 1\n\nf()\n"
        );
    }

    #[test]
    fn test_normalize_indentation_mixed_margin() {
        assert_eq!(normalize_indentation("\tx\n  y"), "\tx\n  y");
        assert_eq!(normalize_indentation(""), "");
    }

    #[test]
    fn test_compare_identical() {
        assert_eq!(compare_versions("a\nb", "a\nb"), "");
    }

    #[test]
    fn test_compare_single_change() {
        let diff = compare_versions("a\nb\nc", "a\nB\nc");
        assert_eq!(
            diff,
            "--- original.py\n+++ refactored.py\n@@ -1,3 +1,3 @@\n a\n-b\n+B\n c\n"
        );
    }

    #[test]
    fn test_compare_insert_into_empty() {
        let diff = compare_versions("", "x");
        assert_eq!(diff, "--- original.py\n+++ refactored.py\n@@ -0,0 +1 @@\n+x\n");
    }

    #[test]
    fn test_compare_distant_changes_split_hunks() {
        let old: Vec<String> = (0..20).map(|i| format!("line{}", i)).collect();
        let mut new = old.clone();
        new[1] = "changed1".to_string();
        new[18] = "changed18".to_string();
        let diff = compare_versions(&old.join("\n"), &new.join("\n"));
        assert_eq!(diff.matches("@@ -").count(), 2);
        assert!(diff.contains("-line1\n+changed1"));
        assert!(diff.contains("-line18\n+changed18"));
    }

    #[test]
    fn test_compare_large_inputs() {
        let old: Vec<String> = (0..6000).map(|i| format!("value_{} = {}", i, i)).collect();
        let mut new = old.clone();
        new[10] = "value_10 = -1".to_string();
        new.remove(3000);
        new.push("tail = True".to_string());

        let diff = compare_versions(&old.join("\n"), &new.join("\n"));
        assert_eq!(diff.matches("@@ -").count(), 3);
        assert!(diff.contains("-value_10 = 10\n+value_10 = -1\n"));
        assert!(diff.contains("-value_3000 = 3000\n"));
        assert!(diff.ends_with("+tail = True\n"));
    }
}
