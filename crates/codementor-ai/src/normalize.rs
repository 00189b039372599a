//! Response normalization.
//!
//! Raw completions are free text. Each mode has its own cleanup pass that
//! turns them into the artifact shape the caller expects. All functions here
//! are pure.

use std::sync::OnceLock;

use regex::Regex;

use crate::leakage::LeakageRules;
use crate::mode::Mode;
use crate::prompt::CONTINUE_MARKER;

/// Limitation line used when a model forgets to state one.
pub const GENERIC_LIMITATION: &str =
    "Limitation: May fail if inputs do not match the expected format.";

/// Explanation returned when mentor cleanup leaves nothing.
pub const MENTOR_FALLBACK: &str = "Step 1: Describe the main idea of the algorithm.
Step 2: Explain how the data is processed step by step.
Step 3: Highlight how edge cases or special conditions are handled.

Limitation: May fail if inputs do not match the expected format.";

pub const PYTHON_END_MARKER: &str = "# END";
pub const C_FAMILY_END_MARKER: &str = "// END";

const ROLE_LABELS: [&str; 3] = ["answer:", "explanation:", "response:"];
const C_FAMILY: [&str; 4] = ["javascript", "java", "c++", "c"];

macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).expect("invalid built-in regex"))
        }
    };
}

static_regex!(latex_code_block, r"(?i)\\begin\{code\}[\s\S]*?\\end\{code\}");
static_regex!(fenced_code_block, r"```[\s\S]*?```");
static_regex!(step_start, r"(?im)(Step\s*1|^\s*1\.)");
static_regex!(limitation_label, r"(?im)^[ \t]*limitation[ \t]*:");
static_regex!(blank_line_run, r"\n{3,}");
static_regex!(horizontal_space_run, r"[ \t]{2,}");
static_regex!(end_marker_word, r"\b(BEGIN|END)\b");

/// Mode-aware cleanup of raw completions.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    rules: LeakageRules,
}

impl Normalizer {
    pub fn new(rules: LeakageRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &LeakageRules {
        &self.rules
    }

    /// Normalize a raw completion for the given mode.
    pub fn normalize(&self, mode: Mode, language: &str, raw: &str) -> String {
        match mode {
            Mode::Generate => raw.trim().to_string(),
            Mode::Autocomplete => clean_autocomplete(raw),
            Mode::Explain => self.clean_mentor(raw),
            Mode::RegenerateCode => self.clean_code_only(raw, language),
        }
    }

    /// Shape a mentor explanation: numbered steps and one limitation line,
    /// no code, no leaked fragments.
    ///
    /// Cleanup repeats until the text stops changing, so removing one
    /// fragment cannot leave a new one behind.
    pub fn clean_mentor(&self, raw: &str) -> String {
        let mut result = raw.replace("\r\n", "\n").replace('\r', "\n");
        loop {
            let next = self.mentor_pass(&result);
            if next == result {
                break;
            }
            result = next;
        }

        if result.is_empty() {
            return MENTOR_FALLBACK.to_string();
        }
        if !has_limitation(&result) {
            result.push_str("\n\n");
            result.push_str(GENERIC_LIMITATION);
        }
        result
    }

    /// One round of mentor cleanup. Each step only removes text or fixes the
    /// case of a label.
    fn mentor_pass(&self, text: &str) -> String {
        let mut result = latex_code_block().replace_all(text, "").into_owned();
        result = fenced_code_block().replace_all(&result, "").into_owned();
        // An unterminated fence swallows the rest of the text.
        if let Some(pos) = result.find("```") {
            result.truncate(pos);
        }

        result = self.rules.scrub_text(&result);
        result = strip_role_labels(result.trim()).to_string();

        if let Some(m) = step_start().find(&result) {
            result = result[m.start()..].to_string();
        }

        result = limitation_label()
            .replace_all(&result, "Limitation:")
            .into_owned();
        result = keep_first_limitation(&result);

        result = blank_line_run().replace_all(&result, "\n\n").into_owned();
        horizontal_space_run()
            .replace_all(result.trim(), " ")
            .into_owned()
    }

    /// Shape a code-only answer: code lines only, a single definition header,
    /// and the language's end marker.
    pub fn clean_code_only(&self, raw: &str, language: &str) -> String {
        let language = language.trim().to_ascii_lowercase();

        let source = if raw.trim().is_empty() {
            placeholder(&language).unwrap_or("")
        } else {
            raw
        };

        let mut lines: Vec<&str> = Vec::new();
        let mut definition_started = false;

        for line in source.lines() {
            let Some(line) = cut_end_marker(line) else {
                continue;
            };
            let trimmed = line.trim();
            if trimmed.starts_with('#') && !trimmed.starts_with("#!") {
                continue;
            }
            if self.rules.leaks_line(line) {
                continue;
            }
            if is_definition_header(line) {
                if definition_started {
                    continue;
                }
                definition_started = true;
            }
            lines.push(line);
        }

        let body = lines.join("\n");
        append_end_marker(&language, body.trim())
    }
}

/// Keep only what follows the last continuation marker.
pub fn clean_autocomplete(raw: &str) -> String {
    match raw.rfind(CONTINUE_MARKER) {
        Some(pos) => raw[pos + CONTINUE_MARKER.len()..].trim().to_string(),
        None => raw.trim().to_string(),
    }
}

/// Whether a normalized code answer carries nothing but its end marker.
pub fn is_bare_end_marker(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed == PYTHON_END_MARKER || trimmed == C_FAMILY_END_MARKER
}

/// Minimal function returned for blank completions in known languages.
fn placeholder(language: &str) -> Option<&'static str> {
    match language {
        "python" => Some("def placeholder():\n    pass\n# END"),
        "javascript" => Some("function placeholder() {}\n// END"),
        _ => None,
    }
}

fn strip_role_labels(mut text: &str) -> &str {
    loop {
        let lower = text.to_ascii_lowercase();
        match ROLE_LABELS.iter().find(|label| lower.starts_with(*label)) {
            Some(label) => text = text[label.len()..].trim_start(),
            None => return text,
        }
    }
}

fn has_limitation(text: &str) -> bool {
    text.lines()
        .any(|line| line.trim_start().starts_with("Limitation:"))
}

fn keep_first_limitation(text: &str) -> String {
    let mut seen = false;
    text.lines()
        .filter(|line| {
            if line.trim_start().starts_with("Limitation:") {
                if seen {
                    return false;
                }
                seen = true;
            }
            true
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Handle a `BEGIN`/`END` marker word on a line.
///
/// A marker trailing a finished statement or block (`}`, `;` or `)`) is cut
/// off along with everything after it. Any other line carrying a marker,
/// including one inside a string or comment, is dropped.
fn cut_end_marker(line: &str) -> Option<&str> {
    let Some(m) = end_marker_word().find(line) else {
        return Some(line);
    };
    let before = &line[..m.start()];
    if marker_is_quoted(before) {
        return None;
    }
    let kept = before.trim_end();
    if kept.ends_with(&['}', ';', ')'][..]) {
        Some(kept)
    } else {
        None
    }
}

/// Whether text ending just before a marker leaves it inside a string
/// literal or a comment.
fn marker_is_quoted(before: &str) -> bool {
    let mut chars = before.chars().peekable();
    let mut quote: Option<char> = None;
    let mut block_comment = false;

    while let Some(c) = chars.next() {
        if block_comment {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                block_comment = false;
            }
            continue;
        }
        if let Some(q) = quote {
            if c == '\\' {
                chars.next();
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '#' => return true,
            '/' if chars.peek() == Some(&'/') => return true,
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                block_comment = true;
            }
            _ => {}
        }
    }
    quote.is_some() || block_comment
}

fn is_definition_header(line: &str) -> bool {
    line.contains("function ") || line.trim_start().starts_with("def ")
}

fn append_end_marker(language: &str, body: &str) -> String {
    if language == "python" {
        format!("{}\n{}", body.trim_end(), PYTHON_END_MARKER)
    } else if C_FAMILY.contains(&language) {
        match body.rfind('}') {
            Some(pos) => format!("{}\n{}", &body[..=pos], C_FAMILY_END_MARKER),
            None => format!("{}\n{}", body, C_FAMILY_END_MARKER),
        }
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> Normalizer {
        Normalizer::default()
    }

    #[test]
    fn test_mentor_strips_label() {
        let raw = "answer: Step 1: does X\nStep 2: does Y\nLimitation: fails on empty input";
        let out = normalizer().clean_mentor(raw);
        assert!(out.starts_with("Step 1: does X"));
        let limitations = out
            .lines()
            .filter(|l| l.starts_with("Limitation:"))
            .count();
        assert_eq!(limitations, 1);
    }

    #[test]
    fn test_mentor_empty_uses_fallback() {
        assert_eq!(normalizer().clean_mentor(""), MENTOR_FALLBACK);
        assert_eq!(normalizer().clean_mentor("  \n\n "), MENTOR_FALLBACK);
        assert_eq!(normalizer().clean_mentor("```python\nprint(1)\n```"), MENTOR_FALLBACK);
        assert!(MENTOR_FALLBACK
            .ends_with("Limitation: May fail if inputs do not match the expected format."));
    }

    #[test]
    fn test_mentor_drops_code_blocks() {
        let raw = concat!(
            "Step 1: Loops.\n```python\nfor i in x:\n    pass\n```\n",
            "Step 2: Returns.\n\\begin{code}\nx\n\\end{code}\nLimitation: none",
        );
        let out = normalizer().clean_mentor(raw);
        assert!(!out.contains("```"));
        assert!(!out.contains("begin{code}"));
        assert!(!out.contains("for i in x"));
        assert!(out.contains("Step 2: Returns."));
    }

    #[test]
    fn test_mentor_unterminated_fence() {
        let out = normalizer().clean_mentor("Step 1: a\n```js\nconsole.log(1)");
        assert!(!out.contains("```"));
        assert!(!out.contains("console.log"));
    }

    #[test]
    fn test_mentor_drops_preamble() {
        let raw = "Sure! Here is what I think.\n\n1. Reads input\n2. Prints it\nlimitation: slow";
        let out = normalizer().clean_mentor(raw);
        assert!(out.starts_with("1. Reads input"));
        assert!(out.ends_with("Limitation: slow"));
    }

    #[test]
    fn test_mentor_whitespace_collapse() {
        let raw = "Step 1:   spaced\t\tout\n\n\n\n\nStep 2: next\nLimitation: x";
        let out = normalizer().clean_mentor(raw);
        assert_eq!(out, "Step 1: spaced out\n\nStep 2: next\nLimitation: x");
    }

    #[test]
    fn test_mentor_single_limitation() {
        let raw = "Step 1: a\nLIMITATION: first\nStep 2: b\nLimitation: second";
        let out = normalizer().clean_mentor(raw);
        assert_eq!(out, "Step 1: a\nLimitation: first\nStep 2: b");
    }

    #[test]
    fn test_mentor_missing_limitation_is_added() {
        let out = normalizer().clean_mentor("Step 1: a\nStep 2: b");
        assert_eq!(out, format!("Step 1: a\nStep 2: b\n\n{}", GENERIC_LIMITATION));
    }

    #[test]
    fn test_mentor_scrubs_leakage() {
        let raw = "Step 1: Uses llama_cpp to import os quickly.\nLimitation: x";
        let out = normalizer().clean_mentor(raw);
        assert!(!out.contains("llama_cpp"));
        assert!(!out.contains("import os"));
        assert!(out.starts_with("Step 1: Uses to quickly."));
    }

    #[test]
    fn test_mentor_scrub_repeats_until_clean() {
        let out = normalizer().clean_mentor("Step 1: uses import import os os here");
        assert!(out.starts_with("Step 1: uses here"));

        let out = normalizer().clean_mentor("Step 1: a ``import os` b\nLimitation: x");
        assert!(!out.contains("```"));
        assert!(out.starts_with("Step 1: a"));
    }

    #[test]
    fn test_mentor_idempotent_on_generated_inputs() {
        const FRAGMENTS: [&str; 34] = [
            "answer:",
            "Response: ",
            "explanation:",
            "Sure!",
            "Step 1:",
            "Step 2:",
            "1.",
            " a",
            "x",
            "import",
            "os",
            " import os ",
            "llama_cpp",
            "traceback",
            "def _load_model",
            "# User browser tabs metadata",
            "edge_all_open_tabs = [",
            "]",
            "`",
            "``",
            "```",
            "\\begin{code}",
            "\\end{code}",
            "limitation:",
            "Limitation: y",
            "LIMITATION :",
            "\n",
            "\n\n\n",
            "  ",
            "\t",
            "\r\n",
            "\r",
            " ",
            "}",
        ];

        // xorshift, so the inputs are the same on every run
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };

        let n = normalizer();
        for _ in 0..5000 {
            let len = (next() % 8) as usize + 1;
            let raw: String = (0..len)
                .map(|_| FRAGMENTS[(next() % FRAGMENTS.len() as u64) as usize])
                .collect();

            let once = n.clean_mentor(&raw);
            assert_eq!(n.clean_mentor(&once), once, "not idempotent for {:?}", raw);
            assert!(!once.contains("```"), "fence left for {:?}", raw);
            let limitations = once
                .lines()
                .filter(|l| l.trim_start().starts_with("Limitation:"))
                .count();
            assert_eq!(limitations, 1, "limitations for {:?}", raw);
        }
    }

    #[test]
    fn test_code_only_python_end_marker() {
        let raw = "# helper\ndef add(a, b):\n    return a + b\n# END";
        let out = normalizer().clean_code_only(raw, "python");
        assert_eq!(out, "def add(a, b):\n    return a + b\n# END");
    }

    #[test]
    fn test_code_only_keeps_shebang() {
        let out = normalizer().clean_code_only("#!/usr/bin/env python\nprint(1)", "Python");
        assert_eq!(out, "#!/usr/bin/env python\nprint(1)\n# END");
    }

    #[test]
    fn test_code_only_second_definition_dropped() {
        let raw = "def a():\n    return 1\ndef b():\n    return 2";
        let out = normalizer().clean_code_only(raw, "python");
        assert_eq!(out, "def a():\n    return 1\n    return 2\n# END");
    }

    #[test]
    fn test_code_only_drops_leaked_lines() {
        let raw = "function f() {\n  // User tabs\n  return 1;\n}\nextra text";
        let out = normalizer().clean_code_only(raw, "javascript");
        assert_eq!(out, "function f() {\n  return 1;\n}\n// END");
    }

    #[test]
    fn test_code_only_begin_marker_cut() {
        let out =
            normalizer().clean_code_only("function foo(){return 1;} BEGIN extra", "javascript");
        assert!(!out.contains("BEGIN"));
        assert!(out.ends_with("}\n// END"));
        assert_eq!(out, "function foo(){return 1;}\n// END");
    }

    #[test]
    fn test_code_only_marker_identifiers_drop_line() {
        let raw = "const END = 5;\nfunction f() {\n  return END;\n}";
        let out = normalizer().clean_code_only(raw, "javascript");
        assert_eq!(out, "function f() {\n}\n// END");
    }

    #[test]
    fn test_code_only_marker_in_string_drops_line() {
        let raw = "def banner():\n    print(\"BEGIN\")\n    return 1";
        let out = normalizer().clean_code_only(raw, "python");
        assert_eq!(out, "def banner():\n    return 1\n# END");
    }

    #[test]
    fn test_code_only_marker_in_comment_drops_line() {
        let raw = "int y = 2;\nint x; /* END */\nfoo(); // BEGIN here";
        let out = normalizer().clean_code_only(raw, "c");
        assert_eq!(out, "int y = 2;\n// END");
    }

    #[test]
    fn test_code_only_trailing_marker_after_statement() {
        let out = normalizer().clean_code_only("x = compute(1) END", "python");
        assert_eq!(out, "x = compute(1)\n# END");
        // The first marker sits inside the string, so the line goes.
        let out = normalizer().clean_code_only("let a = \"END\"; END", "javascript");
        assert_eq!(out, "\n// END");
    }

    #[test]
    fn test_marker_quoting() {
        assert!(marker_is_quoted("print(\""));
        assert!(marker_is_quoted("x = 'it\\'s "));
        assert!(marker_is_quoted("int x; /* "));
        assert!(marker_is_quoted("foo(); // "));
        assert!(!marker_is_quoted("a = \"done\"; /* c */ "));
        assert!(!marker_is_quoted("function foo(){return 1;} "));
    }

    #[test]
    fn test_code_only_marker_lines_removed() {
        let raw = "BEGIN\nint main() { return 0; }\n// END";
        let out = normalizer().clean_code_only(raw, "c");
        assert_eq!(out, "int main() { return 0; }\n// END");
    }

    #[test]
    fn test_code_only_c_family_without_brace() {
        let out = normalizer().clean_code_only("x = 1;", "java");
        assert_eq!(out, "x = 1;\n// END");
    }

    #[test]
    fn test_code_only_blank_placeholders() {
        let n = normalizer();
        assert_eq!(n.clean_code_only("", "python"), "def placeholder():\n    pass\n# END");
        assert_eq!(n.clean_code_only("  ", "javascript"), "function placeholder() {}\n// END");
        assert_eq!(n.clean_code_only("", "rust"), "");
    }

    #[test]
    fn test_code_only_unknown_language_untouched() {
        let out = normalizer().clean_code_only("fn main() {}\n", "rust");
        assert_eq!(out, "fn main() {}");
    }

    #[test]
    fn test_code_only_python_always_ends_with_marker() {
        let n = normalizer();
        for raw in ["x = 1", "# only comment", "def f():\n  pass\n\n\n", "BEGIN\nEND"] {
            assert!(n.clean_code_only(raw, "python").ends_with("\n# END"));
        }
    }

    #[test]
    fn test_autocomplete_after_last_marker() {
        let raw = "# Language: python\ncode\n# CONTINUE:\n  x = 1";
        assert_eq!(clean_autocomplete(raw), "x = 1");
        assert_eq!(clean_autocomplete("a # CONTINUE: b # CONTINUE: c "), "c");
        assert_eq!(clean_autocomplete("  return x\n"), "return x");
    }

    #[test]
    fn test_generate_is_trimmed() {
        let out = normalizer().normalize(Mode::Generate, "python", "\n def f(): pass \n");
        assert_eq!(out, "def f(): pass");
    }

    #[test]
    fn test_bare_end_marker() {
        assert!(is_bare_end_marker("\n# END"));
        assert!(is_bare_end_marker("\n// END"));
        assert!(!is_bare_end_marker("x\n# END"));
    }
}
