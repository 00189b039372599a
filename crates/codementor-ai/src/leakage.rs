//! Leakage scrubbing rules.
//!
//! Models sometimes echo fragments of their prompt or of unrelated training
//! data (internal helper names, import lines, library names). These are
//! removed by an ordered list of rules that can be extended from a JSON file
//! without touching the normalizer.
//!
//! ```json
//! {
//!   "replace_defaults": false,
//!   "rules": [
//!     { "id": "secret-helper", "pattern": "\\b_private_helper\\b", "scope": "text" },
//!     { "id": "debug-print", "pattern": "DEBUG", "scope": "line", "case_insensitive": false }
//!   ]
//! }
//! ```

use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Where a rule is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleScope {
    /// Matches are cut out of mentor explanations.
    Text,
    /// Lines of code-only answers that match are dropped whole.
    Line,
}

/// A single leakage rule as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeakageRule {
    pub id: String,
    /// Regex pattern to match.
    pub pattern: String,
    pub scope: RuleScope,
    #[serde(default = "default_case_insensitive")]
    pub case_insensitive: bool,
}

fn default_case_insensitive() -> bool {
    true
}

impl LeakageRule {
    pub fn text(id: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pattern: pattern.into(),
            scope: RuleScope::Text,
            case_insensitive: true,
        }
    }

    /// Line rules match case-sensitively.
    pub fn line(id: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pattern: pattern.into(),
            scope: RuleScope::Line,
            case_insensitive: false,
        }
    }

    fn compile(&self) -> Result<Regex, ConfigError> {
        RegexBuilder::new(&self.pattern)
            .case_insensitive(self.case_insensitive)
            .build()
            .map_err(|source| ConfigError::InvalidPattern {
                id: self.id.clone(),
                source,
            })
    }
}

/// On-disk shape of a rule file.
#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    replace_defaults: bool,
    rules: Vec<LeakageRule>,
}

/// Built-in rules.
pub fn default_rules() -> Vec<LeakageRule> {
    vec![
        LeakageRule::text("open-tabs-dump", r"edge_all_open_tabs\s*=\s*\[[\s\S]*?\]"),
        LeakageRule::text("browser-tabs-comment", r"#\s*User.*browser.*tabs.*metadata.*"),
        LeakageRule::text("model-loader", r"\bdef\s+_load_model\b"),
        LeakageRule::text("llama-cpp", r"\bllama_cpp\b"),
        LeakageRule::text("import-os", r"\bimport\s+os\b"),
        LeakageRule::text("traceback", r"\btraceback\b"),
        LeakageRule::line("open-tabs-line", "edge_all_open_tabs"),
        LeakageRule::line("user-line", "User"),
    ]
}

/// Ordered, compiled rule set.
#[derive(Debug, Clone)]
pub struct LeakageRules {
    rules: Vec<(LeakageRule, Regex)>,
}

impl LeakageRules {
    /// Compile rules in the given order.
    pub fn new(rules: Vec<LeakageRule>) -> Result<Self, ConfigError> {
        let rules = rules
            .into_iter()
            .map(|rule| {
                let regex = rule.compile()?;
                Ok((rule, regex))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Self { rules })
    }

    /// Parse a rule file. Its rules run after the defaults unless
    /// `replace_defaults` is set.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let file: RuleFile = serde_json::from_str(json)?;
        let mut rules = if file.replace_defaults {
            Vec::new()
        } else {
            default_rules()
        };
        rules.extend(file.rules);
        Self::new(rules)
    }

    /// Load a rule file from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn rules(&self) -> impl Iterator<Item = &LeakageRule> {
        self.rules.iter().map(|(rule, _)| rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Remove every text-rule match, rule by rule.
    pub fn scrub_text(&self, text: &str) -> String {
        let mut result = text.to_string();
        for (rule, regex) in &self.rules {
            if rule.scope == RuleScope::Text {
                result = regex.replace_all(&result, "").into_owned();
            }
        }
        result
    }

    /// Whether a line of code matches any line rule.
    pub fn leaks_line(&self, line: &str) -> bool {
        self.rules
            .iter()
            .any(|(rule, regex)| rule.scope == RuleScope::Line && regex.is_match(line))
    }
}

impl Default for LeakageRules {
    fn default() -> Self {
        let rules = default_rules()
            .into_iter()
            .filter_map(|rule| rule.compile().ok().map(|regex| (rule, regex)))
            .collect();
        Self { rules }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_compile() {
        let rules = LeakageRules::new(default_rules()).unwrap();
        assert_eq!(rules.len(), LeakageRules::default().len());
    }

    #[test]
    fn test_scrub_text() {
        let rules = LeakageRules::default();
        let text =
            "Step 1: uses llama_cpp and Traceback.\nimport os\nedge_all_open_tabs = [1,\n 2]";
        let cleaned = rules.scrub_text(text);
        assert!(!cleaned.to_lowercase().contains("llama_cpp"));
        assert!(!cleaned.to_lowercase().contains("traceback"));
        assert!(!cleaned.contains("import os"));
        assert!(!cleaned.contains("edge_all_open_tabs"));
        assert!(cleaned.starts_with("Step 1: uses"));
    }

    #[test]
    fn test_line_rules_are_case_sensitive() {
        let rules = LeakageRules::default();
        assert!(rules.leaks_line("# User tabs"));
        assert!(rules.leaks_line("x = edge_all_open_tabs[0]"));
        assert!(!rules.leaks_line("user = get_user()"));
    }

    #[test]
    fn test_from_json_extends_defaults() {
        let json = r#"{"rules":[{"id":"secret","pattern":"SECRET_\\w+","scope":"text"}]}"#;
        let rules = LeakageRules::from_json(json).unwrap();
        assert_eq!(rules.len(), default_rules().len() + 1);
        assert_eq!(rules.scrub_text("a secret_KEY b"), "a  b");
        assert_eq!(rules.rules().last().unwrap().id, "secret");
    }

    #[test]
    fn test_from_json_replace_defaults() {
        let json = r#"{
            "replace_defaults": true,
            "rules": [{"id": "dbg", "pattern": "DEBUG", "scope": "line", "case_insensitive": false}]
        }"#;
        let rules = LeakageRules::from_json(json).unwrap();
        assert_eq!(rules.len(), 1);
        assert!(rules.leaks_line("DEBUG = True"));
        assert!(!rules.leaks_line("debug = True"));
        assert_eq!(rules.scrub_text("import os"), "import os");
    }

    #[test]
    fn test_invalid_pattern_reports_rule() {
        let json = r#"{"rules":[{"id":"broken","pattern":"(unclosed","scope":"text"}]}"#;
        match LeakageRules::from_json(json) {
            Err(ConfigError::InvalidPattern { id, .. }) => assert_eq!(id, "broken"),
            other => panic!("expected invalid pattern, got {:?}", other),
        }
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"{"rules":[]}"#).unwrap();
        let rules = LeakageRules::load(&path).unwrap();
        assert_eq!(rules.len(), default_rules().len());
    }
}
