//! Text utilities that do not need the model.

use codementor_ai::{classify as classify_text, postprocess};
use std::fs;
use std::path::Path;

pub(crate) fn classify(text: &str, json: bool) -> miette::Result<()> {
    let sentiment = classify_text(text);
    if json {
        let out = serde_json::json!({ "text": text, "sentiment": sentiment });
        println!("{}", out);
    } else {
        println!("{}", sentiment.as_str());
    }
    Ok(())
}

pub(crate) fn diff(original: &Path, refactored: &Path) -> miette::Result<()> {
    let before = read(original)?;
    let after = read(refactored)?;
    print!("{}", postprocess::compare_versions(&before, &after));
    Ok(())
}

pub(crate) fn tidy(file: &Path) -> miette::Result<()> {
    let source = read(file)?;
    let dedented = postprocess::normalize_indentation(&source);
    let cleaned = postprocess::remove_duplicate_comments(&dedented);
    println!("{}", cleaned);
    Ok(())
}

fn read(path: &Path) -> miette::Result<String> {
    fs::read_to_string(path)
        .map_err(|e| miette::miette!("Failed to read {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_read_missing_file() {
        let dir = tempdir().unwrap();
        let err = read(&dir.path().join("missing.py")).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[test]
    fn test_diff_and_tidy_accept_files() {
        let dir = tempdir().unwrap();
        let original = dir.path().join("a.py");
        let refactored = dir.path().join("b.py");
        fs::write(&original, "x = 1\n").unwrap();
        fs::write(&refactored, "    # note\n    # note\n    x = 2\n").unwrap();

        assert!(diff(&original, &refactored).is_ok());
        assert!(tidy(&refactored).is_ok());
    }
}
