//! Announcement rule list loading

use log::{info, warn};
use std::path::Path;

/// Splits rule text into one rule per non-empty line, order preserved
pub fn parse_rules(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Loads the rule file, or an empty list when it can't be read
pub fn load_rules(path: &Path) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let rules = parse_rules(&text);
            info!("Loaded {} rules from {}", rules.len(), path.display());
            rules
        }
        Err(e) => {
            warn!("Can't read rules file {}: {}. Rules disabled.", path.display(), e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rules() {
        let rules = parse_rules("  No teamkilling \n\n\r\nBe nice\n   \nHave fun");
        assert_eq!(rules, vec!["No teamkilling", "Be nice", "Have fun"]);
    }

    #[test]
    fn test_parse_rules_empty() {
        assert!(parse_rules("").is_empty());
        assert!(parse_rules("\n  \n").is_empty());
    }

    #[test]
    fn test_load_rules_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_rules(&dir.path().join("missing.txt")).is_empty());
    }

    #[test]
    fn test_load_rules_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.txt");
        std::fs::write(&path, "Rule one\nRule two\n").unwrap();
        assert_eq!(load_rules(&path), vec!["Rule one", "Rule two"]);
    }
}
