//! Query Guards
//!
//! Fixed blocklist applied to the raw candidate SQL before anything else.

use lazy_static::lazy_static;
use regex::Regex;

pub struct BlockRule {
    pub name: &'static str,
    pub description: &'static str,
    pattern: Regex,
}

impl BlockRule {
    fn new(name: &'static str, description: &'static str, pattern: &str) -> Self {
        Self {
            name,
            description,
            // Patterns are literals below; a bad one is a programming error.
            pattern: Regex::new(pattern).expect("invalid blocklist pattern"),
        }
    }

    pub fn is_match(&self, sql: &str) -> bool {
        self.pattern.is_match(sql)
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    fn violation(&self) -> String {
        format!("Forbidden pattern ({}): {}", self.name, self.description)
    }
}

lazy_static! {
    static ref BLOCKLIST: Vec<BlockRule> = vec![
        BlockRule::new(
            "write_statement",
            "data or schema modifying statements are not allowed",
            r"(?i)\b(insert|update|delete|drop|alter|truncate|create|grant|revoke|call)\b",
        ),
        BlockRule::new(
            "system_schema",
            "access to system schemas is not allowed",
            r"(?i)\b(information_schema|mysql|sys)\b",
        ),
        BlockRule::new(
            "statement_separator",
            "multiple statements are not allowed",
            r";",
        ),
        BlockRule::new("comment", "SQL comments are not allowed", r"--|/\*"),
        BlockRule::new(
            "dangerous_function",
            "sleep, benchmark and file access functions are not allowed",
            r"(?i)\b(sleep|benchmark|load_file|into\s+outfile)\b",
        ),
    ];
}

pub fn blocklist() -> &'static [BlockRule] {
    &BLOCKLIST
}

/// One error per matching rule, in rule order. Scanning never stops early.
pub fn scan(raw_sql: &str) -> Vec<String> {
    BLOCKLIST
        .iter()
        .filter(|rule| rule.is_match(raw_sql))
        .map(BlockRule::violation)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_select_passes() {
        assert!(scan("SELECT product_name FROM products WHERE list_price > 10").is_empty());
    }

    #[test]
    fn test_reports_every_violation() {
        let errors = scan("SELECT sleep(5); DROP TABLE mysql.user -- bye");
        assert_eq!(errors.len(), 5);
        assert!(errors[0].contains("write_statement"));
        assert!(errors[1].contains("system_schema"));
        assert!(errors[2].contains("statement_separator"));
        assert!(errors[3].contains("comment"));
        assert!(errors[4].contains("dangerous_function"));
    }

    #[test]
    fn test_word_boundaries() {
        // created_at / updated_by are column names, not verbs
        assert!(scan("SELECT created_at, updated_by FROM orders").is_empty());
        assert_eq!(scan("select * into   outfile '/tmp/x' from t").len(), 1);
        assert_eq!(scan("SELECT 1 /* hi */").len(), 1);
    }
}
