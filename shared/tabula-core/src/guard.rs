//! SELECT-only security guard
//!
//! A keyword-level gate, not a parser. A statement is rejected when its
//! uppercased text contains any forbidden keyword anywhere (including inside
//! string literals and identifiers) or when it does not start with `SELECT`.

use std::fmt;

use crate::error::{Result, TabulaError};

pub const FORBIDDEN_KEYWORDS: [&str; 7] = [
    "DROP", "DELETE", "UPDATE", "INSERT", "ALTER", "CREATE", "TRUNCATE",
];

pub const SECURITY_REJECTION: &str = "Only SELECT queries are allowed";

/// Returns true when `sql` may be sent to the database
pub fn validate(sql: &str) -> bool {
    rejection_reason(sql).is_none()
}

/// Explain why `sql` is rejected, or `None` when it passes
pub fn rejection_reason(sql: &str) -> Option<String> {
    let upper = sql.trim().to_uppercase();

    if let Some(keyword) = FORBIDDEN_KEYWORDS.iter().find(|k| upper.contains(*k)) {
        return Some(format!("forbidden keyword {}", keyword));
    }

    if !upper.starts_with("SELECT") {
        return Some("statement does not start with SELECT".to_string());
    }

    None
}

/// A statement that passed [`validate`].
///
/// The only constructor is [`ApprovedSql::approve`], so anything holding an
/// `ApprovedSql` went through the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovedSql(String);

impl ApprovedSql {
    pub fn approve(sql: impl Into<String>) -> Result<Self> {
        let sql = sql.into();
        match rejection_reason(&sql) {
            None => Ok(Self(sql)),
            Some(reason) => {
                tracing::warn!(%reason, "Rejected statement at security gate");
                Err(TabulaError::Security(SECURITY_REJECTION.to_string()))
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ApprovedSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_select_passes() {
        assert!(validate("SELECT * FROM customers LIMIT 20"));
        assert!(validate("   select count(*) from employees;  "));
        assert!(validate("\n\tSeLeCt 1"));
    }

    #[test]
    fn test_forbidden_keywords_reject_in_any_casing() {
        for keyword in FORBIDDEN_KEYWORDS {
            let variants = [
                format!("SELECT 1; {} TABLE x", keyword),
                format!("select 1; {} table x", keyword.to_lowercase()),
                format!("  SELECT * FROM t WHERE note = '{}'  ", keyword),
                format!("{} FROM t", keyword),
            ];
            for sql in variants {
                assert!(!validate(&sql), "accepted: {}", sql);
            }
        }
    }

    #[test]
    fn test_forbidden_word_inside_identifier_rejects() {
        assert!(!validate("SELECT updated_at FROM orders"));
        assert!(!validate("SELECT createdBy FROM logs"));
        assert!(!validate("SELECT * FROM t WHERE reason = 'dropped call'"));
    }

    #[test]
    fn test_non_select_rejected_without_keywords() {
        assert!(!validate("WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(!validate("SHOW TABLES"));
        assert!(!validate("EXPLAIN SELECT 1"));
        assert!(!validate(""));
        assert!(!validate("   "));
    }

    #[test]
    fn test_approve_returns_security_error() {
        let err = ApprovedSql::approve("DROP TABLE customers").unwrap_err();
        assert_eq!(err, TabulaError::Security(SECURITY_REJECTION.to_string()));

        let ok = ApprovedSql::approve("SELECT 1;").unwrap();
        assert_eq!(ok.as_str(), "SELECT 1;");
    }
}
