//! SQL statement classification.
//!
//! The gateway does not restrict what users run. Rows come from the driver;
//! this only decides how a statement that returned none is reported: as an
//! empty result set or as an affected-row count.

/// Leading keywords of statements that return rows.
const ROW_RETURNING_KEYWORDS: [&str; 10] = [
    "SELECT", "WITH", "SHOW", "DESCRIBE", "DESC", "EXPLAIN", "PRAGMA", "VALUES", "TABLE", "CALL",
];

/// Broad statement kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Produces a result set.
    Rows,
    /// Produces only an affected-row count (DML / DDL / session commands).
    Command,
}

impl StatementKind {
    /// Classifies a statement by its first keyword, skipping whitespace,
    /// comments and opening parentheses.
    pub fn of(sql: &str) -> Self {
        match first_keyword(sql) {
            Some(word) if ROW_RETURNING_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word)) => {
                StatementKind::Rows
            }
            _ => StatementKind::Command,
        }
    }
}

fn first_keyword(sql: &str) -> Option<&str> {
    let mut rest = sql;
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
        if let Some(after) = rest.strip_prefix("--") {
            rest = after.split_once('\n').map(|(_, tail)| tail).unwrap_or("");
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = after.split_once("*/").map(|(_, tail)| tail).unwrap_or("");
        } else {
            break;
        }
    }
    let end = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    (end > 0).then(|| &rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_returns_rows() {
        assert_eq!(StatementKind::of("SELECT * FROM Customers;"), StatementKind::Rows);
        assert_eq!(StatementKind::of("  select 1"), StatementKind::Rows);
        assert_eq!(StatementKind::of("(SELECT 1) UNION (SELECT 2)"), StatementKind::Rows);
        assert_eq!(StatementKind::of("show tables"), StatementKind::Rows);
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            StatementKind::of("-- all customers\n/* note */ SELECT * FROM Customers"),
            StatementKind::Rows
        );
        assert_eq!(StatementKind::of("-- only a comment"), StatementKind::Command);
    }

    #[test]
    fn test_modifications_are_commands() {
        assert_eq!(
            StatementKind::of("INSERT INTO Orders VALUES (1, 'Keyboard', 400, 4)"),
            StatementKind::Command
        );
        assert_eq!(StatementKind::of("update Orders set amount = 1"), StatementKind::Command);
        assert_eq!(StatementKind::of("DROP TABLE Orders"), StatementKind::Command);
        assert_eq!(StatementKind::of("DESCRIPTION"), StatementKind::Command);
    }
}
