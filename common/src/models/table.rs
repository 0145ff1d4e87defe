//! Table allow-list for previews.

use crate::errors::{AppError, AppResult};

/// Fixed, server-held set of tables that may be previewed.
///
/// Names are matched exactly. [`TableAllowList::resolve`] hands back the
/// list's own copy of the name so that statements are never built from
/// client-supplied text.
#[derive(Debug, Clone)]
pub struct TableAllowList {
    tables: Vec<String>,
}

impl TableAllowList {
    /// Creates an allow-list from configured names (order is kept for listing).
    pub fn new<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list: Vec<String> = Vec::new();
        for table in tables {
            let table = table.into();
            if !list.contains(&table) {
                list.push(table);
            }
        }
        Self { tables: list }
    }

    /// Returns the allow-listed name equal to `requested`.
    pub fn resolve(&self, requested: &str) -> AppResult<&str> {
        self.tables
            .iter()
            .find(|t| t.as_str() == requested)
            .map(String::as_str)
            .ok_or_else(|| AppError::TableNotAllowed(requested.to_string()))
    }

    /// Allow-listed names in configured order.
    pub fn names(&self) -> &[String] {
        &self.tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> TableAllowList {
        TableAllowList::new(["Customers", "Orders", "Shippings", "Orders"])
    }

    #[test]
    fn test_resolve_known_table() {
        assert_eq!(list().resolve("Orders").unwrap(), "Orders");
    }

    #[test]
    fn test_rejects_unknown_and_injected_names() {
        for name in ["users", "customers", "Customers; DROP TABLE Orders", "Customers--", ""] {
            assert!(matches!(list().resolve(name), Err(AppError::TableNotAllowed(_))), "{}", name);
        }
    }

    #[test]
    fn test_names_are_deduplicated_in_order() {
        assert_eq!(list().names(), &["Customers", "Orders", "Shippings"]);
    }
}
