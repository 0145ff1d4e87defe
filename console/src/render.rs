//! Result set rendering.
//!
//! Headers are the first row's keys in order. Every row is looked up by those
//! names, so rows of a different shape still line up: missing keys render as
//! `NULL` and extra keys are dropped and counted.

use common::models::query::{ResultSet, Row};
use serde_json::Value;

/// Text shown for an empty result set.
pub const NO_RESULTS: &str = "No results found";

/// A result set normalized to a rectangular table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    /// Rows whose key set differs from the header's.
    pub mismatched_rows: usize,
}

impl TableView {
    /// Builds the table, or `None` for an empty result set.
    pub fn from_rows(rows: &[Row]) -> Option<Self> {
        let first = rows.first()?;
        let columns: Vec<String> = first.keys().cloned().collect();

        let mut mismatched_rows = 0;
        let body = rows
            .iter()
            .map(|row| {
                if !same_shape(row, &columns) {
                    mismatched_rows += 1;
                }
                columns
                    .iter()
                    .map(|column| row.get(column).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Some(Self {
            columns,
            rows: body,
            mismatched_rows,
        })
    }

    /// Renders an aligned plain-text table.
    pub fn to_text(&self) -> String {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();

        let mut widths: Vec<usize> = self.columns.iter().map(|c| display_width(c)).collect();
        for row in &cells {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(display_width(cell));
            }
        }

        let mut out = String::new();
        push_line(&mut out, &self.columns, &widths);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&rule.join("-+-"));
        out.push('\n');
        for row in &cells {
            push_line(&mut out, row, &widths);
        }

        let count = self.rows.len();
        out.push_str(&format!("({} row{})", count, if count == 1 { "" } else { "s" }));
        if self.mismatched_rows > 0 {
            out.push_str(&format!(
                "\n{} row(s) did not match the header columns",
                self.mismatched_rows
            ));
        }
        out
    }
}

/// Renders a result set, or the empty-result notice.
pub fn render_results(rows: &ResultSet) -> String {
    match TableView::from_rows(rows) {
        Some(table) => table.to_text(),
        None => NO_RESULTS.to_string(),
    }
}

/// Text of one cell: `NULL`, strings verbatim, anything else as compact JSON.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn same_shape(row: &Row, columns: &[String]) -> bool {
    row.len() == columns.len() && columns.iter().all(|c| row.contains_key(c))
}

fn display_width(text: &str) -> usize {
    text.chars().count()
}

fn push_line<S: AsRef<str>>(out: &mut String, cells: &[S], widths: &[usize]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let cell = cell.as_ref().replace('\n', " ");
            let pad = width.saturating_sub(display_width(&cell));
            format!("{}{}", cell, " ".repeat(pad))
        })
        .collect();
    out.push_str(padded.join(" | ").trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(value: Value) -> ResultSet {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_headers_follow_first_row() {
        let result = rows(json!([
            { "customer_id": 1, "first_name": "Deepak" },
            { "customer_id": 2, "first_name": "Amit" }
        ]));
        let table = TableView::from_rows(&result).unwrap();
        assert_eq!(table.columns, ["customer_id", "first_name"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.mismatched_rows, 0);
        assert_eq!(
            table.to_text(),
            "customer_id | first_name\n\
             ------------+-----------\n\
             1           | Deepak\n\
             2           | Amit\n\
             (2 rows)"
        );
    }

    #[test]
    fn test_empty_result() {
        assert!(TableView::from_rows(&[]).is_none());
        assert_eq!(render_results(&ResultSet::new()), NO_RESULTS);
    }

    #[test]
    fn test_heterogeneous_rows_are_normalized() {
        let result = rows(json!([
            { "a": 1, "b": 2 },
            { "b": 3 },
            { "a": 4, "b": 5, "c": 6 },
            { "b": 7, "a": 8 }
        ]));
        let table = TableView::from_rows(&result).unwrap();
        assert_eq!(table.rows[1], vec![Value::Null, json!(3)]);
        assert_eq!(table.rows[2], vec![json!(4), json!(5)]);
        assert_eq!(table.rows[3], vec![json!(8), json!(7)]);
        assert_eq!(table.mismatched_rows, 2);
        assert!(table.to_text().ends_with("2 row(s) did not match the header columns"));
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Value::Null), "NULL");
        assert_eq!(cell_text(&json!("400.50")), "400.50");
        assert_eq!(cell_text(&json!(12000)), "12000");
        assert_eq!(cell_text(&json!(true)), "true");
        assert_eq!(cell_text(&json!({ "$oid": "abc" })), r#"{"$oid":"abc"}"#);
    }

    #[test]
    fn test_single_row_and_null_cells() {
        let table = TableView::from_rows(&rows(json!([{ "id": 1, "note": null }]))).unwrap();
        assert_eq!(table.to_text(), "id | note\n---+-----\n1  | NULL\n(1 row)");
    }
}
