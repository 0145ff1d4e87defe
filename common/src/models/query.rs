//! SQL query models.
//!
//! Contains the wire types of the query round trip.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

/// One result row: column name to scalar value, in the driver's column order.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Ordered sequence of rows returned by a query.
pub type ResultSet = Vec<Row>;

/// Column of the summary row returned for statements that produce no rows.
pub const AFFECTED_ROWS_COLUMN: &str = "affected_rows";

/// Request body for executing a SQL statement.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SqlQueryRequest {
    /// SQL statement to execute, passed to the database unmodified.
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "No SQL query provided."))]
    pub query: String,
}

impl SqlQueryRequest {
    /// Creates a request for the given statement.
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into() }
    }
}

/// Optional query-string parameters of a table preview.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TablePreviewParams {
    /// Row limit; clamped to the configured maximum.
    pub limit: Option<u32>,
}

/// Builds the single summary row for a statement without a result set.
pub fn affected_rows_result(affected: u64) -> ResultSet {
    let mut row = Row::new();
    row.insert(AFFECTED_ROWS_COLUMN.to_string(), affected.into());
    vec![row]
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_query_is_invalid() {
        assert!(SqlQueryRequest::new("   \n").validate().is_err());
        assert!(SqlQueryRequest::new("").validate().is_err());
        assert!(SqlQueryRequest::new("SELECT 1").validate().is_ok());
    }

    #[test]
    fn test_missing_query_defaults_to_blank() {
        let req: SqlQueryRequest = serde_json::from_str("{}").unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_row_keeps_column_order() {
        let rows: ResultSet =
            serde_json::from_str(r#"[{"z":1,"a":"x","m":null}]"#).unwrap();
        let keys: Vec<&str> = rows[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_affected_rows_result() {
        let rows = affected_rows_result(3);
        assert_eq!(serde_json::to_string(&rows).unwrap(), r#"[{"affected_rows":3}]"#);
    }
}
