//! Document store (NoSQL) query models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::{AppError, AppResult};
use crate::models::query::Row;

/// Document operation kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum DocumentOperation {
    /// Query documents matching a filter.
    Find,
    /// Count documents matching a filter.
    Count,
    /// Run an aggregation pipeline.
    Aggregate,
    /// Insert a single document.
    InsertOne,
}

impl std::fmt::Display for DocumentOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentOperation::Find => write!(f, "find"),
            DocumentOperation::Count => write!(f, "count"),
            DocumentOperation::Aggregate => write!(f, "aggregate"),
            DocumentOperation::InsertOne => write!(f, "insertOne"),
        }
    }
}

/// Request body for executing a document store operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DocumentQueryRequest {
    /// Operation to run.
    pub operation: DocumentOperation,

    /// Operation payload; always carries `collection`.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
}

/// A validated document store command.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentCommand {
    Find {
        collection: String,
        filter: Row,
        projection: Option<Row>,
        limit: Option<i64>,
    },
    Count {
        collection: String,
        filter: Row,
    },
    Aggregate {
        collection: String,
        pipeline: Vec<Row>,
    },
    InsertOne {
        collection: String,
        document: Row,
    },
}

#[derive(Deserialize)]
struct FindPayload {
    collection: String,
    #[serde(default)]
    filter: Row,
    projection: Option<Row>,
    limit: Option<i64>,
}

#[derive(Deserialize)]
struct CountPayload {
    collection: String,
    #[serde(default)]
    filter: Row,
}

#[derive(Deserialize)]
struct AggregatePayload {
    collection: String,
    pipeline: Vec<Row>,
}

#[derive(Deserialize)]
struct InsertOnePayload {
    collection: String,
    document: Row,
}

impl DocumentQueryRequest {
    /// Builds a `find` request.
    pub fn find(collection: impl Into<String>, filter: Row) -> Self {
        Self {
            operation: DocumentOperation::Find,
            data: serde_json::json!({ "collection": collection.into(), "filter": filter }),
        }
    }

    /// Validates the payload against the operation.
    pub fn into_command(self) -> AppResult<DocumentCommand> {
        let operation = self.operation;
        let command = match operation {
            DocumentOperation::Find => {
                let p: FindPayload = parse_payload(operation, self.data)?;
                if matches!(p.limit, Some(n) if n < 0) {
                    return Err(AppError::Validation("limit must not be negative".into()));
                }
                DocumentCommand::Find {
                    collection: p.collection,
                    filter: p.filter,
                    projection: p.projection,
                    limit: p.limit,
                }
            }
            DocumentOperation::Count => {
                let p: CountPayload = parse_payload(operation, self.data)?;
                DocumentCommand::Count {
                    collection: p.collection,
                    filter: p.filter,
                }
            }
            DocumentOperation::Aggregate => {
                let p: AggregatePayload = parse_payload(operation, self.data)?;
                DocumentCommand::Aggregate {
                    collection: p.collection,
                    pipeline: p.pipeline,
                }
            }
            DocumentOperation::InsertOne => {
                let p: InsertOnePayload = parse_payload(operation, self.data)?;
                DocumentCommand::InsertOne {
                    collection: p.collection,
                    document: p.document,
                }
            }
        };

        if command.collection().trim().is_empty() {
            return Err(AppError::Validation("collection is required".into()));
        }
        Ok(command)
    }
}

impl DocumentCommand {
    /// Target collection.
    pub fn collection(&self) -> &str {
        match self {
            DocumentCommand::Find { collection, .. }
            | DocumentCommand::Count { collection, .. }
            | DocumentCommand::Aggregate { collection, .. }
            | DocumentCommand::InsertOne { collection, .. } => collection,
        }
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(
    operation: DocumentOperation,
    data: serde_json::Value,
) -> AppResult<T> {
    serde_json::from_value(data)
        .map_err(|e| AppError::Validation(format!("invalid {} payload: {}", operation, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: serde_json::Value) -> DocumentQueryRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_find_payload() {
        let command = request(json!({
            "operation": "find",
            "data": { "collection": "users", "filter": { "name": "Deepak" }, "limit": 5 }
        }))
        .into_command()
        .unwrap();

        match command {
            DocumentCommand::Find { collection, filter, limit, projection } => {
                assert_eq!(collection, "users");
                assert_eq!(filter.get("name"), Some(&json!("Deepak")));
                assert_eq!(limit, Some(5));
                assert!(projection.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_insert_one_operation_name() {
        let command = request(json!({
            "operation": "insertOne",
            "data": { "collection": "users", "document": { "name": "Amit" } }
        }))
        .into_command()
        .unwrap();
        assert_eq!(command.collection(), "users");
    }

    #[test]
    fn test_blank_collection_is_rejected() {
        let err = request(json!({ "operation": "count", "data": { "collection": " " } }))
            .into_command()
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_pipeline_must_be_array() {
        let err = request(json!({
            "operation": "aggregate",
            "data": { "collection": "orders", "pipeline": { "$match": {} } }
        }))
        .into_command()
        .unwrap_err();
        assert!(err.to_string().starts_with("invalid aggregate payload"));
    }

    #[test]
    fn test_find_builder_round_trips() {
        let mut filter = Row::new();
        filter.insert("status".into(), json!("Delivered"));
        let command = DocumentQueryRequest::find("shippings", filter.clone())
            .into_command()
            .unwrap();
        assert_eq!(
            command,
            DocumentCommand::Find {
                collection: "shippings".into(),
                filter,
                projection: None,
                limit: None,
            }
        );
    }
}
