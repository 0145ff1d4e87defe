//! MongoDB document store.

use common::errors::{AppError, AppResult, QueryErrorKind};
use common::models::connection::DocumentStoreConfig;
use common::models::document::DocumentCommand;
use common::models::query::{ResultSet, Row};
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::error::ErrorKind;
use mongodb::{Client, Database};
use serde_json::Value;

const DEFAULT_DATABASE: &str = "test";

/// Handle on the configured MongoDB database.
#[derive(Clone)]
pub struct DocumentStore {
    client: Client,
    database: Database,
}

impl DocumentStore {
    /// Connects and pings the server so that a bad URI fails at startup.
    pub async fn connect(config: &DocumentStoreConfig) -> Result<Self, mongodb::error::Error> {
        let client = Client::with_uri_str(&config.uri).await?;
        let database = match &config.database {
            Some(name) => client.database(name),
            None => client
                .default_database()
                .unwrap_or_else(|| client.database(DEFAULT_DATABASE)),
        };
        let store = Self { client, database };
        store.ping().await?;
        Ok(store)
    }

    /// Name of the database commands run against.
    pub fn database_name(&self) -> &str {
        self.database.name()
    }

    pub async fn ping(&self) -> Result<(), mongodb::error::Error> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    /// Runs a command and returns its outcome as rows.
    ///
    /// `find` and `aggregate` yield the documents, `count` a single `count`
    /// row and `insertOne` a single `inserted_id` row.
    pub async fn run(&self, command: DocumentCommand) -> Result<ResultSet, DocumentError> {
        let collection = self.database.collection::<Document>(command.collection());
        match command {
            DocumentCommand::Find { filter, projection, limit, .. } => {
                let mut find = collection.find(to_document(&filter)?);
                if let Some(projection) = projection {
                    find = find.projection(to_document(&projection)?);
                }
                if let Some(limit) = limit {
                    find = find.limit(limit);
                }
                let documents: Vec<Document> = find.await?.try_collect().await?;
                Ok(documents.into_iter().map(document_to_row).collect())
            }
            DocumentCommand::Count { filter, .. } => {
                let count = collection.count_documents(to_document(&filter)?).await?;
                Ok(vec![single("count", Value::from(count))])
            }
            DocumentCommand::Aggregate { pipeline, .. } => {
                let stages = pipeline
                    .iter()
                    .map(to_document)
                    .collect::<Result<Vec<_>, _>>()?;
                let documents: Vec<Document> = collection.aggregate(stages).await?.try_collect().await?;
                Ok(documents.into_iter().map(document_to_row).collect())
            }
            DocumentCommand::InsertOne { document, .. } => {
                let result = collection.insert_one(to_document(&document)?).await?;
                Ok(vec![inserted_row(result.inserted_id)])
            }
        }
    }

    /// Collection names of the database, sorted.
    pub async fn list_collections(&self) -> Result<Vec<String>, mongodb::error::Error> {
        let mut names = self.database.list_collection_names().await?;
        names.sort();
        Ok(names)
    }

    /// Closes the client's connection pools.
    pub async fn shutdown(&self) {
        self.client.clone().shutdown().await;
    }
}

/// Failure of a document command.
#[derive(Debug)]
pub enum DocumentError {
    /// The payload could not be represented as BSON.
    Payload(String),
    /// The server or driver rejected the command.
    Driver(mongodb::error::Error),
}

impl From<mongodb::error::Error> for DocumentError {
    fn from(err: mongodb::error::Error) -> Self {
        DocumentError::Driver(err)
    }
}

impl From<bson::ser::Error> for DocumentError {
    fn from(err: bson::ser::Error) -> Self {
        DocumentError::Payload(err.to_string())
    }
}

impl std::fmt::Display for DocumentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentError::Payload(msg) => write!(f, "invalid document payload: {}", msg),
            DocumentError::Driver(err) => write!(f, "{}", err),
        }
    }
}

impl DocumentError {
    /// Converts into the client-facing error; driver details are dropped.
    pub fn into_app_error(self) -> AppError {
        match self {
            DocumentError::Payload(msg) => AppError::Validation(format!("invalid document payload: {}", msg)),
            DocumentError::Driver(err) => AppError::QueryFailed { kind: classify(&err) },
        }
    }
}

/// Maps a MongoDB error to a user-facing category.
pub fn classify(err: &mongodb::error::Error) -> QueryErrorKind {
    match err.kind.as_ref() {
        ErrorKind::Authentication { .. } => QueryErrorKind::PermissionDenied,
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::ConnectionPoolCleared { .. } => QueryErrorKind::Unreachable,
        ErrorKind::Command(command) => match command.code {
            13 | 8000 => QueryErrorKind::PermissionDenied,
            26 => QueryErrorKind::UndefinedObject,
            2 | 9 | 14 | 15 | 40324 => QueryErrorKind::BadSyntax,
            _ => QueryErrorKind::Unknown,
        },
        _ => QueryErrorKind::classify(None, &err.to_string()),
    }
}

fn to_document(row: &Row) -> Result<Document, bson::ser::Error> {
    bson::to_document(row)
}

/// Converts a BSON document to a JSON row in relaxed extended JSON.
pub fn document_to_row(document: Document) -> Row {
    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(map) => map,
        other => single("value", other),
    }
}

/// Summary row of `insertOne`.
fn inserted_row(id: Bson) -> Row {
    single("inserted_id", id.into_relaxed_extjson())
}

fn single(key: &str, value: Value) -> Row {
    let mut row = Row::new();
    row.insert(key.to_string(), value);
    row
}

/// Resolves an optional store or fails with 503.
pub fn require(store: Option<&DocumentStore>) -> AppResult<&DocumentStore> {
    store.ok_or(AppError::DocumentStoreUnavailable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;
    use serde_json::json;

    #[test]
    fn test_document_to_row_keeps_order_and_relaxes_types() {
        let id = ObjectId::parse_str("65a1b2c3d4e5f60718293a4b").unwrap();
        let row = document_to_row(doc! { "_id": id, "name": "Keyboard", "qty": 4_i64, "price": 400.5 });
        assert_eq!(
            Value::Object(row.clone()),
            json!({
                "_id": { "$oid": "65a1b2c3d4e5f60718293a4b" },
                "name": "Keyboard",
                "qty": 4,
                "price": 400.5
            })
        );
        let keys: Vec<&String> = row.keys().collect();
        assert_eq!(keys, ["_id", "name", "qty", "price"]);
    }

    #[test]
    fn test_inserted_row_shape() {
        let id = ObjectId::parse_str("65a1b2c3d4e5f60718293a4b").unwrap();
        assert_eq!(
            Value::Object(inserted_row(Bson::ObjectId(id))),
            json!({ "inserted_id": { "$oid": "65a1b2c3d4e5f60718293a4b" } })
        );
        assert_eq!(
            Value::Object(inserted_row(Bson::Int32(7))),
            json!({ "inserted_id": 7 })
        );
    }

    #[test]
    fn test_to_document() {
        let row = json!({ "age": { "$gt": 25 } }).as_object().unwrap().clone();
        let document = to_document(&row).unwrap();
        let age = document.get_document("age").unwrap();
        assert!(age.contains_key("$gt"));
    }

    #[test]
    fn test_payload_error_is_validation() {
        let err = DocumentError::Payload("bad".into()).into_app_error();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_require_store() {
        assert!(matches!(require(None), Err(AppError::DocumentStoreUnavailable)));
    }
}
