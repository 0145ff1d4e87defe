//! Shared data models for the gateway and the console.

pub mod connection;
pub mod document;
pub mod query;
pub mod table;

// Re-export commonly used types
pub use connection::{ConnectionConfig, DbType, DocumentStoreConfig};
pub use document::{DocumentCommand, DocumentOperation, DocumentQueryRequest};
pub use query::{ResultSet, Row, SqlQueryRequest, TablePreviewParams};
pub use table::TableAllowList;
