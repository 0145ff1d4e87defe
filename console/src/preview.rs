//! Table previews.
//!
//! Each allow-listed table is fetched by its own request; a failure is kept
//! with its table and never affects the others.

use common::models::query::ResultSet;
use futures::future::join_all;

use crate::client::GatewayClient;
use crate::error::ConsoleResult;
use crate::render::TableView;

/// Rows shown per preview (the gateway sends up to its own limit).
pub const PREVIEW_DISPLAY_ROWS: usize = 5;

/// Preview of one table.
#[derive(Debug)]
pub struct TablePreview {
    pub table: String,
    /// Fetched rows, or the failure text.
    pub outcome: Result<ResultSet, String>,
}

impl TablePreview {
    /// Column names, taken from the first fetched row.
    pub fn columns(&self) -> Vec<String> {
        match &self.outcome {
            Ok(rows) => rows
                .first()
                .map(|row| row.keys().cloned().collect())
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    /// Renders the heading, the column list and the first rows.
    pub fn to_text(&self) -> String {
        let mut out = format!("== {} ==\n", self.table);
        match &self.outcome {
            Err(message) => out.push_str(&format!("error: {}", message)),
            Ok(rows) => {
                let shown = &rows[..rows.len().min(PREVIEW_DISPLAY_ROWS)];
                match TableView::from_rows(shown) {
                    Some(table) => {
                        out.push_str(&format!("columns: {}\n", self.columns().join(", ")));
                        out.push_str(&table.to_text());
                    }
                    None => out.push_str("No data"),
                }
            }
        }
        out
    }
}

/// Fetches previews of `tables` concurrently, in the given order.
pub async fn fetch_previews(client: &GatewayClient, tables: &[String]) -> Vec<TablePreview> {
    let requests = tables.iter().map(|table| async move {
        let outcome = client
            .fetch_table_preview(table)
            .await
            .map_err(|e| e.to_string());
        if let Err(message) = &outcome {
            tracing::warn!(table = %table, error = %message, "table preview failed");
        }
        TablePreview {
            table: table.clone(),
            outcome,
        }
    });
    join_all(requests).await
}

/// Lists the previewable tables and fetches all of them.
pub async fn load_previews(client: &GatewayClient) -> ConsoleResult<Vec<TablePreview>> {
    let tables = client.list_tables().await?;
    Ok(fetch_previews(client, &tables).await)
}
