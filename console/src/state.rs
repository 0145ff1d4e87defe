//! Query console state machine.
//!
//! One [`QueryConsole`] owns the query text, the last applied result set and
//! the status line. The run action is disabled while a request is in flight.
//! Every accepted submission gets a new generation number and only the
//! outcome carrying the latest generation is applied.

use common::models::document::{DocumentOperation, DocumentQueryRequest};
use common::models::query::ResultSet;
use serde_json::Value;

use crate::error::ConsoleError;

/// Notice shown when a blank query is submitted.
pub const BLANK_QUERY_NOTICE: &str = "Please enter a query!";

/// Notice shown when a query is submitted while another is running.
pub const RUNNING_NOTICE: &str = "A query is already running";

/// Query language of the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Mode {
    /// Text is sent verbatim to the SQL endpoint.
    #[default]
    Sql,
    /// Text is parsed as JSON and sent to the document endpoint.
    #[value(name = "nosql")]
    NoSql,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Sql => write!(f, "sql"),
            Mode::NoSql => write!(f, "nosql"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sql" => Ok(Mode::Sql),
            "nosql" => Ok(Mode::NoSql),
            other => Err(format!("unknown mode: {}", other)),
        }
    }
}

/// Lifecycle phase of the latest submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing submitted yet.
    Idle,
    /// A request is in flight.
    Running,
    /// The latest request succeeded.
    Resolved,
    /// The latest request failed.
    Failed,
}

/// Severity of the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// Local notice (e.g. blank query).
    Notice,
    /// Request failure.
    Error,
}

/// Non-blocking status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

impl StatusMessage {
    fn notice(text: impl Into<String>) -> Self {
        Self { kind: StatusKind::Notice, text: text.into() }
    }

    fn error(text: impl Into<String>) -> Self {
        Self { kind: StatusKind::Error, text: text.into() }
    }
}

/// Request to send for an accepted submission.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Sql(String),
    Document(DocumentQueryRequest),
}

/// An accepted submission tagged with its generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub generation: u64,
    pub submission: Submission,
}

/// Console state.
#[derive(Debug)]
pub struct QueryConsole {
    mode: Mode,
    query: String,
    phase: Phase,
    generation: u64,
    results: ResultSet,
    status: Option<StatusMessage>,
}

impl QueryConsole {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            query: String::new(),
            phase: Phase::Idle,
            generation: 0,
            results: ResultSet::new(),
            status: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Generation of the latest accepted submission (0 before the first).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Last applied result set.
    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// Label of the run control.
    pub fn run_label(&self) -> &'static str {
        if self.is_running() {
            "Running..."
        } else {
            "Run Query"
        }
    }

    /// Accepts the current query text for execution.
    ///
    /// Blank text (or, in NoSQL mode, text that is not a JSON object) is
    /// rejected with a notice and nothing changes but the status line. So is
    /// any submission while a request is in flight.
    pub fn submit(&mut self) -> Option<Ticket> {
        if self.is_running() {
            self.status = Some(StatusMessage::notice(RUNNING_NOTICE));
            return None;
        }
        if self.query.trim().is_empty() {
            self.status = Some(StatusMessage::notice(BLANK_QUERY_NOTICE));
            return None;
        }

        let submission = match self.mode {
            Mode::Sql => Submission::Sql(self.query.clone()),
            Mode::NoSql => match parse_document_query(&self.query) {
                Ok(req) => Submission::Document(req),
                Err(e) => {
                    self.status = Some(StatusMessage::notice(e));
                    return None;
                }
            },
        };

        self.generation += 1;
        self.phase = Phase::Running;
        self.status = None;
        Some(Ticket {
            generation: self.generation,
            submission,
        })
    }

    /// Applies the outcome of a submission.
    ///
    /// Returns `false` and leaves the state untouched when `generation` is not
    /// the latest one.
    pub fn resolve(&mut self, generation: u64, outcome: Result<ResultSet, ConsoleError>) -> bool {
        if generation != self.generation || self.phase != Phase::Running {
            return false;
        }
        match outcome {
            Ok(rows) => {
                self.results = rows;
                self.phase = Phase::Resolved;
                self.status = None;
            }
            Err(e) => {
                self.phase = Phase::Failed;
                self.status = Some(StatusMessage::error(e.to_string()));
            }
        }
        true
    }
}

/// Parses NoSQL editor text.
///
/// Accepts either a full `{ "operation": …, "data": … }` envelope or a bare
/// `{ "collection": …, "filter": … }` object, which becomes a `find`.
pub fn parse_document_query(text: &str) -> Result<DocumentQueryRequest, String> {
    let value: Value = serde_json::from_str(text).map_err(|e| format!("Invalid JSON: {}", e))?;
    let Value::Object(object) = value else {
        return Err("NoSQL query must be a JSON object".to_string());
    };

    if object.contains_key("operation") {
        return serde_json::from_value(Value::Object(object))
            .map_err(|e| format!("Invalid NoSQL request: {}", e));
    }

    Ok(DocumentQueryRequest {
        operation: DocumentOperation::Find,
        data: Value::Object(object),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(value: Value) -> ResultSet {
        serde_json::from_value(value).unwrap()
    }

    fn gateway_error(message: &str) -> ConsoleError {
        ConsoleError::Gateway {
            status: 500,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_blank_query_is_rejected_locally() {
        let mut console = QueryConsole::new(Mode::Sql);
        console.set_query("  \n\t");
        assert!(console.submit().is_none());
        assert_eq!(console.phase(), Phase::Idle);
        assert_eq!(console.generation(), 0);
        assert_eq!(console.status().unwrap().text, BLANK_QUERY_NOTICE);
        assert_eq!(console.status().unwrap().kind, StatusKind::Notice);
    }

    #[test]
    fn test_submit_and_resolve() {
        let mut console = QueryConsole::new(Mode::Sql);
        console.set_query("SELECT * FROM Customers;");
        let ticket = console.submit().unwrap();
        assert_eq!(ticket.generation, 1);
        assert_eq!(ticket.submission, Submission::Sql("SELECT * FROM Customers;".into()));
        assert!(console.is_running());
        assert_eq!(console.run_label(), "Running...");

        let result = rows(json!([{ "customer_id": 1, "first_name": "Deepak" }]));
        assert!(console.resolve(1, Ok(result.clone())));
        assert_eq!(console.phase(), Phase::Resolved);
        assert_eq!(console.results(), &result);
        assert_eq!(console.run_label(), "Run Query");
    }

    #[test]
    fn test_failure_keeps_query_and_previous_results() {
        let mut console = QueryConsole::new(Mode::Sql);
        console.set_query("SELECT 1");
        let first = console.submit().unwrap();
        let previous = rows(json!([{ "1": 1 }]));
        console.resolve(first.generation, Ok(previous.clone()));

        console.set_query("SELECT * FROM NoSuchTable;");
        let second = console.submit().unwrap();
        assert!(console.resolve(second.generation, Err(gateway_error("Query failed"))));

        assert_eq!(console.phase(), Phase::Failed);
        assert_eq!(console.query(), "SELECT * FROM NoSuchTable;");
        assert_eq!(console.results(), &previous);
        let status = console.status().unwrap();
        assert_eq!(status.kind, StatusKind::Error);
        assert_eq!(status.text, "Query failed");
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut console = QueryConsole::new(Mode::Sql);
        console.set_query("SELECT 1");
        let first = console.submit().unwrap();
        assert!(console.resolve(first.generation, Ok(rows(json!([{ "1": 1 }])))));

        console.set_query("SELECT 2");
        let second = console.submit().unwrap();
        assert!(second.generation > first.generation);
        assert!(!console.resolve(first.generation, Ok(rows(json!([{ "late": 1 }])))));
        assert!(!console.resolve(first.generation, Err(gateway_error("late failure"))));
        assert!(console.is_running());

        let latest = rows(json!([{ "2": 2 }]));
        assert!(console.resolve(second.generation, Ok(latest.clone())));
        assert_eq!(console.results(), &latest);
        assert_eq!(console.phase(), Phase::Resolved);
        assert!(console.status().is_none());
    }

    #[test]
    fn test_submit_while_running_is_rejected() {
        let mut console = QueryConsole::new(Mode::Sql);
        console.set_query("SELECT 1");
        let ticket = console.submit().unwrap();
        assert_eq!(ticket.generation, 1);

        console.set_query("SELECT 2");
        assert!(console.submit().is_none());
        assert_eq!(console.generation(), 1);
        assert!(console.is_running());
        let status = console.status().unwrap();
        assert_eq!(status.kind, StatusKind::Notice);
        assert_eq!(status.text, RUNNING_NOTICE);

        assert!(console.resolve(ticket.generation, Ok(ResultSet::new())));
        assert!(console.status().is_none());
        assert_eq!(console.submit().unwrap().generation, 2);
    }

    #[test]
    fn test_duplicate_resolution_is_ignored() {
        let mut console = QueryConsole::new(Mode::Sql);
        console.set_query("SELECT 1");
        let ticket = console.submit().unwrap();
        assert!(console.resolve(ticket.generation, Ok(ResultSet::new())));
        assert!(!console.resolve(ticket.generation, Err(gateway_error("again"))));
        assert_eq!(console.phase(), Phase::Resolved);
    }

    #[test]
    fn test_nosql_bare_object_becomes_find() {
        let mut console = QueryConsole::new(Mode::NoSql);
        console.set_query(r#"{ "collection": "users", "filter": { "name": "Deepak" } }"#);
        let ticket = console.submit().unwrap();
        let Submission::Document(req) = ticket.submission else {
            panic!("expected a document submission");
        };
        assert_eq!(req.operation, DocumentOperation::Find);
        assert_eq!(req.data["collection"], "users");
    }

    #[test]
    fn test_nosql_envelope_and_invalid_json() {
        let req = parse_document_query(
            r#"{ "operation": "count", "data": { "collection": "users" } }"#,
        )
        .unwrap();
        assert_eq!(req.operation, DocumentOperation::Count);

        let mut console = QueryConsole::new(Mode::NoSql);
        console.set_query("{ not json");
        assert!(console.submit().is_none());
        assert!(console.status().unwrap().text.starts_with("Invalid JSON"));
        assert_eq!(console.phase(), Phase::Idle);

        assert!(parse_document_query("[1, 2]").is_err());
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("SQL".parse::<Mode>().unwrap(), Mode::Sql);
        assert_eq!("nosql".parse::<Mode>().unwrap(), Mode::NoSql);
        assert!("graphql".parse::<Mode>().is_err());
    }
}
