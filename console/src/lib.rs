//! Query console.
//!
//! Client side of the query dashboard: the submission state machine, the
//! gateway client, result rendering and table previews. The `query-console`
//! binary wraps them in a terminal REPL.

pub mod client;
pub mod error;
pub mod preview;
pub mod render;
pub mod samples;
pub mod state;

// Re-export commonly used types
pub use client::{GatewayClient, DEFAULT_GATEWAY_URL};
pub use error::{ConsoleError, ConsoleResult};
pub use preview::{load_previews, TablePreview};
pub use render::{render_results, TableView};
pub use state::{Mode, Phase, QueryConsole, StatusKind, Submission, Ticket};
