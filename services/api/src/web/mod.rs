pub mod chat_task;
pub mod protocol;
pub mod quiz_task;
pub mod report_task;
pub mod rest;
pub mod state;

// Re-export the router and shared state to make them easily accessible
// to the binary that builds the web server.
pub use rest::{router, ApiDoc};
pub use state::{AppState, SessionRegistry};
