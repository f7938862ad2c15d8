//! Thin read-oriented HTTP surface over the Reconciler's query operations.
//! No auth, no streaming, no websockets — this is status-and-inspection
//! only.

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_app;
pub use state::AppState;
