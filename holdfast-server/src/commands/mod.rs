pub mod demo_library;
pub mod index;
pub mod reconcile;
pub mod schema;
pub mod serve;
