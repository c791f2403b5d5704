pub mod models;
pub mod service;
pub mod telemetry;

pub use service::{AppState, CLIENT_HEADER, create_app};
pub use telemetry::init_tracing;
