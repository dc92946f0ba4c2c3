// HTTP server setup (Axum + WebSocket trace channels)
pub mod app;
pub mod error;
pub mod routes;

pub use app::*;
pub use error::ApiError;
