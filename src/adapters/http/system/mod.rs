//! HTTP adapter for health and credential endpoints.

mod dto;
mod handlers;
mod routes;

pub use dto::{HealthResponse, ValidateKeyResponse};
pub use handlers::SystemAppState;
pub use routes::system_routes;
