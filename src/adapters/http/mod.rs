//! HTTP adapters - REST API implementations.
//!
//! Each endpoint group has its own module with dto, handlers and routes.

pub mod chat;
pub mod error;
pub mod router;
pub mod system;

pub use chat::{chat_routes, ChatAppState};
pub use error::{ChatApiError, ErrorResponse};
pub use router::{api_router, app_router};
pub use system::{system_routes, SystemAppState};
