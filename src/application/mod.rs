//! Application layer - Sessions, relaying, and handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.

pub mod connectivity;
pub mod errors;
pub mod handlers;
pub mod relay;
pub mod session;

pub use connectivity::ConnectivityMonitor;
pub use errors::ChatError;
pub use handlers::{RelayMessageCommand, RelayMessageHandler, RelayStream};
pub use relay::{spawn_relay, RelayEvent, RelayOutcome, StreamRelay};
pub use session::{BatchReply, ChatSession, SendMode, SendOutcome, StreamedReply};
