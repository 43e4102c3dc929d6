//! Command handlers.

mod relay_message;

pub use relay_message::{
    RelayMessageCommand, RelayMessageHandler, RelayStream, DEFAULT_RELAY_BUFFER,
};
