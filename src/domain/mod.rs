//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `conversation` - Turns, bounded history and prompt assembly
//! - `connectivity` - Derivation of the UI-facing connectivity status
//! - `errors` - Validation errors shared by the domain

pub mod connectivity;
pub mod conversation;
pub mod errors;

pub use errors::ValidationError;
