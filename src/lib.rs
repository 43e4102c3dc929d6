//! Chat Relay - Compliance Assistant Backend
//!
//! This crate relays chat turns to an LLM completion API, keeping a bounded
//! conversation history and streaming generated text back to HTTP clients
//! as it arrives.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
