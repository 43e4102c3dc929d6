//! Connectivity Probe Adapters.
//!
//! - `HttpConnectivityProbe` - Checks a relay through its health and validate-key endpoints
//! - `ProviderConnectivityProbe` - Checks the completion provider in-process

mod http_probe;
mod provider_probe;

pub use http_probe::HttpConnectivityProbe;
pub use provider_probe::ProviderConnectivityProbe;
