//! HTTP client module for the agent message API
//!
//! Provides the transport seam, the API client and reply extraction.

mod client;
mod reply;
#[cfg(test)]
pub mod stub;
mod transport;

pub use client::{ApiBody, ApiClient, ApiResponse};
#[cfg(test)]
pub use transport::RawResponse;
pub use transport::{ReqwestTransport, Transport, TransportError};
