//! Outbound client for the Khipu payment API.
//!
//! A single authenticated call, [`client::ApiClient::invoke`], that forwards a request and hands
//! back the decoded response body. It knows nothing about the navigation engine or MCP.

pub mod client;
pub mod error;
pub mod safety;

pub use client::{API_KEY_HEADER, ApiClient, ApiClientConfig, ApiRequest, DEFAULT_BASE_URL};
pub use reqwest::Method;
pub use error::{ApiClientError, Result};
