//! HTTP client configuration
//!
//! A single blocking client is built per batch and reused for every page
//! fetch and file download, in order.

use reqwest::blocking::Client;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, InvalidHeaderValue, USER_AGENT,
};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const DEFAULT_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Errors that can occur while building the HTTP client
#[derive(Debug, Error)]
pub enum HttpClientError {
    /// A configured header value is not a valid HTTP header value
    #[error("Invalid value for header {header}: {source}")]
    InvalidHeader {
        header: &'static str,
        source: InvalidHeaderValue,
    },

    /// The underlying client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Request settings shared by all requests of a batch
///
/// Defaults mimic a desktop browser, since some episode sites refuse
/// requests that do not look like one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Value of the `User-Agent` header
    pub user_agent: String,
    /// Value of the `Accept` header
    pub accept: String,
    /// Value of the `Accept-Language` header
    pub accept_language: String,
    /// Maximum time to establish a connection; transfers themselves are not limited
    pub connect_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl HttpConfig {
    /// Builds a blocking client with these settings
    ///
    /// Compressed responses (gzip, deflate, brotli) are decoded transparently.
    pub fn build_client(&self) -> Result<Client, HttpClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value("User-Agent", &self.user_agent)?);
        headers.insert(ACCEPT, header_value("Accept", &self.accept)?);
        headers.insert(
            ACCEPT_LANGUAGE,
            header_value("Accept-Language", &self.accept_language)?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(self.connect_timeout)
            .timeout(None)
            .build()?;

        Ok(client)
    }
}

fn header_value(header: &'static str, value: &str) -> Result<HeaderValue, HttpClientError> {
    HeaderValue::from_str(value).map_err(|source| HttpClientError::InvalidHeader { header, source })
}
