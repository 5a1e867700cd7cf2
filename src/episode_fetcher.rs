//! Episode fetcher module
//!
//! Resolves an episode page URL into an [`EpisodeDescriptor`]: the page is
//! downloaded, its best MP4 source selected and the episode number read from
//! the page URL.

use crate::episode_numbering::extract_number;
use crate::page_parser::{SourceNotFound, select_best_source};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use thiserror::Error;
use url::Url;

/// Errors that can occur while resolving an episode page
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The page URL is not a valid absolute URL
    #[error("Invalid page URL {url}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    /// Request for the page failed
    #[error("Failed to fetch page {url}: {source}")]
    Request { url: Url, source: reqwest::Error },

    /// The server answered with a non-success status
    #[error("HTTP {status} while fetching page {url}")]
    HttpStatus { url: Url, status: StatusCode },

    /// The page did not contain a usable video source
    #[error("No downloadable video on page {url}: {reason}")]
    NoVideo { url: Url, reason: SourceNotFound },
}

/// A resolved, downloadable episode
///
/// Only built once an absolute download URL is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeDescriptor {
    /// Episode number taken from the page URL, `0` if it had none
    pub number: u32,
    /// The episode page the video was found on
    pub page_url: Url,
    /// Absolute URL of the video file
    pub download_url: Url,
    /// Advertised vertical resolution, `0` if unknown
    pub quality: u32,
}

impl EpisodeDescriptor {
    /// Local file name for this episode, e.g. `episode-7.1080p.mp4`
    pub fn file_name(&self) -> String {
        format!("episode-{}.{}p.mp4", self.number, self.quality)
    }
}

/// Fetches an episode page and resolves its video source
///
/// Transport errors, error statuses and pages without a usable source all
/// become a [`ResolutionError`]; nothing here aborts a batch.
pub fn resolve_episode(client: &Client, page_url: &str) -> Result<EpisodeDescriptor, ResolutionError> {
    let url = Url::parse(page_url).map_err(|source| ResolutionError::InvalidUrl {
        url: page_url.to_string(),
        source,
    })?;

    tracing::debug!(%url, "fetching episode page");

    let response = client
        .get(url.clone())
        .send()
        .map_err(|source| ResolutionError::Request {
            url: url.clone(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ResolutionError::HttpStatus { url, status });
    }

    let markup = response.bytes().map_err(|source| ResolutionError::Request {
        url: url.clone(),
        source,
    })?;

    let source = match select_best_source(&markup, &url) {
        Ok(source) => source,
        Err(reason) => return Err(ResolutionError::NoVideo { url, reason }),
    };

    tracing::debug!(
        page = %url,
        video = %source.url,
        quality = source.quality,
        "selected video source"
    );

    Ok(EpisodeDescriptor {
        number: extract_number(url.as_str()),
        page_url: url,
        download_url: source.url,
        quality: source.quality,
    })
}
