//! Streaming downloader module
//!
//! Streams a resolved episode's video file to disk in fixed-size chunks,
//! reporting progress after every chunk. A destination file is only left on
//! disk when every announced byte has been written.

use crate::episode_fetcher::EpisodeDescriptor;
use crate::partial_file::PartialFile;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use url::Url;

/// Size of a single read from the response body (8KB)
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Lower bound for reported elapsed time, keeps throughput finite
const MIN_ELAPSED_SECS: f64 = 1e-6;

/// Errors that can occur while downloading a video file
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Request for the video file failed
    #[error("Failed to request {url}: {source}")]
    Request { url: Url, source: reqwest::Error },

    /// The server answered with a non-success status
    #[error("HTTP {status} while downloading {url}")]
    HttpStatus { url: Url, status: StatusCode },

    /// The response did not announce a usable content length
    #[error("Cannot determine file size of {url}")]
    SizeUnknown { url: Url },

    /// The destination file could not be created
    #[error("Failed to create {path}: {source}")]
    CreateFile { path: PathBuf, source: io::Error },

    /// Reading the response body failed
    #[error("Transfer interrupted: {0}")]
    Read(#[source] io::Error),

    /// Writing to the destination file failed
    #[error("Failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    /// The body did not match the announced content length
    #[error("Size mismatch: expected {expected} bytes, received {received}")]
    SizeMismatch { expected: u64, received: u64 },
}

/// Snapshot of a running transfer, reported after each chunk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferProgress {
    /// Bytes written so far, never more than `total`
    pub downloaded: u64,
    /// Announced size of the file, fixed for one download
    pub total: u64,
    /// Seconds since the transfer started, always greater than zero
    pub elapsed_secs: f64,
}

impl TransferProgress {
    /// Completed fraction in `0.0..=1.0`
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.downloaded as f64 / self.total as f64).min(1.0)
    }

    /// Average throughput since the start of the transfer
    pub fn bytes_per_second(&self) -> f64 {
        self.downloaded as f64 / self.elapsed_secs
    }
}

/// Downloads an episode's video file to `destination`
///
/// The response body is streamed in [`CHUNK_SIZE`] reads and `on_progress`
/// is called once per chunk. A response without a `Content-Length` is
/// rejected before any file is created. On any failure after the file was
/// created, the file is removed before the error is returned.
///
/// # Returns
///
/// The path of the completed file, holding exactly the announced number of bytes.
pub fn download_episode<F>(
    client: &Client,
    episode: &EpisodeDescriptor,
    destination: &Path,
    on_progress: F,
) -> Result<PathBuf, DownloadError>
where
    F: FnMut(TransferProgress),
{
    let url = &episode.download_url;
    tracing::debug!(%url, destination = %destination.display(), "starting download");

    let response = client
        .get(url.clone())
        .send()
        .map_err(|source| DownloadError::Request {
            url: url.clone(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::HttpStatus {
            url: url.clone(),
            status,
        });
    }

    let total = match response.content_length() {
        Some(length) if length > 0 => length,
        _ => return Err(DownloadError::SizeUnknown { url: url.clone() }),
    };

    stream_to_file(response, total, destination, on_progress)
}

/// Copies `reader` into a new file at `destination` chunk by chunk
///
/// Exactly one chunk is in flight at a time: it is read, written, and
/// reported before the next read starts.
pub(crate) fn stream_to_file<R, F>(
    mut reader: R,
    total: u64,
    destination: &Path,
    mut on_progress: F,
) -> Result<PathBuf, DownloadError>
where
    R: Read,
    F: FnMut(TransferProgress),
{
    let mut file =
        PartialFile::create(destination).map_err(|source| DownloadError::CreateFile {
            path: destination.to_path_buf(),
            source,
        })?;
    tracing::debug!(path = %file.path().display(), total, "writing destination file");

    let started = Instant::now();
    let mut buffer = [0u8; CHUNK_SIZE];
    let mut downloaded: u64 = 0;

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(DownloadError::Read(e)),
        };

        downloaded += bytes_read as u64;
        if downloaded > total {
            return Err(DownloadError::SizeMismatch {
                expected: total,
                received: downloaded,
            });
        }

        file.write_all(&buffer[..bytes_read])
            .map_err(|source| DownloadError::Write {
                path: destination.to_path_buf(),
                source,
            })?;

        on_progress(TransferProgress {
            downloaded,
            total,
            elapsed_secs: started.elapsed().as_secs_f64().max(MIN_ELAPSED_SECS),
        });
    }

    if downloaded != total {
        return Err(DownloadError::SizeMismatch {
            expected: total,
            received: downloaded,
        });
    }

    file.finish().map_err(|source| DownloadError::Write {
        path: destination.to_path_buf(),
        source,
    })
}
