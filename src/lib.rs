//! Episode Downloader - Fetch a run of numbered episode videos
//!
//! This library resolves the pages of consecutive episodes from a single
//! episode URL, picks the best MP4 source embedded in each page and streams
//! the video files to disk while reporting progress.

mod episode_fetcher;
mod episode_numbering;
mod http;
mod page_parser;
mod partial_file;
mod streaming_downloader;

pub use episode_fetcher::{EpisodeDescriptor, ResolutionError, resolve_episode};
pub use episode_numbering::{extract_number, sequence, with_number};
pub use http::{HttpClientError, HttpConfig};
pub use page_parser::{CandidateSource, SelectedSource, SourceNotFound, select_best_source};
pub use streaming_downloader::{CHUNK_SIZE, DownloadError, TransferProgress, download_episode};

use reqwest::blocking::Client;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

/// Settings for a batch of episode downloads
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Directory the episode files are written to
    pub output_dir: PathBuf,
    /// Skip episodes whose destination file already exists
    pub skip_existing: bool,
    /// Request settings for page fetches and downloads
    pub http: HttpConfig,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            skip_existing: false,
            http: HttpConfig::default(),
        }
    }
}

/// Progress event emitted while processing a batch
///
/// Events are emitted strictly in processing order; events of one episode
/// never interleave with those of another.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Batch started
    Started { first_episode: u32, last_episode: u32 },

    /// Fetching an episode page
    ResolvingEpisode { number: u32, page_url: String },

    /// Video source found for an episode
    EpisodeResolved {
        number: u32,
        download_url: Url,
        quality: u32,
        file_name: String,
    },

    /// Episode left alone because its file already exists
    EpisodeSkipped { number: u32, path: PathBuf },

    /// A chunk of the episode's video was written
    DownloadProgress {
        number: u32,
        progress: TransferProgress,
    },

    /// Episode downloaded completely
    EpisodeDownloaded { number: u32, path: PathBuf },

    /// Episode could not be resolved or downloaded; the batch continues
    EpisodeFailed {
        number: u32,
        page_url: String,
        kind: FailureKind,
        reason: String,
    },

    /// Every requested episode has been attempted
    Complete {
        downloaded: usize,
        skipped: usize,
        failed: usize,
    },
}

/// Cause category of a failed episode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The episode page could not be fetched
    PageFetch,
    /// The page has no video element
    NoVideo,
    /// The video element has no usable MP4 source
    NoMp4Source,
    /// The video response announced no content length
    SizeUnknown,
    /// The transfer or the file write failed
    DownloadIo,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::PageFetch => "page fetch error",
            FailureKind::NoVideo => "no video found",
            FailureKind::NoMp4Source => "no MP4 source",
            FailureKind::SizeUnknown => "size unknown",
            FailureKind::DownloadIo => "download I/O error",
        };
        f.write_str(label)
    }
}

/// Why a single episode failed
#[derive(Debug, Error)]
pub enum EpisodeFailure {
    /// The episode page could not be resolved into a video URL
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// The video file could not be downloaded
    #[error(transparent)]
    Download(#[from] DownloadError),
}

impl EpisodeFailure {
    /// Cause category of this failure
    pub fn kind(&self) -> FailureKind {
        match self {
            EpisodeFailure::Resolution(ResolutionError::NoVideo { reason, .. }) => match reason {
                SourceNotFound::NoVideoElement => FailureKind::NoVideo,
                SourceNotFound::NoMp4Source | SourceNotFound::InvalidSourceUrl { .. } => {
                    FailureKind::NoMp4Source
                }
            },
            EpisodeFailure::Resolution(_) => FailureKind::PageFetch,
            EpisodeFailure::Download(DownloadError::SizeUnknown { .. }) => FailureKind::SizeUnknown,
            EpisodeFailure::Download(_) => FailureKind::DownloadIo,
        }
    }
}

/// A failed episode as recorded in the [`BatchReport`]
#[derive(Debug)]
pub struct FailedEpisode {
    /// Episode number taken from the page URL
    pub number: u32,
    /// The episode page that was attempted
    pub page_url: String,
    /// What went wrong
    pub failure: EpisodeFailure,
}

/// Outcome of a whole batch
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Files written during this run, in episode order
    pub downloaded: Vec<PathBuf>,
    /// Files that already existed and were skipped
    pub skipped: Vec<PathBuf>,
    /// Episodes that failed
    pub failed: Vec<FailedEpisode>,
}

/// Errors that prevent a batch from starting
///
/// Failures of individual episodes are never reported through this type,
/// see [`ProgressEvent::EpisodeFailed`] and [`BatchReport::failed`].
#[derive(Debug, Error)]
pub enum EpisodeDownloaderError {
    /// No URL was given
    #[error("URL is empty")]
    EmptyUrl,

    /// The seed URL is not a valid absolute URL
    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    /// The seed URL has no `episode-<number>` part
    #[error("Cannot parse episode number from {0}")]
    MissingEpisodeNumber(String),

    /// Zero episodes were requested
    #[error("Episode count must be at least 1")]
    InvalidCount,

    /// The HTTP client could not be set up
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] HttpClientError),

    /// The output directory could not be created
    #[error("Failed to create output directory {path}: {source}")]
    OutputDirectory { path: PathBuf, source: io::Error },
}

/// Result of processing one episode that did not fail
enum EpisodeOutcome {
    Downloaded(PathBuf),
    Skipped(PathBuf),
}

/// Downloads `count` consecutive episodes, starting at the one `seed_url` points to
///
/// The episode number is read from the `episode-<number>` part of the seed
/// URL; episodes `number ..= number + count - 1` are then resolved and
/// downloaded one after another. A failing episode is reported and skipped,
/// it never stops the batch.
///
/// Progress events are emitted through the provided callback, allowing library
/// users to render progress bars, log, or remain silent.
///
/// # Arguments
///
/// * `seed_url` - URL of the first episode page, e.g. `https://site.example/show/episode-3`
/// * `count` - Number of episodes to process, including the first
/// * `options` - Output directory and request settings
/// * `progress_callback` - Closure called with progress events
///
/// # Returns
///
/// A `BatchReport` with the outcome of every episode, or an error if the
/// input is invalid and no episode was attempted.
///
/// # Examples
///
/// ```no_run
/// use episode_downloader::{DownloadOptions, ProgressEvent, download_episodes};
///
/// let report = download_episodes(
///     "https://site.example/show/episode-1",
///     3,
///     &DownloadOptions::default(),
///     |event| {
///         if let ProgressEvent::EpisodeDownloaded { number, path } = event {
///             println!("Episode {} saved to {}", number, path.display());
///         }
///     },
/// )
/// .unwrap();
///
/// println!("{} failed", report.failed.len());
/// ```
pub fn download_episodes<F>(
    seed_url: &str,
    count: u32,
    options: &DownloadOptions,
    mut progress_callback: F,
) -> Result<BatchReport, EpisodeDownloaderError>
where
    F: FnMut(ProgressEvent),
{
    let seed_url = seed_url.trim();
    if seed_url.is_empty() {
        return Err(EpisodeDownloaderError::EmptyUrl);
    }

    Url::parse(seed_url).map_err(|source| EpisodeDownloaderError::InvalidUrl {
        url: seed_url.to_string(),
        source,
    })?;

    let first_episode = extract_number(seed_url);
    if first_episode == 0 {
        return Err(EpisodeDownloaderError::MissingEpisodeNumber(
            seed_url.to_string(),
        ));
    }

    if count == 0 {
        return Err(EpisodeDownloaderError::InvalidCount);
    }
    let last_episode = first_episode.saturating_add(count - 1);

    let client = options.http.build_client()?;

    std::fs::create_dir_all(&options.output_dir).map_err(|source| {
        EpisodeDownloaderError::OutputDirectory {
            path: options.output_dir.clone(),
            source,
        }
    })?;

    progress_callback(ProgressEvent::Started {
        first_episode,
        last_episode,
    });

    let mut report = BatchReport::default();

    for page_url in sequence(seed_url, first_episode, last_episode) {
        let number = extract_number(&page_url);

        progress_callback(ProgressEvent::ResolvingEpisode {
            number,
            page_url: page_url.clone(),
        });

        match process_episode(&client, &page_url, options, &mut progress_callback) {
            Ok(EpisodeOutcome::Downloaded(path)) => {
                progress_callback(ProgressEvent::EpisodeDownloaded {
                    number,
                    path: path.clone(),
                });
                report.downloaded.push(path);
            }
            Ok(EpisodeOutcome::Skipped(path)) => {
                progress_callback(ProgressEvent::EpisodeSkipped {
                    number,
                    path: path.clone(),
                });
                report.skipped.push(path);
            }
            Err(failure) => {
                tracing::warn!(number, page = %page_url, error = %failure, "episode failed");
                progress_callback(ProgressEvent::EpisodeFailed {
                    number,
                    page_url: page_url.clone(),
                    kind: failure.kind(),
                    reason: failure.to_string(),
                });
                report.failed.push(FailedEpisode {
                    number,
                    page_url,
                    failure,
                });
            }
        }
    }

    progress_callback(ProgressEvent::Complete {
        downloaded: report.downloaded.len(),
        skipped: report.skipped.len(),
        failed: report.failed.len(),
    });

    Ok(report)
}

/// Resolves and downloads a single episode
fn process_episode<F>(
    client: &Client,
    page_url: &str,
    options: &DownloadOptions,
    progress_callback: &mut F,
) -> Result<EpisodeOutcome, EpisodeFailure>
where
    F: FnMut(ProgressEvent),
{
    let episode = resolve_episode(client, page_url)?;
    let file_name = episode.file_name();
    let destination = options.output_dir.join(&file_name);

    progress_callback(ProgressEvent::EpisodeResolved {
        number: episode.number,
        download_url: episode.download_url.clone(),
        quality: episode.quality,
        file_name,
    });

    if options.skip_existing && destination.exists() {
        return Ok(EpisodeOutcome::Skipped(destination));
    }

    let number = episode.number;
    let path = download_episode(client, &episode, &destination, |progress| {
        progress_callback(ProgressEvent::DownloadProgress { number, progress })
    })?;

    Ok(EpisodeOutcome::Downloaded(path))
}
