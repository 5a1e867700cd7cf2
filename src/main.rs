use clap::Parser;
use dialoguer::Input;
use episode_downloader::{DownloadOptions, ProgressEvent, TransferProgress, download_episodes};
use humansize::{BINARY, format_size};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Width of the progress bar in characters
const BAR_WIDTH: usize = 20;

/// Minimum time between two redraws of the progress line
const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Link to the first episode page (must contain `episode-<number>`);
    /// asked for interactively when omitted
    url: Option<String>,

    #[arg(short = 'n', long)]
    /// Number of consecutive episodes to download, including the first
    count: Option<u32>,

    #[arg(short, long, default_value = ".")]
    /// Directory the episode files are written to
    output_dir: PathBuf,

    #[arg(long)]
    /// Skip episodes whose file already exists
    skip_existing: bool,

    #[arg(short, long)]
    /// Print debug logging to stderr
    verbose: bool,
}

/// Renders progress events to stdout
///
/// Download progress is drawn as a single line that is rewritten in place.
#[derive(Default)]
struct ConsoleReporter {
    last_redraw: Option<Instant>,
}

impl ConsoleReporter {
    fn handle(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started {
                first_episode,
                last_episode,
            } => {
                println!("Downloading episodes {}-{}", first_episode, last_episode);
            }
            ProgressEvent::ResolvingEpisode { number, page_url } => {
                println!("\n[{:03}] Resolving {}", number, page_url);
            }
            ProgressEvent::EpisodeResolved {
                download_url,
                quality,
                ..
            } => {
                println!("📥 Downloading ({}p): {}", quality, download_url);
                self.last_redraw = None;
            }
            ProgressEvent::EpisodeSkipped { path, .. } => {
                println!("⏭️  Already exists, skipping: {}", path.display());
            }
            ProgressEvent::DownloadProgress { number, progress } => {
                self.draw_progress(number, progress);
            }
            ProgressEvent::EpisodeDownloaded { path, .. } => {
                self.last_redraw = None;
                println!("\n✅ Downloaded: {}", path.display());
            }
            ProgressEvent::EpisodeFailed {
                number,
                kind,
                reason,
                ..
            } => {
                // Terminate a progress line that may still be open
                if self.last_redraw.take().is_some() {
                    println!();
                }
                println!("❌ Episode {} failed ({}): {}", number, kind, reason);
            }
            ProgressEvent::Complete {
                downloaded,
                skipped,
                failed,
            } => {
                println!(
                    "\nAll episodes processed: {} downloaded, {} skipped, {} failed.",
                    downloaded, skipped, failed
                );
            }
        }
    }

    fn draw_progress(&mut self, number: u32, progress: TransferProgress) {
        let finished = progress.downloaded == progress.total;
        let now = Instant::now();
        if let Some(last) = self.last_redraw {
            if !finished && now.duration_since(last) < REDRAW_INTERVAL {
                return;
            }
        }
        self.last_redraw = Some(now);

        print!("\r{}", format_progress_line(number, progress));
        io::stdout().flush().ok();
    }
}

/// Formats a progress line like
/// `Episode 007: [==========          ]  50.0% 10 MiB / 20 MiB at 1.50 MiB/s`
fn format_progress_line(number: u32, progress: TransferProgress) -> String {
    let fraction = progress.fraction();
    let filled = ((fraction * BAR_WIDTH as f64) as usize).min(BAR_WIDTH);
    let bar = format!("{:<width$}", "=".repeat(filled), width = BAR_WIDTH);

    format!(
        "Episode {:03}: [{}] {:>5.1}% {} / {} at {}/s   ",
        number,
        bar,
        fraction * 100.0,
        format_size(progress.downloaded, BINARY),
        format_size(progress.total, BINARY),
        format_size(progress.bytes_per_second() as u64, BINARY),
    )
}

/// Prompts for the seed URL and the episode count
fn prompt_for_input() -> Result<(String, Option<u32>), dialoguer::Error> {
    let url: String = Input::new()
        .with_prompt("Link on episode")
        .allow_empty(true)
        .interact_text()?;

    let count: String = Input::new()
        .with_prompt("How many episodes to download (enter for 1)")
        .allow_empty(true)
        .interact_text()?;

    Ok((url, count.trim().parse().ok()))
}

fn init_logging(verbose: bool) {
    let default_directive = if verbose {
        "episode_downloader=debug"
    } else {
        "episode_downloader=warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let (url, count) = match args.url {
        Some(url) => (url, args.count),
        None => match prompt_for_input() {
            Ok((url, prompted_count)) => (url, args.count.or(prompted_count)),
            Err(e) => {
                eprintln!("Error: Failed to read input: {}", e);
                process::exit(1);
            }
        },
    };
    let count = count.filter(|&count| count > 0).unwrap_or(1);

    let options = DownloadOptions {
        output_dir: args.output_dir,
        skip_existing: args.skip_existing,
        ..DownloadOptions::default()
    };

    let mut reporter = ConsoleReporter::default();
    match download_episodes(&url, count, &options, |event| reporter.handle(event)) {
        Ok(report) => {
            if !report.failed.is_empty() {
                println!("Failed episodes:");
                for failed in &report.failed {
                    println!("  {:03} {} ({})", failed.number, failed.page_url, failed.failure.kind());
                }
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
