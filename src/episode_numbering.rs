//! Episode numbering module
//!
//! Episode pages are addressed by URLs that carry their number as an
//! `episode-<digits>` fragment (e.g. `https://site.example/show/episode-7`).
//! This module reads that number and produces sibling URLs for other episodes.
//! Everything here is a pure string transform.

use regex::Regex;
use std::sync::LazyLock;

static EPISODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"episode-(\d+)").expect("episode pattern is a valid regex"));

/// Extracts the episode number from a URL
///
/// Only the first `episode-<digits>` occurrence is considered. Returns `0`
/// when the pattern is absent or the digits do not fit into a `u32`.
///
/// # Examples
///
/// ```
/// use episode_downloader::extract_number;
///
/// assert_eq!(extract_number("https://site.example/show/episode-7"), 7);
/// assert_eq!(extract_number("https://site.example/show/"), 0);
/// ```
pub fn extract_number(url: &str) -> u32 {
    EPISODE_PATTERN
        .captures(url)
        .and_then(|captures| captures.get(1))
        .and_then(|digits| digits.as_str().parse().ok())
        .unwrap_or(0)
}

/// Returns `url` with the first episode number replaced by `number`
///
/// The rest of the URL is left untouched. If the URL contains no episode
/// number it is returned unchanged, so callers should check
/// [`extract_number`] first.
pub fn with_number(url: &str, number: u32) -> String {
    EPISODE_PATTERN
        .replace(url, format!("episode-{number}").as_str())
        .into_owned()
}

/// Generates the page URLs for episodes `start..=end`, in ascending order
///
/// The iterator is lazy and owns its inputs, so it can be cloned and replayed.
/// It is empty when `end < start`.
pub fn sequence(
    base_url: &str,
    start: u32,
    end: u32,
) -> impl Iterator<Item = String> + Clone + use<> {
    let base_url = base_url.to_string();
    (start..=end).map(move |number| with_number(&base_url, number))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_number() {
        assert_eq!(extract_number("https://site.example/show/episode-7"), 7);
        assert_eq!(extract_number("https://site.example/episode-7/watch"), 7);
        assert_eq!(extract_number("https://site.example/show-episode-012"), 12);
    }

    #[test]
    fn test_extract_number_missing_pattern() {
        assert_eq!(extract_number("https://site.example/show/ep-7"), 0);
        assert_eq!(extract_number("https://site.example/episode-"), 0);
        assert_eq!(extract_number(""), 0);
    }

    #[test]
    fn test_extract_number_uses_first_occurrence() {
        assert_eq!(
            extract_number("https://site.example/episode-3/next/episode-4"),
            3
        );
    }

    #[test]
    fn test_extract_number_overflow_is_not_found() {
        assert_eq!(extract_number("https://site.example/episode-99999999999"), 0);
    }

    #[test]
    fn test_with_number() {
        assert_eq!(
            with_number("https://site.example/show/episode-7?lang=en", 12),
            "https://site.example/show/episode-12?lang=en"
        );
        assert_eq!(
            with_number("https://site.example/show/episode-007", 8),
            "https://site.example/show/episode-8"
        );
    }

    #[test]
    fn test_with_number_round_trip() {
        let url = "https://site.example/anime/title-episode-1/";
        for number in [0, 1, 9, 10, 250, u32::MAX] {
            assert_eq!(extract_number(&with_number(url, number)), number);
        }
    }

    #[test]
    fn test_with_number_without_pattern_is_noop() {
        let url = "https://site.example/show/";
        assert_eq!(with_number(url, 3), url);
    }

    #[test]
    fn test_sequence() {
        let urls: Vec<String> = sequence("https://site.example/episode-1", 3, 5).collect();
        assert_eq!(
            urls,
            vec![
                "https://site.example/episode-3",
                "https://site.example/episode-4",
                "https://site.example/episode-5",
            ]
        );
        let numbers: Vec<u32> = urls.iter().map(|url| extract_number(url)).collect();
        assert_eq!(numbers, vec![3, 4, 5]);
    }

    #[test]
    fn test_sequence_empty_when_reversed() {
        assert_eq!(sequence("https://site.example/episode-1", 5, 3).count(), 0);
    }

    #[test]
    fn test_sequence_is_restartable() {
        let urls = sequence("https://site.example/episode-1", 1, 2);
        let first: Vec<String> = urls.clone().collect();
        let second: Vec<String> = urls.collect();
        assert_eq!(first, second);
    }
}
