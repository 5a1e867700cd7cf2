//! Page parser module
//!
//! This module inspects the markup of an episode page, finds its `<video>`
//! element and picks the best MP4 `<source>` by the quality advertised in the
//! `res` attribute.

use scraper::{ElementRef, Html};
use std::borrow::Cow;
use thiserror::Error;
use url::Url;

/// MIME type a `<source>` must declare to be considered
const MP4_MIME_TYPE: &str = "video/mp4";

/// Reasons why a page did not yield a downloadable source
///
/// These are ordinary outcomes for pages without a usable video; callers
/// skip the episode instead of aborting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceNotFound {
    /// The page contains no `<video>` element
    #[error("no video element on page")]
    NoVideoElement,

    /// The video element has no `video/mp4` source with a non-empty `src`
    #[error("no MP4 source in video element")]
    NoMp4Source,

    /// The selected `src` cannot be turned into an absolute URL
    #[error("invalid source URL {src:?}: {reason}")]
    InvalidSourceUrl { src: String, reason: String },
}

/// A `<source>` entry read off the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSource {
    /// The `src` attribute, entity-decoded
    pub url: String,
    /// Parsed `res` attribute, `0` when missing or malformed
    pub quality: u32,
}

/// The winning source, resolved against the page URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedSource {
    /// Absolute URL of the video file
    pub url: Url,
    /// Quality of the chosen source, `0` if unknown
    pub quality: u32,
}

/// Selects the highest quality MP4 source from an episode page
///
/// # Arguments
///
/// * `markup` - Raw bytes of the page body
/// * `page_url` - URL the page was fetched from, used to resolve relative sources
///
/// # Returns
///
/// The selected source with an absolute URL, or the reason no source was found.
pub fn select_best_source(markup: &[u8], page_url: &Url) -> Result<SelectedSource, SourceNotFound> {
    let text = decode_markup(markup);
    let document = Html::parse_document(&text);

    let video = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().name() == "video")
        .ok_or(SourceNotFound::NoVideoElement)?;

    let best = pick_best(mp4_candidates(video)).ok_or(SourceNotFound::NoMp4Source)?;
    let url = resolve_source_url(&best.url, page_url)?;

    Ok(SelectedSource {
        url,
        quality: best.quality,
    })
}

/// Decodes page bytes as UTF-8, falling back to Latin-1 for legacy pages
///
/// Latin-1 maps every byte to a character, so decoding itself never fails.
fn decode_markup(markup: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(markup) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(markup.iter().map(|&byte| char::from(byte)).collect()),
    }
}

/// Collects the `video/mp4` sources below a video element in document order
fn mp4_candidates(video: ElementRef<'_>) -> Vec<CandidateSource> {
    video
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| {
            element.value().name() == "source"
                && element.value().attr("type") == Some(MP4_MIME_TYPE)
        })
        .map(|element| CandidateSource {
            url: element.value().attr("src").unwrap_or_default().to_string(),
            quality: parse_quality(element.value().attr("res")),
        })
        .collect()
}

fn parse_quality(res: Option<&str>) -> u32 {
    res.and_then(|value| value.trim().parse().ok()).unwrap_or(0)
}

/// Picks the candidate with the highest quality, ignoring empty URLs
///
/// On equal quality the earlier candidate wins.
fn pick_best(candidates: Vec<CandidateSource>) -> Option<CandidateSource> {
    candidates
        .into_iter()
        .filter(|candidate| !candidate.url.trim().is_empty())
        .fold(None, |best, candidate| match best {
            Some(current) if current.quality >= candidate.quality => Some(current),
            _ => Some(candidate),
        })
}

/// Uses `src` as-is when absolute, otherwise resolves it against the page URL
fn resolve_source_url(src: &str, page_url: &Url) -> Result<Url, SourceNotFound> {
    let src = src.trim();
    match Url::parse(src) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            page_url
                .join(src)
                .map_err(|e| SourceNotFound::InvalidSourceUrl {
                    src: src.to_string(),
                    reason: e.to_string(),
                })
        }
        Err(e) => Err(SourceNotFound::InvalidSourceUrl {
            src: src.to_string(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("https://site.example/ep/1").unwrap()
    }

    fn select(markup: &str) -> Result<SelectedSource, SourceNotFound> {
        select_best_source(markup.as_bytes(), &page_url())
    }

    #[test]
    fn test_selects_highest_quality_regardless_of_order() {
        let markup = r#"<html><body><video>
            <source src="https://cdn.example/low.mp4" type="video/mp4" res="480">
            <source src="https://cdn.example/high.mp4" type="video/mp4" res="1080">
        </video></body></html>"#;
        let selected = select(markup).unwrap();
        assert_eq!(selected.url.as_str(), "https://cdn.example/high.mp4");
        assert_eq!(selected.quality, 1080);

        let reversed = r#"<video>
            <source src="https://cdn.example/high.mp4" type="video/mp4" res="1080">
            <source src="https://cdn.example/low.mp4" type="video/mp4" res="480">
        </video>"#;
        assert_eq!(select(reversed).unwrap().quality, 1080);
    }

    #[test]
    fn test_empty_src_is_never_selected() {
        let markup = r#"<video>
            <source src="" type="video/mp4" res="1080">
            <source src="a.mp4" type="video/mp4" res="480">
        </video>"#;
        let selected = select(markup).unwrap();
        assert_eq!(selected.url.as_str(), "https://site.example/ep/a.mp4");
        assert_eq!(selected.quality, 480);
    }

    #[test]
    fn test_only_empty_sources_is_not_found() {
        let markup = r#"<video>
            <source src="" type="video/mp4" res="1080">
            <source type="video/mp4" res="720">
        </video>"#;
        assert_eq!(select(markup), Err(SourceNotFound::NoMp4Source));
    }

    #[test]
    fn test_resolves_root_relative_source() {
        let markup = r#"<video><source src="/videos/a.mp4" type="video/mp4" res="720"></video>"#;
        assert_eq!(
            select(markup).unwrap().url.as_str(),
            "https://site.example/videos/a.mp4"
        );
    }

    #[test]
    fn test_resolves_protocol_relative_source() {
        let markup = r#"<video><source src="//cdn.example/a.mp4" type="video/mp4"></video>"#;
        assert_eq!(select(markup).unwrap().url.as_str(), "https://cdn.example/a.mp4");
    }

    #[test]
    fn test_decodes_entities_in_src() {
        let markup = r#"<video><source src="/v.mp4?a=1&amp;b=2" type="video/mp4" res="360"></video>"#;
        assert_eq!(
            select(markup).unwrap().url.as_str(),
            "https://site.example/v.mp4?a=1&b=2"
        );
    }

    #[test]
    fn test_ties_keep_first_candidate() {
        let markup = r#"<video>
            <source src="/first.mp4" type="video/mp4" res="720">
            <source src="/second.mp4" type="video/mp4" res="720">
        </video>"#;
        assert_eq!(
            select(markup).unwrap().url.as_str(),
            "https://site.example/first.mp4"
        );
    }

    #[test]
    fn test_malformed_res_is_quality_zero() {
        let markup = r#"<video>
            <source src="/hd.mp4" type="video/mp4" res="HD">
            <source src="/sd.mp4" type="video/mp4" res="240">
        </video>"#;
        let selected = select(markup).unwrap();
        assert_eq!(selected.url.as_str(), "https://site.example/sd.mp4");
        assert_eq!(selected.quality, 240);

        let unknown = r#"<video><source src="/x.mp4" type="video/mp4"></video>"#;
        assert_eq!(select(unknown).unwrap().quality, 0);
    }

    #[test]
    fn test_ignores_non_mp4_sources() {
        let markup = r#"<video>
            <source src="/a.webm" type="video/webm" res="2160">
            <source src="/a.mp4" type="video/mp4" res="720">
        </video>"#;
        assert_eq!(select(markup).unwrap().url.as_str(), "https://site.example/a.mp4");

        let webm_only = r#"<video><source src="/a.webm" type="video/webm" res="2160"></video>"#;
        assert_eq!(select(webm_only), Err(SourceNotFound::NoMp4Source));
    }

    #[test]
    fn test_no_video_element() {
        let markup = r#"<html><body><source src="/a.mp4" type="video/mp4"></body></html>"#;
        assert_eq!(select(markup), Err(SourceNotFound::NoVideoElement));
    }

    #[test]
    fn test_uses_first_video_element_only() {
        let markup = r#"
            <video id="trailer"><source src="/trailer.webm" type="video/webm"></video>
            <video id="episode"><source src="/episode.mp4" type="video/mp4" res="1080"></video>"#;
        assert_eq!(select(markup), Err(SourceNotFound::NoMp4Source));
    }

    #[test]
    fn test_latin1_fallback() {
        let markup = b"<p>Caf\xe9</p><video><source src=\"/a.mp4\" type=\"video/mp4\" res=\"480\"></video>";
        let selected = select_best_source(markup, &page_url()).unwrap();
        assert_eq!(selected.url.as_str(), "https://site.example/a.mp4");
        assert_eq!(decode_markup(b"Caf\xe9"), "Caf\u{e9}");
    }

    #[test]
    fn test_pick_best() {
        let candidates = vec![
            CandidateSource { url: "a".into(), quality: 360 },
            CandidateSource { url: " ".into(), quality: 2160 },
            CandidateSource { url: "b".into(), quality: 720 },
        ];
        assert_eq!(pick_best(candidates).unwrap().url, "b");
        assert_eq!(pick_best(Vec::new()), None);
    }
}
