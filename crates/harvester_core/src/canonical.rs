//! URL canonicalization and classification for pin media assets.
use std::fmt;
use std::sync::LazyLock;

use engine_logging::engine_debug;
use regex::Regex;
use url::Url;

/// Domain shared by every asset host.
pub const ASSET_DOMAIN: &str = "pinimg.com";
pub const IMAGE_HOST: &str = "i.pinimg.com";
pub const VIDEO_HOST: &str = "v.pinimg.com";

const ORIGINALS: &str = "originals";
const THUMBNAILS_MARKER: &str = "thumbnails";
const FALLBACK_EXTENSION: &str = "bin";
const KNOWN_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "mp4", "webm"];

/// A scaled-variant marker such as `236x` or `736x1104`.
static TIER_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+x").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolutionTier {
    Originals,
    /// A scaled variant such as `236x` or `736x1104`.
    Scaled(String),
    /// Streaming video has no tier segment.
    NotApplicable,
    Unknown,
}

impl ResolutionTier {
    pub fn of(url: &str) -> Self {
        if is_video_url(url) {
            return ResolutionTier::NotApplicable;
        }
        let Ok(parsed) = Url::parse(url) else {
            return ResolutionTier::Unknown;
        };
        let Some(segments) = parsed.path_segments() else {
            return ResolutionTier::Unknown;
        };
        for segment in segments {
            if segment == ORIGINALS {
                return ResolutionTier::Originals;
            }
            if is_tier_segment(segment) {
                return ResolutionTier::Scaled(segment.to_string());
            }
        }
        ResolutionTier::Unknown
    }
}

impl fmt::Display for ResolutionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionTier::Originals => write!(f, "originals"),
            ResolutionTier::Scaled(label) => write!(f, "{label}"),
            ResolutionTier::NotApplicable => write!(f, "stream"),
            ResolutionTier::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A normalized locator for one asset at its best available variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalUrl {
    pub url: String,
    pub kind: MediaKind,
    pub tier: ResolutionTier,
}

/// Rewrites a raw locator to its full-size variant and classifies it.
///
/// Returns `None` only for blank input. The result is not validated; see
/// [`is_valid`].
pub fn canonicalize(raw: &str) -> Option<CanonicalUrl> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if is_video_url(raw) {
        return Some(CanonicalUrl {
            url: raw.to_string(),
            kind: MediaKind::Video,
            tier: ResolutionTier::NotApplicable,
        });
    }

    let url = upgrade_resolution(raw);
    let tier = ResolutionTier::of(&url);
    Some(CanonicalUrl {
        url,
        kind: MediaKind::Image,
        tier,
    })
}

/// Replaces the first `<digits>x` path segment with `originals`.
fn upgrade_resolution(raw: &str) -> String {
    let mut parsed = match Url::parse(raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            engine_debug!("url upgrade failed for {raw}: {err}");
            return raw.to_string();
        }
    };
    let Some(segments) = parsed.path_segments() else {
        return raw.to_string();
    };
    let mut segments: Vec<String> = segments.map(str::to_string).collect();
    let Some(index) = segments.iter().position(|s| is_tier_segment(s)) else {
        return raw.to_string();
    };
    segments[index] = ORIGINALS.to_string();
    parsed.set_path(&format!("/{}", segments.join("/")));
    parsed.to_string()
}

fn is_tier_segment(segment: &str) -> bool {
    TIER_MARKER.is_match(segment)
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
}

fn is_video_host(host: &str) -> bool {
    if host == VIDEO_HOST {
        return true;
    }
    // Numbered edge hosts such as v1.pinimg.com.
    host.strip_suffix(ASSET_DOMAIN)
        .and_then(|prefix| prefix.strip_suffix('.'))
        .and_then(|label| label.strip_prefix('v'))
        .map(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

fn is_image_host(host: &str) -> bool {
    (host == ASSET_DOMAIN || host.ends_with(".pinimg.com")) && !is_video_host(host)
}

/// `true` for URLs served by the streaming-video asset host.
pub fn is_video_url(url: &str) -> bool {
    host_of(url).map(|h| is_video_host(&h)).unwrap_or(false)
}

pub fn is_valid(url: &str) -> bool {
    if url.trim().is_empty() || url.contains(THUMBNAILS_MARKER) {
        return false;
    }
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = parsed.host_str().map(str::to_ascii_lowercase) else {
        return false;
    };
    if is_video_host(&host) {
        return true;
    }
    is_image_host(&host) && parsed.path().starts_with("/originals/")
}

/// Canonicalizes and validates in one step.
pub fn accept(raw: &str) -> Option<CanonicalUrl> {
    canonicalize(raw).filter(|c| is_valid(&c.url))
}

/// Resolves the archive file extension for an asset.
pub fn extension_of(url: &str, content_type: Option<&str>) -> &'static str {
    if is_video_url(url) {
        return "mp4";
    }
    if let Some(ext) = content_type.and_then(extension_for_content_type) {
        return ext;
    }
    extension_from_suffix(url).unwrap_or(FALLBACK_EXTENSION)
}

fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "video/mp4" => Some("mp4"),
        "image/gif" => Some("gif"),
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

fn extension_from_suffix(url: &str) -> Option<&'static str> {
    let without_tail = url.split(['?', '#']).next().unwrap_or(url);
    let last_segment = without_tail.rsplit('/').next()?;
    let (_, suffix) = last_segment.rsplit_once('.')?;
    let suffix = suffix.to_ascii_lowercase();
    KNOWN_EXTENSIONS.iter().copied().find(|known| *known == suffix)
}
