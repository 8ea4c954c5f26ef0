//! Asset URLs that reach the page through its own network traffic rather than
//! through markup, such as JSON state embedded in scripts.
use std::sync::LazyLock;

use harvester_core::ASSET_DOMAIN;
use regex::Regex;

/// An absolute asset-host URL, ending at the first quote, bracket, separator
/// or whitespace.
static ASSET_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)https?://[a-z0-9.-]*pinimg\.com/[^\s"'<>\\)\],;}]+"#).expect("valid regex")
});

/// Asset-host URLs found in `text`, in order of first appearance, without
/// duplicates. JSON-escaped slashes are undone first.
pub fn scan_asset_urls(text: &str) -> Vec<String> {
    let unescaped = text.replace("\\/", "/").replace("\\u002F", "/");
    let mut found: Vec<String> = Vec::new();
    for hit in ASSET_URL.find_iter(&unescaped) {
        let url = hit.as_str();
        if is_asset_url(url) && !found.iter().any(|seen| seen == url) {
            found.push(url.to_string());
        }
    }
    found
}

fn is_asset_url(url: &str) -> bool {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_ascii_lowercase))
        .is_some_and(|host| host == ASSET_DOMAIN || host.ends_with(&format!(".{ASSET_DOMAIN}")))
}
