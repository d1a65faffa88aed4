//! Locator parsing for embedded sources.
//!
//! Embedded players are addressed by a short video identifier rather than a
//! URL. Users paste whatever link their browser shows, so the identifier has
//! to be recovered from several URL shapes.

use url::Url;

const SHARE_HOST: &str = "youtu.be";
const WATCH_HOST: &str = "youtube.com";
const ID_PATH_MARKERS: [&str; 3] = ["shorts", "embed", "live"];

/// Extracts the embedded-player identifier from a locator.
///
/// Supported shapes:
/// - `https://youtu.be/<id>`
/// - `https://www.youtube.com/watch?v=<id>` (any subdomain of `youtube.com`)
/// - `https://youtube.com/{shorts,embed,live}/<id>`
///
/// Returns `None` for blank, unparsable or unrecognised locators.
pub fn parse_embed_id(locator: &str) -> Option<String> {
    let trimmed = locator.trim();
    if trimmed.is_empty() {
        return None;
    }

    let url = Url::parse(trimmed).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let segments = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect::<Vec<_>>())
        .unwrap_or_default();

    if host == SHARE_HOST {
        return segments.first().map(|id| id.to_string());
    }

    if is_watch_host(host) {
        let watch_id = url
            .query_pairs()
            .find(|(key, value)| key == "v" && !value.is_empty());
        if let Some((_, id)) = watch_id {
            return Some(id.into_owned());
        }
        let marker = segments
            .iter()
            .position(|segment| ID_PATH_MARKERS.contains(segment))?;
        return segments.get(marker + 1).map(|id| id.to_string());
    }

    None
}

/// Returns `true` if the locator points at an embedded-player host.
pub fn is_embedded_locator(locator: &str) -> bool {
    let lower = locator.to_ascii_lowercase();
    lower.contains(SHARE_HOST) || lower.contains(WATCH_HOST)
}

/// `youtube.com` itself or any of its subdomains.
fn is_watch_host(host: &str) -> bool {
    host == WATCH_HOST
        || host
            .strip_suffix(WATCH_HOST)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_links() {
        assert_eq!(parse_embed_id("https://youtu.be/dQw4w9WgXcQ"), Some("dQw4w9WgXcQ".into()));
        assert_eq!(
            parse_embed_id("  https://youtu.be/dQw4w9WgXcQ?t=42  "),
            Some("dQw4w9WgXcQ".into())
        );
        assert_eq!(parse_embed_id("https://youtu.be/"), None);
    }

    #[test]
    fn watch_links() {
        assert_eq!(
            parse_embed_id("https://www.youtube.com/watch?v=abc123&t=10s"),
            Some("abc123".into())
        );
        assert_eq!(
            parse_embed_id("https://m.youtube.com/watch?feature=share&v=xyz"),
            Some("xyz".into())
        );
    }

    #[test]
    fn path_style_links() {
        assert_eq!(parse_embed_id("https://youtube.com/shorts/s1"), Some("s1".into()));
        assert_eq!(parse_embed_id("https://www.youtube.com/embed/e1"), Some("e1".into()));
        assert_eq!(parse_embed_id("https://www.youtube.com/live/l1?si=x"), Some("l1".into()));
        assert_eq!(parse_embed_id("https://www.youtube.com/shorts/"), None);
        assert_eq!(parse_embed_id("https://www.youtube.com/channel/c1"), None);
    }

    #[test]
    fn rejects_everything_else() {
        assert_eq!(parse_embed_id(""), None);
        assert_eq!(parse_embed_id("   "), None);
        assert_eq!(parse_embed_id("not a url"), None);
        assert_eq!(parse_embed_id("https://vimeo.com/12345"), None);
        assert_eq!(parse_embed_id("https://cdn.example.com/watch?v=abc"), None);
    }

    #[test]
    fn lookalike_hosts_are_not_watch_hosts() {
        assert_eq!(parse_embed_id("https://notyoutube.com/watch?v=abc"), None);
        assert_eq!(parse_embed_id("https://www.fakeyoutube.com/embed/e1"), None);
        assert_eq!(
            parse_embed_id("https://music.youtube.com/watch?v=m1"),
            Some("m1".into())
        );
    }

    #[test]
    fn detects_embedded_hosts() {
        assert!(is_embedded_locator("https://YouTu.be/abc"));
        assert!(is_embedded_locator("https://www.youtube.com/watch?v=abc"));
        assert!(!is_embedded_locator("https://cdn.example.com/match.mp4"));
    }
}
