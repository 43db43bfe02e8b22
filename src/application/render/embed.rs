//! Embed URL normalization.
//!
//! Share links pasted by authors (watch pages, short links) are rewritten
//! into the provider's iframe-embeddable form. Anything unrecognized passes
//! through as a generic frame.

use serde::Serialize;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedProvider {
    Youtube,
    Vimeo,
    Generic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedTarget {
    pub url: String,
    pub provider: EmbedProvider,
}

impl EmbedTarget {
    fn generic(url: &str) -> Self {
        Self {
            url: url.to_string(),
            provider: EmbedProvider::Generic,
        }
    }
}

/// Normalize a share URL into its embeddable form.
pub fn normalize(raw_url: &str) -> EmbedTarget {
    let Ok(parsed) = Url::parse(raw_url) else {
        return EmbedTarget::generic(raw_url);
    };
    let host = parsed.host_str().unwrap_or("");
    let host = host.strip_prefix("www.").unwrap_or(host);

    if host == "youtube.com" || host.ends_with(".youtube.com") {
        if parsed.path().starts_with("/embed/") {
            return EmbedTarget {
                url: raw_url.to_string(),
                provider: EmbedProvider::Youtube,
            };
        }
        if parsed.path() == "/watch"
            && let Some((_, id)) = parsed.query_pairs().find(|(key, _)| key == "v")
            && !id.is_empty()
        {
            return EmbedTarget {
                url: format!("https://www.youtube.com/embed/{id}"),
                provider: EmbedProvider::Youtube,
            };
        }
        return EmbedTarget::generic(raw_url);
    }

    if host == "youtu.be" {
        if let Some(mut segments) = parsed.path_segments()
            && let Some(id) = segments.next()
            && !id.is_empty()
        {
            return EmbedTarget {
                url: format!("https://www.youtube.com/embed/{id}"),
                provider: EmbedProvider::Youtube,
            };
        }
        return EmbedTarget::generic(raw_url);
    }

    if host == "player.vimeo.com" {
        return EmbedTarget {
            url: raw_url.to_string(),
            provider: EmbedProvider::Vimeo,
        };
    }

    if host == "vimeo.com" {
        if let Some(mut segments) = parsed.path_segments()
            && let Some(id) = segments.next()
            && !id.is_empty()
            && id.chars().all(|c| c.is_ascii_digit())
        {
            return EmbedTarget {
                url: format!("https://player.vimeo.com/video/{id}"),
                provider: EmbedProvider::Vimeo,
            };
        }
        return EmbedTarget::generic(raw_url);
    }

    EmbedTarget::generic(raw_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn youtube_watch_url_is_rewritten() {
        let target = normalize("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42");
        assert_eq!(target.url, "https://www.youtube.com/embed/dQw4w9WgXcQ");
        assert_eq!(target.provider, EmbedProvider::Youtube);
    }

    #[test]
    fn youtube_short_link_is_rewritten() {
        let target = normalize("https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(target.url, "https://www.youtube.com/embed/dQw4w9WgXcQ");
        assert_eq!(target.provider, EmbedProvider::Youtube);
    }

    #[test]
    fn youtube_embed_url_passes_through() {
        let raw = "https://www.youtube.com/embed/dQw4w9WgXcQ";
        let target = normalize(raw);
        assert_eq!(target.url, raw);
        assert_eq!(target.provider, EmbedProvider::Youtube);
    }

    #[test]
    fn vimeo_numeric_path_is_rewritten() {
        let target = normalize("https://vimeo.com/76979871");
        assert_eq!(target.url, "https://player.vimeo.com/video/76979871");
        assert_eq!(target.provider, EmbedProvider::Vimeo);
    }

    #[test]
    fn vimeo_named_path_is_generic() {
        let raw = "https://vimeo.com/channels/staffpicks";
        let target = normalize(raw);
        assert_eq!(target.url, raw);
        assert_eq!(target.provider, EmbedProvider::Generic);
    }

    #[test]
    fn unknown_hosts_pass_through() {
        let raw = "https://www.figma.com/proto/abc123";
        let target = normalize(raw);
        assert_eq!(target.url, raw);
        assert_eq!(target.provider, EmbedProvider::Generic);
    }
}
