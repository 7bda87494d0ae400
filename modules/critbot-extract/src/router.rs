// Site detection: decide from the URL alone which extraction path to take.

/// What kind of site a URL points at. Determined without any HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteKind {
    /// Short-form social text (X / Twitter). Client-rendered.
    Social,
    /// Link aggregation / discussion (Reddit). Client-rendered.
    Discussion,
    /// Everything else. Static HTML is good enough.
    Generic,
}

impl SiteKind {
    pub fn classify(url: &str) -> Self {
        let host = match url::Url::parse(url.trim()) {
            Ok(parsed) => match parsed.host_str() {
                Some(host) => host.to_lowercase(),
                None => return SiteKind::Generic,
            },
            Err(_) => return SiteKind::Generic,
        };

        if host_matches(&host, "x.com") || host_matches(&host, "twitter.com") {
            return SiteKind::Social;
        }
        if host == "reddit.com" || host == "www.reddit.com" {
            return SiteKind::Discussion;
        }
        SiteKind::Generic
    }

    /// Whether static HTML is known to be useless for this site.
    pub fn needs_rendering(self) -> bool {
        matches!(self, SiteKind::Social | SiteKind::Discussion)
    }

    /// Element that signals the client-side app has rendered the content.
    pub fn wait_selector(self) -> Option<&'static str> {
        match self {
            SiteKind::Social => Some(crate::services::twitter::WAIT_SELECTOR),
            SiteKind::Discussion => Some(crate::services::reddit::WAIT_SELECTOR),
            SiteKind::Generic => None,
        }
    }
}

/// "x.com" matches "x.com" and "mobile.x.com" but not "box.com".
fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}
