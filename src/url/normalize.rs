use crate::{UrlError, UrlResult};
use url::form_urlencoded;
use url::Url;

/// List of tracking query parameters to remove during normalization
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "ref", "source"];

/// Switches controlling how aggressively URLs are canonicalized
///
/// Fragment removal, host lowercasing, default-port removal, dot-segment and
/// trailing-slash cleanup always apply; the flags below are the optional rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Drop a leading `www.` from the host
    pub remove_www: bool,
    /// Rewrite `http://` to `https://`
    pub force_https: bool,
    /// Drop `utm_*` and other tracking query parameters
    pub strip_tracking_params: bool,
    /// Sort the remaining query parameters by key
    pub sort_query_params: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            remove_www: true,
            force_https: false,
            strip_tracking_params: true,
            sort_query_params: true,
        }
    }
}

/// Normalizes a URL so that equivalent forms compare equal
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if it is not an absolute http(s) URL
/// 2. Optionally enforce HTTPS
/// 3. Lowercase the host, optionally removing the `www.` prefix
/// 4. Remove the port when it is the scheme's default
/// 5. Normalize path:
///    - Remove dot segments (. and ..) and repeated slashes
///    - Remove trailing slash (except for root /)
///    - Empty path becomes /
/// 6. Remove fragment (everything after #)
/// 7. Optionally remove tracking query parameters and sort the rest
/// 8. Remove empty query string (trailing ?)
///
/// The result is a fixed point: normalizing it again yields the same URL.
///
/// # Examples
///
/// ```
/// use pagewise::url::{normalize_url, NormalizeOptions};
///
/// let url = normalize_url("http://WWW.EXAMPLE.COM:80/page/#top", &NormalizeOptions::default()).unwrap();
/// assert_eq!(url.as_str(), "http://example.com/page");
/// ```
pub fn normalize_url(url_str: &str, options: &NormalizeOptions) -> UrlResult<Url> {
    let trimmed = url_str.trim();
    if trimmed.is_empty() {
        return Err(UrlError::InvalidUrl("empty URL".to_string()));
    }

    let mut url =
        Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(format!("{}: {}", trimmed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if options.force_https && url.scheme() == "http" {
        url.set_scheme("https")
            .map_err(|_| UrlError::Malformed(format!("Cannot upgrade {} to https", trimmed)))?;
    }

    let mut host = url
        .host_str()
        .map(|h| h.to_lowercase())
        .ok_or(UrlError::MissingDomain)?;
    // Strip every leading `www.`, not just the first
    while options.remove_www && host.len() > 4 && host.starts_with("www.") {
        host = host[4..].to_string();
    }
    if url.host_str() != Some(host.as_str()) {
        url.set_host(Some(&host))
            .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;
    }

    if url.port().is_some() && url.port() == default_port(url.scheme()) {
        url.set_port(None)
            .map_err(|_| UrlError::Malformed(format!("Failed to clear port on {}", trimmed)))?;
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    match url.query() {
        None => {}
        Some("") => url.set_query(None),
        Some(_) if options.strip_tracking_params || options.sort_query_params => {
            let params = filter_query_params(&url, options);
            if params.is_empty() {
                url.set_query(None);
            } else {
                let query = form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(params)
                    .finish();
                url.set_query(Some(&query));
            }
        }
        Some(_) => {}
    }

    Ok(url)
}

/// Returns true when both URLs normalize to the same page
///
/// Unparseable input never matches anything.
pub fn is_same_page(a: &str, b: &str, options: &NormalizeOptions) -> bool {
    match (normalize_url(a, options), normalize_url(b, options)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

/// Normalizes a URL path by removing dot segments, empty segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

/// Applies the query rules selected in `options`
fn filter_query_params(url: &Url, options: &NormalizeOptions) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !(options.strip_tracking_params && is_tracking_param(key)))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if options.sort_query_params {
        // Stable sort keeps repeated keys in their original order
        params.sort_by(|a, b| a.0.cmp(&b.0));
    }

    params
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
