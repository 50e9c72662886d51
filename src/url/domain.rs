use url::Url;

/// Extracts the lowercase host of a URL, without port
///
/// # Examples
///
/// ```
/// use url::Url;
/// use pagewise::url::extract_domain;
///
/// let url = Url::parse("https://Shop.Example.com:8443/cart").unwrap();
/// assert_eq!(extract_domain(&url), Some("shop.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true if `url` is hosted on exactly `domain`
///
/// Subdomains are separate hosts: `blog.example.com` is not `example.com`.
pub fn is_same_domain(url: &Url, domain: &str) -> bool {
    url.host_str()
        .map(|host| host.eq_ignore_ascii_case(domain))
        .unwrap_or(false)
}
