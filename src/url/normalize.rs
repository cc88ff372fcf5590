use crate::UrlError;
use url::Url;

/// Normalizes a URL a caller asked to analyze
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace; reject empty input
/// 2. Default a missing scheme to `https`
/// 3. Parse the URL; reject if malformed
/// 4. Accept only HTTP and HTTPS
/// 5. Require a host
///
/// Unlike link resolution, the fragment and query are left untouched: the
/// caller's URL is fetched as given.
///
/// # Examples
///
/// ```
/// use page_lens::url::normalize_target;
///
/// let url = normalize_target("example.com/page").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/page");
/// ```
pub fn normalize_target(url_str: &str) -> Result<Url, UrlError> {
    let trimmed = url_str.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let candidate = if has_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed.trim_start_matches("//"))
    };

    let url = Url::parse(&candidate).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}

/// True when the input starts with `scheme://`
///
/// `example.com:8080/path` must not be read as scheme `example.com`, so a
/// bare `scheme:` prefix without slashes does not count.
fn has_scheme(input: &str) -> bool {
    match input.find("://") {
        Some(idx) => {
            let scheme = &input[..idx];
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
        }
        None => false,
    }
}
