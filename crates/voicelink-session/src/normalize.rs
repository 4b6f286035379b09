//! Stock destination normalizers for [`crate::RouterBridge`].

use url::Url;

/// Reduces an absolute `http(s)` URL to `path?query#fragment`.
///
/// Agents often send full URLs while in-app routers expect paths. Relative
/// destinations and non-web URLs are returned unchanged.
pub fn path_only(destination: &str) -> String {
    let Ok(url) = Url::parse(destination) else {
        return destination.to_string();
    };
    if !matches!(url.scheme(), "http" | "https") {
        return destination.to_string();
    }

    let mut out = url.path().to_string();
    if let Some(query) = url.query() {
        out.push('?');
        out.push_str(query);
    }
    if let Some(fragment) = url.fragment() {
        out.push('#');
        out.push_str(fragment);
    }
    out
}
