//! Content types for embedded assets, inferred from the file extension.

use std::path::Path;

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Content type for `path`. Unknown extensions fall back to `application/octet-stream`.
///
/// Text types served to browsers carry `charset=utf-8`; everything else comes
/// from `mime_guess`.
pub fn from_path(path: impl AsRef<Path>) -> &'static str {
    let ext = path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "" => OCTET_STREAM,
        "js" | "mjs" | "cjs" => "text/javascript; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "html" | "htm" => "text/html; charset=utf-8",
        "txt" => "text/plain; charset=utf-8",
        "json" | "map" => "application/json",
        "webmanifest" => "application/manifest+json",
        "wasm" => "application/wasm",
        other => mime_guess::from_ext(other).first_raw().unwrap_or(OCTET_STREAM),
    }
}

pub fn is_javascript(content_type: &str) -> bool {
    content_type.starts_with("text/javascript")
}

pub fn is_stylesheet(content_type: &str) -> bool {
    content_type.starts_with("text/css")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions() {
        assert_eq!(from_path("assets/index-abc123.js"), "text/javascript; charset=utf-8");
        assert_eq!(from_path("assets/index-def456.css"), "text/css; charset=utf-8");
        assert_eq!(from_path("app/index.html"), "text/html; charset=utf-8");
        assert_eq!(from_path("logo.SVG"), "image/svg+xml");
        assert_eq!(from_path("pkg_bg.wasm"), "application/wasm");
        assert_eq!(from_path("assets/hero-9f8e7d.webp"), "image/webp");
    }

    #[test]
    fn unknown_extension_falls_back() {
        assert_eq!(from_path("data.bin"), OCTET_STREAM);
        assert_eq!(from_path("LICENSE"), OCTET_STREAM);
    }
}
