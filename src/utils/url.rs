//! Helpers for turning the configured backend origin into request URLs.

/// Strip trailing slashes so endpoint joins never produce `//`.
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// The REST root for a backend origin: `<origin>/api`.
///
/// An origin that already ends in `/api` is left alone.
///
/// ```
/// use chatpdf::utils::url::api_base_url;
///
/// assert_eq!(api_base_url("http://localhost:8001/"), "http://localhost:8001/api");
/// assert_eq!(api_base_url("https://pdf.example.com/api"), "https://pdf.example.com/api");
/// ```
pub fn api_base_url(origin: &str) -> String {
    let origin = normalize_base_url(origin);
    if origin.ends_with("/api") {
        origin
    } else {
        construct_api_url(&origin, "api")
    }
}

/// Join `endpoint` onto `base_url` with exactly one slash between them.
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}

/// Basic sanity check for user-supplied backend origins.
pub fn validate_origin(origin: &str) -> Result<(), String> {
    let trimmed = origin.trim();
    if trimmed.is_empty() {
        return Err("backend URL cannot be empty".to_string());
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(format!(
            "backend URL must start with http:// or https:// (got {trimmed})"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_every_trailing_slash() {
        assert_eq!(
            normalize_base_url("http://localhost:8001///"),
            "http://localhost:8001"
        );
        assert_eq!(normalize_base_url("///"), "");
    }

    #[test]
    fn api_base_appends_prefix_once() {
        assert_eq!(
            api_base_url("http://localhost:8001"),
            "http://localhost:8001/api"
        );
        assert_eq!(
            api_base_url("http://localhost:8001/api/"),
            "http://localhost:8001/api"
        );
    }

    #[test]
    fn construct_joins_with_single_slash() {
        assert_eq!(
            construct_api_url("http://h/api/", "/sessions/1/messages"),
            "http://h/api/sessions/1/messages"
        );
        assert_eq!(construct_api_url("http://h/api", "models"), "http://h/api/models");
    }

    #[test]
    fn origin_must_be_http() {
        assert!(validate_origin("http://localhost:8001").is_ok());
        assert!(validate_origin("https://x.example").is_ok());
        assert!(validate_origin("localhost:8001").is_err());
        assert!(validate_origin("  ").is_err());
    }
}
