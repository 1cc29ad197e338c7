//! Anti-forgery token handling
//!
//! The server sets a `csrftoken` cookie when a page is rendered and rejects
//! any mutating request that does not echo it back in `X-CSRFToken`.

/// Cookie carrying the anti-forgery token
pub const CSRF_COOKIE: &str = "csrftoken";

/// Header the token must be echoed in
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Session cookie of an authenticated browser session
pub const SESSION_COOKIE: &str = "sessionid";

/// Extract the token from a `Cookie` header value (`a=1; csrftoken=xyz; b=2`)
pub fn token_from_cookie_header(header: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == CSRF_COOKIE)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_among_other_cookies() {
        let header = "sessionid=s3cr3t; csrftoken=AbC123; theme=dark";
        assert_eq!(token_from_cookie_header(header).as_deref(), Some("AbC123"));
    }

    #[test]
    fn test_token_alone_and_quoted() {
        assert_eq!(token_from_cookie_header("csrftoken=\"q\"").as_deref(), Some("q"));
    }

    #[test]
    fn test_missing_or_empty_token() {
        assert_eq!(token_from_cookie_header("sessionid=abc"), None);
        assert_eq!(token_from_cookie_header("csrftoken="), None);
        assert_eq!(token_from_cookie_header(""), None);
        // Name must match exactly
        assert_eq!(token_from_cookie_header("xcsrftoken=1"), None);
    }
}
