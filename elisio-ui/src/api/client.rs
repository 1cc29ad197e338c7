//! reqwest implementation of the Elisio API
//!
//! # API Reference
//! - List endpoints return Django-serialized records
//! - `/json/poem/{id}` returns a bare integer body
//! - Mutating requests need `X-CSRFToken` matching the `csrftoken` cookie

use async_trait::async_trait;
use elisio_common::config::ClientConfig;
use elisio_common::models::{
    AuthorRecord, BookRecord, OpusRecord, PoemRecord, ScanResponse, ScanResult, VerseMetadata,
};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{header, Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

use super::csrf::{token_from_cookie_header, CSRF_COOKIE, CSRF_HEADER, SESSION_COOKIE};
use super::CorpusApi;
use crate::error::{ApiError, ApiResult};
use crate::scan::ScanQuery;

/// User-Agent header sent with every request
const USER_AGENT: &str = concat!("elisio-ui/", env!("CARGO_PKG_VERSION"));

/// Elisio HTTP client
///
/// Holds one cookie jar for the lifetime of the client, so the session and
/// anti-forgery cookies set by the server are replayed like a browser would.
pub struct HttpApi {
    /// HTTP client for API requests
    http_client: Client,
    /// Server root, always ending in `/`
    base_url: Url,
    /// Cookie jar shared with `http_client`
    jar: Arc<Jar>,
}

impl HttpApi {
    /// Create a client for the configured server
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let mut base_url = Url::parse(&config.server_url).map_err(|e| {
            ApiError::InvalidInput(format!("invalid server URL '{}': {}", config.server_url, e))
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let jar = Arc::new(Jar::default());
        if let Some(session) = &config.session_id {
            jar.add_cookie_str(&format!("{}={}", SESSION_COOKIE, session), &base_url);
        }
        if let Some(token) = &config.csrf_token {
            jar.add_cookie_str(&format!("{}={}", CSRF_COOKIE, token), &base_url);
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(header::USER_AGENT, header::HeaderValue::from_static(USER_AGENT));

        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .cookie_provider(Arc::clone(&jar))
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http_client, base_url, jar })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL below the server root from path segments
    ///
    /// Segments are percent-encoded; a trailing `""` yields a trailing slash.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ApiError::InvalidInput(format!("server URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Anti-forgery token currently held in the cookie jar
    fn cookie_token(&self) -> Option<String> {
        let header = self.jar.cookies(&self.base_url)?;
        token_from_cookie_header(header.to_str().ok()?)
    }

    /// Anti-forgery token, loading the site root first if no cookie is held yet
    pub async fn csrf_token(&self) -> ApiResult<String> {
        if let Some(token) = self.cookie_token() {
            return Ok(token);
        }

        debug!(url = %self.base_url, "No csrftoken cookie, loading site root");
        self.http_client.get(self.base_url.clone()).send().await?;

        self.cookie_token()
            .ok_or_else(|| ApiError::MissingCsrfToken(self.base_url.to_string()))
    }

    pub(crate) fn get(&self, url: Url) -> RequestBuilder {
        self.http_client.get(url)
    }

    pub(crate) fn post(&self, url: Url) -> RequestBuilder {
        self.http_client.post(url)
    }

    pub(crate) fn delete(&self, url: Url) -> RequestBuilder {
        self.http_client.delete(url)
    }

    /// Send a request and map non-success statuses to errors
    pub(crate) async fn send(&self, request: RequestBuilder, url: &Url) -> ApiResult<Response> {
        debug!(url = %url, "Sending request");
        let response = request.send().await?;
        check_status(response, url).await
    }

    /// Send a mutating request with the anti-forgery header attached
    pub(crate) async fn send_mutating(
        &self,
        request: RequestBuilder,
        url: &Url,
    ) -> ApiResult<Response> {
        let token = self.csrf_token().await?;
        let request = request
            .header(CSRF_HEADER, token)
            .header(header::REFERER, self.base_url.as_str());
        self.send(request, url).await
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> ApiResult<T> {
        let response = self.send(self.get(url.clone()), &url).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Parse(format!("{}: {}", url.path(), e)))
    }

    /// GET whose body (if any) is irrelevant
    pub(crate) async fn get_empty(&self, url: Url) -> ApiResult<()> {
        self.send(self.get(url.clone()), &url).await?;
        Ok(())
    }
}

async fn check_status(response: Response, url: &Url) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status.as_u16() {
        401 | 403 => Err(ApiError::Forbidden(url.path().to_string())),
        404 => Err(ApiError::NotFound(url.path().to_string())),
        code => {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::Status { status: code, body })
        }
    }
}

/// Parse the bare integer body of `/json/poem/{id}`
///
/// A poem without verses yields `None` on the server side; that reads as 0.
pub(crate) fn parse_max_verse(body: &str) -> ApiResult<u32> {
    let body = body.trim();
    if body.is_empty() || body == "None" || body == "null" {
        return Ok(0);
    }
    body.parse::<u32>()
        .map_err(|e| ApiError::Parse(format!("max verse number '{}': {}", body, e)))
}

#[async_trait]
impl CorpusApi for HttpApi {
    async fn authors(&self) -> ApiResult<Vec<AuthorRecord>> {
        self.get_json(self.endpoint(&["json", "authors", ""])?).await
    }

    async fn opera(&self, author_id: i64) -> ApiResult<Vec<OpusRecord>> {
        let id = author_id.to_string();
        self.get_json(self.endpoint(&["json", "author", &id])?).await
    }

    async fn books(&self, opus_id: i64) -> ApiResult<Vec<BookRecord>> {
        let id = opus_id.to_string();
        self.get_json(self.endpoint(&["json", "opus", &id])?).await
    }

    async fn poems(&self, book_id: i64) -> ApiResult<Vec<PoemRecord>> {
        let id = book_id.to_string();
        self.get_json(self.endpoint(&["json", "book", &id])?).await
    }

    async fn max_verse_number(&self, poem_id: i64) -> ApiResult<u32> {
        let id = poem_id.to_string();
        let url = self.endpoint(&["json", "poem", &id])?;
        let body = self.send(self.get(url.clone()), &url).await?.text().await?;
        parse_max_verse(&body)
    }

    async fn verse(&self, poem_id: i64, number: u32) -> ApiResult<VerseMetadata> {
        let poem = poem_id.to_string();
        let verse = number.to_string();
        self.get_json(self.endpoint(&["json", "verse", &poem, &verse])?).await
    }

    async fn random_verse(&self) -> ApiResult<VerseMetadata> {
        self.get_json(self.endpoint(&["json", "verse", "random", ""])?).await
    }

    async fn scan(&self, query: &ScanQuery) -> ApiResult<ScanResult> {
        let segments = query.path_segments();
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
        let mut url = self.endpoint(&segments)?;
        url.query_pairs_mut().extend_pairs(query.query_pairs());

        let response: ScanResponse = self.get_json(url).await?;
        Ok(response.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(server_url: &str) -> HttpApi {
        let config = ClientConfig { server_url: server_url.to_string(), ..Default::default() };
        HttpApi::new(&config).unwrap()
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let api = api("http://elisio.example/app");
        assert_eq!(api.base_url().as_str(), "http://elisio.example/app/");
    }

    #[test]
    fn test_endpoint_paths() {
        let api = api("http://elisio.example/");
        assert_eq!(
            api.endpoint(&["json", "authors", ""]).unwrap().as_str(),
            "http://elisio.example/json/authors/"
        );
        assert_eq!(
            api.endpoint(&["json", "author", "3"]).unwrap().as_str(),
            "http://elisio.example/json/author/3"
        );
    }

    #[test]
    fn test_endpoint_below_prefix() {
        let api = api("http://elisio.example/app/");
        assert_eq!(
            api.endpoint(&["json", "poem", "5"]).unwrap().as_str(),
            "http://elisio.example/app/json/poem/5"
        );
    }

    #[test]
    fn test_endpoint_encodes_text_segment() {
        let api = api("http://elisio.example/");
        let url = api.endpoint(&["json", "scan", "text", "arma virumque/cano"]).unwrap();
        assert_eq!(url.path(), "/json/scan/text/arma%20virumque%2Fcano");
    }

    #[test]
    fn test_invalid_server_url() {
        let config = ClientConfig { server_url: "not a url".to_string(), ..Default::default() };
        assert!(matches!(HttpApi::new(&config), Err(ApiError::InvalidInput(_))));
    }

    #[test]
    fn test_configured_token_is_available() {
        let config = ClientConfig {
            server_url: "http://elisio.example/".to_string(),
            csrf_token: Some("preset".to_string()),
            session_id: Some("sess".to_string()),
            ..Default::default()
        };
        let api = HttpApi::new(&config).unwrap();
        assert_eq!(api.cookie_token().as_deref(), Some("preset"));
    }

    #[test]
    fn test_parse_max_verse() {
        assert_eq!(parse_max_verse("42").unwrap(), 42);
        assert_eq!(parse_max_verse(" 7\n").unwrap(), 7);
        assert_eq!(parse_max_verse("None").unwrap(), 0);
        assert!(matches!(parse_max_verse("many"), Err(ApiError::Parse(_))));
    }
}
