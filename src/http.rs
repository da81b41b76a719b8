//! HTTP client with rate limiting and OAuth authentication for the Yandex
//! Music API.
//!
//! This module provides a wrapper around `reqwest::Client` that adds:
//! * Resolution of relative API paths against the configured base URL
//! * Form-encoded request bodies
//! * The `Authorization: OAuth <token>` header
//! * Request rate limiting
//! * Cancellation and JSON decoding of the response envelope
//!
//! # Rate Limiting
//!
//! * 50 calls per 5-second interval
//! * Allows bursts up to the maximum calls per interval
//! * Requests that would exceed the limit are delayed
//!
//! # Example
//!
//! ```rust
//! use yamusic::{config::Config, http::Client};
//! use tokio_util::sync::CancellationToken;
//!
//! let client = Client::new(&Config::new(Some(token)))?;
//! let cancel = CancellationToken::new();
//!
//! let request = client.new_request(Method::GET, "queues", None)?;
//! let (response, raw) = client.execute::<QueueList>(&cancel, request).await?;
//! ```

use std::{fmt::Debug, future::Future, num::NonZeroU32, time::Duration};

use futures_util::{FutureExt, TryFutureExt};
use governor::{DefaultDirectRateLimiter, Quota};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, AUTHORIZATION},
    Method, StatusCode, Url,
};
use serde::Deserialize;
use serde_json::error::Category;
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    error::{Error, ErrorKind, Result},
    protocol::{self, Response},
};

/// Metadata of the transport response.
///
/// The body has already been consumed by decoding; status and headers
/// remain available to callers that need them, e.g. to tell a 404 with an
/// error envelope apart from a 200 with one.
#[derive(Clone, Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub url: Url,
}

/// Decoded envelope together with the transport response it came from.
pub type Reply<T> = (Response<T>, RawResponse);

/// Response whose body is not a valid envelope.
///
/// Carried inside the returned [`Error`]; recover it with
/// [`Error::downcast`] to inspect the status the service answered with.
#[derive(Debug, thiserror::Error)]
#[error("{} from {}: {source}", .raw.status, .raw.url)]
pub struct DecodeError {
    pub raw: RawResponse,
    #[source]
    pub source: serde_json::Error,
}

impl DecodeError {
    /// `DataLoss` for a truncated body, `InvalidArgument` otherwise.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self.source.classify() {
            Category::Eof => ErrorKind::DataLoss,
            Category::Io => ErrorKind::Unknown,
            Category::Syntax | Category::Data => ErrorKind::InvalidArgument,
        }
    }
}

/// HTTP client with built-in rate limiting and authentication.
///
/// Shared by all services; it holds no per-call state, so a single instance
/// can serve concurrent tasks.
pub struct Client {
    /// Underlying client; only reached through the rate limiter.
    unlimited: reqwest::Client,

    /// Rate limiter for API quota compliance.
    rate_limiter: DefaultDirectRateLimiter,

    /// Base that relative API paths are resolved against.
    base_url: Url,

    /// Prebuilt `Authorization` header, marked sensitive.
    authorization: Option<HeaderValue>,
}

impl Client {
    /// Rolling window for the rate limit.
    const RATE_LIMIT_INTERVAL: Duration = Duration::from_secs(5);

    /// Maximum allowed API calls per interval.
    const RATE_LIMIT_CALLS_PER_INTERVAL: u8 = 50;

    /// Duration to keep idle connections alive.
    const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(60);

    /// `Content-Type` of form-encoded request bodies.
    pub const FORM_CONTENT: HeaderValue =
        HeaderValue::from_static("application/x-www-form-urlencoded");

    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// * HTTP client creation fails
    /// * The token cannot be used as a header value
    ///
    /// # Panics
    ///
    /// Panics if rate limit parameters are zero.
    pub fn new(config: &Config) -> Result<Self> {
        // Not having `Accept-Language` set is non-fatal.
        let mut headers = HeaderMap::new();
        if let Ok(lang) = HeaderValue::from_str(&config.app_lang) {
            headers.insert(ACCEPT_LANGUAGE, lang);
        }

        let http_client = reqwest::Client::builder()
            .tcp_keepalive(Self::KEEPALIVE_TIMEOUT)
            .timeout(config.timeout)
            .default_headers(headers)
            .user_agent(&config.user_agent)
            .build()?;

        let authorization = match config.token {
            Some(ref token) => {
                let mut value = HeaderValue::from_str(&format!("OAuth {token}"))?;
                value.set_sensitive(true);
                Some(value)
            }
            None => None,
        };

        let replenish_interval =
            Self::RATE_LIMIT_INTERVAL / u32::from(Self::RATE_LIMIT_CALLS_PER_INTERVAL);
        let quota = Quota::with_period(replenish_interval)
            .expect("quota time interval is zero")
            .allow_burst(
                NonZeroU32::new(Self::RATE_LIMIT_CALLS_PER_INTERVAL.into())
                    .expect("calls per interval is zero"),
            );

        Ok(Self {
            unlimited: http_client,
            rate_limiter: governor::RateLimiter::direct(quota),
            base_url: config.base_url.clone(),
            authorization,
        })
    }

    /// Builds a request for an API path relative to the base URL.
    ///
    /// `path` is resolved as given; callers embedding ids must make sure
    /// they are valid path segments. When `form` is given, the pairs are
    /// url-encoded into the body. No `Content-Type` is set here.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidArgument` error, without any I/O, if the base URL
    /// cannot be joined with `path` or is not an http(s) URL. Returns an
    /// error if the `Authorization` header cannot be added.
    pub fn new_request(
        &self,
        method: Method,
        path: &str,
        form: Option<&[(&str, &str)]>,
    ) -> Result<reqwest::Request> {
        // Check the URL early to not needlessly hit the rate limiter.
        if !matches!(self.base_url.scheme(), "http" | "https") {
            return Err(Error::invalid_argument(format!(
                "base url is not an http(s) url: {}",
                self.base_url
            )));
        }
        let url = self.base_url.join(path)?;

        let mut request = reqwest::Request::new(method, url);

        if let Some(pairs) = form {
            let body = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish();
            *request.body_mut() = Some(body.into());
        }

        if let Some(ref authorization) = self.authorization {
            request
                .headers_mut()
                .try_insert(AUTHORIZATION, authorization.clone())?;
        }

        Ok(request)
    }

    /// Sends a request once the rate limiter allows it.
    ///
    /// # Errors
    ///
    /// Returns error if request execution fails.
    pub fn send(
        &self,
        request: reqwest::Request,
    ) -> impl Future<Output = Result<reqwest::Response>> + '_ {
        let throttle = self.rate_limiter.until_ready();
        throttle.then(|()| self.unlimited.execute(request).map_err(Into::into))
    }

    /// Executes a request and decodes the response envelope.
    ///
    /// The HTTP status is not checked: any response whose body decodes as
    /// an envelope is returned, and logical failures are left in
    /// [`Response::error`]. An empty body yields the default envelope.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// * `cancel` fires before or during the exchange (`Cancelled`)
    /// * the request times out (`DeadlineExceeded`)
    /// * the network fails (`Unavailable`, `Aborted`, ...)
    /// * the body is not a valid envelope for `T`; the error carries a
    ///   [`DecodeError`] with the status and headers
    pub async fn execute<T>(
        &self,
        cancel: &CancellationToken,
        request: reqwest::Request,
    ) -> Result<Reply<T>>
    where
        T: for<'de> Deserialize<'de> + Default + Debug,
    {
        let origin = format!("{} {}", request.method(), request.url().path());
        if cancel.is_cancelled() {
            return Err(Error::cancelled(format!("{origin}: cancelled before dispatch")));
        }

        debug!("{origin}");
        tokio::select! {
            // Cancellation takes precedence over whatever the transport reports.
            biased;

            () = cancel.cancelled() => {
                debug!("{origin}: cancelled");
                Err(Error::cancelled(format!("{origin}: cancelled")))
            }

            reply = self.exchange(request, &origin) => reply,
        }
    }

    async fn exchange<T>(&self, request: reqwest::Request, origin: &str) -> Result<Reply<T>>
    where
        T: for<'de> Deserialize<'de> + Default + Debug,
    {
        let response = self.send(request).await?;
        let raw = RawResponse {
            status: response.status(),
            headers: response.headers().clone(),
            url: response.url().clone(),
        };

        let body = response.bytes().await?;
        trace!("{origin}: {} ({} bytes)", raw.status, body.len());

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok((Response::default(), raw));
        }

        match protocol::decode(&body, origin) {
            Ok(decoded) => Ok((decoded, raw)),
            Err(source) => {
                let error = DecodeError { raw, source };
                Err(Error::new(error.kind(), error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Token;

    fn client(token: Option<&str>) -> Client {
        let token = token.map(|token| token.parse::<Token>().unwrap());
        Client::new(&Config::new(token)).unwrap()
    }

    #[test]
    fn resolves_relative_paths() {
        let request = client(None)
            .new_request(Method::GET, "tracks/42/download-info", None)
            .unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://api.music.yandex.net/tracks/42/download-info"
        );
        assert!(request.body().is_none());
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn adds_oauth_header() {
        let request = client(Some("y0_secret"))
            .new_request(Method::GET, "queues", None)
            .unwrap();
        let authorization = request.headers().get(AUTHORIZATION).unwrap();
        assert_eq!(authorization, "OAuth y0_secret");
        assert!(authorization.is_sensitive());
    }

    #[test]
    fn encodes_form_body() {
        let request = client(None)
            .new_request(Method::POST, "tracks", Some(&[("track_ids", "1,2")]))
            .unwrap();
        let body = request.body().and_then(reqwest::Body::as_bytes).unwrap();
        assert_eq!(body, b"track_ids=1%2C2");
    }

    #[test]
    fn unusable_base_url_fails_without_io() {
        let mut config = Config::default();
        config.base_url = Url::parse("mailto:someone@example.com").unwrap();
        let client = Client::new(&config).unwrap();

        let err = client.new_request(Method::GET, "queues", None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn decode_error_kind_follows_json_category() {
        let raw = RawResponse {
            status: StatusCode::BAD_GATEWAY,
            headers: HeaderMap::new(),
            url: Url::parse("https://api.music.yandex.net/queues").unwrap(),
        };

        let source = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
        let error = DecodeError { raw: raw.clone(), source };
        assert_eq!(error.kind(), ErrorKind::InvalidArgument);
        assert!(error.to_string().starts_with("502 Bad Gateway from https://api.music.yandex.net/queues: "));

        let source = serde_json::from_str::<serde_json::Value>("{\"result\": [").unwrap_err();
        assert_eq!(DecodeError { raw, source }.kind(), ErrorKind::DataLoss);
    }

    #[tokio::test]
    async fn cancelled_token_skips_dispatch() {
        let client = client(None);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let request = client.new_request(Method::GET, "queues", None).unwrap();
        let err = client
            .execute::<protocol::queues::QueueList>(&cancel, request)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
