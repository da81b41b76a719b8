use std::time::Duration;

use url::Url;

use crate::{
    error::{Error, Result},
    token::Token,
};

/// Client configuration shared by every request.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Config {
    pub app_name: String,
    pub app_version: String,
    pub app_lang: String,

    pub user_agent: String,

    /// Absolute URL that relative API paths are resolved against.
    pub base_url: Url,

    /// OAuth token; anonymous requests are sent without one.
    pub token: Option<Token>,

    /// Upper bound for a single request, from connecting until the body is
    /// read.
    pub timeout: Duration,
}

impl Config {
    /// The URL of the Yandex Music API.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.music.yandex.net/";

    /// Default per-request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a configuration for the public API endpoint.
    ///
    /// # Panics
    ///
    /// Panics if the crate name, version or OS information cannot be turned
    /// into a valid `User-Agent`, or the default base URL is invalid.
    #[must_use]
    pub fn new(token: Option<Token>) -> Self {
        let app_name = env!("CARGO_PKG_NAME").to_owned();
        let app_version = env!("CARGO_PKG_VERSION").to_owned();
        let app_lang = "en".to_owned();

        // Additional `User-Agent` string checks on top of `reqwest::HeaderValue`.
        let illegal_chars = |chr| chr == '/' || chr == ';';
        if app_name.is_empty()
            || app_name.contains(illegal_chars)
            || app_version.is_empty()
            || app_version.contains(illegal_chars)
        {
            panic!("application name and/or version invalid (\"{app_name}\"; \"{app_version}\")");
        }

        let os_name = match std::env::consts::OS {
            "macos" => "osx",
            other => other,
        };
        let os_version = sysinfo::System::os_version()
            .filter(|version| !version.is_empty() && !version.contains(illegal_chars))
            .unwrap_or_else(|| String::from("0"));

        let user_agent = format!("{app_name}/{app_version} (Rust; {os_name}/{os_version})");
        trace!("user agent: {user_agent}");

        Self {
            app_name,
            app_version,
            app_lang,

            user_agent,

            base_url: Url::parse(Self::DEFAULT_BASE_URL).expect("invalid default base url"),
            token,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Points the client at another API endpoint, such as a mirror or a
    /// mock server.
    ///
    /// A trailing slash is appended when missing, so that relative paths
    /// resolve below the given path instead of replacing its last segment.
    ///
    /// # Errors
    ///
    /// Will return `Err` if `base_url` is not an absolute `http` or `https`
    /// URL.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        let mut url = Url::parse(base_url)?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(Error::invalid_argument(format!(
                "base url must be an http(s) url: {base_url}"
            )));
        }

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        self.base_url = url;
        Ok(self)
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(None)
    }
}
