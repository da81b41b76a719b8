//! OAuth token used to authenticate against the Yandex Music API.
//!
//! The token is sent as `Authorization: OAuth <token>` on every request. It
//! grants full access to the account, so its `Debug` output is redacted and
//! it should only ever be read from a protected secrets file.
//!
//! # Secrets File
//!
//! ```toml
//! token = "y0_AgAAAAA..."
//! ```

use std::{fmt, fs, ops::Deref, path::Path, str::FromStr};

use veil::Redact;

use crate::error::{Error, Result};

/// OAuth access token.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Redact)]
pub struct Token(#[redact] String);

impl Token {
    /// Upper bound for the size of a secrets file.
    ///
    /// Tokens are well under a kilobyte; anything larger is not a secrets
    /// file and is refused before being read into memory.
    const MAX_FILE_SIZE: u64 = 1024;

    /// Loads the token from the `token` key of a TOML secrets file.
    ///
    /// # Errors
    ///
    /// Will return `Err` if:
    /// - the file cannot be read or is too large
    /// - the file is not valid TOML
    /// - the file does not contain a `token` string
    /// - the token is not a valid header value
    pub fn from_file<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();

        // Prevent out-of-memory condition: secrets file should be small.
        let file_size = fs::metadata(path)?.len();
        if file_size > Self::MAX_FILE_SIZE {
            return Err(Error::out_of_range(format!(
                "{} is too large ({file_size} bytes)",
                path.display()
            )));
        }

        let contents = fs::read_to_string(path)?;
        let value = contents.parse::<toml::Table>()?;

        match value.get("token").and_then(toml::Value::as_str) {
            Some(token) => token.parse(),
            None => Err(Error::unauthenticated(format!(
                "{} does not contain a token",
                path.display()
            ))),
        }
    }
}

impl FromStr for Token {
    type Err = Error;

    /// Parses a token, rejecting characters that cannot appear in an HTTP
    /// header value.
    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim();
        if token.is_empty() {
            return Err(Error::invalid_argument("token is empty"));
        }

        if let Some(illegal) = token
            .chars()
            .find(|chr| chr.is_whitespace() || chr.is_control() || !chr.is_ascii())
        {
            return Err(Error::invalid_argument(format!(
                "token contains illegal character {illegal:?}"
            )));
        }

        Ok(Self(token.to_owned()))
    }
}

impl Deref for Token {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
