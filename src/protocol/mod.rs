//! Wire types of the Yandex Music API.
//!
//! Every response body shares the same envelope:
//!
//! ```json
//! {
//!     "invocationInfo": {
//!         "hostname": "music-stable-back-vla-12.vla.yp-c.yandex.net",
//!         "req-id": "1562058479226171-12417823578378217478",
//!         "exec-duration-millis": 2
//!     },
//!     "result": ...
//! }
//! ```
//!
//! On a logical failure the service still answers with a decodable body,
//! possibly with HTTP 200, and fills in `error` instead of `result`:
//!
//! ```json
//! {
//!     "invocationInfo": { ... },
//!     "error": {
//!         "name": "not-found",
//!         "message": "queue not found"
//!     }
//! }
//! ```
//!
//! Such responses are *not* turned into an [`Err`]; check
//! [`Response::error`] after every call, or opt in with
//! [`Response::into_result`].
//!
//! # Submodules
//!
//! * [`queues`] - saved playback queues
//! * [`tracks`] - track metadata and download variants

pub mod queues;
pub mod tracks;

use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use thiserror::Error;

use crate::error::{Error, Result};

/// Response envelope shared by all API endpoints.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
#[serde(bound(
    serialize = "T: Serialize",
    deserialize = "T: Deserialize<'de> + Default"
))]
pub struct Response<T> {
    /// Request tracing metadata
    #[serde(default)]
    #[serde(skip_serializing_if = "InvocationInfo::is_empty")]
    pub invocation_info: InvocationInfo,

    /// Logical failure reported by the service
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,

    /// Operation-specific payload; defaulted when the service omits it
    #[serde(default)]
    pub result: T,
}

impl<T> Response<T> {
    /// Returns the logical error reported by the service, if any.
    ///
    /// An `error` object with neither a name nor a message counts as no
    /// error.
    #[must_use]
    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref().filter(|error| !error.is_empty())
    }

    /// Whether the service reported success.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error().is_none()
    }

    /// Unwraps the payload, raising a reported logical error.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::FailedPrecondition`](crate::error::ErrorKind::FailedPrecondition)
    /// carrying the [`ApiError`] when the service filled in `error`.
    pub fn into_result(self) -> Result<T> {
        match self.error {
            Some(error) if !error.is_empty() => Err(Error::failed_precondition(error)),
            _ => Ok(self.result),
        }
    }
}

/// Request tracing metadata attached to every response.
///
/// Opaque to the client and kept exactly as received, including keys not
/// known here, so that it can be passed on when reporting problems
/// upstream. The accessors read the well-known keys.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Debug)]
#[serde(transparent)]
pub struct InvocationInfo(serde_json::Map<String, serde_json::Value>);

/// Server-side execution time, sent as either a number or a string.
#[serde_as]
#[derive(Deserialize)]
struct Millis(#[serde_as(as = "PickFirst<(_, DisplayFromStr)>")] u64);

impl InvocationInfo {
    #[must_use]
    pub fn hostname(&self) -> Option<&str> {
        self.0.get("hostname").and_then(serde_json::Value::as_str)
    }

    #[must_use]
    pub fn req_id(&self) -> Option<&str> {
        self.0.get("req-id").and_then(serde_json::Value::as_str)
    }

    #[must_use]
    pub fn exec_duration_millis(&self) -> Option<u64> {
        let value = self.0.get("exec-duration-millis")?;
        Millis::deserialize(value).ok().map(|Millis(millis)| millis)
    }

    /// Raw value of any key, known or not.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Logical error reported inside a response envelope.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Debug, Hash, Error)]
#[error("{name}: {message}")]
pub struct ApiError {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.message.is_empty()
    }
}

/// Parses and logs JSON responses from the API.
///
/// # Arguments
///
/// * `body` - Response body to parse
/// * `origin` - Description of the endpoint for logging
///
/// # Errors
///
/// Returns error if:
/// * Response body is not valid JSON
/// * JSON structure doesn't match type `T`
///
/// # Logging
///
/// * Success: Logs parsed structure at TRACE level
/// * Parse Error: Logs raw JSON at TRACE level if valid JSON
/// * Invalid JSON: Logs error and raw text at ERROR level
pub fn json<T>(body: &[u8], origin: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Debug,
{
    decode(body, origin).map_err(Into::into)
}

/// Like [`json`], but keeps the original `serde_json` error.
pub fn decode<T>(body: &[u8], origin: &str) -> serde_json::Result<T>
where
    T: for<'de> Deserialize<'de> + Debug,
{
    match serde_json::from_slice(body) {
        Ok(result) => {
            trace!("{origin}: {result:#?}");
            Ok(result)
        }
        Err(e) => {
            if let Ok(json) = serde_json::from_slice::<serde_json::Value>(body) {
                debug!("{origin}: unexpected response shape ({e})");
                trace!("{origin}: {json:#?}");
            } else {
                error!("{origin}: failed parsing response ({e})");
                trace!("{}", String::from_utf8_lossy(body));
            }
            Err(e)
        }
    }
}
