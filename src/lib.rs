//! Typed client for the Yandex Music web API.
//!
//! A shared [`http::Client`] builds, authenticates and executes requests;
//! thin services map one method call to one request:
//!
//! * [`queues::Queues`] - `list`, `get`
//! * [`tracks::Tracks`] - `get_tracks`, `get_download_info`
//!
//! Every call returns the decoded [`protocol::Response`] envelope together
//! with the [`http::RawResponse`] it came from. Check
//! [`Response::error`](protocol::Response::error) after each call: the API
//! reports logical failures inside the envelope, not through HTTP errors.
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

#[macro_use]
extern crate log;

pub mod config;
pub mod error;
pub mod http;
pub mod protocol;
pub mod queues;
pub mod signal;
pub mod token;
pub mod tracks;

pub use http::Client;
