//! Error types for the extension client.
//!
//! # Design
//! Three layers, each wrapping its cause:
//! - `ConfigError` is returned while building a client from the environment.
//! - `RequestError` covers one GET round trip: a non-200 status, a transport
//!   failure, or a caller deadline that ran out.
//! - `ApiError` is what `Parameters::get` and `Secrets::get` return. It names
//!   the resource kind and separates request failures from decode failures.

use std::fmt;
use std::num::ParseIntError;
use std::time::Duration;

use thiserror::Error;
use ureq::http::StatusCode;

/// Errors raised while reading client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {var} value {value:?}: {source}")]
    InvalidPort {
        var: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// Errors from a single request to the extension.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The extension answered with something other than 200.
    #[error("{}", status_text(.status, .body))]
    Status { status: u16, body: String },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(#[from] ureq::Error),

    /// The caller's deadline ran out between retries.
    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

/// The resource kind a request was made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Parameter,
    Secret,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Parameter => f.write_str("parameter"),
            Resource::Secret => f.write_str("secret"),
        }
    }
}

/// Errors returned by the `Parameters` and `Secrets` facades.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("failed to get {resource} - http request error: {source}")]
    Request {
        resource: Resource,
        #[source]
        source: RequestError,
    },

    #[error("failed to get {resource} - json decode error: {source}")]
    Decode {
        resource: Resource,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    pub fn resource(&self) -> Resource {
        match self {
            ApiError::Request { resource, .. } | ApiError::Decode { resource, .. } => *resource,
        }
    }

    /// HTTP status of the response that caused this error, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Request {
                source: RequestError::Status { status, .. },
                ..
            } => Some(*status),
            _ => None,
        }
    }
}

/// Status line, then the body when there is one: `"400 Bad Request: not ready"`.
fn status_text(status: &u16, body: &str) -> String {
    let status = *status;
    let reason = StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason());
    let mut text = match reason {
        Some(reason) => format!("{status} {reason}"),
        None => status.to_string(),
    };
    if !body.is_empty() {
        text.push_str(": ");
        text.push_str(body);
    }
    text
}
