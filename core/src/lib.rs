//! Client for the local parameters and secrets extension.
//!
//! # Overview
//! A serverless function can run a caching extension next to it that serves
//! parameter-store and secret-store lookups on `localhost`. This crate issues
//! authenticated GET requests to that extension and decodes the JSON answers
//! into typed records.
//!
//! ```no_run
//! use extension_client::{ParameterOption, Parameters, Secrets};
//!
//! let parameters = Parameters::from_env()?.with_retry(3);
//! let db_host = parameters.get("/prod/db/host", &[ParameterOption::WithDecryption])?;
//! println!("{}", db_host.parameter.value);
//!
//! let secrets = Secrets::must_from_env();
//! let creds = secrets.get("prod/db", &[])?;
//! println!("{}", creds.name);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Design
//! - `Parameters` and `Secrets` are thin facades over one `ExtensionClient`.
//! - Each lookup is split into `build_get` (produces an `HttpRequest`) and
//!   `parse_get` (consumes an `HttpResponse`); `get` runs both around a real
//!   round trip with `ureq`.
//! - Port and session token come from the environment (`ExtensionConfig`).
//! - Retrying is opt-in and only covers transient statuses (`RetryConfig`).

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod parameters;
pub mod retry;
pub mod secrets;
pub mod types;

pub use client::{ExtensionClient, TOKEN_HEADER};
pub use config::{ExtensionConfig, SessionToken, DEFAULT_PORT, PORT_ENV, SESSION_TOKEN_ENV};
pub use error::{ApiError, ConfigError, RequestError, Resource};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use parameters::{ParameterOption, Parameters, PARAMETERS_PATH};
pub use retry::RetryConfig;
pub use secrets::{SecretOption, Secrets, SECRETS_PATH};
pub use types::{Parameter, ParameterOutput, SecretOutput};
