//! Shared GET-and-decode helper behind `Parameters` and `Secrets`.
//!
//! # Design
//! `ExtensionClient` holds the resolved config, the resource path, a
//! `ureq::Agent` and an optional `RetryConfig`. It carries no state between
//! calls. Request building and status checking are pure; `execute` is the
//! single place that performs I/O.

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use url::Url;

use crate::config::ExtensionConfig;
use crate::error::RequestError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::retry::RetryConfig;

/// Header the extension reads the session token from.
pub const TOKEN_HEADER: &str = "X-Aws-Parameters-Secrets-Token";

#[derive(Clone)]
pub struct ExtensionClient {
    config: ExtensionConfig,
    path: &'static str,
    agent: ureq::Agent,
    retry: Option<RetryConfig>,
}

impl fmt::Debug for ExtensionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionClient")
            .field("config", &self.config)
            .field("path", &self.path)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ExtensionClient {
    pub fn new(config: ExtensionConfig, path: &'static str) -> Self {
        Self {
            config,
            path,
            agent: default_agent(),
            retry: None,
        }
    }

    pub fn config(&self) -> &ExtensionConfig {
        &self.config
    }

    pub fn retry_config(&self) -> Option<&RetryConfig> {
        self.retry.as_ref()
    }

    pub fn set_retry(&mut self, retry: RetryConfig) {
        self.retry = Some(retry);
    }

    /// Replace the HTTP agent. Status codes are interpreted by this crate,
    /// so the agent should be built with `http_status_as_error(false)`.
    pub fn set_agent(&mut self, agent: ureq::Agent) {
        self.agent = agent;
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.config.base_url(), self.path)
    }

    /// Build a GET for `query`, sorted by key and form-urlencoded.
    pub fn build_request(&self, mut query: Vec<(&str, String)>) -> HttpRequest {
        // Stable sort keeps repeated keys in caller order.
        query.sort_by(|a, b| a.0.cmp(b.0));

        let endpoint = self.endpoint();
        let url = match Url::parse(&endpoint) {
            Ok(mut url) => {
                if !query.is_empty() {
                    let mut pairs = url.query_pairs_mut();
                    for (key, value) in &query {
                        pairs.append_pair(key, value);
                    }
                }
                url.to_string()
            }
            // The endpoint is `http://localhost:<u16><path>`, which always parses.
            Err(_) => endpoint,
        };

        HttpRequest {
            method: HttpMethod::Get,
            url,
            headers: vec![(
                TOKEN_HEADER.to_string(),
                self.config.session_token.expose().to_string(),
            )],
        }
    }

    /// Perform `request`, retrying transient statuses when retry is enabled.
    ///
    /// `timeout` overrides the configured default deadline for this call.
    pub fn execute(
        &self,
        request: &HttpRequest,
        timeout: Option<Duration>,
    ) -> Result<HttpResponse, RequestError> {
        let timeout = timeout.or(self.config.timeout);
        let deadline = timeout.map(|t| (Instant::now() + t, t));
        let max_retries = self.retry.as_ref().map_or(0, |r| r.max_retries);

        let mut attempt: u32 = 0;
        loop {
            let remaining = match deadline {
                Some((at, total)) => {
                    let now = Instant::now();
                    if now >= at {
                        return Err(RequestError::DeadlineExceeded(total));
                    }
                    Some(at - now)
                }
                None => None,
            };

            debug!(
                method = request.method.as_str(),
                url = %request.url,
                attempt = attempt + 1,
                "sending request to extension"
            );
            let response = match self.send_once(request, remaining) {
                Ok(response) => response,
                // The attempt used up the rest of the caller's deadline.
                Err(RequestError::Transport(ureq::Error::Timeout(_)))
                    if deadline.is_some_and(|(at, _)| Instant::now() >= at) =>
                {
                    return Err(RequestError::DeadlineExceeded(timeout.unwrap_or_default()));
                }
                Err(err) => return Err(err),
            };

            let retry = match &self.retry {
                Some(retry) if attempt < max_retries && retry.is_retryable(response.status) => {
                    retry
                }
                _ => return Ok(response),
            };

            let delay = retry.delay_for(attempt);
            if let Some((at, total)) = deadline {
                if Instant::now() + delay >= at {
                    return Err(RequestError::DeadlineExceeded(total));
                }
            }
            warn!(
                status = response.status,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                "extension returned a transient status, retrying"
            );
            thread::sleep(delay);
            attempt += 1;
        }
    }

    fn send_once(
        &self,
        request: &HttpRequest,
        timeout: Option<Duration>,
    ) -> Result<HttpResponse, RequestError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.agent.get(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let mut config = builder.config().http_status_as_error(false);
        // Without a deadline the agent's own timeouts apply.
        if let Some(timeout) = timeout {
            config = config.timeout_global(Some(timeout));
        }
        let mut response = config.build().call()?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = response.body_mut().read_to_string()?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Body of a 200 response, or a `Status` error carrying status and body.
pub fn check_status(response: HttpResponse) -> Result<String, RequestError> {
    if response.status == 200 {
        return Ok(response.body);
    }
    Err(RequestError::Status {
        status: response.status,
        body: response.body,
    })
}

fn default_agent() -> ureq::Agent {
    ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent()
}
