//! `Parameters`: typed access to the parameter store through the extension.

use std::time::Duration;

use tracing::debug;

use crate::client::{check_status, ExtensionClient};
use crate::config::ExtensionConfig;
use crate::error::{ApiError, ConfigError, Resource};
use crate::http::{HttpRequest, HttpResponse};
use crate::retry::RetryConfig;
use crate::types::ParameterOutput;

/// Extension path serving parameter lookups.
pub const PARAMETERS_PATH: &str = "/systemsmanager/parameters/get/";

/// Optional selectors for a parameter lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterOption {
    /// A specific version number.
    Version(u64),
    /// The version carrying this label.
    Label(String),
    /// Return `SecureString` values in plain text.
    WithDecryption,
}

impl ParameterOption {
    pub fn key(&self) -> &'static str {
        match self {
            ParameterOption::Version(_) => "version",
            ParameterOption::Label(_) => "label",
            ParameterOption::WithDecryption => "withDecryption",
        }
    }

    pub fn value(&self) -> String {
        match self {
            ParameterOption::Version(version) => version.to_string(),
            ParameterOption::Label(label) => label.clone(),
            ParameterOption::WithDecryption => "true".to_string(),
        }
    }
}

/// Client for `GET /systemsmanager/parameters/get/`.
#[derive(Debug, Clone)]
pub struct Parameters {
    client: ExtensionClient,
}

impl Parameters {
    pub fn new(config: ExtensionConfig) -> Self {
        Self {
            client: ExtensionClient::new(config, PARAMETERS_PATH),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        ExtensionConfig::from_env().map(Self::new)
    }

    /// Like `from_env`, but panics when the environment is invalid.
    pub fn must_from_env() -> Self {
        Self::from_env().unwrap_or_else(|err| panic!("Parameters::must_from_env(): {err}"))
    }

    /// Retry transient responses up to `max_retries` extra times.
    pub fn with_retry(self, max_retries: u32) -> Self {
        self.with_retry_config(RetryConfig::with_max_retries(max_retries))
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.client.set_retry(retry);
        self
    }

    pub fn with_agent(mut self, agent: ureq::Agent) -> Self {
        self.client.set_agent(agent);
        self
    }

    pub fn client(&self) -> &ExtensionClient {
        &self.client
    }

    pub fn get(
        &self,
        name: &str,
        options: &[ParameterOption],
    ) -> Result<ParameterOutput, ApiError> {
        self.fetch(name, options, None)
    }

    /// `get` bounded by `timeout`, retries included.
    pub fn get_with_timeout(
        &self,
        name: &str,
        options: &[ParameterOption],
        timeout: Duration,
    ) -> Result<ParameterOutput, ApiError> {
        self.fetch(name, options, Some(timeout))
    }

    pub fn get_with_decryption(&self, name: &str) -> Result<ParameterOutput, ApiError> {
        self.get(name, &[ParameterOption::WithDecryption])
    }

    pub fn build_get(&self, name: &str, options: &[ParameterOption]) -> HttpRequest {
        let mut query = Vec::with_capacity(options.len() + 1);
        query.push(("name", name.to_string()));
        query.extend(options.iter().map(|opt| (opt.key(), opt.value())));
        self.client.build_request(query)
    }

    pub fn parse_get(&self, response: HttpResponse) -> Result<ParameterOutput, ApiError> {
        let body = check_status(response).map_err(|source| ApiError::Request {
            resource: Resource::Parameter,
            source,
        })?;
        let output: ParameterOutput =
            serde_json::from_str(&body).map_err(|source| ApiError::Decode {
                resource: Resource::Parameter,
                source,
            })?;
        debug!(
            name = %output.parameter.name,
            version = output.parameter.version,
            "decoded parameter"
        );
        Ok(output)
    }

    fn fetch(
        &self,
        name: &str,
        options: &[ParameterOption],
        timeout: Option<Duration>,
    ) -> Result<ParameterOutput, ApiError> {
        let request = self.build_get(name, options);
        let response = self
            .client
            .execute(&request, timeout)
            .map_err(|source| ApiError::Request {
                resource: Resource::Parameter,
                source,
            })?;
        self.parse_get(response)
    }
}
