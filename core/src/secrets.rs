//! `Secrets`: typed access to the secret store through the extension.

use std::time::Duration;

use tracing::debug;

use crate::client::{check_status, ExtensionClient};
use crate::config::ExtensionConfig;
use crate::error::{ApiError, ConfigError, Resource};
use crate::http::{HttpRequest, HttpResponse};
use crate::retry::RetryConfig;
use crate::types::SecretOutput;

/// Extension path serving secret lookups.
pub const SECRETS_PATH: &str = "/secretsmanager/get";

/// Optional selectors for a secret lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretOption {
    VersionId(String),
    /// A staging label such as `AWSCURRENT` or `AWSPREVIOUS`.
    VersionStage(String),
}

impl SecretOption {
    pub fn key(&self) -> &'static str {
        match self {
            SecretOption::VersionId(_) => "versionId",
            SecretOption::VersionStage(_) => "versionStage",
        }
    }

    pub fn value(&self) -> String {
        match self {
            SecretOption::VersionId(id) => id.clone(),
            SecretOption::VersionStage(stage) => stage.clone(),
        }
    }
}

/// Client for `GET /secretsmanager/get`.
#[derive(Debug, Clone)]
pub struct Secrets {
    client: ExtensionClient,
}

impl Secrets {
    pub fn new(config: ExtensionConfig) -> Self {
        Self {
            client: ExtensionClient::new(config, SECRETS_PATH),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        ExtensionConfig::from_env().map(Self::new)
    }

    /// Like `from_env`, but panics when the environment is invalid.
    pub fn must_from_env() -> Self {
        Self::from_env().unwrap_or_else(|err| panic!("Secrets::must_from_env(): {err}"))
    }

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

    pub fn get(&self, secret_id: &str, options: &[SecretOption]) -> Result<SecretOutput, ApiError> {
        self.fetch(secret_id, options, None)
    }

    pub fn get_with_timeout(
        &self,
        secret_id: &str,
        options: &[SecretOption],
        timeout: Duration,
    ) -> Result<SecretOutput, ApiError> {
        self.fetch(secret_id, options, Some(timeout))
    }

    pub fn build_get(&self, secret_id: &str, options: &[SecretOption]) -> HttpRequest {
        let mut query = Vec::with_capacity(options.len() + 1);
        query.push(("secretId", secret_id.to_string()));
        query.extend(options.iter().map(|opt| (opt.key(), opt.value())));
        self.client.build_request(query)
    }

    pub fn parse_get(&self, response: HttpResponse) -> Result<SecretOutput, ApiError> {
        let body = check_status(response).map_err(|source| ApiError::Request {
            resource: Resource::Secret,
            source,
        })?;
        let output: SecretOutput = serde_json::from_str(&body).map_err(|source| ApiError::Decode {
            resource: Resource::Secret,
            source,
        })?;
        debug!(name = %output.name, version_id = %output.version_id, "decoded secret");
        Ok(output)
    }

    fn fetch(
        &self,
        secret_id: &str,
        options: &[SecretOption],
        timeout: Option<Duration>,
    ) -> Result<SecretOutput, ApiError> {
        let request = self.build_get(secret_id, options);
        let response = self
            .client
            .execute(&request, timeout)
            .map_err(|source| ApiError::Request {
                resource: Resource::Secret,
                source,
            })?;
        self.parse_get(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"
        {
            "ARN": "arn:aws:secretsmanager:us-west-2:123456789012:secret:MyTestDatabaseSecret-a1b2c3",
            "CreatedDate": 1.523477145713E9,
            "Name": "MyTestDatabaseSecret",
            "SecretString": "{\"username\":\"david\",\"password\":\"EXAMPLE-PASSWORD\"}",
            "VersionId": "EXAMPLE1-90ab-cdef-fedc-ba987SECRET1",
            "VersionStages": ["AWSPREVIOUS"]
        }
    "#;

    fn secrets() -> Secrets {
        Secrets::new(ExtensionConfig::new(2773, "session"))
    }

    #[test]
    fn build_get_with_options() {
        let req = secrets().build_get(
            "foo",
            &[
                SecretOption::VersionId("EXAMPLE1-90ab-cdef-fedc-ba987SECRET1".into()),
                SecretOption::VersionStage("AWSPREVIOUS".into()),
            ],
        );
        assert_eq!(
            req.url,
            "http://localhost:2773/secretsmanager/get?secretId=foo&versionId=EXAMPLE1-90ab-cdef-fedc-ba987SECRET1&versionStage=AWSPREVIOUS"
        );
    }

    #[test]
    fn build_get_percent_encodes_secret_id() {
        let req = secrets().build_get("prod/db creds", &[]);
        assert_eq!(
            req.url,
            "http://localhost:2773/secretsmanager/get?secretId=prod%2Fdb+creds"
        );
    }

    #[test]
    fn parse_get_success() {
        let output = secrets().parse_get(HttpResponse::new(200, BODY)).unwrap();
        assert_eq!(output.name, "MyTestDatabaseSecret");
        assert_eq!(output.version_id, "EXAMPLE1-90ab-cdef-fedc-ba987SECRET1");
        assert_eq!(output.version_stages, vec!["AWSPREVIOUS".to_string()]);
        assert_eq!(output.created_date, "1523477145.713");
        assert!(output.secret_string.contains("EXAMPLE-PASSWORD"));
    }

    #[test]
    fn parse_get_treats_null_as_empty() {
        let output = secrets()
            .parse_get(HttpResponse::new(
                200,
                r#"{"Name":"s","SecretString":null,"VersionStages":null}"#,
            ))
            .unwrap();
        assert_eq!(output.name, "s");
        assert!(output.secret_string.is_empty());
        assert!(output.version_stages.is_empty());
    }

    #[test]
    fn parse_get_bad_json() {
        let err = secrets().parse_get(HttpResponse::new(200, "{\"Name\":")).unwrap_err();
        assert!(matches!(err, ApiError::Decode { resource: Resource::Secret, .. }));
    }

    #[test]
    fn parse_get_error_status() {
        let err = secrets()
            .parse_get(HttpResponse::new(404, "secret not found"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to get secret - http request error: 404 Not Found: secret not found"
        );
    }
}
