//! Connection settings for the local extension endpoint.

use std::fmt;
use std::time::Duration;

use zeroize::Zeroizing;

use crate::error::ConfigError;

/// Environment variable that overrides the extension's HTTP port.
pub const PORT_ENV: &str = "PARAMETERS_SECRETS_EXTENSION_HTTP_PORT";
/// Environment variable holding the ambient session token.
pub const SESSION_TOKEN_ENV: &str = "AWS_SESSION_TOKEN";
/// Port the extension listens on when `PORT_ENV` is unset.
pub const DEFAULT_PORT: u16 = 2773;

/// Session token copied into the auth header of every request.
///
/// The buffer is zeroed on drop and never printed by `Debug`.
#[derive(Clone, Default)]
pub struct SessionToken(Zeroizing<String>);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Zeroizing::new(token.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("SessionToken(<empty>)")
        } else {
            f.write_str("SessionToken(<redacted>)")
        }
    }
}

/// Where the extension lives and how to authenticate with it.
#[derive(Debug, Clone)]
pub struct ExtensionConfig {
    pub port: u16,
    pub session_token: SessionToken,
    /// Deadline applied to every call that does not pass its own.
    pub timeout: Option<Duration>,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            session_token: SessionToken::default(),
            timeout: None,
        }
    }
}

impl ExtensionConfig {
    pub fn new(port: u16, session_token: impl Into<String>) -> Self {
        Self {
            port,
            session_token: SessionToken::new(session_token),
            timeout: None,
        }
    }

    /// Reads the port and session token from the process environment.
    ///
    /// The token is read once here, not per request.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup(PORT_ENV) {
            Some(raw) if !raw.trim().is_empty() => {
                raw.trim()
                    .parse::<u16>()
                    .map_err(|source| ConfigError::InvalidPort {
                        var: PORT_ENV,
                        value: raw.clone(),
                        source,
                    })?
            }
            _ => DEFAULT_PORT,
        };
        let session_token = SessionToken::new(lookup(SESSION_TOKEN_ENV).unwrap_or_default());

        Ok(Self {
            port,
            session_token,
            timeout: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }
}
