//! In-process stand-in for the parameters and secrets extension.
//!
//! Serves the same two GET routes as the real extension, checks the session
//! token header, and can pretend to be warming up for the first N requests.
//! Stored records are fixed once the router is built; handlers only read.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{debug, info};
use uuid::Uuid;

pub const PARAMETERS_PATH: &str = "/systemsmanager/parameters/get/";
pub const SECRETS_PATH: &str = "/secretsmanager/get";
pub const TOKEN_HEADER: &str = "x-aws-parameters-secrets-token";
pub const NOT_READY_MESSAGE: &str = "not ready to serve traffic, please wait";
/// Value returned for a `SecureString` requested without decryption.
pub const ENCRYPTED_VALUE: &str = "AQICAHh4ENCRYPTEDVALUE==";
pub const CURRENT_STAGE: &str = "AWSCURRENT";
pub const PREVIOUS_STAGE: &str = "AWSPREVIOUS";

/// Environment variable naming the port to listen on.
pub const PORT_ENV: &str = "PARAMETERS_SECRETS_EXTENSION_HTTP_PORT";
/// Environment variable holding the token requests must carry.
pub const SESSION_TOKEN_ENV: &str = "AWS_SESSION_TOKEN";
/// Environment variable naming a JSON `Fixture` file to seed from.
pub const FIXTURE_ENV: &str = "MOCK_EXTENSION_FIXTURE";
pub const DEFAULT_PORT: u16 = 2773;

const REGION: &str = "us-east-1";
const ACCOUNT: &str = "123456789012";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ParameterVersion {
    pub version: i64,
    pub value: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default = "now_text")]
    pub last_modified_date: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StoredParameter {
    pub name: String,
    /// `String`, `StringList` or `SecureString`.
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default = "default_data_type")]
    pub data_type: String,
    #[serde(default)]
    pub versions: Vec<ParameterVersion>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SecretVersion {
    pub version_id: String,
    pub secret_string: String,
    #[serde(default)]
    pub stages: Vec<String>,
    #[serde(default = "now_epoch")]
    pub created_date: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StoredSecret {
    pub name: String,
    #[serde(default)]
    pub arn: Option<String>,
    #[serde(default)]
    pub versions: Vec<SecretVersion>,
}

/// Seed data, loadable from JSON.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub parameters: Vec<StoredParameter>,
    #[serde(default)]
    pub secrets: Vec<StoredSecret>,
}

/// The extension's state: stored records, expected token, request counter.
#[derive(Debug, Default)]
pub struct Extension {
    token: String,
    warmup: usize,
    parameters: HashMap<String, StoredParameter>,
    secrets: HashMap<String, StoredSecret>,
    hits: AtomicUsize,
}

impl Extension {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Self::default()
        }
    }

    pub fn from_fixture(token: impl Into<String>, fixture: Fixture) -> Self {
        let mut ext = Self::new(token);
        for parameter in fixture.parameters {
            ext.parameters.insert(parameter.name.clone(), parameter);
        }
        for secret in fixture.secrets {
            ext.secrets.insert(secret.name.clone(), secret);
        }
        ext
    }

    /// Answer the first `requests` requests with 400 "not ready".
    pub fn with_warmup(mut self, requests: usize) -> Self {
        self.warmup = requests;
        self
    }

    /// Store a new version of a parameter and return its version number.
    pub fn put_parameter(&mut self, name: &str, kind: &str, value: &str) -> i64 {
        let parameter = self
            .parameters
            .entry(name.to_string())
            .or_insert_with(|| StoredParameter {
                name: name.to_string(),
                kind: kind.to_string(),
                data_type: default_data_type(),
                versions: Vec::new(),
            });
        parameter.kind = kind.to_string();
        let version = parameter.versions.last().map_or(1, |v| v.version + 1);
        parameter.versions.push(ParameterVersion {
            version,
            value: value.to_string(),
            labels: Vec::new(),
            last_modified_date: now_text(),
        });
        version
    }

    /// Move `label` onto `version` of `name`. Returns false if either is unknown.
    pub fn label_parameter(&mut self, name: &str, version: i64, label: &str) -> bool {
        let Some(parameter) = self.parameters.get_mut(name) else {
            return false;
        };
        if !parameter.versions.iter().any(|v| v.version == version) {
            return false;
        }
        for v in &mut parameter.versions {
            v.labels.retain(|l| l != label);
            if v.version == version {
                v.labels.push(label.to_string());
            }
        }
        true
    }

    /// Store a new secret version as `AWSCURRENT`, demoting the previous one
    /// to `AWSPREVIOUS`. Returns the new version id.
    pub fn put_secret(&mut self, name: &str, secret_string: &str) -> String {
        let secret = self
            .secrets
            .entry(name.to_string())
            .or_insert_with(|| StoredSecret {
                name: name.to_string(),
                arn: None,
                versions: Vec::new(),
            });
        for v in &mut secret.versions {
            v.stages.retain(|s| s != PREVIOUS_STAGE);
            if let Some(pos) = v.stages.iter().position(|s| s == CURRENT_STAGE) {
                v.stages[pos] = PREVIOUS_STAGE.to_string();
            }
        }
        let version_id = Uuid::new_v4().to_string();
        secret.versions.push(SecretVersion {
            version_id: version_id.clone(),
            secret_string: secret_string.to_string(),
            stages: vec![CURRENT_STAGE.to_string()],
            created_date: now_epoch(),
        });
        version_id
    }

    /// Number of requests received so far, rejected ones included.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Port from a raw `PORT_ENV` value; unset or blank means `DEFAULT_PORT`.
pub fn listen_port(raw: Option<&str>) -> Result<u16, String> {
    match raw.map(str::trim) {
        None | Some("") => Ok(DEFAULT_PORT),
        Some(raw) => raw
            .parse::<u16>()
            .map_err(|err| format!("invalid {PORT_ENV} value {raw:?}: {err}")),
    }
}

pub type Shared = Arc<Extension>;

pub fn app(ext: Shared) -> Router {
    Router::new()
        .route(PARAMETERS_PATH, get(get_parameter))
        .route(SECRETS_PATH, get(get_secret))
        .with_state(ext)
}

pub async fn run(listener: TcpListener, ext: Shared) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock extension listening");
    }
    axum::serve(listener, app(ext)).await
}

#[derive(Debug, Deserialize)]
pub struct ParameterQuery {
    pub name: Option<String>,
    pub version: Option<String>,
    pub label: Option<String>,
    #[serde(rename = "withDecryption")]
    pub with_decryption: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SecretQuery {
    #[serde(rename = "secretId")]
    pub secret_id: Option<String>,
    #[serde(rename = "versionId")]
    pub version_id: Option<String>,
    #[serde(rename = "versionStage")]
    pub version_stage: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ParameterBody {
    name: String,
    #[serde(rename = "Type")]
    kind: String,
    value: String,
    version: i64,
    last_modified_date: String,
    #[serde(rename = "ARN")]
    arn: String,
    data_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ParameterEnvelope {
    parameter: ParameterBody,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SecretBody {
    #[serde(rename = "ARN")]
    arn: String,
    name: String,
    version_id: String,
    secret_string: String,
    version_stages: Vec<String>,
    created_date: f64,
}

#[derive(Debug, Serialize)]
struct StoreError {
    #[serde(rename = "__type")]
    kind: &'static str,
    message: String,
}

fn store_error(kind: &'static str, message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(StoreError { kind, message })).into_response()
}

/// Counts the request, then applies warm-up and token checks.
fn admit(ext: &Extension, headers: &HeaderMap) -> Result<(), Response> {
    let hit = ext.hits.fetch_add(1, Ordering::SeqCst) + 1;
    if hit <= ext.warmup {
        debug!(hit, warmup = ext.warmup, "still warming up");
        return Err((StatusCode::BAD_REQUEST, NOT_READY_MESSAGE).into_response());
    }
    let token = headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if token != ext.token {
        return Err((
            StatusCode::UNAUTHORIZED,
            "missing or invalid X-Aws-Parameters-Secrets-Token header",
        )
            .into_response());
    }
    Ok(())
}

async fn get_parameter(
    State(ext): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<ParameterQuery>,
) -> Response {
    if let Err(rejected) = admit(&ext, &headers) {
        return rejected;
    }
    let Some(name) = query.name.filter(|n| !n.is_empty()) else {
        return store_error(
            "ValidationException",
            "missing required query parameter: name".to_string(),
        );
    };
    let Some(parameter) = ext.parameters.get(&name) else {
        return store_error("ParameterNotFound", format!("parameter {name} not found"));
    };

    let selected = match (&query.version, &query.label) {
        (Some(raw), _) => match raw.parse::<i64>() {
            Ok(version) => parameter.versions.iter().find(|v| v.version == version),
            Err(_) => {
                return store_error("ValidationException", format!("invalid version {raw:?}"));
            }
        },
        (None, Some(label)) => parameter
            .versions
            .iter()
            .find(|v| v.labels.iter().any(|l| l == label)),
        (None, None) => parameter.versions.iter().max_by_key(|v| v.version),
    };
    let Some(version) = selected else {
        return store_error("ParameterVersionNotFound", format!("no matching version of {name}"));
    };

    let decrypt = query.with_decryption.as_deref() == Some("true");
    let value = if parameter.kind == "SecureString" && !decrypt {
        ENCRYPTED_VALUE.to_string()
    } else {
        version.value.clone()
    };

    Json(ParameterEnvelope {
        parameter: ParameterBody {
            name: parameter.name.clone(),
            kind: parameter.kind.clone(),
            value,
            version: version.version,
            last_modified_date: version.last_modified_date.clone(),
            arn: parameter_arn(&parameter.name),
            data_type: parameter.data_type.clone(),
        },
    })
    .into_response()
}

async fn get_secret(
    State(ext): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<SecretQuery>,
) -> Response {
    if let Err(rejected) = admit(&ext, &headers) {
        return rejected;
    }
    let Some(secret_id) = query.secret_id.filter(|s| !s.is_empty()) else {
        return store_error(
            "ValidationException",
            "missing required query parameter: secretId".to_string(),
        );
    };
    let Some(secret) = ext.secrets.get(&secret_id) else {
        return store_error(
            "ResourceNotFoundException",
            format!("Secrets Manager can't find the specified secret: {secret_id}"),
        );
    };

    let stage = query.version_stage.as_deref();
    let selected = secret.versions.iter().find(|v| {
        let id_matches = query.version_id.as_ref().map_or(true, |id| &v.version_id == id);
        let stage_matches = match stage {
            Some(stage) => v.stages.iter().any(|s| s == stage),
            None if query.version_id.is_some() => true,
            None => v.stages.iter().any(|s| s == CURRENT_STAGE),
        };
        id_matches && stage_matches
    });
    let Some(version) = selected else {
        return store_error(
            "ResourceNotFoundException",
            format!("no version of {secret_id} matches the requested id and stage"),
        );
    };

    Json(SecretBody {
        arn: secret
            .arn
            .clone()
            .unwrap_or_else(|| secret_arn(&secret.name)),
        name: secret.name.clone(),
        version_id: version.version_id.clone(),
        secret_string: version.secret_string.clone(),
        version_stages: version.stages.clone(),
        created_date: version.created_date,
    })
    .into_response()
}

fn parameter_arn(name: &str) -> String {
    let name = name.trim_start_matches('/');
    format!("arn:aws:ssm:{REGION}:{ACCOUNT}:parameter/{name}")
}

fn secret_arn(name: &str) -> String {
    format!("arn:aws:secretsmanager:{REGION}:{ACCOUNT}:secret:{name}")
}

fn default_kind() -> String {
    "String".to_string()
}

fn default_data_type() -> String {
    "text".to_string()
}

fn now_epoch() -> f64 {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    (elapsed.as_millis() as f64) / 1000.0
}

fn now_text() -> String {
    format!("{:.3}", now_epoch())
}
