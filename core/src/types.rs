//! Response records returned by the extension.
//!
//! # Design
//! Field names follow the store's PascalCase JSON. Missing and `null` fields
//! decode to their defaults and unknown fields are ignored, so older or newer extension
//! builds keep decoding. Timestamps are kept as text; the store sends epoch
//! seconds either as a JSON number or as a string, and both are accepted.
//! The mock extension defines its own copies of these shapes; the integration
//! tests catch drift between the two.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Envelope of a parameter lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ParameterOutput {
    #[serde(deserialize_with = "nullable")]
    pub parameter: Parameter,
}

/// A single parameter version.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Parameter {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    /// `String`, `StringList` or `SecureString`.
    #[serde(rename = "Type", deserialize_with = "nullable")]
    pub kind: String,
    #[serde(deserialize_with = "nullable")]
    pub value: String,
    #[serde(deserialize_with = "nullable")]
    pub version: i64,
    #[serde(deserialize_with = "timestamp")]
    pub last_modified_date: String,
    #[serde(rename = "ARN", deserialize_with = "nullable")]
    pub arn: String,
    #[serde(deserialize_with = "nullable")]
    pub data_type: String,
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("value", &"<redacted>")
            .field("version", &self.version)
            .field("last_modified_date", &self.last_modified_date)
            .field("arn", &self.arn)
            .field("data_type", &self.data_type)
            .finish()
    }
}

/// A single secret version.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SecretOutput {
    #[serde(rename = "ARN", deserialize_with = "nullable")]
    pub arn: String,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub version_id: String,
    #[serde(deserialize_with = "nullable")]
    pub secret_string: String,
    #[serde(deserialize_with = "nullable")]
    pub version_stages: Vec<String>,
    #[serde(deserialize_with = "timestamp")]
    pub created_date: String,
}

impl fmt::Debug for SecretOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretOutput")
            .field("arn", &self.arn)
            .field("name", &self.name)
            .field("version_id", &self.version_id)
            .field("secret_string", &"<redacted>")
            .field("version_stages", &self.version_stages)
            .field("created_date", &self.created_date)
            .finish()
    }
}

/// `null` decodes like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn timestamp<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(text)) => text,
        Some(Raw::Number(number)) => number.to_string(),
        None => String::new(),
    })
}
