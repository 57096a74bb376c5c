// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource (Connection) Definitions
//!
//! A resource is a named remote-access target. Its `attributes` become
//! columns of the connection row (`protocol`, `max_connections`, ...) and its
//! `parameters` become one parameter row each.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::DistinguishedName;

/// Ordered `name → value` mapping used for both attributes and parameters
pub type SettingMap = BTreeMap<String, String>;

/// Attribute every connection row must carry
pub const PROTOCOL_ATTRIBUTE: &str = "protocol";

/// Parameter overwritten per computer in the auto template
pub const HOSTNAME_PARAMETER: &str = "hostname";

/// Connection-row columns that may be set from configuration
///
/// Anything outside this list would have to be spliced into SQL as an
/// identifier, so configuration validation rejects it.
pub const CONNECTION_ATTRIBUTES: &[&str] = &[
    "protocol",
    "max_connections",
    "max_connections_per_user",
    "connection_weight",
    "failover_only",
    "proxy_hostname",
    "proxy_port",
    "proxy_encryption_method",
];

/// Integer columns; stored values read back without sign or leading zeros
const INTEGER_ATTRIBUTES: &[&str] = &[
    "max_connections",
    "max_connections_per_user",
    "connection_weight",
    "proxy_port",
];

/// Boolean column that reads back as `"true"` when set and not at all when clear
pub const FAILOVER_ATTRIBUTE: &str = "failover_only";

/// Enum column (`NONE` or `SSL`)
pub const ENCRYPTION_ATTRIBUTE: &str = "proxy_encryption_method";

/// Bring one attribute value to the form the store reads it back in
///
/// `Ok(None)` means the attribute is dropped: a clear `failover_only` is
/// indistinguishable from an absent one once stored.
pub fn canonical_attribute(name: &str, value: &str) -> Result<Option<String>, String> {
    let trimmed = value.trim();
    match name {
        FAILOVER_ATTRIBUTE => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Some("true".to_string())),
            "false" | "0" | "no" | "" => Ok(None),
            other => Err(format!("{name}: expected a boolean, got {other:?}")),
        },
        ENCRYPTION_ATTRIBUTE => {
            let upper = trimmed.to_ascii_uppercase();
            if upper == "NONE" || upper == "SSL" {
                Ok(Some(upper))
            } else {
                Err(format!("{name}: expected NONE or SSL, got {value:?}"))
            }
        }
        _ if INTEGER_ATTRIBUTES.contains(&name) => trimmed
            .parse::<i32>()
            .map(|n| Some(n.to_string()))
            .map_err(|_| format!("{name}: expected an integer, got {value:?}")),
        _ => Ok(Some(value.to_string())),
    }
}

/// Canonical form of a whole attribute map
///
/// Values that do not parse are kept verbatim; configuration validation
/// rejects them before a cycle ever runs.
pub fn canonical_attributes(attributes: &SettingMap) -> SettingMap {
    attributes
        .iter()
        .filter_map(|(name, value)| match canonical_attribute(name, value) {
            Ok(canonical) => canonical.map(|v| (name.clone(), v)),
            Err(_) => Some((name.clone(), value.clone())),
        })
        .collect()
}

/// Destination-assigned resource id (`connection_id`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub i64);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a definition came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceSource {
    /// Derived from an inventory computer
    Auto { computer: DistinguishedName },
    /// Declared in configuration
    Manual,
}

/// Desired state of one resource for the current cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDefinition {
    pub name: String,
    pub source: ResourceSource,
    pub attributes: SettingMap,
    pub parameters: SettingMap,
}

impl ResourceDefinition {
    /// The `protocol` attribute, if set
    pub fn protocol(&self) -> Option<&str> {
        self.attributes.get(PROTOCOL_ATTRIBUTE).map(String::as_str)
    }

    /// Derived from an inventory computer rather than declared
    pub fn is_auto(&self) -> bool {
        matches!(self.source, ResourceSource::Auto { .. })
    }
}

/// Attribute and parameter block shared by templates and defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTemplate {
    #[serde(default, deserialize_with = "scalar_settings")]
    pub attributes: SettingMap,
    #[serde(default, deserialize_with = "scalar_settings")]
    pub parameters: SettingMap,
}

/// Configuration files write `port: 3389` and `enable-drive: true`; the
/// store only knows strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
}

impl From<Scalar> for String {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Text(text) => text,
            Scalar::Integer(n) => n.to_string(),
            Scalar::Float(n) => n.to_string(),
            Scalar::Flag(flag) => flag.to_string(),
        }
    }
}

fn scalar_settings<'de, D>(deserializer: D) -> Result<SettingMap, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Scalar>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|(k, v)| (k, v.into())).collect())
}

impl ResourceTemplate {
    /// Shallow merge: keys of `overrides` win on collision
    pub fn merged_with(&self, overrides: &ResourceTemplate) -> ResourceTemplate {
        let mut attributes = self.attributes.clone();
        attributes.extend(overrides.attributes.clone());

        let mut parameters = self.parameters.clone();
        parameters.extend(overrides.parameters.clone());

        ResourceTemplate {
            attributes,
            parameters,
        }
    }
}

/// Manually declared resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualResource {
    pub name: String,
    /// Inherit the `defaults` block of the manual section
    #[serde(default = "default_use_defaults")]
    pub use_defaults: bool,
    #[serde(flatten)]
    pub settings: ResourceTemplate,
}

fn default_use_defaults() -> bool {
    true
}
