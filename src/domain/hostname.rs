// Copyright (c) 2025 - Cowboy AI, Inc.
//! Hostname Value Object for Directory Computer Records
//!
//! `dNSHostName` values come straight out of the directory and end up as the
//! `hostname` parameter of a connection, and (under the passthrough DNS
//! policy) as the connection name itself. They are validated once, when the
//! computer record is mapped, so that nothing downstream has to re-check them.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Hostname validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostnameError {
    #[error("hostname is empty")]
    Empty,

    #[error("hostname exceeds 253 characters: {len}")]
    TooLong { len: usize },

    #[error("label exceeds 63 characters: {0}")]
    LabelTooLong(String),

    #[error("empty label in hostname: {0}")]
    EmptyLabel(String),

    #[error("invalid character {ch:?} in label {label}")]
    InvalidCharacter { label: String, ch: char },

    #[error("label cannot start or end with a hyphen: {0}")]
    HyphenEdge(String),
}

/// DNS hostname as published by the directory (RFC 1123 rules)
///
/// A single trailing dot (absolute form) is accepted and stripped. Case is
/// preserved, since the broker shows connection names verbatim.
///
/// ```rust
/// use guacamole_dirsync::domain::Hostname;
///
/// let host = Hostname::new("host1.example.com.").unwrap();
/// assert_eq!(host.as_str(), "host1.example.com");
/// assert!(Hostname::new("bad_host.example.com").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Hostname(String);

impl Hostname {
    /// Maximum total length (RFC 1123)
    pub const MAX_LENGTH: usize = 253;

    /// Maximum length of a single label (RFC 1123)
    pub const MAX_LABEL_LENGTH: usize = 63;

    pub fn new(hostname: impl Into<String>) -> Result<Self, HostnameError> {
        let mut hostname = hostname.into();
        if hostname.ends_with('.') {
            hostname.pop();
        }

        if hostname.is_empty() {
            return Err(HostnameError::Empty);
        }
        if hostname.len() > Self::MAX_LENGTH {
            return Err(HostnameError::TooLong {
                len: hostname.len(),
            });
        }

        for label in hostname.split('.') {
            Self::validate_label(&hostname, label)?;
        }

        Ok(Self(hostname))
    }

    fn validate_label(hostname: &str, label: &str) -> Result<(), HostnameError> {
        if label.is_empty() {
            return Err(HostnameError::EmptyLabel(hostname.to_string()));
        }
        if label.len() > Self::MAX_LABEL_LENGTH {
            return Err(HostnameError::LabelTooLong(label.to_string()));
        }
        if let Some(ch) = label
            .chars()
            .find(|ch| !ch.is_ascii_alphanumeric() && *ch != '-')
        {
            return Err(HostnameError::InvalidCharacter {
                label: label.to_string(),
                ch,
            });
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(HostnameError::HyphenEdge(label.to_string()));
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Hostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Hostname {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Hostname {
    type Error = HostnameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Hostname {
    type Error = HostnameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Hostname> for String {
    fn from(value: Hostname) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("host1" ; "single label")]
    #[test_case("host1.example.com" ; "fqdn")]
    #[test_case("HOST1.Example.COM" ; "mixed case")]
    #[test_case("ws-042.corp.example.com" ; "hyphenated label")]
    #[test_case("10.example.com" ; "numeric first label")]
    fn accepts_directory_hostnames(input: &str) {
        assert_eq!(Hostname::new(input).unwrap().as_str(), input);
    }

    #[test]
    fn strips_single_trailing_dot() {
        let host = Hostname::new("host1.example.com.").unwrap();
        assert_eq!(host.as_str(), "host1.example.com");
        assert!(matches!(
            Hostname::new("host1.example.com.."),
            Err(HostnameError::EmptyLabel(_))
        ));
    }

    #[test]
    fn rejects_malformed_hostnames() {
        assert_eq!(Hostname::new(""), Err(HostnameError::Empty));
        assert!(matches!(
            Hostname::new("host..example.com"),
            Err(HostnameError::EmptyLabel(_))
        ));
        assert!(matches!(
            Hostname::new("-host.example.com"),
            Err(HostnameError::HyphenEdge(_))
        ));
        assert!(matches!(
            Hostname::new("host_1.example.com"),
            Err(HostnameError::InvalidCharacter { ch: '_', .. })
        ));
        assert!(matches!(
            Hostname::new("host 1"),
            Err(HostnameError::InvalidCharacter { ch: ' ', .. })
        ));
    }

    #[test]
    fn enforces_length_limits() {
        let long_label = "a".repeat(64);
        assert!(matches!(
            Hostname::new(format!("{long_label}.com")),
            Err(HostnameError::LabelTooLong(_))
        ));
        assert!(Hostname::new(format!("{}.com", "a".repeat(63))).is_ok());

        let long_fqdn = format!("{}.{}.com", "a".repeat(125), "b".repeat(125));
        assert!(matches!(
            Hostname::new(long_fqdn),
            Err(HostnameError::TooLong { len: 255 })
        ));
    }

    #[test]
    fn displays_as_published() {
        let host = Hostname::new("DB01.prod.example.com").unwrap();
        assert_eq!(host.to_string(), "DB01.prod.example.com");
    }
}
