use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::SqlGatewayError;

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Options for opening a [`Connection`](crate::Connection).
///
/// Deserializable so callers can keep them in whatever config format they already load:
/// ```rust
/// use sql_gateway::prelude::*;
///
/// let opts: ConnectOptions = serde_json::from_str(r#"{ "target": "sqlite::memory:" }"#).unwrap();
/// assert_eq!(opts.scheme().unwrap(), "sqlite");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectOptions {
    /// `scheme:rest`; the scheme picks the driver.
    pub target: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// chrono pattern for date literals, or `U` for unix timestamps.
    #[serde(default)]
    pub date_format: Option<String>,
    /// chrono pattern for date-time literals, or `U` for unix timestamps.
    #[serde(default)]
    pub date_time_format: Option<String>,
    #[serde(default = "default_normalize_types")]
    pub normalize_types: bool,
    /// Dialect-specific knobs.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

fn default_normalize_types() -> bool {
    true
}

impl ConnectOptions {
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            username: None,
            password: None,
            date_format: None,
            date_time_format: None,
            normalize_types: true,
            options: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn builder(target: impl Into<String>) -> ConnectOptionsBuilder {
        ConnectOptionsBuilder::new(target)
    }

    /// The driver scheme: everything before the first `:`.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::ConnectionError` if the target has no scheme.
    pub fn scheme(&self) -> Result<&str, SqlGatewayError> {
        split_target(&self.target).map(|(scheme, _)| scheme)
    }

    /// The part of the target after the scheme.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::ConnectionError` if the target has no scheme.
    pub fn location(&self) -> Result<&str, SqlGatewayError> {
        split_target(&self.target).map(|(_, rest)| rest)
    }

    #[must_use]
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Read a boolean knob (`true/false/1/0/yes/no/on/off`).
    ///
    /// # Errors
    /// Returns `SqlGatewayError::ConfigError` if the value is not a boolean.
    pub fn bool_option(&self, key: &str) -> Result<Option<bool>, SqlGatewayError> {
        self.option(key)
            .map(|raw| match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                other => Err(SqlGatewayError::ConfigError(format!(
                    "option '{key}' expects a boolean, got '{other}'"
                ))),
            })
            .transpose()
    }

    /// Read an unsigned integer knob.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::ConfigError` if the value is not a number.
    pub fn u64_option(&self, key: &str) -> Result<Option<u64>, SqlGatewayError> {
        self.option(key)
            .map(|raw| {
                raw.trim().parse::<u64>().map_err(|e| {
                    SqlGatewayError::ConfigError(format!("option '{key}' expects an integer: {e}"))
                })
            })
            .transpose()
    }

    #[must_use]
    pub fn date_format(&self) -> DateTimeFormat {
        DateTimeFormat::parse(self.date_format.as_deref().unwrap_or(DEFAULT_DATE_FORMAT))
    }

    #[must_use]
    pub fn date_time_format(&self) -> DateTimeFormat {
        DateTimeFormat::parse(
            self.date_time_format
                .as_deref()
                .unwrap_or(DEFAULT_DATE_TIME_FORMAT),
        )
    }
}

/// Fluent builder for [`ConnectOptions`].
#[derive(Debug, Clone)]
pub struct ConnectOptionsBuilder {
    opts: ConnectOptions,
}

impl ConnectOptionsBuilder {
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            opts: ConnectOptions::new(target),
        }
    }

    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.opts.username = Some(username.into());
        self.opts.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.opts.date_format = Some(format.into());
        self
    }

    #[must_use]
    pub fn date_time_format(mut self, format: impl Into<String>) -> Self {
        self.opts.date_time_format = Some(format.into());
        self
    }

    #[must_use]
    pub fn normalize_types(mut self, normalize: bool) -> Self {
        self.opts.normalize_types = normalize;
        self
    }

    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.opts.options.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn finish(self) -> ConnectOptions {
        self.opts
    }
}

/// How dates and date-times are rendered as SQL literals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateTimeFormat {
    /// Bare seconds since the epoch.
    Unix,
    /// A chrono pattern, rendered as a quoted string.
    Pattern(String),
}

impl DateTimeFormat {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw == "U" {
            DateTimeFormat::Unix
        } else {
            DateTimeFormat::Pattern(raw.to_owned())
        }
    }

    #[must_use]
    pub fn is_unix(&self) -> bool {
        matches!(self, DateTimeFormat::Unix)
    }
}

/// Split `scheme:rest` at the first colon.
///
/// # Errors
/// Returns `SqlGatewayError::ConnectionError` if there is no colon or the scheme is empty.
pub fn split_target(target: &str) -> Result<(&str, &str), SqlGatewayError> {
    match target.split_once(':') {
        Some((scheme, rest)) if !scheme.is_empty() => Ok((scheme, rest)),
        _ => Err(SqlGatewayError::ConnectionError(format!(
            "connection target '{target}' has no driver scheme"
        ))),
    }
}
