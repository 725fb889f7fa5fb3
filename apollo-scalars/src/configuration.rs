//! Execution and coercion options.

use std::str::FromStr;

use displaydoc::Display;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Configuration error.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// {message}: {error}
    InvalidConfiguration {
        message: &'static str,
        error: String,
    },
    /// could not deserialize configuration: {0}
    DeserializeConfigError(serde_json::Error),
}

/// The configuration of a [`Schema`](crate::Schema).
///
/// Can be created through `serde::Deserialize` from various formats,
/// or parsed from YAML with [`str::parse`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    /// Options pertaining to request execution.
    #[serde(default)]
    pub execution: Execution,

    /// Options pertaining to built-in scalar coercion.
    #[serde(default)]
    pub scalars: Scalars,
}

#[buildstructor::buildstructor]
impl Configuration {
    #[builder(visibility = "pub")]
    fn new(execution: Option<Execution>, scalars: Option<Scalars>) -> Self {
        Self {
            execution: execution.unwrap_or_default(),
            scalars: scalars.unwrap_or_default(),
        }
    }

    fn validate(self) -> Result<Self, ConfigurationError> {
        if self.execution.max_input_depth == 0 {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "execution.max_input_depth",
                error: "must be at least 1".to_string(),
            });
        }
        Ok(self)
    }
}

impl FromStr for Configuration {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        let configuration: Configuration =
            serde_yaml::from_str(s).map_err(|e| ConfigurationError::InvalidConfiguration {
                message: "failed to parse yaml",
                error: e.to_string(),
            })?;
        configuration.validate()
    }
}

impl TryFrom<serde_json::Value> for Configuration {
    type Error = ConfigurationError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        let configuration: Configuration =
            serde_json::from_value(value).map_err(ConfigurationError::DeserializeConfigError)?;
        configuration.validate()
    }
}

/// What happens to a field that failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPropagation {
    /// A null in a non-null position bubbles up to the nearest nullable parent.
    #[default]
    Propagate,
    /// The failing field alone becomes null, whatever its type.
    Null,
}

/// Options pertaining to request execution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Execution {
    /// How field errors propagate to parent fields.
    /// default: propagate
    #[serde(default)]
    pub error_propagation: ErrorPropagation,

    /// Maximum nesting of lists and input objects in an input value.
    /// default: 32
    #[serde(default = "default_max_input_depth")]
    pub max_input_depth: usize,

    /// Add the path of the rejected value inside the argument to coercion
    /// errors, as the `argumentPath` extension.
    /// default: true
    #[serde(default = "default_argument_path_extension")]
    pub argument_path_extension: bool,
}

#[buildstructor::buildstructor]
impl Execution {
    #[builder(visibility = "pub")]
    fn new(
        error_propagation: Option<ErrorPropagation>,
        max_input_depth: Option<usize>,
        argument_path_extension: Option<bool>,
    ) -> Self {
        Self {
            error_propagation: error_propagation.unwrap_or_default(),
            max_input_depth: max_input_depth.unwrap_or_else(default_max_input_depth),
            argument_path_extension: argument_path_extension
                .unwrap_or_else(default_argument_path_extension),
        }
    }
}

impl Default for Execution {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Options pertaining to built-in scalar coercion.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Scalars {
    /// Accept integers as `ID` input, converted to strings.
    /// default: true
    #[serde(default = "default_id_accepts_integers")]
    pub id_accepts_integers: bool,
}

#[buildstructor::buildstructor]
impl Scalars {
    #[builder(visibility = "pub")]
    fn new(id_accepts_integers: Option<bool>) -> Self {
        Self {
            id_accepts_integers: id_accepts_integers.unwrap_or_else(default_id_accepts_integers),
        }
    }
}

impl Default for Scalars {
    fn default() -> Self {
        Self::builder().build()
    }
}

fn default_max_input_depth() -> usize {
    32
}

fn default_argument_path_extension() -> bool {
    true
}

fn default_id_accepts_integers() -> bool {
    true
}
