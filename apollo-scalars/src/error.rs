//! Schema building and coercion errors.
use displaydoc::Display;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::graphql;
use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::Value;

/// Trait used to get extension type from an error
pub(crate) trait ErrorExtension
where
    Self: Sized,
{
    fn extension_code(&self) -> String;
}

/// Errors raised while binding custom scalars to native types.
///
/// These are fatal at schema build time: a schema that fails to bind its
/// scalars is never used to execute a request.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BuildError {
    /// custom scalar '{0}' is not backed by any native type
    MissingBinding(String),

    /// custom scalar '{scalar}' is claimed by both '{bound}' and '{other}'
    AmbiguousBinding {
        /// The contested scalar name.
        scalar: String,
        /// The native type that was bound first.
        bound: &'static str,
        /// The native type that also claimed the scalar.
        other: &'static str,
    },

    /// native type '{0}' does not back any custom scalar declared in the schema
    UnboundCandidate(&'static str),
}

/// Errors raised while building a [`Schema`](crate::Schema).
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum SchemaError {
    /// schema validation failed: {0}
    Validate(String),

    /// {0}
    Scalar(#[from] BuildError),
}

/// Errors aborting a request before execution starts.
#[derive(Error, Display, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub(crate) enum RequestError {
    /// Must provide query string.
    MissingQuery,

    /// subscription operation is not supported
    SubscriptionNotSupported,

    /// invalid value for variable '${name}': {failure}
    InvalidVariable {
        /// Name of the variable.
        name: String,
        /// Why the value was rejected.
        failure: CoercionFailure,
    },
}

impl ErrorExtension for RequestError {
    fn extension_code(&self) -> String {
        match self {
            RequestError::MissingQuery => "MISSING_QUERY",
            RequestError::SubscriptionNotSupported => "SUBSCRIPTION_NOT_SUPPORTED",
            RequestError::InvalidVariable { .. } => "VALIDATION_INVALID_TYPE_VARIABLE",
        }
        .to_string()
    }
}

impl RequestError {
    pub(crate) fn to_graphql_error(&self, argument_path_extension: bool) -> graphql::Error {
        let mut extensions = Object::new();
        if let RequestError::InvalidVariable { name, failure } = self {
            extensions.insert("name", name.as_str().into());
            extensions.insert("coercion", failure.error.extension_code().into());
            if argument_path_extension && !failure.path.is_empty() {
                extensions.insert(
                    "argumentPath",
                    serde_json_bytes::to_value(&failure.path).unwrap_or_default(),
                );
            }
        }
        graphql::Error::builder()
            .message(self.to_string())
            .extension_code(self.extension_code())
            .extensions(extensions)
            .build()
    }
}

/// The reason a value was rejected during input coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoercionErrorKind {
    /// The value is not of the expected structure (list, object, or nesting).
    WrongShape,
    /// The value is of the wrong primitive kind (e.g. a number for a string).
    WrongKind,
    /// The value is of the right kind but outside the representable range.
    OutOfRange,
    /// The value was rejected by a semantic rule of the scalar.
    Custom,
    /// The engine could not find the coercion to run. This is a schema bug.
    Internal,
}

/// A value rejected by input coercion, or a native value that could not be
/// serialized for the scalar it was returned for.
///
/// The message is shown to clients verbatim.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct CoercionError {
    kind: CoercionErrorKind,
    message: String,
    input: Value,
}

impl CoercionError {
    pub fn new(kind: CoercionErrorKind, message: impl Into<String>, input: Value) -> Self {
        Self {
            kind,
            message: message.into(),
            input,
        }
    }

    /// The input has the wrong structure.
    pub fn wrong_shape(message: impl Into<String>, input: &Value) -> Self {
        Self::new(CoercionErrorKind::WrongShape, message, input.clone())
    }

    /// The input is of the wrong primitive kind.
    pub fn wrong_kind(message: impl Into<String>, input: &Value) -> Self {
        Self::new(CoercionErrorKind::WrongKind, message, input.clone())
    }

    /// The input cannot be represented by the native type.
    pub fn out_of_range(message: impl Into<String>, input: &Value) -> Self {
        Self::new(CoercionErrorKind::OutOfRange, message, input.clone())
    }

    /// The input breaks a rule specific to the scalar.
    pub fn custom(message: impl Into<String>, input: &Value) -> Self {
        Self::new(CoercionErrorKind::Custom, message, input.clone())
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(CoercionErrorKind::Internal, message, Value::Null)
    }

    pub fn kind(&self) -> CoercionErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The offending input value.
    pub fn input(&self) -> &Value {
        &self.input
    }

    /// Attaches the input path at which the value was rejected.
    pub fn at(self, path: Path) -> CoercionFailure {
        CoercionFailure { error: self, path }
    }
}

impl ErrorExtension for CoercionError {
    fn extension_code(&self) -> String {
        match self.kind {
            CoercionErrorKind::WrongShape => "INVALID_INPUT_SHAPE",
            CoercionErrorKind::WrongKind => "INVALID_INPUT_TYPE",
            CoercionErrorKind::OutOfRange => "INPUT_OUT_OF_RANGE",
            CoercionErrorKind::Custom => "INVALID_INPUT_VALUE",
            CoercionErrorKind::Internal => "INTERNAL_SERVER_ERROR",
        }
        .to_string()
    }
}

/// A [`CoercionError`] tagged with the path of the rejected value, relative
/// to the argument or variable being coerced.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error}")]
pub struct CoercionFailure {
    pub error: CoercionError,
    pub path: Path,
}

impl CoercionFailure {
    /// Convert the failure to a GraphQL error located at `response_path`.
    ///
    /// The message is kept as-is.
    pub(crate) fn to_graphql_error(
        &self,
        response_path: Option<Path>,
        locations: Vec<graphql::Location>,
        argument_path_extension: bool,
    ) -> graphql::Error {
        let mut extensions = Object::new();
        extensions.insert("code", self.error.extension_code().into());
        if argument_path_extension && !self.path.is_empty() {
            extensions.insert(
                "argumentPath",
                serde_json_bytes::to_value(&self.path).unwrap_or_default(),
            );
        }
        graphql::Error::builder()
            .message(self.error.message())
            .locations(locations)
            .and_path(response_path)
            .extensions(extensions)
            .build()
    }
}
