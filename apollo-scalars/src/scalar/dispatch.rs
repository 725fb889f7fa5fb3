use super::ScalarRegistry;
use super::ScalarValue;
use crate::error::CoercionError;
use crate::error::CoercionFailure;
use crate::json_ext::Path;
use crate::json_ext::Value;

/// Routes custom scalar values through the native type bound to them.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScalarDispatcher<'a> {
    registry: &'a ScalarRegistry,
}

impl<'a> ScalarDispatcher<'a> {
    pub(crate) fn new(registry: &'a ScalarRegistry) -> Self {
        Self { registry }
    }

    /// Materializes `input` as a native value of the type bound to `scalar`.
    ///
    /// `null` is never handed to the native type: it coerces to `None`.
    pub(crate) fn coerce_input(
        &self,
        scalar: &str,
        input: &Value,
        path: &Path,
    ) -> Result<Option<ScalarValue>, CoercionFailure> {
        if input.is_null() {
            return Ok(None);
        }
        let Some(binding) = self.registry.resolve(scalar) else {
            tracing::error!(scalar, "no native type is bound to custom scalar");
            return Err(
                CoercionError::internal(format!("custom scalar {scalar} cannot be coerced"))
                    .at(path.clone()),
            );
        };
        binding.materialize(input).map(Some).map_err(|error| {
            tracing::trace!(
                scalar,
                path = %path,
                kind = ?error.kind(),
                "custom scalar input rejected"
            );
            error.at(path.clone())
        })
    }

    /// Serializes a native value returned for `scalar`.
    ///
    /// The value must be of the type bound to `scalar`.
    pub(crate) fn coerce_output(
        &self,
        scalar: &str,
        value: &ScalarValue,
    ) -> Result<Value, CoercionError> {
        let Some(binding) = self.registry.resolve(scalar) else {
            tracing::error!(scalar, "no native type is bound to custom scalar");
            return Err(CoercionError::internal(format!(
                "custom scalar {scalar} cannot be serialized"
            )));
        };
        if binding.type_id() != value.native_type_id() {
            return Err(CoercionError::internal(format!(
                "Resolver returned a {} value, expected {scalar}",
                value.type_name()
            )));
        }
        Ok(Value::String(value.serialize().into()))
    }

    /// Serializes raw JSON returned for `scalar`, by materializing it as the
    /// type bound to `scalar` first.
    ///
    /// A value the type rejects is a resolver bug, reported as internal.
    pub(crate) fn coerce_output_json(
        &self,
        scalar: &str,
        value: &Value,
    ) -> Result<Value, CoercionError> {
        let Some(binding) = self.registry.resolve(scalar) else {
            tracing::error!(scalar, "no native type is bound to custom scalar");
            return Err(CoercionError::internal(format!(
                "custom scalar {scalar} cannot be serialized"
            )));
        };
        let native = binding.materialize(value).map_err(|error| {
            CoercionError::internal(format!(
                "Resolver returned {value}, which {scalar} rejected: {}",
                error.message()
            ))
        })?;
        Ok(Value::String(native.serialize().into()))
    }
}
