//! <https://spec.graphql.org/October2021/#sec-Coercing-Variable-Values>
//! and <https://spec.graphql.org/October2021/#sec-Coercing-Field-Arguments>

use apollo_compiler::Node;
use apollo_compiler::ast;
use apollo_compiler::executable::Field;
use apollo_compiler::executable::VariableDefinition;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::Type;
use indexmap::IndexMap;
use serde_json_bytes::ByteString;

use super::resolver::Arguments;
use super::resolver::InputValue;
use crate::Schema;
use crate::error::CoercionError;
use crate::error::CoercionFailure;
use crate::error::RequestError;
use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::PathElement;
use crate::json_ext::Value;
use crate::json_ext::ValueExt;

/// The variables of a request, as sent (with default values filled in) and
/// coerced.
#[derive(Debug, Default)]
pub(crate) struct VariableValues {
    json: Object,
    coerced: IndexMap<String, InputValue>,
}

impl VariableValues {
    pub(crate) fn json(&self) -> &Object {
        &self.json
    }
}

/// An input value to coerce.
#[derive(Clone, Copy)]
enum Input<'v> {
    /// Part of a request variable.
    Json(&'v Value),
    /// Part of a literal in the document, which may refer to variables.
    Literal(&'v ast::Value, &'v VariableValues),
    /// A variable, already coerced against its declared type.
    Coerced(&'v InputValue),
}

impl<'v> Input<'v> {
    /// Replaces a variable by its value. Returns `None` if it was not provided.
    fn resolve(self) -> Option<Self> {
        match self {
            Input::Literal(ast::Value::Variable(name), variables) => {
                variables.coerced.get(name.as_str()).map(Input::Coerced)
            }
            input => Some(input),
        }
    }

    fn is_null(&self) -> bool {
        match self {
            Input::Json(value) => value.is_null(),
            Input::Literal(value, _) => matches!(value, ast::Value::Null),
            Input::Coerced(value) => value.is_null(),
        }
    }

    fn to_json(self) -> Result<Value, CoercionError> {
        match self {
            Input::Json(value) => Ok(value.clone()),
            Input::Literal(value, variables) => {
                Ok(literal_to_json(value, &variables.json)?.unwrap_or_default())
            }
            Input::Coerced(_) => Err(CoercionError::internal(
                "coerced variable has no JSON representation",
            )),
        }
    }

    /// The JSON form of this input, for error reporting.
    fn to_json_lossy(self) -> Value {
        self.to_json().unwrap_or_default()
    }
}

/// Coerces input values against the input types of a schema.
pub(crate) struct InputCoercion<'a> {
    schema: &'a Schema,
}

impl<'a> InputCoercion<'a> {
    pub(crate) fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Coerces the request variables against the variable definitions of the
    /// operation, filling in their default values.
    ///
    /// Custom scalars are materialized here, once per variable.
    pub(crate) fn coerce_variable_values(
        &self,
        definitions: &[Node<VariableDefinition>],
        values: &Object,
    ) -> Result<VariableValues, Vec<RequestError>> {
        let mut variables = VariableValues::default();
        let mut errors = Vec::new();
        for definition in definitions {
            let name = definition.name.as_str();
            let value = match (values.get(name), &definition.default_value) {
                (Some(value), _) => value.clone(),
                (None, Some(default_value)) => {
                    match literal_to_json(default_value, &Object::new()) {
                        Ok(value) => value.unwrap_or_default(),
                        Err(error) => {
                            errors.push(RequestError::InvalidVariable {
                                name: name.to_string(),
                                failure: error.at(Path::empty()),
                            });
                            continue;
                        }
                    }
                }
                (None, None) if definition.ty.is_non_null() => Value::Null,
                (None, None) => continue,
            };
            match self.coerce_input_value(&value, &definition.ty, &Path::empty(), 0) {
                Ok(coerced) => {
                    variables.json.insert(name, value);
                    variables.coerced.insert(name.to_string(), coerced);
                }
                Err(failure) => errors.push(RequestError::InvalidVariable {
                    name: name.to_string(),
                    failure,
                }),
            }
        }
        if errors.is_empty() {
            Ok(variables)
        } else {
            Err(errors)
        }
    }

    /// Coerces the arguments of `field`, materializing custom scalars.
    ///
    /// The failure path starts with the name of the argument.
    pub(crate) fn coerce_argument_values(
        &self,
        field: &Field,
        variables: &VariableValues,
    ) -> Result<Arguments, CoercionFailure> {
        let no_variables = VariableValues::default();
        let null = Value::Null;
        let mut coerced = IndexMap::with_capacity(field.definition.arguments.len());
        for definition in &field.definition.arguments {
            let name = definition.name.as_str();
            let provided = field
                .arguments
                .iter()
                .find(|argument| argument.name == definition.name)
                .and_then(|argument| Input::Literal(&argument.value, variables).resolve());
            let input = match (provided, &definition.default_value) {
                (Some(input), _) => input,
                (None, Some(default_value)) => Input::Literal(default_value, &no_variables),
                (None, None) if definition.ty.is_non_null() => Input::Json(&null),
                (None, None) => continue,
            };
            let path = Path(vec![PathElement::Key(name.to_string())]);
            let value = self.coerce_value(input, &definition.ty, &path, 0)?;
            coerced.insert(name.to_string(), value);
        }
        Ok(Arguments(coerced))
    }

    /// <https://spec.graphql.org/October2021/#sec-Input-Values>
    pub(crate) fn coerce_input_value(
        &self,
        value: &Value,
        ty: &Type,
        path: &Path,
        depth: usize,
    ) -> Result<InputValue, CoercionFailure> {
        self.coerce_value(Input::Json(value), ty, path, depth)
    }

    fn coerce_value(
        &self,
        input: Input<'_>,
        ty: &Type,
        path: &Path,
        depth: usize,
    ) -> Result<InputValue, CoercionFailure> {
        // Variable usages were checked against their definition by validation.
        if let Input::Coerced(value) = input {
            return Ok(value.clone());
        }

        let max_depth = self.schema.configuration().execution.max_input_depth;
        if depth > max_depth {
            return Err(CoercionError::wrong_shape(
                format!("Input value exceeds the maximum depth of {max_depth}"),
                &input.to_json_lossy(),
            )
            .at(path.clone()));
        }

        // Accept null for any nullable type.
        if input.is_null() {
            return if ty.is_non_null() {
                Err(CoercionError::wrong_kind(
                    format!("Expected a value of non-null type {ty}, found null"),
                    &Value::Null,
                )
                .at(path.clone()))
            } else {
                Ok(InputValue::Null)
            };
        }

        let type_name = match ty {
            Type::List(item_ty) | Type::NonNullList(item_ty) => {
                let null = Value::Null;
                let items: Vec<Input<'_>> = match input {
                    Input::Json(Value::Array(items)) => items.iter().map(Input::Json).collect(),
                    Input::Literal(ast::Value::List(items), variables) => items
                        .iter()
                        .map(|item| {
                            // a variable that was not provided is null in a list
                            Input::Literal(item, variables)
                                .resolve()
                                .unwrap_or(Input::Json(&null))
                        })
                        .collect(),
                    // Coerce single values (except null) to a list.
                    _ => {
                        return self
                            .coerce_value(input, item_ty, path, depth + 1)
                            .map(|item| InputValue::List(vec![item]));
                    }
                };
                return items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| {
                        let mut item_path = path.clone();
                        item_path.push(index);
                        self.coerce_value(item, item_ty, &item_path, depth + 1)
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(InputValue::List);
            }
            Type::Named(name) | Type::NonNullNamed(name) => name,
        };

        match self.schema.definitions.types.get(type_name) {
            Some(ExtendedType::Scalar(scalar)) if !scalar.is_built_in() => {
                let value = input.to_json().map_err(|error| error.at(path.clone()))?;
                match self
                    .schema
                    .dispatcher()
                    .coerce_input(type_name, &value, path)?
                {
                    Some(native) => Ok(InputValue::Scalar(native)),
                    None => Ok(InputValue::Null),
                }
            }
            Some(ExtendedType::Scalar(_)) => input
                .to_json()
                .and_then(|value| self.coerce_built_in(type_name, &value))
                .map(InputValue::Leaf)
                .map_err(|error| error.at(path.clone())),
            // Enums must match the type.
            Some(ExtendedType::Enum(enum_)) => {
                let value = input.to_json().map_err(|error| error.at(path.clone()))?;
                if value
                    .as_str()
                    .is_some_and(|str| enum_.values.contains_key(str))
                {
                    Ok(InputValue::Leaf(value))
                } else {
                    Err(CoercionError::wrong_kind(
                        format!("Value {value} does not exist in enum {type_name}"),
                        &value,
                    )
                    .at(path.clone()))
                }
            }
            Some(ExtendedType::InputObject(definition)) => {
                let fields: Vec<(&str, Input<'_>)> = match input {
                    Input::Json(Value::Object(object)) => object
                        .iter()
                        .map(|(key, value)| (key.as_str(), Input::Json(value)))
                        .collect(),
                    Input::Literal(ast::Value::Object(object), variables) => object
                        .iter()
                        .map(|(name, value)| (name.as_str(), Input::Literal(value, variables)))
                        .collect(),
                    _ => {
                        let value = input.to_json_lossy();
                        return Err(CoercionError::wrong_shape(
                            format!(
                                "Expected an object of input type {type_name}, found a {}",
                                value.kind()
                            ),
                            &value,
                        )
                        .at(path.clone()));
                    }
                };
                if let Some((unknown, _)) = fields
                    .iter()
                    .find(|(key, _)| !definition.fields.contains_key(*key))
                {
                    let mut field_path = path.clone();
                    field_path.push(*unknown);
                    return Err(CoercionError::wrong_shape(
                        format!("Field {unknown} is not defined by input type {type_name}"),
                        &input.to_json_lossy(),
                    )
                    .at(field_path));
                }

                let no_variables = VariableValues::default();
                let mut coerced = IndexMap::with_capacity(definition.fields.len());
                for (field_name, field_definition) in definition.fields.iter() {
                    let mut field_path = path.clone();
                    field_path.push(field_name.as_str());
                    let provided = fields
                        .iter()
                        .find(|(key, _)| *key == field_name.as_str())
                        .and_then(|(_, field_input)| field_input.resolve());
                    let field_input = match provided {
                        Some(field_input) => field_input,
                        None => match &field_definition.default_value {
                            Some(default_value) => Input::Literal(default_value, &no_variables),
                            None if field_definition.is_required() => {
                                return Err(CoercionError::wrong_shape(
                                    format!(
                                        "Field {field_name} of required type {} was not provided",
                                        field_definition.ty
                                    ),
                                    &input.to_json_lossy(),
                                )
                                .at(field_path));
                            }
                            None => continue,
                        },
                    };
                    let field_value = self.coerce_value(
                        field_input,
                        &field_definition.ty,
                        &field_path,
                        depth + 1,
                    )?;
                    coerced.insert(field_name.to_string(), field_value);
                }
                Ok(InputValue::Object(coerced))
            }
            // Other types are totally invalid (and should ideally be rejected by validation).
            Some(ExtendedType::Object(_) | ExtendedType::Interface(_) | ExtendedType::Union(_))
            | None => Err(
                CoercionError::internal(format!("{type_name} is not an input type"))
                    .at(path.clone()),
            ),
        }
    }

    fn coerce_built_in(&self, type_name: &str, value: &Value) -> Result<Value, CoercionError> {
        match type_name {
            // https://spec.graphql.org/October2021/#sec-Int.Input-Coercion
            "Int" => {
                if value.is_valid_int_input() {
                    Ok(value.clone())
                } else if value.is_i64() || value.is_u64() {
                    Err(CoercionError::out_of_range(
                        format!("Int cannot represent non 32-bit signed integer value: {value}"),
                        value,
                    ))
                } else {
                    Err(CoercionError::wrong_kind(
                        format!("Int cannot represent non-integer value: {value}"),
                        value,
                    ))
                }
            }
            // https://spec.graphql.org/October2021/#sec-Float.Input-Coercion
            "Float" => {
                if value.is_number() {
                    Ok(value.clone())
                } else {
                    Err(CoercionError::wrong_kind(
                        format!("Float cannot represent non numeric value: {value}"),
                        value,
                    ))
                }
            }
            // https://spec.graphql.org/October2021/#sec-String.Input-Coercion
            "String" => {
                if value.is_string() {
                    Ok(value.clone())
                } else {
                    Err(CoercionError::wrong_kind(
                        format!("String cannot represent a non string value: {value}"),
                        value,
                    ))
                }
            }
            // https://spec.graphql.org/October2021/#sec-Boolean.Input-Coercion
            "Boolean" => {
                if value.is_boolean() {
                    Ok(value.clone())
                } else {
                    Err(CoercionError::wrong_kind(
                        format!("Boolean cannot represent a non boolean value: {value}"),
                        value,
                    ))
                }
            }
            // https://spec.graphql.org/October2021/#sec-ID.Input-Coercion
            "ID" => match value {
                Value::String(_) => Ok(value.clone()),
                // In practice it seems Int works too
                Value::Number(number)
                    if (number.is_i64() || number.is_u64())
                        && self.schema.configuration().scalars.id_accepts_integers =>
                {
                    Ok(Value::String(number.to_string().into()))
                }
                _ => Err(CoercionError::wrong_kind(
                    format!("ID cannot represent value: {value}"),
                    value,
                )),
            },
            _ => Err(CoercionError::internal(format!(
                "unknown built-in scalar {type_name}"
            ))),
        }
    }
}

/// Converts a GraphQL literal to JSON, replacing variables by their value.
///
/// Returns `None` for a variable that was not provided. Inside a list such a
/// variable becomes null, and inside an object the field is left out.
pub(crate) fn literal_to_json(
    value: &ast::Value,
    variable_values: &Object,
) -> Result<Option<Value>, CoercionError> {
    Ok(Some(match value {
        ast::Value::Null => Value::Null,
        ast::Value::Variable(name) => return Ok(variable_values.get(name.as_str()).cloned()),
        ast::Value::Enum(name) => Value::String(name.as_str().into()),
        ast::Value::String(string) => Value::String(string.as_str().into()),
        ast::Value::Boolean(boolean) => Value::Bool(*boolean),
        ast::Value::Int(int) => number_to_json(int.as_str())?,
        ast::Value::Float(float) => number_to_json(float.as_str())?,
        ast::Value::List(items) => {
            let mut list = Vec::with_capacity(items.len());
            for item in items {
                list.push(literal_to_json(item, variable_values)?.unwrap_or_default());
            }
            Value::Array(list)
        }
        ast::Value::Object(fields) => {
            let mut object = Object::with_capacity(fields.len());
            for (name, value) in fields {
                if let Some(value) = literal_to_json(value, variable_values)? {
                    object.insert(ByteString::from(name.as_str()), value);
                }
            }
            Value::Object(object)
        }
    }))
}

fn number_to_json(literal: &str) -> Result<Value, CoercionError> {
    literal
        .parse::<serde_json::Number>()
        .map(Value::Number)
        .map_err(|_| {
            CoercionError::out_of_range(
                format!("Numeric literal {literal} is out of range"),
                &Value::Null,
            )
        })
}
