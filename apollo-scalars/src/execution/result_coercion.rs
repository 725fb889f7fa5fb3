use apollo_compiler::Node;
use apollo_compiler::executable::Field;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::Type;

use super::engine::ExecutionContext;
use super::engine::LinkedPath;
use super::engine::LinkedPathElement;
use super::engine::PropagateNull;
use super::resolver::ResolvedValue;
use crate::error::CoercionError;
use crate::error::ErrorExtension;
use crate::graphql;
use crate::json_ext::PathElement;
use crate::json_ext::Value;

/// <https://spec.graphql.org/October2021/#CompleteValue()>
///
/// Returns `Err` for a field error being propagated upwards to find a nullable place
pub(crate) fn complete_value<'a>(
    ctx: &ExecutionContext<'a>,
    errors: &mut Vec<graphql::Error>,
    path: LinkedPath<'_>,
    ty: &Type,
    resolved: ResolvedValue<'_>,
    fields: &[&'a Node<Field>],
) -> Result<Value, PropagateNull> {
    macro_rules! field_error {
        ($($arg: tt)+) => {
            {
                errors.push(ctx.field_error(format!($($arg)+), path, fields[0]));
                return Err(PropagateNull);
            }
        };
    }
    if let ResolvedValue::Leaf(Value::Null) = resolved {
        if ty.is_non_null() {
            field_error!("Non-null type {ty} resolved to null")
        } else {
            return Ok(Value::Null);
        }
    }
    let (ty_name, resolved) = match (ty, resolved) {
        (Type::Named(_) | Type::NonNullNamed(_), ResolvedValue::List(_)) => {
            field_error!("Non-list type {ty} resolved to a list")
        }
        (Type::List(inner_ty) | Type::NonNullList(inner_ty), ResolvedValue::List(iter)) => {
            let mut completed_list = Vec::with_capacity(iter.size_hint().0);
            for (index, inner_result) in iter.enumerate() {
                let inner_resolved = match inner_result {
                    Ok(inner_resolved) => inner_resolved,
                    Err(error) => field_error!("{}", error.message),
                };
                let inner_path = LinkedPathElement {
                    element: PathElement::Index(index),
                    next: path,
                };
                let inner_result = complete_value(
                    ctx,
                    errors,
                    Some(&inner_path),
                    inner_ty,
                    inner_resolved,
                    fields,
                );
                // On field error, try to nullify that item
                match ctx.try_nullify(inner_ty, inner_result) {
                    Ok(inner_value) => completed_list.push(inner_value),
                    // If the item is non-null, try to nullify the list
                    Err(PropagateNull) => return ctx.try_nullify(ty, Err(PropagateNull)),
                }
            }
            return Ok(completed_list.into());
        }
        (Type::List(_) | Type::NonNullList(_), _) => {
            field_error!("List type {ty} resolved to a non-list value")
        }
        (Type::Named(name) | Type::NonNullNamed(name), resolved) => (name, resolved),
    };
    let Some(ty_def) = ctx.schema.definitions.types.get(ty_name) else {
        field_error!("Undefined type {ty_name}")
    };
    match (ty_def, resolved) {
        (ExtendedType::InputObject(_), _) => {
            field_error!("Field with input object type {ty_name}")
        }
        (
            ExtendedType::Object(_) | ExtendedType::Interface(_) | ExtendedType::Union(_),
            ResolvedValue::Leaf(_) | ResolvedValue::Scalar(_),
        ) => {
            field_error!(
                "Resolver returned a leaf value \
                 but expected an object for type {ty_name}"
            )
        }
        (ExtendedType::Enum(enum_def), ResolvedValue::Leaf(json_value)) => {
            // https://spec.graphql.org/October2021/#sec-Enums.Result-Coercion
            if !json_value
                .as_str()
                .is_some_and(|str| enum_def.values.contains_key(str))
            {
                field_error!("Resolver returned {json_value}, expected enum {ty_name}")
            }
            Ok(json_value)
        }
        (ExtendedType::Scalar(scalar), ResolvedValue::Leaf(json_value)) if scalar.is_built_in() => {
            if let Err(message) = check_built_in_result(ty_name, &json_value) {
                field_error!("{message}")
            }
            Ok(json_value)
        }
        (ExtendedType::Scalar(_), ResolvedValue::Leaf(json_value)) => {
            let result = ctx
                .schema
                .dispatcher()
                .coerce_output_json(ty_name, &json_value);
            scalar_output(ctx, errors, path, fields[0], ty_name, result)
        }
        (ExtendedType::Scalar(scalar), ResolvedValue::Scalar(native)) if !scalar.is_built_in() => {
            let result = ctx.schema.dispatcher().coerce_output(ty_name, &native);
            scalar_output(ctx, errors, path, fields[0], ty_name, result)
        }
        (ExtendedType::Enum(_) | ExtendedType::Scalar(_), ResolvedValue::Scalar(native)) => {
            field_error!(
                "Resolver returned a {} custom scalar value, expected {ty_name}",
                native.type_name()
            )
        }
        (ExtendedType::Enum(_) | ExtendedType::Scalar(_), ResolvedValue::Object(_)) => {
            field_error!("Resolver returned an object, expected {ty_name}")
        }
        (_, ResolvedValue::List(_)) => {
            field_error!("Non-list type {ty} resolved to a list")
        }
        (ExtendedType::Interface(_) | ExtendedType::Union(_), ResolvedValue::Object(resolved_obj)) => {
            let object_type_name = resolved_obj.type_name();
            let Some(object_type) = ctx.schema.definitions.get_object(object_type_name) else {
                field_error!(
                    "Resolver returned an object of type {object_type_name} \
                     not defined in the schema"
                )
            };
            if !ctx
                .schema
                .definitions
                .is_subtype(ty_name, object_type_name)
            {
                field_error!(
                    "Resolver returned an object of type {object_type_name} \
                     which is not a possible type of {ty_name}"
                )
            }
            ctx.execute_selection_set(
                errors,
                path,
                object_type,
                &*resolved_obj,
                fields
                    .iter()
                    .copied()
                    .flat_map(|field| &field.selection_set.selections),
            )
            .map(Value::Object)
        }
        (ExtendedType::Object(object_type), ResolvedValue::Object(resolved_obj)) => ctx
            .execute_selection_set(
                errors,
                path,
                object_type,
                &*resolved_obj,
                fields
                    .iter()
                    .copied()
                    .flat_map(|field| &field.selection_set.selections),
            )
            .map(Value::Object),
    }
}

/// Turns a failed custom scalar serialization into a field error.
fn scalar_output(
    ctx: &ExecutionContext<'_>,
    errors: &mut Vec<graphql::Error>,
    path: LinkedPath<'_>,
    field: &Node<Field>,
    scalar: &str,
    result: Result<Value, CoercionError>,
) -> Result<Value, PropagateNull> {
    result.map_err(|error| {
        tracing::error!(scalar, error = error.message(), "custom scalar result rejected");
        let mut field_error = ctx.field_error(error.message(), path, field);
        field_error
            .extensions
            .insert("code", error.extension_code().into());
        errors.push(field_error);
        PropagateNull
    })
}

/// Result coercion of built-in scalars.
///
/// > GraphQL services may coerce non-integer internal values to integers
/// > when reasonable without losing information
///
/// We choose not to, to keep with Rust’s strong typing
fn check_built_in_result(ty_name: &str, json_value: &Value) -> Result<(), String> {
    match ty_name {
        // https://spec.graphql.org/October2021/#sec-Int.Result-Coercion
        "Int" => match json_value.as_i64() {
            Some(int) if i32::try_from(int).is_err() => {
                Err(format!("Resolver returned {json_value} which overflows Int"))
            }
            Some(_) => Ok(()),
            None => Err(format!("Resolver returned {json_value}, expected Int")),
        },
        // https://spec.graphql.org/October2021/#sec-Float.Result-Coercion
        "Float" if !json_value.is_number() => {
            Err(format!("Resolver returned {json_value}, expected Float"))
        }
        // https://spec.graphql.org/October2021/#sec-String.Result-Coercion
        "String" if !json_value.is_string() => {
            Err(format!("Resolver returned {json_value}, expected String"))
        }
        // https://spec.graphql.org/October2021/#sec-Boolean.Result-Coercion
        "Boolean" if !json_value.is_boolean() => {
            Err(format!("Resolver returned {json_value}, expected Boolean"))
        }
        // https://spec.graphql.org/October2021/#sec-ID.Result-Coercion
        "ID" if !(json_value.is_string() || json_value.is_i64()) => {
            Err(format!("Resolver returned {json_value}, expected ID"))
        }
        _ => Ok(()),
    }
}
