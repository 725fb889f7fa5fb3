use std::collections::HashSet;

use apollo_compiler::ExecutableDocument;
use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::executable::DirectiveList;
use apollo_compiler::executable::Field;
use apollo_compiler::executable::Selection;
use apollo_compiler::schema::FieldDefinition;
use apollo_compiler::schema::ObjectType;
use apollo_compiler::schema::Type;
use apollo_compiler::validation::Valid;
use indexmap::IndexMap;

use super::input_coercion::InputCoercion;
use super::input_coercion::VariableValues;
use super::input_coercion::literal_to_json;
use super::resolver::ObjectValue;
use super::result_coercion::complete_value;
use crate::ErrorPropagation;
use crate::Schema;
use crate::graphql;
use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::PathElement;
use crate::json_ext::Value;

/// A field error was pushed: the field is null, and that null may have to
/// propagate upwards to find a nullable place.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PropagateNull;

/// Linked-list version of `Path`, to be built on the stack while recursing.
pub(crate) type LinkedPath<'a> = Option<&'a LinkedPathElement<'a>>;

pub(crate) struct LinkedPathElement<'a> {
    pub(crate) element: PathElement,
    pub(crate) next: LinkedPath<'a>,
}

/// Everything execution reads, but never changes, during one request.
pub(crate) struct ExecutionContext<'a> {
    pub(crate) schema: &'a Schema,
    pub(crate) document: &'a Valid<ExecutableDocument>,
    pub(crate) variable_values: &'a VariableValues,
}

impl<'a> ExecutionContext<'a> {
    /// <https://spec.graphql.org/October2021/#ExecuteSelectionSet()>
    ///
    /// Returns `Err` for a field error being propagated upwards to find a nullable place
    pub(crate) fn execute_selection_set(
        &self,
        errors: &mut Vec<graphql::Error>,
        path: LinkedPath<'_>,
        object_type: &'a ObjectType,
        object_value: &ObjectValue<'_>,
        selections: impl IntoIterator<Item = &'a Selection>,
    ) -> Result<Object, PropagateNull> {
        let mut grouped_field_set = IndexMap::new();
        self.collect_fields(
            object_type,
            selections,
            &mut HashSet::new(),
            &mut grouped_field_set,
        );

        let mut response_map = Object::with_capacity(grouped_field_set.len());
        for (response_key, fields) in &grouped_field_set {
            let field_name = &fields[0].name;
            let path_element = LinkedPathElement {
                element: PathElement::Key(response_key.to_string()),
                next: path,
            };
            let value = if field_name == "__typename" {
                Value::String(object_type.name.as_str().into())
            } else if let Some(field_def) = object_type.fields.get(field_name) {
                let field_result = self.execute_field(
                    errors,
                    Some(&path_element),
                    object_value,
                    field_def,
                    fields,
                );
                self.try_nullify(&field_def.ty, field_result)?
            } else {
                errors.push(self.field_error(
                    format!("Undefined field {field_name} on type {}", object_type.name),
                    Some(&path_element),
                    fields[0],
                ));
                Value::Null
            };
            response_map.insert(response_key.as_str(), value);
        }
        Ok(response_map)
    }

    /// <https://spec.graphql.org/October2021/#CollectFields()>
    fn collect_fields(
        &self,
        object_type: &ObjectType,
        selections: impl IntoIterator<Item = &'a Selection>,
        visited_fragments: &mut HashSet<&'a Name>,
        grouped_fields: &mut IndexMap<&'a Name, Vec<&'a Node<Field>>>,
    ) {
        for selection in selections {
            match selection {
                Selection::Field(field) => {
                    if !self.is_included(&field.directives) {
                        continue;
                    }
                    grouped_fields
                        .entry(field.response_key())
                        .or_default()
                        .push(field)
                }
                Selection::FragmentSpread(spread) => {
                    if !self.is_included(&spread.directives)
                        || !visited_fragments.insert(&spread.fragment_name)
                    {
                        continue;
                    }
                    let Some(fragment) = self.document.fragments.get(&spread.fragment_name) else {
                        continue;
                    };
                    if !self.does_fragment_type_apply(object_type, fragment.type_condition()) {
                        continue;
                    }
                    self.collect_fields(
                        object_type,
                        &fragment.selection_set.selections,
                        visited_fragments,
                        grouped_fields,
                    )
                }
                Selection::InlineFragment(inline) => {
                    if !self.is_included(&inline.directives) {
                        continue;
                    }
                    if let Some(condition) = &inline.type_condition
                        && !self.does_fragment_type_apply(object_type, condition)
                    {
                        continue;
                    }
                    self.collect_fields(
                        object_type,
                        &inline.selection_set.selections,
                        visited_fragments,
                        grouped_fields,
                    )
                }
            }
        }
    }

    /// <https://spec.graphql.org/October2021/#DoesFragmentTypeApply()>
    fn does_fragment_type_apply(&self, object_type: &ObjectType, fragment_type: &Name) -> bool {
        object_type.name == *fragment_type
            || self
                .schema
                .definitions
                .is_subtype(fragment_type, &object_type.name)
    }

    /// Evaluates `@skip` and `@include`
    fn is_included(&self, directives: &DirectiveList) -> bool {
        let condition = |name: &str| {
            let value = directives.get(name)?.specified_argument_by_name("if")?;
            literal_to_json(value, self.variable_values.json())
                .ok()??
                .as_bool()
        };
        condition("skip") != Some(true) && condition("include") != Some(false)
    }

    /// <https://spec.graphql.org/October2021/#ExecuteField()>
    ///
    /// Returns `Err` for a field error being propagated upwards to find a nullable place
    fn execute_field(
        &self,
        errors: &mut Vec<graphql::Error>,
        path: LinkedPath<'_>,
        object_value: &ObjectValue<'_>,
        field_def: &'a FieldDefinition,
        fields: &[&'a Node<Field>],
    ) -> Result<Value, PropagateNull> {
        let field = fields[0];
        let arguments = match InputCoercion::new(self.schema)
            .coerce_argument_values(field, self.variable_values)
        {
            Ok(arguments) => arguments,
            Err(failure) => {
                // The resolver is not called. Only this field is null,
                // even when its type is non-null.
                errors.push(failure.to_graphql_error(
                    Some(path_to_vec(path)),
                    self.locations(field),
                    self.schema.configuration().execution.argument_path_extension,
                ));
                return Ok(Value::Null);
            }
        };
        let resolved = match object_value.resolve_field(&field.name, &arguments) {
            Ok(resolved) => resolved,
            Err(error) => {
                errors.push(self.field_error(error.message, path, field));
                return Err(PropagateNull);
            }
        };
        complete_value(self, errors, path, &field_def.ty, resolved, fields)
    }

    /// Turns a propagating null into an actual null if the type allows it.
    ///
    /// With [`ErrorPropagation::Null`], every failed field becomes null.
    pub(crate) fn try_nullify(
        &self,
        ty: &Type,
        result: Result<Value, PropagateNull>,
    ) -> Result<Value, PropagateNull> {
        match result {
            Ok(value) => Ok(value),
            Err(PropagateNull) => {
                let propagation = self.schema.configuration().execution.error_propagation;
                if ty.is_non_null() && propagation == ErrorPropagation::Propagate {
                    Err(PropagateNull)
                } else {
                    Ok(Value::Null)
                }
            }
        }
    }

    pub(crate) fn field_error(
        &self,
        message: impl Into<String>,
        path: LinkedPath<'_>,
        field: &Node<Field>,
    ) -> graphql::Error {
        graphql::Error::builder()
            .message(message)
            .locations(self.locations(field))
            .path(path_to_vec(path))
            .build()
    }

    fn locations(&self, field: &Node<Field>) -> Vec<graphql::Location> {
        field
            .line_column_range(&self.document.sources)
            .map(|range| graphql::Location::saturating(range.start.line, range.start.column))
            .into_iter()
            .collect()
    }
}

pub(crate) fn path_to_vec(mut link: LinkedPath<'_>) -> Path {
    let mut path = Vec::new();
    while let Some(node) = link {
        path.push(node.element.clone());
        link = node.next;
    }
    path.reverse();
    Path(path)
}
