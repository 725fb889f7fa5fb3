//! GraphQL execution engine.
//!
//! Executes a request against a [`Schema`] and a root [`Resolver`].
//! Arguments are coerced before resolvers are called, materializing custom
//! scalars into their native types, and native values returned by resolvers
//! are serialized back by the type bound to their scalar.
//!
//! Fields are resolved sequentially, for queries and mutations alike.
//! Subscriptions are not supported.

#[macro_use]
pub(crate) mod resolver;
pub(crate) mod engine;
pub(crate) mod input_coercion;
pub(crate) mod result_coercion;

use apollo_compiler::ExecutableDocument;
use apollo_compiler::ast::OperationType;
use apollo_compiler::response::GraphQLError;

pub use self::resolver::Arguments;
pub use self::resolver::InputValue;
pub use self::resolver::ObjectValue;
pub use self::resolver::ResolvedValue;
pub use self::resolver::Resolver;
pub use self::resolver::ResolverError;
use self::engine::ExecutionContext;
use self::input_coercion::InputCoercion;
use crate::Schema;
use crate::error::RequestError;
use crate::graphql;
use crate::json_ext::Value;

/// Executes `request` against `schema`, starting from the `root` object of
/// the operation type.
///
/// Request errors (an invalid document, an unknown operation, invalid
/// variables) produce a response without `data`. Field errors produce a
/// partial response.
#[tracing::instrument(skip_all, level = "trace")]
pub fn execute(
    schema: &Schema,
    request: &graphql::Request,
    root: &ObjectValue<'_>,
) -> graphql::Response {
    match execute_request(schema, request, root) {
        Ok(response) => response,
        Err(errors) => {
            tracing::trace!(errors = errors.len(), "request failed before execution");
            graphql::Response::from_errors(errors)
        }
    }
}

fn execute_request(
    schema: &Schema,
    request: &graphql::Request,
    root: &ObjectValue<'_>,
) -> Result<graphql::Response, Vec<graphql::Error>> {
    let argument_path_extension = schema.configuration().execution.argument_path_extension;
    let request_error = |error: RequestError| vec![error.to_graphql_error(argument_path_extension)];

    let Some(query) = request.query.as_deref() else {
        return Err(request_error(RequestError::MissingQuery));
    };
    let document = ExecutableDocument::parse_and_validate(&schema.definitions, query, "query")
        .map_err(|invalid| {
            invalid
                .errors
                .iter()
                .map(|diagnostic| {
                    let mut error = graphql::Error::from(diagnostic.to_json());
                    error
                        .extensions
                        .entry("code")
                        .or_insert_with(|| "GRAPHQL_VALIDATION_FAILED".into());
                    error
                })
                .collect::<Vec<_>>()
        })?;
    let operation = document
        .operations
        .get(request.operation_name.as_deref())
        .map_err(|e| vec![e.to_graphql_error(&document.sources).into()])?;

    let plain_error = |message: &str| {
        vec![graphql::Error::from(GraphQLError::new(
            message,
            None,
            &document.sources,
        ))]
    };
    if operation.operation_type == OperationType::Subscription {
        return Err(request_error(RequestError::SubscriptionNotSupported));
    }
    let Some(root_type) = schema
        .definitions
        .root_operation(operation.operation_type)
        .and_then(|name| schema.definitions.get_object(name))
    else {
        return Err(plain_error("root operation type not found"));
    };

    let variable_values = InputCoercion::new(schema)
        .coerce_variable_values(&operation.variables, &request.variables)
        .map_err(|errors| {
            errors
                .into_iter()
                .map(|error| error.to_graphql_error(argument_path_extension))
                .collect::<Vec<_>>()
        })?;

    let ctx = ExecutionContext {
        schema,
        document: &document,
        variable_values: &variable_values,
    };
    let mut errors = Vec::new();
    let data = ctx
        .execute_selection_set(
            &mut errors,
            None,
            root_type,
            root,
            &operation.selection_set.selections,
        )
        .map(Value::Object)
        // Root field errors propagated to the root: data is null
        .unwrap_or(Value::Null);

    Ok(graphql::Response::builder()
        .data(data)
        .errors(errors)
        .build())
}
