//! GraphQL schema.

use std::fmt;

use apollo_compiler::schema::ExtendedType;
use apollo_compiler::validation::Valid;

use crate::Configuration;
use crate::error::SchemaError;
use crate::scalar::ScalarCandidate;
use crate::scalar::ScalarRegistry;
use crate::scalar::dispatch::ScalarDispatcher;

/// A validated GraphQL schema whose custom scalars are all bound to native
/// types.
///
/// Immutable once built, and shared between concurrent requests.
pub struct Schema {
    pub(crate) definitions: Valid<apollo_compiler::Schema>,
    scalars: ScalarRegistry,
    configuration: Configuration,
}

static_assertions::assert_impl_all!(Schema: Send, Sync);

#[buildstructor::buildstructor]
impl Schema {
    /// Returns a builder that parses, validates and binds a schema.
    ///
    /// Builder methods:
    ///
    /// * `.sdl(impl Into<`[`String`]`>)`
    ///   Required.
    ///
    /// * `.candidates(impl Into<`[`Vec`]`<`[`ScalarCandidate`]`>>)` or `.candidate(ScalarCandidate)`
    ///   Native types offered to back the custom scalars the schema declares.
    ///
    /// * `.configuration(`[`Configuration`]`)`
    ///   Optional.
    ///
    /// * `.build()`
    ///   Finishes the builder and returns the schema, or a [`SchemaError`].
    #[builder(visibility = "pub")]
    fn new(
        sdl: String,
        candidates: Vec<ScalarCandidate>,
        configuration: Option<Configuration>,
    ) -> Result<Self, SchemaError> {
        let definitions = apollo_compiler::Schema::parse_and_validate(sdl, "schema.graphql")
            .map_err(|invalid| SchemaError::Validate(invalid.errors.to_string()))?;

        let declared = definitions.types.iter().filter_map(|(name, ty)| match ty {
            ExtendedType::Scalar(scalar) if !scalar.is_built_in() => Some(name.as_str()),
            _ => None,
        });
        let scalars = ScalarRegistry::new(declared, &candidates)?;

        tracing::debug!(custom_scalars = scalars.len(), "schema built");

        Ok(Schema {
            definitions,
            scalars,
            configuration: configuration.unwrap_or_default(),
        })
    }

    /// Builds a schema with the default configuration.
    pub fn parse(sdl: &str, candidates: &[ScalarCandidate]) -> Result<Self, SchemaError> {
        Self::builder()
            .sdl(sdl)
            .candidates(candidates.to_vec())
            .build()
    }

    /// The validated schema definitions.
    pub fn definitions(&self) -> &Valid<apollo_compiler::Schema> {
        &self.definitions
    }

    /// The custom scalar bindings.
    pub fn scalars(&self) -> &ScalarRegistry {
        &self.scalars
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub(crate) fn dispatcher(&self) -> ScalarDispatcher<'_> {
        ScalarDispatcher::new(&self.scalars)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("scalars", &self.scalars)
            .field("configuration", &self.configuration)
            .finish_non_exhaustive()
    }
}
