use std::any::TypeId;

use indexmap::IndexMap;
use indexmap::map::Entry;

use super::Capability;
use super::ScalarCandidate;
use super::ScalarValue;
use crate::error::BuildError;
use crate::error::CoercionError;
use crate::json_ext::Value;

/// A custom scalar bound to the native type backing it.
#[derive(Debug, Clone)]
pub struct ScalarBinding {
    scalar_name: String,
    candidate: ScalarCandidate,
}

impl ScalarBinding {
    pub fn scalar_name(&self) -> &str {
        &self.scalar_name
    }

    /// The declared name of the native type.
    pub fn type_name(&self) -> &'static str {
        self.candidate.type_name()
    }

    pub fn capability(&self) -> Capability {
        self.candidate.capability()
    }

    pub(crate) fn type_id(&self) -> TypeId {
        self.candidate.type_id()
    }

    pub(crate) fn materialize(&self, input: &Value) -> Result<ScalarValue, CoercionError> {
        self.candidate.materialize(input)
    }
}

/// The custom scalar bindings of one schema.
///
/// Immutable once built.
#[derive(Debug, Default)]
pub struct ScalarRegistry {
    bindings: IndexMap<String, ScalarBinding>,
}

static_assertions::assert_impl_all!(ScalarRegistry: Send, Sync);

impl ScalarRegistry {
    /// Binds every declared custom scalar to exactly one candidate.
    ///
    /// Fails if a declared scalar has no candidate, if two distinct native
    /// types claim the same scalar, or if a candidate backs none of the
    /// declared scalars.
    pub fn new<I, S>(declared: I, candidates: &[ScalarCandidate]) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let declared: Vec<String> = declared.into_iter().map(Into::into).collect();
        let mut registry = Self::default();

        for candidate in candidates {
            let mut backs_any = false;
            for scalar_name in declared.iter().filter(|name| candidate.accepts(name)) {
                registry.register(scalar_name, *candidate)?;
                backs_any = true;
            }
            if !backs_any {
                return Err(BuildError::UnboundCandidate(candidate.type_name()));
            }
        }

        if let Some(missing) = declared
            .iter()
            .find(|name| !registry.bindings.contains_key(name.as_str()))
        {
            return Err(BuildError::MissingBinding(missing.clone()));
        }

        Ok(registry)
    }

    fn register(&mut self, scalar_name: &str, candidate: ScalarCandidate) -> Result<(), BuildError> {
        match self.bindings.entry(scalar_name.to_string()) {
            Entry::Occupied(entry) => {
                let bound = entry.get();
                if bound.type_id() == candidate.type_id() {
                    return Ok(());
                }
                Err(BuildError::AmbiguousBinding {
                    scalar: scalar_name.to_string(),
                    bound: bound.type_name(),
                    other: candidate.type_name(),
                })
            }
            Entry::Vacant(entry) => {
                tracing::debug!(
                    scalar = scalar_name,
                    native_type = candidate.type_name(),
                    capability = ?candidate.capability(),
                    "bound custom scalar"
                );
                entry.insert(ScalarBinding {
                    scalar_name: scalar_name.to_string(),
                    candidate,
                });
                Ok(())
            }
        }
    }

    pub fn resolve(&self, scalar_name: &str) -> Option<&ScalarBinding> {
        self.bindings.get(scalar_name)
    }

    pub fn bindings(&self) -> impl Iterator<Item = &ScalarBinding> {
        self.bindings.values()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
