//! Custom scalars backed by native Rust types.
//!
//! The [GraphQL specification](https://spec.graphql.org/October2021/#sec-Scalars)
//! requires every scalar to be representable as a string, so a custom scalar
//! is a type that can be displayed, and that can be materialized from any
//! JSON value the client sent.

use std::any::Any;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use crate::error::CoercionError;
use crate::json_ext::Value;

pub(crate) mod dispatch;
pub(crate) mod registry;

pub use registry::ScalarBinding;
pub use registry::ScalarRegistry;

/// A native type able to back a GraphQL custom scalar.
///
/// This trait assumes that the name of the implementing type and the name of
/// the custom scalar match. Implement [`NamedCustomScalar`] as well when they
/// don't, or when one type backs several scalars.
pub trait CustomScalar: fmt::Display + fmt::Debug + Send + Sync + Sized + 'static {
    /// The name this type declares for itself.
    ///
    /// Defaults to the unqualified Rust type name, without generic arguments.
    fn type_name() -> &'static str {
        short_type_name::<Self>()
    }

    /// Builds an instance from a decoded input value.
    ///
    /// Never called with `null`.
    fn materialize(input: &Value) -> Result<Self, CoercionError>;

    /// The wire representation of this value.
    fn serialize(&self) -> String {
        self.to_string()
    }
}

/// A [`CustomScalar`] choosing which GraphQL scalars it backs, instead of
/// relying on its type name.
pub trait NamedCustomScalar: CustomScalar {
    /// Returns true if the implementation supports a GraphQL type of the
    /// provided name.
    fn implements_graphql_type(name: &str) -> bool;
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}

/// How a candidate decides which scalar names it backs.
///
/// Resolved once, when the candidate is created.
#[derive(Clone, Copy)]
pub enum Capability {
    /// Backs the scalar whose name equals the type name.
    Basic,
    /// Backs every scalar for which the function returns true.
    NamedCustom(fn(&str) -> bool),
}

impl Capability {
    fn accepts(&self, type_name: &str, scalar_name: &str) -> bool {
        match self {
            Capability::Basic => type_name == scalar_name,
            Capability::NamedCustom(implements_graphql_type) => implements_graphql_type(scalar_name),
        }
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Basic => f.write_str("Basic"),
            Capability::NamedCustom(_) => f.write_str("NamedCustom"),
        }
    }
}

type MaterializeFn = fn(&Value) -> Result<ScalarValue, CoercionError>;

/// A native type offered to the schema as a possible backing for its custom
/// scalars.
#[derive(Clone, Copy)]
pub struct ScalarCandidate {
    type_name: &'static str,
    type_id: TypeId,
    capability: Capability,
    materialize: MaterializeFn,
}

impl ScalarCandidate {
    /// A candidate backing the scalar named after `T`.
    pub fn of<T: CustomScalar>() -> Self {
        Self::with_capability::<T>(Capability::Basic)
    }

    /// A candidate backing every scalar `T` claims through
    /// [`NamedCustomScalar::implements_graphql_type`].
    pub fn named<T: NamedCustomScalar>() -> Self {
        Self::with_capability::<T>(Capability::NamedCustom(T::implements_graphql_type))
    }

    fn with_capability<T: CustomScalar>(capability: Capability) -> Self {
        Self {
            type_name: T::type_name(),
            type_id: TypeId::of::<T>(),
            capability,
            materialize: |input| T::materialize(input).map(ScalarValue::new),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Returns true if this candidate is willing to back `scalar_name`.
    pub fn accepts(&self, scalar_name: &str) -> bool {
        self.capability.accepts(self.type_name, scalar_name)
    }

    pub(crate) fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub(crate) fn materialize(&self, input: &Value) -> Result<ScalarValue, CoercionError> {
        (self.materialize)(input)
    }
}

impl fmt::Debug for ScalarCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarCandidate")
            .field("type_name", &self.type_name)
            .field("capability", &self.capability)
            .finish()
    }
}

trait AnyScalar: Any + fmt::Debug + Send + Sync {
    fn serialize(&self) -> String;
    fn native_type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: CustomScalar> AnyScalar for T {
    fn serialize(&self) -> String {
        CustomScalar::serialize(self)
    }

    fn native_type_name(&self) -> &'static str {
        T::type_name()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// An instance of some [`CustomScalar`], as produced by input coercion or
/// returned by a resolver.
///
/// Cloning shares the native value: a variable is materialized once, however
/// many arguments use it.
#[derive(Debug, Clone)]
pub struct ScalarValue(Arc<dyn AnyScalar>);

impl ScalarValue {
    pub fn new<T: CustomScalar>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// The wire representation of the native value.
    pub fn serialize(&self) -> String {
        self.0.serialize()
    }

    /// The declared name of the native type.
    pub fn type_name(&self) -> &'static str {
        self.0.native_type_name()
    }

    pub fn is<T: CustomScalar>(&self) -> bool {
        self.0.as_any().is::<T>()
    }

    pub fn downcast_ref<T: CustomScalar>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    /// Takes back the native value, if it is a `T` that no clone still shares.
    pub fn downcast<T: CustomScalar>(self) -> Option<T> {
        let value = self.0.into_any().downcast::<T>().ok()?;
        Arc::try_unwrap(value).ok()
    }

    pub(crate) fn native_type_id(&self) -> TypeId {
        self.0.as_any().type_id()
    }
}

impl<T: CustomScalar> From<T> for ScalarValue {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}
