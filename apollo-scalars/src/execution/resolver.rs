use std::fmt;

use indexmap::IndexMap;

use crate::json_ext::Value;
use crate::scalar::CustomScalar;
use crate::scalar::ScalarValue;

/// A GraphQL object whose fields can be resolved during execution
pub type ObjectValue<'a> = dyn Resolver + 'a;

/// Abstraction for implementing field resolvers. Used through [`ObjectValue`].
///
/// Use the [`impl_resolver!`][crate::impl_resolver] macro to implement this trait
/// with reduced boilerplate
pub trait Resolver {
    /// Returns the name of the concrete object type this resolver represents
    ///
    /// That name expected to be that of an object type defined in the schema.
    /// This is called when the schema indicates an abstract (interface or union) type.
    fn type_name(&self) -> &str;

    /// Resolves a field of this object with the given arguments
    ///
    /// Arguments are coerced according to their definition in the schema:
    /// custom scalar arguments are already materialized as native values.
    /// The resolver is not called if any argument fails coercion.
    fn resolve_field<'a>(
        &'a self,
        field_name: &'a str,
        arguments: &'a Arguments,
    ) -> Result<ResolvedValue<'a>, ResolverError>;
}

/// A field error reported by a resolver. The message is shown to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverError {
    pub message: String,
}

impl fmt::Display for ResolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.message.fmt(f)
    }
}

impl From<String> for ResolverError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for ResolverError {
    fn from(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Implements the [`Resolver`] trait with reduced boilerplate
///
/// Define:
///
/// * The implementing Rust type
/// * The __typename string
/// * One pseudo-method per field. Types are omitted in the signature for brevity.
///   - Takes two optional arguments: `&self` (which must be spelled something else because macros)
///     and `args: `[`&Arguments`][crate::execution::Arguments] for the field arguments.
///   - Returns `Result<ResolvedValue, ResolverError>`, `Err` is turned into a field error.
///     `String` and `&str` convert into `ResolverError` with `?`.
#[macro_export]
macro_rules! impl_resolver {
    (
        for $ty: ty:
        __typename = $type_name: expr;
        $(
            fn $field_name: ident(
                $( &$self_: ident $(, $( $args: ident $(,)? )? )? )?
            ) $block: block
        )*

    ) => {
        impl $crate::execution::Resolver for $ty {
            fn type_name(&self) -> &str {
                $type_name
            }

            fn resolve_field<'a>(
                &'a self,
                field_name: &'a str,
                arguments: &'a $crate::execution::Arguments,
            ) -> Result<
                $crate::execution::ResolvedValue<'a>,
                $crate::execution::ResolverError
            > {
                let _allow_unused = arguments;
                match field_name {
                    $(
                        stringify!($field_name) => {
                            $(
                                let $self_ = self;
                                $($(
                                    let $args = arguments;
                                )?)?
                            )?
                            return $block
                        },
                    )*
                    _ => Err($crate::execution::ResolverError {
                        message: format!(
                            "unexpected field name: {field_name} in type {}",
                            $crate::execution::Resolver::type_name(self)
                        )
                    }),
                }
            }
        }
    };
}

/// The value of a resolved field
pub enum ResolvedValue<'a> {
    /// * JSON null represents GraphQL null
    /// * A GraphQL enum value is represented as a JSON string
    /// * GraphQL built-in scalars are coerced according to their respective *Result Coercion* spec
    /// * For custom scalars, the JSON value is materialized by the type bound to the scalar,
    ///   then serialized
    Leaf(Value),

    /// A native value for a custom scalar, serialized by the type bound to it
    Scalar(ScalarValue),

    /// Expected where the GraphQL type is an object, interface, or union type
    Object(Box<ObjectValue<'a>>),

    /// Expected for GraphQL list types
    List(Box<dyn Iterator<Item = Result<ResolvedValue<'a>, ResolverError>> + 'a>),
}

impl<'a> ResolvedValue<'a> {
    /// Construct a null leaf resolved value
    pub fn null() -> Self {
        Self::Leaf(Value::Null)
    }

    /// Construct a leaf resolved value from something that is convertible to JSON
    pub fn leaf(json: impl Into<Value>) -> Self {
        Self::Leaf(json.into())
    }

    /// Construct a custom scalar resolved value from its native value
    pub fn scalar(value: impl CustomScalar) -> Self {
        Self::Scalar(ScalarValue::new(value))
    }

    /// Construct a custom scalar resolved value or null, from an optional native value
    pub fn opt_scalar(value: Option<impl CustomScalar>) -> Self {
        match value {
            Some(value) => Self::scalar(value),
            None => Self::null(),
        }
    }

    /// Construct an object resolved value from the resolver for that object
    pub fn object(resolver: impl Resolver + 'a) -> Self {
        Self::Object(Box::new(resolver))
    }

    /// Construct an object resolved value or null, from an optional resolver
    pub fn opt_object(opt_resolver: Option<impl Resolver + 'a>) -> Self {
        match opt_resolver {
            Some(resolver) => Self::Object(Box::new(resolver)),
            None => Self::null(),
        }
    }

    /// Construct a list resolved value from an iterator
    pub fn list<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Self>,
        I::IntoIter: 'a,
    {
        Self::List(Box::new(iter.into_iter().map(Ok)))
    }
}

impl fmt::Debug for ResolvedValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf(value) => f.debug_tuple("Leaf").field(value).finish(),
            Self::Scalar(value) => f.debug_tuple("Scalar").field(value).finish(),
            Self::Object(object) => f.debug_tuple("Object").field(&object.type_name()).finish(),
            Self::List(_) => f.write_str("List(..)"),
        }
    }
}

/// A coerced argument value, or a part of one.
///
/// Cloning shares custom scalar values rather than materializing them again.
#[derive(Debug, Clone)]
pub enum InputValue {
    Null,
    /// A built-in scalar or an enum value.
    Leaf(Value),
    /// A custom scalar, materialized as its native type.
    Scalar(ScalarValue),
    List(Vec<InputValue>),
    /// An input object, including the fields filled from default values.
    Object(IndexMap<String, InputValue>),
}

impl InputValue {
    pub fn is_null(&self) -> bool {
        matches!(self, InputValue::Null)
    }

    pub fn as_leaf(&self) -> Option<&Value> {
        match self {
            InputValue::Leaf(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_leaf()?.as_str()
    }

    pub fn as_scalar<T: CustomScalar>(&self) -> Option<&T> {
        match self {
            InputValue::Scalar(value) => value.downcast_ref(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[InputValue]> {
        match self {
            InputValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, InputValue>> {
        match self {
            InputValue::Object(fields) => Some(fields),
            _ => None,
        }
    }
}

/// The coerced arguments of a field.
///
/// Arguments that were neither provided nor defaulted are absent.
#[derive(Debug, Default)]
pub struct Arguments(pub(crate) IndexMap<String, InputValue>);

impl Arguments {
    pub fn get(&self, name: &str) -> Option<&InputValue> {
        self.0.get(name)
    }

    /// The native value of a custom scalar argument.
    pub fn scalar<T: CustomScalar>(&self, name: &str) -> Option<&T> {
        self.get(name)?.as_scalar()
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name)?.as_str()
    }

    pub fn i32(&self, name: &str) -> Option<i32> {
        self.get(name)?
            .as_leaf()?
            .as_i64()
            .and_then(|int| i32::try_from(int).ok())
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.get(name)?.as_leaf()?.as_f64()
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name)?.as_leaf()?.as_bool()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &InputValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, InputValue)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (String, InputValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;
    use crate::scalar::tests::MyScalar;

    struct QueryResolver {
        world: String,
    }

    impl_resolver! {
        for &'_ QueryResolver:

        __typename = "Query";

        fn null() {
            Ok(ResolvedValue::null())
        }

        fn hello(&self_) {
            Ok(ResolvedValue::list([
                ResolvedValue::leaf(format!("Hello {}!", self_.world)),
                ResolvedValue::leaf(format!("Hello {}!", self_.world)),
            ]))
        }

        fn toUpper(&_self, args) {
            let input = args.scalar::<MyScalar>("input").ok_or("missing input")?;
            Ok(ResolvedValue::leaf(input.name.to_uppercase()))
        }

        fn myselfAgain(&self_) {
            Ok(ResolvedValue::object(*self_))
        }
    }

    fn arguments() -> Arguments {
        [
            (
                "input".to_string(),
                InputValue::Scalar(ScalarValue::new(MyScalar {
                    name: "phrase".to_string(),
                })),
            ),
            ("count".to_string(), InputValue::Leaf(json!(3))),
            ("flag".to_string(), InputValue::Leaf(json!(true))),
            ("name".to_string(), InputValue::Leaf(json!("n"))),
            ("nothing".to_string(), InputValue::Null),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn typed_argument_access() {
        let arguments = arguments();
        assert_eq!(arguments.scalar::<MyScalar>("input").unwrap().name, "phrase");
        assert_eq!(arguments.i32("count"), Some(3));
        assert_eq!(arguments.f64("count"), Some(3.0));
        assert_eq!(arguments.bool("flag"), Some(true));
        assert_eq!(arguments.str("name"), Some("n"));
        assert!(arguments.get("nothing").unwrap().is_null());
        assert!(arguments.get("absent").is_none());
        assert!(arguments.str("input").is_none());
        assert_eq!(arguments.len(), 5);
    }

    #[test]
    fn macro_dispatches_fields() {
        let resolver = QueryResolver {
            world: "World".to_string(),
        };
        let resolver = &resolver;
        let arguments = arguments();
        assert_eq!(Resolver::type_name(&resolver), "Query");

        match resolver.resolve_field("toUpper", &arguments).unwrap() {
            ResolvedValue::Leaf(value) => assert_eq!(value, json!("PHRASE")),
            other => panic!("unexpected {other:?}"),
        }
        match resolver.resolve_field("hello", &arguments).unwrap() {
            ResolvedValue::List(items) => assert_eq!(items.count(), 2),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            resolver.resolve_field("myselfAgain", &arguments).unwrap(),
            ResolvedValue::Object(_)
        ));
        assert!(matches!(
            resolver.resolve_field("null", &arguments).unwrap(),
            ResolvedValue::Leaf(Value::Null)
        ));

        let error = resolver
            .resolve_field("toUpper", &Arguments::default())
            .unwrap_err();
        assert_eq!(error.message, "missing input");
        let error = resolver
            .resolve_field("unknown", &arguments)
            .unwrap_err();
        assert_eq!(error.message, "unexpected field name: unknown in type Query");
    }
}
