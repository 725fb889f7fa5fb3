use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use apollo_scalars::Configuration;
use apollo_scalars::CustomScalar;
use apollo_scalars::ErrorPropagation;
use apollo_scalars::NamedCustomScalar;
use apollo_scalars::ScalarCandidate;
use apollo_scalars::Schema;
use apollo_scalars::configuration::Execution;
use apollo_scalars::error::BuildError;
use apollo_scalars::error::CoercionError;
use apollo_scalars::error::SchemaError;
use apollo_scalars::execution::InputValue;
use apollo_scalars::execution::ResolvedValue;
use apollo_scalars::graphql::Request;
use apollo_scalars::impl_resolver;
use apollo_scalars::json_ext::Value;
use pretty_assertions::assert_eq;
use serde_json_bytes::json;
use test_log::test;

const SCHEMA: &str = r#"
    scalar MyScalar
    scalar MyReturn
    scalar Temperature

    interface Place {
        name: String!
        temperature: Temperature
    }

    type City implements Place {
        name: String!
        temperature: Temperature
        population: Int
    }

    type Query {
        id: ID!
        exists(searchID: ID!): Boolean!
        toUpper(input: MyScalar!): String!
        maybeUpper(input: MyScalar!): String
        toLower(input: String!): MyReturn!
        echo(temperature: Temperature): Temperature
        warmest(readings: [Temperature!]!): Temperature
        wrongType: MyReturn
        rawTemperature: Temperature
        rawInvalid: Temperature
        failing: String!
        places: [Place!]!
    }

    type Subscription {
        ticks: Int
    }
"#;

#[derive(Debug)]
struct MyScalar {
    name: String,
}

impl fmt::Display for MyScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl CustomScalar for MyScalar {
    fn materialize(input: &Value) -> Result<Self, CoercionError> {
        match input.as_str() {
            Some(name) => Ok(MyScalar {
                name: name.to_string(),
            }),
            None => Err(CoercionError::wrong_kind(
                format!("{input} is not a string"),
                input,
            )),
        }
    }
}

#[derive(Debug)]
struct MyNamedReturn {
    result: String,
}

impl fmt::Display for MyNamedReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.result)
    }
}

impl CustomScalar for MyNamedReturn {
    fn materialize(input: &Value) -> Result<Self, CoercionError> {
        match input.as_str() {
            Some(result) => Ok(MyNamedReturn {
                result: result.to_string(),
            }),
            None => Err(CoercionError::wrong_kind(
                format!("{input} is not a string"),
                input,
            )),
        }
    }
}

impl NamedCustomScalar for MyNamedReturn {
    fn implements_graphql_type(name: &str) -> bool {
        name == "MyReturn"
    }
}

/// Degrees Celsius, sent as a number or as a string like `"12.5C"`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Temperature(f64);

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}C", self.0)
    }
}

impl CustomScalar for Temperature {
    fn materialize(input: &Value) -> Result<Self, CoercionError> {
        match input {
            Value::Number(number) => number.as_f64().map(Temperature).ok_or_else(|| {
                CoercionError::out_of_range(format!("{input} is not a finite number"), input)
            }),
            Value::String(text) => text
                .as_str()
                .strip_suffix('C')
                .and_then(|degrees| degrees.parse().ok())
                .map(Temperature)
                .ok_or_else(|| {
                    CoercionError::custom(format!("{input} is not a temperature in Celsius"), input)
                }),
            _ => Err(CoercionError::wrong_kind(
                format!("{input} is not a temperature"),
                input,
            )),
        }
    }
}

struct Query;

impl_resolver! {
    for Query:

    __typename = "Query";

    fn id() {
        Ok(ResolvedValue::leaf("test"))
    }

    fn exists(&_self, args) {
        Ok(ResolvedValue::leaf(args.str("searchID") == Some("success")))
    }

    fn toUpper(&_self, args) {
        let input = args.scalar::<MyScalar>("input").ok_or("missing input")?;
        Ok(ResolvedValue::leaf(input.name.to_uppercase()))
    }

    fn maybeUpper(&_self, args) {
        let input = args.scalar::<MyScalar>("input").ok_or("missing input")?;
        Ok(ResolvedValue::leaf(input.name.to_uppercase()))
    }

    fn toLower(&_self, args) {
        let input = args.str("input").ok_or("missing input")?;
        Ok(ResolvedValue::scalar(MyNamedReturn {
            result: input.to_lowercase(),
        }))
    }

    fn echo(&_self, args) {
        Ok(ResolvedValue::opt_scalar(
            args.scalar::<Temperature>("temperature").copied(),
        ))
    }

    fn warmest(&_self, args) {
        let readings = args
            .get("readings")
            .and_then(InputValue::as_list)
            .ok_or("missing readings")?;
        let warmest = readings
            .iter()
            .filter_map(|reading| reading.as_scalar::<Temperature>())
            .map(|reading| reading.0)
            .reduce(f64::max);
        Ok(ResolvedValue::opt_scalar(warmest.map(Temperature)))
    }

    fn wrongType() {
        Ok(ResolvedValue::scalar(Temperature(1.0)))
    }

    fn rawTemperature() {
        Ok(ResolvedValue::leaf(20))
    }

    fn rawInvalid() {
        Ok(ResolvedValue::leaf(json!({ "a": 1 })))
    }

    fn failing() {
        Err("boom".into())
    }

    fn places() {
        Ok(ResolvedValue::list(CITIES.iter().map(|city| ResolvedValue::object(city))))
    }
}

struct City {
    name: &'static str,
    temperature: Option<f64>,
    population: i32,
}

static CITIES: [City; 2] = [
    City {
        name: "Oslo",
        temperature: Some(4.5),
        population: 709_000,
    },
    City {
        name: "Lima",
        temperature: None,
        population: 10_000_000,
    },
];

impl_resolver! {
    for &'_ City:

    __typename = "City";

    fn name(&self_) {
        Ok(ResolvedValue::leaf(self_.name))
    }

    fn temperature(&self_) {
        Ok(ResolvedValue::opt_scalar(self_.temperature.map(Temperature)))
    }

    fn population(&self_) {
        Ok(ResolvedValue::leaf(self_.population))
    }
}

fn candidates() -> Vec<ScalarCandidate> {
    vec![
        ScalarCandidate::of::<MyScalar>(),
        ScalarCandidate::named::<MyNamedReturn>(),
        ScalarCandidate::of::<Temperature>(),
    ]
}

fn schema() -> Schema {
    Schema::parse(SCHEMA, &candidates()).unwrap()
}

fn schema_with(configuration: Configuration) -> Schema {
    Schema::builder()
        .sdl(SCHEMA)
        .candidates(candidates())
        .configuration(configuration)
        .build()
        .unwrap()
}

fn run(schema: &Schema, request: Request) -> Value {
    let response = apollo_scalars::execute(schema, &request, &Query);
    serde_json_bytes::to_value(response).unwrap()
}

fn query(schema: &Schema, query: &str) -> Value {
    run(schema, Request::builder().query(query).build())
}

#[test]
fn custom_scalar_argument() {
    let response = query(
        &schema(),
        r#"{ id exists(searchID: "success") toUpper(input: "phrase") }"#,
    );
    assert_eq!(
        response,
        json!({
            "data": {
                "id": "test",
                "exists": true,
                "toUpper": "PHRASE",
            }
        })
    );
}

#[test]
fn escaped_string_reaches_the_native_type_decoded() {
    let response = query(&schema(), r#"{ toUpper(input: "phr\"ase") }"#);
    assert_eq!(response, json!({ "data": { "toUpper": "PHR\"ASE" } }));
}

#[test]
fn rejected_argument_nulls_only_its_field() {
    // toUpper is non-null, but a rejected argument does not propagate
    let response = query(
        &schema(),
        r#"{ id exists(searchID: "success") toUpper(input: 123) }"#,
    );
    assert_eq!(
        response,
        json!({
            "data": {
                "id": "test",
                "exists": true,
                "toUpper": null,
            },
            "errors": [{
                "message": "123 is not a string",
                "locations": [{ "line": 1, "column": 34 }],
                "path": ["toUpper"],
                "extensions": {
                    "code": "INVALID_INPUT_TYPE",
                    "argumentPath": ["input"],
                },
            }],
        })
    );
}

#[test]
fn resolver_error_propagates_to_nullable_parent() {
    // failing is non-null, so its null propagates up to the root
    let response = query(&schema(), r#"{ id failing }"#);
    assert_eq!(response["data"], Value::Null);
    let errors = response["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["message"], json!("boom"));
    assert_eq!(errors[0]["path"], json!(["failing"]));
}

#[test]
fn out_of_range_number_literal() {
    let response = query(&schema(), r#"{ id toUpper(input: 1e999) }"#);
    assert_eq!(
        response,
        json!({
            "data": { "id": "test", "toUpper": null },
            "errors": [{
                "message": "Numeric literal 1e999 is out of range",
                "locations": [{ "line": 1, "column": 6 }],
                "path": ["toUpper"],
                "extensions": {
                    "code": "INPUT_OUT_OF_RANGE",
                    "argumentPath": ["input"],
                },
            }],
        })
    );
}

#[test]
fn rejected_argument_on_nullable_field() {
    let response = query(
        &schema(),
        r#"{ id exists(searchID: "success") maybeUpper(input: 123) }"#,
    );
    assert_eq!(
        response,
        json!({
            "data": {
                "id": "test",
                "exists": true,
                "maybeUpper": null,
            },
            "errors": [{
                "message": "123 is not a string",
                "locations": [{ "line": 1, "column": 34 }],
                "path": ["maybeUpper"],
                "extensions": {
                    "code": "INVALID_INPUT_TYPE",
                    "argumentPath": ["input"],
                },
            }],
        })
    );
}

#[test]
fn rejected_argument_without_propagation() {
    let schema = schema_with(
        Configuration::builder()
            .execution(
                Execution::builder()
                    .error_propagation(ErrorPropagation::Null)
                    .build(),
            )
            .build(),
    );
    let response = query(
        &schema,
        r#"{ id exists(searchID: "success") toUpper(input: 123) }"#,
    );
    assert_eq!(
        response["data"],
        json!({
            "id": "test",
            "exists": true,
            "toUpper": null,
        })
    );
    let errors = response["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    insta::assert_snapshot!(errors[0]["message"].as_str().unwrap(), @"123 is not a string");
}

#[test]
fn argument_path_extension_is_configurable() {
    let configuration: Configuration = "execution:\n  argument_path_extension: false\n"
        .parse()
        .unwrap();
    let response = query(&schema_with(configuration), r#"{ maybeUpper(input: 123) }"#);
    assert_eq!(
        response["errors"][0]["extensions"],
        json!({ "code": "INVALID_INPUT_TYPE" })
    );
}

#[test]
fn named_custom_scalar_result() {
    let response = query(
        &schema(),
        r#"{ id exists(searchID: "success") toLower(input: "PHRASE") }"#,
    );
    assert_eq!(
        response,
        json!({
            "data": {
                "id": "test",
                "exists": true,
                "toLower": "phrase",
            }
        })
    );
}

#[test]
fn serialized_result_round_trips() {
    let schema = schema();
    let response = query(
        &schema,
        r#"{ a: echo(temperature: 12.5) b: echo(temperature: "12.5C") }"#,
    );
    assert_eq!(
        response,
        json!({ "data": { "a": "12.5C", "b": "12.5C" } })
    );

    // feeding the wire form back in gives the same wire form
    let request = Request::builder()
        .query("query($t: Temperature) { echo(temperature: $t) }")
        .variable("t", response["data"]["a"].clone())
        .build();
    assert_eq!(
        run(&schema, request),
        json!({ "data": { "echo": "12.5C" } })
    );
}

#[test]
fn custom_rejection_code() {
    let response = query(&schema(), r#"{ echo(temperature: "hot") }"#);
    assert_eq!(response["data"], json!({ "echo": null }));
    assert_eq!(
        response["errors"][0]["message"],
        json!(r#""hot" is not a temperature in Celsius"#)
    );
    assert_eq!(
        response["errors"][0]["extensions"]["code"],
        json!("INVALID_INPUT_VALUE")
    );
}

#[test]
fn list_arguments() {
    let schema = schema();
    let response = query(&schema, r#"{ warmest(readings: [12.5, "30C", -4]) }"#);
    assert_eq!(response, json!({ "data": { "warmest": "30C" } }));

    // a single value is promoted to a list of one
    let response = query(&schema, r#"{ warmest(readings: 20) }"#);
    assert_eq!(response, json!({ "data": { "warmest": "20C" } }));

    let response = query(&schema, r#"{ warmest(readings: [12.5, true]) }"#);
    assert_eq!(response["data"], json!({ "warmest": null }));
    assert_eq!(
        response["errors"],
        json!([{
            "message": "true is not a temperature",
            "locations": [{ "line": 1, "column": 3 }],
            "path": ["warmest"],
            "extensions": {
                "code": "INVALID_INPUT_TYPE",
                "argumentPath": ["readings", 1],
            },
        }])
    );
}

#[test]
fn null_argument_is_not_materialized() {
    let response = query(&schema(), r#"{ a: echo(temperature: null) b: echo }"#);
    assert_eq!(response, json!({ "data": { "a": null, "b": null } }));
}

#[test]
fn resolver_returning_the_wrong_native_type() {
    let response = query(&schema(), r#"{ id wrongType }"#);
    assert_eq!(
        response,
        json!({
            "data": { "id": "test", "wrongType": null },
            "errors": [{
                "message": "Resolver returned a Temperature value, expected MyReturn",
                "locations": [{ "line": 1, "column": 6 }],
                "path": ["wrongType"],
                "extensions": { "code": "INTERNAL_SERVER_ERROR" },
            }],
        })
    );
}

#[test]
fn raw_json_result_goes_through_the_bound_type() {
    let response = query(&schema(), r#"{ rawTemperature rawInvalid }"#);
    assert_eq!(
        response,
        json!({
            "data": { "rawTemperature": "20C", "rawInvalid": null },
            "errors": [{
                "message": "Resolver returned {\"a\":1}, which Temperature rejected: \
                            {\"a\":1} is not a temperature",
                "locations": [{ "line": 1, "column": 18 }],
                "path": ["rawInvalid"],
                "extensions": { "code": "INTERNAL_SERVER_ERROR" },
            }],
        })
    );
}

#[test]
fn custom_scalars_in_abstract_types() {
    let response = query(
        &schema(),
        r#"
        {
            places {
                name
                ... on City { temperature }
                ...Kind
            }
        }

        fragment Kind on Place {
            __typename
        }
        "#,
    );
    assert_eq!(
        response,
        json!({
            "data": {
                "places": [
                    { "name": "Oslo", "temperature": "4.5C", "__typename": "City" },
                    { "name": "Lima", "temperature": null, "__typename": "City" },
                ]
            }
        })
    );
}

#[test]
fn variables() {
    let schema = schema();
    let request = Request::builder()
        .query("query($v: MyScalar!) { toUpper(input: $v) }")
        .variable("v", "phrase")
        .build();
    assert_eq!(
        run(&schema, request),
        json!({ "data": { "toUpper": "PHRASE" } })
    );

    let request = Request::builder()
        .query("query($v: MyScalar!) { toUpper(input: $v) }")
        .variable("v", 123)
        .build();
    assert_eq!(
        run(&schema, request),
        json!({
            "errors": [{
                "message": "invalid value for variable '$v': 123 is not a string",
                "extensions": {
                    "name": "v",
                    "coercion": "INVALID_INPUT_TYPE",
                    "code": "VALIDATION_INVALID_TYPE_VARIABLE",
                },
            }],
        })
    );

    let request = Request::builder()
        .query("query($v: MyScalar!) { toUpper(input: $v) }")
        .build();
    let response = run(&schema, request);
    assert!(!response.as_object().unwrap().contains_key("data"));
    insta::assert_snapshot!(
        response["errors"][0]["message"].as_str().unwrap(),
        @"invalid value for variable '$v': Expected a value of non-null type MyScalar!, found null"
    );
}

#[test]
fn variable_default_value() {
    let request = Request::builder()
        .query(r#"query($v: MyScalar! = "default") { toUpper(input: $v) }"#)
        .build();
    assert_eq!(
        run(&schema(), request),
        json!({ "data": { "toUpper": "DEFAULT" } })
    );
}

#[test]
fn request_errors() {
    let schema = schema();

    let response = run(&schema, Request::builder().build());
    assert_eq!(
        response,
        json!({
            "errors": [{
                "message": "Must provide query string.",
                "extensions": { "code": "MISSING_QUERY" },
            }],
        })
    );

    let response = query(&schema, "subscription { ticks }");
    assert_eq!(
        response,
        json!({
            "errors": [{
                "message": "subscription operation is not supported",
                "extensions": { "code": "SUBSCRIPTION_NOT_SUPPORTED" },
            }],
        })
    );

    let response = query(&schema, "{ nope }");
    assert!(!response.as_object().unwrap().contains_key("data"));
    assert_eq!(
        response["errors"][0]["extensions"]["code"],
        json!("GRAPHQL_VALIDATION_FAILED")
    );
}

#[test]
fn operation_name_selects_the_operation() {
    let request = Request::builder()
        .query(r#"query A { id } query B { toUpper(input: "b") }"#)
        .operation_name("B")
        .build();
    assert_eq!(
        run(&schema(), request),
        json!({ "data": { "toUpper": "B" } })
    );
}

#[test]
fn binding_errors() {
    let error = Schema::parse(SCHEMA, &[ScalarCandidate::of::<MyScalar>()]).unwrap_err();
    assert!(matches!(
        error,
        SchemaError::Scalar(BuildError::MissingBinding(_))
    ));

    #[derive(Debug)]
    struct OtherReturn;

    impl fmt::Display for OtherReturn {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("other")
        }
    }

    impl CustomScalar for OtherReturn {
        fn type_name() -> &'static str {
            "MyReturn"
        }

        fn materialize(_: &Value) -> Result<Self, CoercionError> {
            Ok(OtherReturn)
        }
    }

    let mut ambiguous = candidates();
    ambiguous.push(ScalarCandidate::of::<OtherReturn>());
    let error = Schema::parse(SCHEMA, &ambiguous).unwrap_err();
    insta::assert_snapshot!(
        error,
        @"custom scalar 'MyReturn' is claimed by both 'MyNamedReturn' and 'MyReturn'"
    );

    let error = Schema::parse(
        "type Query { id: ID }",
        &[ScalarCandidate::of::<Temperature>()],
    )
    .unwrap_err();
    insta::assert_snapshot!(
        error,
        @"native type 'Temperature' does not back any custom scalar declared in the schema"
    );
}

static COUNTED_MATERIALIZATIONS: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug)]
struct Counted;

impl fmt::Display for Counted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("counted")
    }
}

impl CustomScalar for Counted {
    fn materialize(_: &Value) -> Result<Self, CoercionError> {
        COUNTED_MATERIALIZATIONS.fetch_add(1, Ordering::SeqCst);
        Ok(Counted)
    }
}

struct CountedQuery;

impl_resolver! {
    for CountedQuery:

    __typename = "Query";

    fn count(&_self, args) {
        Ok(ResolvedValue::leaf(args.scalar::<Counted>("value").is_some()))
    }
}

#[test]
fn null_never_reaches_materialize() {
    let schema = Schema::parse(
        "scalar Counted type Query { count(value: Counted): Boolean }",
        &[ScalarCandidate::of::<Counted>()],
    )
    .unwrap();
    let request = Request::builder()
        .query("query($v: Counted) { a: count(value: null) b: count c: count(value: $v) }")
        .variable("v", Value::Null)
        .build();
    let response = apollo_scalars::execute(&schema, &request, &CountedQuery);
    assert_eq!(
        serde_json_bytes::to_value(response).unwrap(),
        json!({ "data": { "a": false, "b": false, "c": false } })
    );
    assert_eq!(COUNTED_MATERIALIZATIONS.load(Ordering::SeqCst), 0);

    let request = Request::builder()
        .query(r#"{ count(value: "x") }"#)
        .build();
    let response = apollo_scalars::execute(&schema, &request, &CountedQuery);
    assert_eq!(
        serde_json_bytes::to_value(response).unwrap(),
        json!({ "data": { "count": true } })
    );
    assert_eq!(COUNTED_MATERIALIZATIONS.load(Ordering::SeqCst), 1);

    // A variable is materialized once, however many arguments use it
    let request = Request::builder()
        .query("query($v: Counted) { a: count(value: $v) b: count(value: $v) }")
        .variable("v", "x")
        .build();
    let response = apollo_scalars::execute(&schema, &request, &CountedQuery);
    assert_eq!(
        serde_json_bytes::to_value(response).unwrap(),
        json!({ "data": { "a": true, "b": true } })
    );
    assert_eq!(COUNTED_MATERIALIZATIONS.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn schema_is_shared_between_concurrent_requests() {
    let schema = Arc::new(schema());
    let tasks = (0..16).map(|i| {
        let schema = schema.clone();
        tokio::spawn(async move {
            let request = Request::builder()
                .query("query($v: MyScalar!) { toUpper(input: $v) }")
                .variable("v", format!("request {i}"))
                .build();
            let response = apollo_scalars::execute(&schema, &request, &Query);
            (i, serde_json_bytes::to_value(response).unwrap())
        })
    });
    for task in tasks.collect::<Vec<_>>() {
        let (i, response) = task.await.unwrap();
        assert_eq!(
            response,
            json!({ "data": { "toUpper": format!("REQUEST {i}") } })
        );
    }
}
