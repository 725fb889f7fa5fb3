//! Custom scalar coercion for GraphQL execution.
//!
//! Native Rust types declare themselves as backing a GraphQL `scalar` by
//! implementing [`CustomScalar`] (and optionally [`NamedCustomScalar`]).
//! A [`Schema`] binds every custom scalar it declares to exactly one of the
//! candidate types it is built with, and [`execution::execute`] runs requests
//! against it, materializing arguments into native values and serializing
//! native results back to JSON.
//!
//! ```ignore
//! let schema = Schema::builder()
//!     .sdl("scalar MyScalar type Query { toUpper(input: MyScalar!): String }")
//!     .candidate(ScalarCandidate::of::<MyScalar>())
//!     .build()?;
//! let response = execute(&schema, &request, &QueryResolver);
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![warn(unreachable_pub)]

#[macro_use]
pub mod execution;

pub mod configuration;
pub mod error;
pub mod graphql;
pub mod json_ext;
pub mod scalar;
mod spec;

pub use configuration::Configuration;
pub use configuration::ConfigurationError;
pub use configuration::ErrorPropagation;
pub use execution::execute;
pub use scalar::CustomScalar;
pub use scalar::NamedCustomScalar;
pub use scalar::ScalarCandidate;
pub use scalar::ScalarValue;
pub use spec::Schema;
