//! GraphQL schema definitions, bound to native custom scalars.

mod schema;

pub use schema::Schema;
