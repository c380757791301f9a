//! SPARQL side of the pipeline: turning a matched pattern into an
//! injection-safe SELECT query, posting it to an endpoint, and rendering
//! the results.

pub mod builder;
pub mod client;
pub mod format;

pub use builder::{BuildError, OrderDirection, QueryBuilder, QueryOptions, MAX_ROW_LIMIT};
pub use client::{Auth, ClientError, ResultSet, SparqlClient};
pub use format::OutputFormat;
