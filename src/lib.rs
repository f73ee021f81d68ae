//! sql2mongo: lowers a SELECT/DELETE subset of SQL to MongoDB
//! find/count/distinct/aggregate/deleteMany operations.
//!
//! # Modules
//!
//! - `lexer`/`parser`: hand-written front end, SQL text to [`ast::Statement`]
//! - `ast`: the statement/expression tree the front end produces
//! - `coerce`: literal-to-`Bson` type coercion driven by [`config::FieldTypeMap`]
//! - `specialty`: recognizers for `regexMatch`/`date()`/`OBJECTID()`/`Bindata()`
//! - `lower`: the lowering pipeline (WHERE/SELECT/GROUP BY/ORDER BY, the
//!   validator, and the shape-selecting assembler) that turns a
//!   `Statement` into a [`plan::QueryPlan`]
//! - `join`: the boundary with an external join-resolving collaborator
//! - `config`: caller-supplied `FieldTypeMap`/`RenderOptions`
//! - `formatter`: renders a `QueryPlan` to `db.<collection>.<op>(...)` text
//! - `error`: the crate-wide error type
//!
//! # Example
//!
//! ```
//! use sql2mongo::config::FieldTypeMap;
//!
//! let plan = sql2mongo::translate(
//!     "SELECT name FROM users WHERE age > 21",
//!     &FieldTypeMap::new(),
//! ).unwrap();
//! assert_eq!(plan.collection, "users");
//! ```

pub mod ast;
pub mod coerce;
pub mod config;
pub mod error;
pub mod formatter;
pub mod join;
pub mod lexer;
pub mod lower;
pub mod parser;
pub mod plan;
pub mod specialty;

pub use config::{FieldType, FieldTypeMap, RenderOptions};
pub use error::{Result, TranslateError};
pub use join::{JoinPipeline, NoJoins};
pub use lower::{assemble_with_joins, translate};
pub use plan::{Op, QueryPlan};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the library version string.
pub fn version() -> &'static str {
    VERSION
}
