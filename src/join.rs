//! The boundary between the assembler (C7) and whatever collaborator
//! knows how to turn a join clause into `$lookup`-shaped pipeline stages.
//!
//! The core recognizes that joins are present — it never builds the
//! stages itself (§1, §4.9). Callers who need real join support supply
//! their own [`JoinPipeline`] implementation; this crate ships only the
//! no-op default used when a statement carries no join clauses.

use bson::Document;

use crate::ast::JoinClause;
use crate::error::Result;

/// Resolves a statement's join clauses into the ordered pipeline stages
/// the assembler splices in immediately after `$match` (§4.5).
pub trait JoinPipeline {
    /// Build the stages for `joins`. An empty slice must yield an empty
    /// `Vec` rather than an error.
    fn build(&self, joins: &[JoinClause]) -> Result<Vec<Document>>;
}

/// The default collaborator: recognizes joins exist but refuses to build
/// anything for them. Used whenever a statement has no `joins` at all;
/// wiring in actual `$lookup` stage construction is explicitly out of
/// scope for this crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoJoins;

impl JoinPipeline for NoJoins {
    fn build(&self, joins: &[JoinClause]) -> Result<Vec<Document>> {
        if joins.is_empty() {
            Ok(Vec::new())
        } else {
            Err(crate::error::TranslateError::UnsupportedJoin)
        }
    }
}
