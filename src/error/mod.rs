//! Error types for SQL-to-MongoDB translation.
//!
//! This module defines the single crate-wide error enum used by the
//! lexer/parser front end and every lowering component. There is no
//! driver or connection collaborator in this crate, so the error surface
//! is narrower than a full shell application's: translation either
//! succeeds with a complete `QueryPlan` or fails with one message.

mod kinds;

pub use kinds::{Result, TranslateError};
