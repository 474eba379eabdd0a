//! Relation tuple model.
//!
//! This module contains:
//! - Schema references (RelationReference, ObjectAndRelation)
//! - Relation tuples and their mutations (RelationTuple, TupleUpdate)
//! - Change batches emitted by a datastore change feed

mod types;

pub use types::*;
