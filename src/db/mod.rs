//! MongoDB storage layer
//!
//! Typed collection access with schema-declared indexes. The enrollment
//! engine owns the `enrollments` collection; `courses` and `learners` are
//! collaborator-owned collections this engine reads (and, for the course
//! enrolled counter, atomically increments).

pub mod mongo;
pub mod schemas;

pub use mongo::{IntoIndexes, MongoClient, MongoCollection, MutMetadata};
