//! Core data model definitions shared across Cinedex crates.
#![allow(missing_docs)]

pub mod documents;
pub mod error;
pub mod ids;
pub mod role;

// Intentionally curated re-exports for downstream consumers.
pub use documents::{
    GenreDocument, GenreEntry, MovieDocument, PersonDocument, PersonEntry,
};
pub use error::ModelError;
pub use ids::{GenreId, MovieId, PersonId};
pub use role::Role;
