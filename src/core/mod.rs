//! Core business logic - framework-agnostic series engine.
//!
//! The pure layers (`schedule`, `kind`, `definition`, `materializer`) never touch
//! storage. `series` and `progress` reach storage only through the
//! [`store::OccurrenceStore`] trait.

pub mod definition;
pub mod kind;
pub mod materializer;
pub mod progress;
pub mod schedule;
pub mod series;
pub mod store;
