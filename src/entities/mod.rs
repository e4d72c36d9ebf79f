//! Entity module - Contains the SeaORM entity definitions for the database.
//! Occurrences live in a single flat table; series membership is expressed
//! through the `series_id` and `root_id` columns rather than relations.

pub mod occurrence;

pub use occurrence::{
    Column as OccurrenceColumn, Entity as Occurrence, Model as OccurrenceModel, ObligationKind,
    OccurrenceState,
};
