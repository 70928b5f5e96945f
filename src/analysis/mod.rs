//! Analysis modules.
//!
//! Building the per-product aggregate from row tables, querying it for
//! rollups and forecasts, and matching product notes.

pub mod builder;
pub mod notes;
pub mod query;

#[cfg(test)]
pub(crate) mod test_support;

pub use builder::build_catalog;
pub use notes::matching_notes;
pub use query::QueryContext;
