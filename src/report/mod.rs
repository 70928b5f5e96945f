//! Dashboard rendering.
//!
//! Markdown for terminals and files, JSON for machines.

mod generator;

pub use generator::{generate_json_report, generate_markdown_report, write_report};
