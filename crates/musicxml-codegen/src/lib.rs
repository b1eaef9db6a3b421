//! MusicXML XSD → compiled schema-table generator.
//!
//! Parses the MusicXML 4.0 XSD schema and generates the Rust source that
//! `musicxml`'s [`build.rs`](../../musicxml/build.rs) compiles into the
//! `musicxml::schema` module.

mod ast;
mod generator;
mod xsd;

pub use ast::*;
pub use generator::generate;
pub use xsd::parse_xsd;
