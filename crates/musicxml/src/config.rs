//! Recognized configuration options (§6).

/// Options controlling schema checking and serialization.
///
/// Mirrors the `SerializeConfig`/`DeserializeConfig` split the teacher
/// codebase uses for its own format adapters, collapsed into one struct
/// here since both parsing and serialization share the same three knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// When `false`, disables all schema checking on add/remove and on
    /// `to_string`; children are appended in call order.
    pub xsd_check: bool,
    /// Indentation width, in spaces, for serialization.
    pub indent: usize,
    /// Whether to emit an `<?xml version="1.0" encoding="UTF-8"?>` header.
    pub include_xml_declaration: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            xsd_check: true,
            indent: 2,
            include_xml_declaration: true,
        }
    }
}
