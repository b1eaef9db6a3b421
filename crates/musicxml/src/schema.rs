//! Compiled-in schema metadata: element name → content-model tree + attribute
//! list + value type (§4.A).
//!
//! The actual tables are produced at build time by `musicxml-codegen` from
//! `schema/musicxml-4.0.xsd` and pulled in via [`include!`] below. Nothing in
//! this module hand-encodes schema data; it only defines the shapes the
//! generated code populates and the read-only API the rest of the crate uses
//! to query them.

use std::collections::HashMap;
use std::sync::OnceLock;

/// An occurrence bound: either a concrete count or `unbounded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurs {
    Bounded(u32),
    Unbounded,
}

impl Occurs {
    /// Whether one more occurrence is still permitted given `count` so far.
    pub fn allows(self, count: u32) -> bool {
        match self {
            Occurs::Bounded(max) => count < max,
            Occurs::Unbounded => true,
        }
    }

    pub fn is_unbounded_or_gt_one(self) -> bool {
        match self {
            Occurs::Bounded(n) => n > 1,
            Occurs::Unbounded => true,
        }
    }
}

/// A node in an XSD particle tree (§3).
#[derive(Debug, Clone)]
pub enum ContentModelNode {
    Sequence {
        min_occurs: u32,
        max_occurs: Occurs,
        items: Vec<ContentModelNode>,
    },
    Choice {
        min_occurs: u32,
        max_occurs: Occurs,
        items: Vec<ContentModelNode>,
    },
    All {
        items: Vec<ContentModelNode>,
    },
    GroupRef {
        group: &'static str,
    },
    Element(ElementParticle),
}

/// A leaf particle naming one allowed child element.
#[derive(Debug, Clone, Copy)]
pub struct ElementParticle {
    pub name: &'static str,
    pub min_occurs: u32,
    pub max_occurs: Occurs,
}

/// An attribute declaration on a complex type.
#[derive(Debug, Clone, Copy)]
pub struct AttributeDecl {
    pub name: &'static str,
    pub type_ref: &'static str,
    pub required: bool,
    pub default_value: Option<&'static str>,
}

/// Binds an element's complex type to its attributes and content model (§4.C).
#[derive(Debug, Clone)]
pub struct ComplexTypeDescriptor {
    pub attributes: Vec<AttributeDecl>,
    pub content: ComplexContent,
    /// Simple type governing `value` when this type allows simple content
    /// (text content alongside attributes, no child elements).
    pub simple_content_type: Option<&'static str>,
}

#[derive(Debug, Clone)]
pub enum ComplexContent {
    Empty,
    Model(ContentModelNode),
}

/// A global element declaration: which complex type it uses.
#[derive(Debug, Clone, Copy)]
pub struct ElementDecl {
    pub complex_type_ref: &'static str,
    pub min_occurs: u32,
    pub max_occurs: Occurs,
}

/// The base XSD atomic kind a simple type ultimately restricts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomicKind {
    String,
    Token,
    Integer,
    NonNegativeInteger,
    Decimal,
    Boolean,
}

/// Facets narrowing a restriction's value space (§4.B).
#[derive(Debug, Clone, Default)]
pub struct Facets {
    pub pattern: Option<&'static str>,
    pub min_inclusive: Option<f64>,
    pub max_inclusive: Option<f64>,
    pub min_exclusive: Option<f64>,
    pub max_exclusive: Option<f64>,
    pub length: Option<u64>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
}

/// One XSD simple type definition, as consumed by the validators in
/// [`crate::simple_types`].
#[derive(Debug, Clone)]
pub enum SimpleTypeDef {
    Atomic {
        base: AtomicKind,
    },
    Enumeration {
        base: AtomicKind,
        values: Vec<&'static str>,
    },
    Restriction {
        base: AtomicKind,
        facets: Facets,
    },
    List {
        item_type: &'static str,
    },
    Union {
        member_types: Vec<&'static str>,
    },
}

/// Process-wide, immutable, initialize-once schema metadata (§3, §5).
pub struct SchemaTable {
    pub elements: HashMap<&'static str, ElementDecl>,
    pub complex_types: HashMap<&'static str, ComplexTypeDescriptor>,
    pub simple_types: HashMap<&'static str, SimpleTypeDef>,
    pub groups: HashMap<&'static str, ContentModelNode>,
}

impl SchemaTable {
    pub fn element(&self, name: &str) -> Option<&ElementDecl> {
        self.elements.get(name)
    }

    /// Look up a complex type by name. A missing reference here is a
    /// programmer error (corrupted or mismatched compiled-in table), not a
    /// recoverable condition, so this panics with a descriptive message
    /// rather than returning `Option`/`Result`.
    pub fn complex_type(&self, name: &str) -> &ComplexTypeDescriptor {
        self.complex_types
            .get(name)
            .unwrap_or_else(|| panic!("schema table corrupted: no complex type named '{name}'"))
    }

    pub fn simple_type(&self, name: &str) -> Option<&SimpleTypeDef> {
        self.simple_types.get(name)
    }

    pub fn group(&self, name: &str) -> &ContentModelNode {
        self.groups
            .get(name)
            .unwrap_or_else(|| panic!("schema table corrupted: no group named '{name}'"))
    }
}

static TABLE: OnceLock<SchemaTable> = OnceLock::new();

/// Returns the process-wide schema table, building it on first access.
pub fn schema_table() -> &'static SchemaTable {
    TABLE.get_or_init(|| {
        let table = build_schema_table();
        tracing::debug!(
            elements = table.elements.len(),
            complex_types = table.complex_types.len(),
            simple_types = table.simple_types.len(),
            groups = table.groups.len(),
            "schema table loaded"
        );
        table
    })
}

include!(concat!(env!("OUT_DIR"), "/schema_table.rs"));
