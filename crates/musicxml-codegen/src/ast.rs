//! AST for the MusicXML XSD schema.
//!
//! Represents parsed simple types, complex types, groups, attribute groups,
//! and top-level elements used to generate the compiled-in schema table.

#![allow(dead_code)]

use std::collections::HashMap;

/// Schema AST built from the XSD file.
#[derive(Debug, Default)]
pub struct Schema {
    pub simple_types: HashMap<String, SimpleType>,
    pub complex_types: HashMap<String, ComplexType>,
    pub groups: HashMap<String, Particle>,
    pub attribute_groups: HashMap<String, AttributeGroup>,
    pub elements: HashMap<String, ElementDecl>,
}

/// Occurrence bound: either a concrete count or `unbounded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurs {
    Bounded(u32),
    Unbounded,
}

impl Default for Occurs {
    fn default() -> Self {
        Occurs::Bounded(1)
    }
}

/// xs:simpleType: atomic alias, enumeration, restriction with facets, list, or union.
#[derive(Debug, Clone)]
pub enum SimpleType {
    /// Plain alias to a base XSD primitive (e.g. xs:decimal, xs:string).
    Atomic { base: String },
    /// Enumeration of allowed values, restricted from a base type.
    Enumeration { base: String, values: Vec<String> },
    /// Restriction to a base type with facets (pattern, min/max, length).
    Restriction { base: String, facets: Facets },
    /// Whitespace-separated list of items of the given item type.
    List { item_type: String },
    /// Union of member simple types, tried left-to-right.
    Union { member_types: Vec<String> },
}

/// Facets narrowing a restriction's value space.
#[derive(Debug, Clone, Default)]
pub struct Facets {
    pub pattern: Option<String>,
    pub min_inclusive: Option<String>,
    pub max_inclusive: Option<String>,
    pub min_exclusive: Option<String>,
    pub max_exclusive: Option<String>,
    pub length: Option<u64>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
}

/// xs:complexType: element content and attributes.
#[derive(Debug, Clone)]
pub struct ComplexType {
    pub content: ComplexContent,
    pub attribute_group_refs: Vec<String>,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComplexContent {
    /// No child elements (attributes only, or truly empty).
    Empty,
    /// xs:simpleContent/xs:extension base="...".
    SimpleExtension { base: String },
    /// xs:sequence, xs:choice, or xs:all of particles.
    Model(Particle),
}

/// Content model particle: sequence, choice, all, group ref, or element.
#[derive(Debug, Clone, PartialEq)]
pub enum Particle {
    Sequence {
        min_occurs: u32,
        max_occurs: Occurs,
        items: Vec<Particle>,
    },
    Choice {
        min_occurs: u32,
        max_occurs: Occurs,
        items: Vec<Particle>,
    },
    All {
        items: Vec<Particle>,
    },
    GroupRef {
        name: String,
        min_occurs: u32,
        max_occurs: Occurs,
    },
    Element(ElementParticle),
}

/// Element in content model: name, type ref, min/max occurs.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementParticle {
    pub name: String,
    pub type_name: Option<String>,
    pub min_occurs: u32,
    pub max_occurs: Occurs,
}

/// xs:attribute.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub type_name: String,
    pub required: bool,
    pub default_value: Option<String>,
}

/// xs:group: named group with content model.
#[derive(Debug, Clone)]
pub struct Group {
    pub content: Particle,
}

/// xs:attributeGroup: named group of attributes, possibly referencing others.
#[derive(Debug, Clone)]
pub struct AttributeGroup {
    pub attributes: Vec<Attribute>,
    pub attribute_group_refs: Vec<String>,
}

/// Top-level xs:element (e.g. score-partwise, pitch).
#[derive(Debug, Clone)]
pub struct ElementDecl {
    /// type="..." reference when present.
    pub type_name: Option<String>,
    pub min_occurs: u32,
    pub max_occurs: Occurs,
}
