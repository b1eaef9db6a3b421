//! Generate Rust source for the compiled-in schema table from the XSD AST.
//!
//! The AST produced by [`crate::xsd`] mirrors XSD structure closely (named
//! groups, attribute groups, particle trees keyed by name). This module
//! resolves all of that down to the flat, runtime-facing shape
//! `musicxml::schema` expects: one element-name → type map (covering both
//! globally declared elements and every locally used leaf element name,
//! since MusicXML reuses element names with a single consistent type
//! throughout the schema), one complex-type table, one simple-type table,
//! and one named-group table.

use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::path::Path;

use crate::ast::*;

fn atomic_kind(xsd_base: &str) -> &'static str {
    match xsd_base {
        "xs:integer" | "xs:int" | "xs:long" | "xs:positiveInteger" => "AtomicKind::Integer",
        "xs:nonNegativeInteger" => "AtomicKind::NonNegativeInteger",
        "xs:decimal" | "xs:float" | "xs:double" => "AtomicKind::Decimal",
        "xs:boolean" => "AtomicKind::Boolean",
        "xs:token" | "xs:normalizedString" | "xs:NMTOKEN" | "xs:anyURI" => "AtomicKind::Token",
        _ => "AtomicKind::String",
    }
}

fn occurs_literal(o: Occurs) -> String {
    match o {
        Occurs::Bounded(n) => format!("Occurs::Bounded({n})"),
        Occurs::Unbounded => "Occurs::Unbounded".to_string(),
    }
}

/// Recursively collect every element name used as a particle leaf, anywhere
/// in a content-model tree, into `out` (first occurrence wins).
fn collect_leaf_elements(p: &Particle, out: &mut HashMap<String, Option<String>>) {
    match p {
        Particle::Sequence { items, .. } | Particle::Choice { items, .. } => {
            for it in items {
                collect_leaf_elements(it, out);
            }
        }
        Particle::All { items } => {
            for it in items {
                collect_leaf_elements(it, out);
            }
        }
        Particle::GroupRef { .. } => {}
        Particle::Element(ep) => {
            out.entry(ep.name.clone()).or_insert_with(|| ep.type_name.clone());
        }
    }
}

/// Expand an attribute group (and any groups it references) into a flat,
/// declaration-ordered attribute list.
fn resolve_attribute_group(schema: &Schema, name: &str, out: &mut Vec<Attribute>, seen: &mut HashSet<String>) {
    if !seen.insert(name.to_string()) {
        return;
    }
    let Some(ag) = schema.attribute_groups.get(name) else {
        return;
    };
    for r in &ag.attribute_group_refs {
        resolve_attribute_group(schema, r, out, seen);
    }
    out.extend(ag.attributes.iter().cloned());
}

fn resolve_attributes(schema: &Schema, ct: &ComplexType) -> Vec<Attribute> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for r in &ct.attribute_group_refs {
        resolve_attribute_group(schema, r, &mut out, &mut seen);
    }
    out.extend(ct.attributes.iter().cloned());
    out
}

fn gen_attribute_decl(a: &Attribute) -> String {
    let default_lit = match &a.default_value {
        Some(v) => format!("Some({v:?})"),
        None => "None".to_string(),
    };
    format!(
        "AttributeDecl {{ name: {:?}, type_ref: {:?}, required: {}, default_value: {} }}",
        a.name, a.type_name, a.required, default_lit
    )
}

fn gen_particle(p: &Particle) -> String {
    match p {
        Particle::Sequence { min_occurs, max_occurs, items } => format!(
            "ContentModelNode::Sequence {{ min_occurs: {min_occurs}, max_occurs: {}, items: vec![{}] }}",
            occurs_literal(*max_occurs),
            items.iter().map(gen_particle).collect::<Vec<_>>().join(", ")
        ),
        Particle::Choice { min_occurs, max_occurs, items } => format!(
            "ContentModelNode::Choice {{ min_occurs: {min_occurs}, max_occurs: {}, items: vec![{}] }}",
            occurs_literal(*max_occurs),
            items.iter().map(gen_particle).collect::<Vec<_>>().join(", ")
        ),
        Particle::All { items } => format!(
            "ContentModelNode::All {{ items: vec![{}] }}",
            items.iter().map(gen_particle).collect::<Vec<_>>().join(", ")
        ),
        Particle::GroupRef { name, min_occurs, max_occurs } => {
            let group_ref = format!("ContentModelNode::GroupRef {{ group: {name:?} }}");
            // A group ref's own occurs bounds how many times the whole
            // referenced particle may repeat; the runtime GroupRef node is
            // transparent, so fold non-default occurs into a wrapping
            // Sequence of one rather than losing them.
            if *min_occurs == 1 && *max_occurs == Occurs::Bounded(1) {
                group_ref
            } else {
                format!(
                    "ContentModelNode::Sequence {{ min_occurs: {min_occurs}, max_occurs: {}, items: vec![{group_ref}] }}",
                    occurs_literal(*max_occurs)
                )
            }
        }
        Particle::Element(ep) => format!(
            "ContentModelNode::Element(ElementParticle {{ name: {:?}, min_occurs: {}, max_occurs: {} }})",
            ep.name,
            ep.min_occurs,
            occurs_literal(ep.max_occurs)
        ),
    }
}

fn sanitize_key(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Generate `schema_table.rs` into `out_dir`.
pub fn generate(schema: &Schema, out_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(out_dir)?;
    let mut out = String::new();
    writeln!(out, "// Generated by musicxml-codegen from schema/musicxml-4.0.xsd. DO NOT EDIT.")?;
    writeln!(out, "fn build_schema_table() -> SchemaTable {{")?;

    // --- simple types ---
    writeln!(out, "    let mut simple_types: HashMap<&'static str, SimpleTypeDef> = HashMap::new();")?;
    for (name, st) in &schema.simple_types {
        let def = match st {
            SimpleType::Atomic { base } => format!("SimpleTypeDef::Atomic {{ base: {} }}", atomic_kind(base)),
            SimpleType::Enumeration { base, values } => format!(
                "SimpleTypeDef::Enumeration {{ base: {}, values: vec![{}] }}",
                atomic_kind(base),
                values.iter().map(|v| format!("{v:?}")).collect::<Vec<_>>().join(", ")
            ),
            SimpleType::Restriction { base, facets } => format!(
                "SimpleTypeDef::Restriction {{ base: {}, facets: Facets {{ pattern: {}, min_inclusive: {}, max_inclusive: {}, min_exclusive: {}, max_exclusive: {}, length: {:?}, min_length: {:?}, max_length: {:?} }} }}",
                atomic_kind(base),
                facets.pattern.as_ref().map(|p| format!("Some({p:?})")).unwrap_or_else(|| "None".into()),
                facets.min_inclusive.as_ref().map(|v| format!("Some({v}f64)")).unwrap_or_else(|| "None".into()),
                facets.max_inclusive.as_ref().map(|v| format!("Some({v}f64)")).unwrap_or_else(|| "None".into()),
                facets.min_exclusive.as_ref().map(|v| format!("Some({v}f64)")).unwrap_or_else(|| "None".into()),
                facets.max_exclusive.as_ref().map(|v| format!("Some({v}f64)")).unwrap_or_else(|| "None".into()),
                facets.length,
                facets.min_length,
                facets.max_length,
            ),
            SimpleType::List { item_type } => format!("SimpleTypeDef::List {{ item_type: {item_type:?} }}"),
            SimpleType::Union { member_types } => format!(
                "SimpleTypeDef::Union {{ member_types: vec![{}] }}",
                member_types.iter().map(|m| format!("{m:?}")).collect::<Vec<_>>().join(", ")
            ),
        };
        writeln!(out, "    simple_types.insert({name:?}, {def});")?;
    }

    // --- named groups ---
    writeln!(out, "    let mut groups: HashMap<&'static str, ContentModelNode> = HashMap::new();")?;
    for (name, particle) in &schema.groups {
        writeln!(out, "    groups.insert({name:?}, {});", gen_particle(particle))?;
    }

    // --- complex types (as declared) ---
    writeln!(out, "    let mut complex_types: HashMap<&'static str, ComplexTypeDescriptor> = HashMap::new();")?;
    for (name, ct) in &schema.complex_types {
        let attrs = resolve_attributes(schema, ct);
        let attrs_lit = attrs.iter().map(gen_attribute_decl).collect::<Vec<_>>().join(", ");
        let (content_lit, simple_content_lit) = match &ct.content {
            ComplexContent::Empty => ("ComplexContent::Empty".to_string(), "None".to_string()),
            ComplexContent::Model(p) => (format!("ComplexContent::Model({})", gen_particle(p)), "None".to_string()),
            ComplexContent::SimpleExtension { base } => {
                ("ComplexContent::Empty".to_string(), format!("Some({base:?})"))
            }
        };
        writeln!(
            out,
            "    complex_types.insert({name:?}, ComplexTypeDescriptor {{ attributes: vec![{attrs_lit}], content: {content_lit}, simple_content_type: {simple_content_lit} }});"
        )?;
    }

    // --- element name -> type map: global declarations + every particle leaf ---
    let mut leaf_names: HashMap<String, Option<String>> = HashMap::new();
    for (_, ct) in &schema.complex_types {
        if let ComplexContent::Model(p) = &ct.content {
            collect_leaf_elements(p, &mut leaf_names);
        }
    }
    for (_, particle) in &schema.groups {
        collect_leaf_elements(particle, &mut leaf_names);
    }
    for (name, decl) in &schema.elements {
        leaf_names.entry(name.clone()).or_insert_with(|| decl.type_name.clone());
    }

    let mut synthesized: HashMap<String, String> = HashMap::new(); // type_name -> synth key
    writeln!(out, "    let mut elements: HashMap<&'static str, ElementDecl> = HashMap::new();")?;
    for (name, type_name) in &leaf_names {
        let type_name = type_name.clone().unwrap_or_else(|| "xs:string".to_string());
        let type_ref: String = if schema.complex_types.contains_key(&type_name) {
            type_name.clone()
        } else {
            // Simple-typed leaf (named simple type or a bare xs: primitive):
            // synthesize a shared, attribute-less, childless complex type
            // whose `simple_content_type` carries the original type name.
            synthesized
                .entry(type_name.clone())
                .or_insert_with(|| format!("__leaf_{}", sanitize_key(&type_name)))
                .clone()
        };
        writeln!(
            out,
            "    elements.insert({name:?}, ElementDecl {{ complex_type_ref: {type_ref:?}, min_occurs: 1, max_occurs: Occurs::Bounded(1) }});"
        )?;
    }
    for (type_name, synth_key) in &synthesized {
        writeln!(
            out,
            "    complex_types.insert({synth_key:?}, ComplexTypeDescriptor {{ attributes: vec![], content: ComplexContent::Empty, simple_content_type: Some({type_name:?}) }});"
        )?;
    }

    writeln!(
        out,
        "    SchemaTable {{ elements, complex_types, simple_types, groups }}"
    )?;
    writeln!(out, "}}")?;

    std::fs::write(out_dir.join("schema_table.rs"), out)?;
    Ok(())
}
