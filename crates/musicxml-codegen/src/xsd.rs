//! Parser for the MusicXML XSD schema.
//!
//! Extracts simpleType, complexType, group, attributeGroup, and top-level
//! element definitions from `schema/musicxml-4.0.xsd`.

use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::BufRead;
use std::path::Path;

use crate::ast::*;

fn local_name(name: &[u8]) -> Vec<u8> {
    match name.iter().position(|&b| b == b':') {
        Some(i) => name[i + 1..].to_vec(),
        None => name.to_vec(),
    }
}

fn get_attr(e: &BytesStart<'_>, key: &str) -> Option<String> {
    let key = key.as_bytes();
    for a in e.attributes() {
        let a = a.ok()?;
        if a.key.as_ref() == key {
            return Some(String::from_utf8_lossy(a.value.as_ref()).into_owned());
        }
    }
    None
}

fn parse_u32(s: &str) -> u32 {
    s.parse().unwrap_or(1)
}

fn parse_occurs(e: &BytesStart<'_>) -> Occurs {
    match get_attr(e, "maxOccurs").as_deref() {
        Some("unbounded") => Occurs::Unbounded,
        Some(n) => Occurs::Bounded(parse_u32(n)),
        None => Occurs::Bounded(1),
    }
}

fn parse_min_occurs(e: &BytesStart<'_>) -> u32 {
    get_attr(e, "minOccurs").map(|s| parse_u32(&s)).unwrap_or(1)
}

/// Parse the MusicXML XSD file and return a Schema AST.
pub fn parse_xsd(path: &Path) -> Result<Schema> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("read XSD: {}", path.display()))?;
    parse_xsd_str(&content)
}

/// Parse XSD from string (for tests or in-memory schemas).
pub fn parse_xsd_str(content: &str) -> Result<Schema> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut schema = Schema::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let local = local_name(e.name().as_ref());
                match local.as_slice() {
                    b"simpleType" => {
                        if let Some(n) = get_attr(&e, "name") {
                            if let Some(st) = read_simple_type(&mut reader, &mut buf)? {
                                schema.simple_types.insert(n, st);
                            }
                        }
                    }
                    b"complexType" => {
                        if let Some(n) = get_attr(&e, "name") {
                            let ct = read_complex_type(&mut reader, &mut buf)?;
                            schema.complex_types.insert(n, ct);
                        }
                    }
                    b"group" => {
                        if let Some(n) = get_attr(&e, "name") {
                            let g = read_group(&mut reader, &mut buf)?;
                            schema.groups.insert(n, g);
                        }
                    }
                    b"attributeGroup" => {
                        if let Some(n) = get_attr(&e, "name") {
                            let ag = read_attribute_group(&mut reader, &mut buf)?;
                            schema.attribute_groups.insert(n, ag);
                        }
                    }
                    b"element" => {
                        if let Some(n) = get_attr(&e, "name") {
                            let type_name = get_attr(&e, "type");
                            let min_occurs = parse_min_occurs(&e);
                            let max_occurs = parse_occurs(&e);
                            skip_to_end(&mut reader, &mut buf, "element")?;
                            schema.elements.insert(
                                n,
                                ElementDecl {
                                    type_name,
                                    min_occurs,
                                    max_occurs,
                                },
                            );
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                let local = local_name(e.name().as_ref());
                if local.as_slice() == b"element" {
                    if let Some(n) = get_attr(&e, "name") {
                        let type_name = get_attr(&e, "type");
                        let min_occurs = parse_min_occurs(&e);
                        let max_occurs = parse_occurs(&e);
                        schema.elements.insert(
                            n,
                            ElementDecl {
                                type_name,
                                min_occurs,
                                max_occurs,
                            },
                        );
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    Ok(schema)
}

/// Skip forward until the end tag matching `name` at the current depth.
fn skip_to_end<R: BufRead>(reader: &mut Reader<R>, buf: &mut Vec<u8>, name: &str) -> Result<()> {
    let name = name.as_bytes().to_vec();
    let mut depth = 1u32;
    loop {
        buf.clear();
        match reader.read_event_into(buf)? {
            Event::Start(e) if local_name(e.name().as_ref()) == name => depth += 1,
            Event::End(e) if local_name(e.name().as_ref()) == name => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => anyhow::bail!("unexpected EOF while skipping <{}>", String::from_utf8_lossy(&name)),
            _ => {}
        }
    }
}

fn read_simple_type<R: BufRead>(reader: &mut Reader<R>, buf: &mut Vec<u8>) -> Result<Option<SimpleType>> {
    let mut result = None;
    let mut depth = 1u32;
    loop {
        buf.clear();
        match reader.read_event_into(buf)? {
            Event::Start(e) => {
                let local = local_name(e.name().as_ref());
                match local.as_slice() {
                    b"restriction" => {
                        let base = get_attr(&e, "base").unwrap_or_else(|| "xs:string".into());
                        let (values, facets) = read_restriction_body(reader, buf)?;
                        result = Some(if values.is_empty() {
                            if facets_empty(&facets) {
                                SimpleType::Atomic { base }
                            } else {
                                SimpleType::Restriction { base, facets }
                            }
                        } else {
                            SimpleType::Enumeration { base, values }
                        });
                    }
                    b"list" => {
                        let item_type = get_attr(&e, "itemType").unwrap_or_else(|| "xs:string".into());
                        skip_to_end(reader, buf, "list")?;
                        result = Some(SimpleType::List { item_type });
                    }
                    _ => depth += 1,
                }
            }
            Event::Empty(e) => {
                let local = local_name(e.name().as_ref());
                if local.as_slice() == b"union" {
                    let members = get_attr(&e, "memberTypes").unwrap_or_default();
                    let member_types = members.split_whitespace().map(|s| s.to_string()).collect();
                    result = Some(SimpleType::Union { member_types });
                } else if local.as_slice() == b"list" {
                    let item_type = get_attr(&e, "itemType").unwrap_or_else(|| "xs:string".into());
                    result = Some(SimpleType::List { item_type });
                }
            }
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(result);
                }
            }
            Event::Eof => anyhow::bail!("unexpected EOF in simpleType"),
            _ => {}
        }
    }
}

fn facets_empty(f: &Facets) -> bool {
    f.pattern.is_none()
        && f.min_inclusive.is_none()
        && f.max_inclusive.is_none()
        && f.min_exclusive.is_none()
        && f.max_exclusive.is_none()
        && f.length.is_none()
        && f.min_length.is_none()
        && f.max_length.is_none()
}

fn read_restriction_body<R: BufRead>(
    reader: &mut Reader<R>,
    buf: &mut Vec<u8>,
) -> Result<(Vec<String>, Facets)> {
    let mut values = Vec::new();
    let mut facets = Facets::default();
    let mut depth = 1u32;
    loop {
        buf.clear();
        match reader.read_event_into(buf)? {
            Event::Empty(e) => {
                let local = local_name(e.name().as_ref());
                match local.as_slice() {
                    b"enumeration" => {
                        if let Some(v) = get_attr(&e, "value") {
                            values.push(v);
                        }
                    }
                    b"pattern" => facets.pattern = get_attr(&e, "value"),
                    b"minInclusive" => facets.min_inclusive = get_attr(&e, "value"),
                    b"maxInclusive" => facets.max_inclusive = get_attr(&e, "value"),
                    b"minExclusive" => facets.min_exclusive = get_attr(&e, "value"),
                    b"maxExclusive" => facets.max_exclusive = get_attr(&e, "value"),
                    b"length" => facets.length = get_attr(&e, "value").and_then(|v| v.parse().ok()),
                    b"minLength" => {
                        facets.min_length = get_attr(&e, "value").and_then(|v| v.parse().ok())
                    }
                    b"maxLength" => {
                        facets.max_length = get_attr(&e, "value").and_then(|v| v.parse().ok())
                    }
                    _ => {}
                }
            }
            Event::Start(e) => {
                let local = local_name(e.name().as_ref());
                skip_to_end(reader, buf, std::str::from_utf8(&local).unwrap_or(""))?;
            }
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok((values, facets));
                }
            }
            Event::Eof => anyhow::bail!("unexpected EOF in restriction"),
            _ => {}
        }
    }
}

fn read_attribute(e: &BytesStart<'_>) -> Attribute {
    Attribute {
        name: get_attr(e, "name").unwrap_or_default(),
        type_name: get_attr(e, "type").unwrap_or_else(|| "xs:string".into()),
        required: get_attr(e, "use").as_deref() == Some("required"),
        default_value: get_attr(e, "default"),
    }
}

fn read_complex_type<R: BufRead>(reader: &mut Reader<R>, buf: &mut Vec<u8>) -> Result<ComplexType> {
    let mut content = ComplexContent::Empty;
    let mut attribute_group_refs = Vec::new();
    let mut attributes = Vec::new();
    let mut depth = 1u32;

    loop {
        buf.clear();
        match reader.read_event_into(buf)? {
            Event::Start(e) => {
                let local = local_name(e.name().as_ref());
                match local.as_slice() {
                    b"sequence" => {
                        let min_occurs = parse_min_occurs(&e);
                        let max_occurs = parse_occurs(&e);
                        let p = read_particle_list(reader, buf, "sequence")?;
                        content = ComplexContent::Model(Particle::Sequence {
                            min_occurs,
                            max_occurs,
                            items: p,
                        });
                    }
                    b"choice" => {
                        let min_occurs = parse_min_occurs(&e);
                        let max_occurs = parse_occurs(&e);
                        let p = read_particle_list(reader, buf, "choice")?;
                        content = ComplexContent::Model(Particle::Choice {
                            min_occurs,
                            max_occurs,
                            items: p,
                        });
                    }
                    b"all" => {
                        let p = read_particle_list(reader, buf, "all")?;
                        content = ComplexContent::Model(Particle::All { items: p });
                    }
                    b"simpleContent" => {
                        let (base, attrs, ag_refs) = read_simple_content(reader, buf)?;
                        content = ComplexContent::SimpleExtension { base };
                        attributes.extend(attrs);
                        attribute_group_refs.extend(ag_refs);
                    }
                    b"attribute" => {
                        attributes.push(read_attribute(&e));
                        skip_to_end(reader, buf, "attribute")?;
                    }
                    _ => depth += 1,
                }
            }
            Event::Empty(e) => {
                let local = local_name(e.name().as_ref());
                match local.as_slice() {
                    b"attribute" => attributes.push(read_attribute(&e)),
                    b"attributeGroup" => {
                        if let Some(r) = get_attr(&e, "ref") {
                            attribute_group_refs.push(r);
                        }
                    }
                    _ => {}
                }
            }
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(ComplexType {
                        content,
                        attribute_group_refs,
                        attributes,
                    });
                }
            }
            Event::Eof => anyhow::bail!("unexpected EOF in complexType"),
            _ => {}
        }
    }
}

fn read_simple_content<R: BufRead>(
    reader: &mut Reader<R>,
    buf: &mut Vec<u8>,
) -> Result<(String, Vec<Attribute>, Vec<String>)> {
    let mut base = String::from("xs:string");
    let mut attributes = Vec::new();
    let mut attribute_group_refs = Vec::new();
    let mut depth = 1u32;
    loop {
        buf.clear();
        match reader.read_event_into(buf)? {
            Event::Start(e) => {
                let local = local_name(e.name().as_ref());
                if local.as_slice() == b"extension" {
                    base = get_attr(&e, "base").unwrap_or_else(|| "xs:string".into());
                } else if local.as_slice() == b"attribute" {
                    attributes.push(read_attribute(&e));
                    skip_to_end(reader, buf, "attribute")?;
                } else {
                    depth += 1;
                }
            }
            Event::Empty(e) => {
                let local = local_name(e.name().as_ref());
                if local.as_slice() == b"extension" {
                    base = get_attr(&e, "base").unwrap_or_else(|| "xs:string".into());
                } else if local.as_slice() == b"attribute" {
                    attributes.push(read_attribute(&e));
                } else if local.as_slice() == b"attributeGroup" {
                    if let Some(r) = get_attr(&e, "ref") {
                        attribute_group_refs.push(r);
                    }
                }
            }
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok((base, attributes, attribute_group_refs));
                }
            }
            Event::Eof => anyhow::bail!("unexpected EOF in simpleContent"),
            _ => {}
        }
    }
}

/// Read the items of a sequence/choice/all until its matching end tag.
fn read_particle_list<R: BufRead>(
    reader: &mut Reader<R>,
    buf: &mut Vec<u8>,
    closing: &str,
) -> Result<Vec<Particle>> {
    let mut items = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(buf)? {
            Event::Start(e) => {
                let local = local_name(e.name().as_ref());
                match local.as_slice() {
                    b"sequence" => {
                        let min_occurs = parse_min_occurs(&e);
                        let max_occurs = parse_occurs(&e);
                        let inner = read_particle_list(reader, buf, "sequence")?;
                        items.push(Particle::Sequence {
                            min_occurs,
                            max_occurs,
                            items: inner,
                        });
                    }
                    b"choice" => {
                        let min_occurs = parse_min_occurs(&e);
                        let max_occurs = parse_occurs(&e);
                        let inner = read_particle_list(reader, buf, "choice")?;
                        items.push(Particle::Choice {
                            min_occurs,
                            max_occurs,
                            items: inner,
                        });
                    }
                    b"all" => {
                        let inner = read_particle_list(reader, buf, "all")?;
                        items.push(Particle::All { items: inner });
                    }
                    b"element" => {
                        let name = get_attr(&e, "name").unwrap_or_default();
                        let type_name = get_attr(&e, "type");
                        let min_occurs = parse_min_occurs(&e);
                        let max_occurs = parse_occurs(&e);
                        skip_to_end(reader, buf, "element")?;
                        items.push(Particle::Element(ElementParticle {
                            name,
                            type_name,
                            min_occurs,
                            max_occurs,
                        }));
                    }
                    _ => {
                        skip_to_end(reader, buf, std::str::from_utf8(&local).unwrap_or(""))?;
                    }
                }
            }
            Event::Empty(e) => {
                let local = local_name(e.name().as_ref());
                match local.as_slice() {
                    b"element" => {
                        let name = get_attr(&e, "name").unwrap_or_default();
                        let type_name = get_attr(&e, "type");
                        items.push(Particle::Element(ElementParticle {
                            name,
                            type_name,
                            min_occurs: parse_min_occurs(&e),
                            max_occurs: parse_occurs(&e),
                        }));
                    }
                    b"group" => {
                        if let Some(r) = get_attr(&e, "ref") {
                            items.push(Particle::GroupRef {
                                name: r,
                                min_occurs: parse_min_occurs(&e),
                                max_occurs: parse_occurs(&e),
                            });
                        }
                    }
                    _ => {}
                }
            }
            Event::End(e) => {
                let local = local_name(e.name().as_ref());
                if local == closing.as_bytes() {
                    return Ok(items);
                }
            }
            Event::Eof => anyhow::bail!("unexpected EOF in {closing}"),
            _ => {}
        }
    }
}

fn read_group<R: BufRead>(reader: &mut Reader<R>, buf: &mut Vec<u8>) -> Result<Particle> {
    let mut depth = 1u32;
    loop {
        buf.clear();
        match reader.read_event_into(buf)? {
            Event::Start(e) => {
                let local = local_name(e.name().as_ref());
                match local.as_slice() {
                    b"sequence" => {
                        let min_occurs = parse_min_occurs(&e);
                        let max_occurs = parse_occurs(&e);
                        let items = read_particle_list(reader, buf, "sequence")?;
                        skip_to_end(reader, buf, "group")?;
                        return Ok(Particle::Sequence {
                            min_occurs,
                            max_occurs,
                            items,
                        });
                    }
                    b"choice" => {
                        let min_occurs = parse_min_occurs(&e);
                        let max_occurs = parse_occurs(&e);
                        let items = read_particle_list(reader, buf, "choice")?;
                        skip_to_end(reader, buf, "group")?;
                        return Ok(Particle::Choice {
                            min_occurs,
                            max_occurs,
                            items,
                        });
                    }
                    b"all" => {
                        let items = read_particle_list(reader, buf, "all")?;
                        skip_to_end(reader, buf, "group")?;
                        return Ok(Particle::All { items });
                    }
                    _ => depth += 1,
                }
            }
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(Particle::Sequence {
                        min_occurs: 1,
                        max_occurs: Occurs::Bounded(1),
                        items: Vec::new(),
                    });
                }
            }
            Event::Eof => anyhow::bail!("unexpected EOF in group"),
            _ => {}
        }
    }
}

fn read_attribute_group<R: BufRead>(
    reader: &mut Reader<R>,
    buf: &mut Vec<u8>,
) -> Result<AttributeGroup> {
    let mut attributes = Vec::new();
    let mut attribute_group_refs = Vec::new();
    let mut depth = 1u32;
    loop {
        buf.clear();
        match reader.read_event_into(buf)? {
            Event::Start(e) => {
                let local = local_name(e.name().as_ref());
                if local.as_slice() == b"attribute" {
                    attributes.push(read_attribute(&e));
                    skip_to_end(reader, buf, "attribute")?;
                } else {
                    depth += 1;
                }
            }
            Event::Empty(e) => {
                let local = local_name(e.name().as_ref());
                match local.as_slice() {
                    b"attribute" => attributes.push(read_attribute(&e)),
                    b"attributeGroup" => {
                        if let Some(r) = get_attr(&e, "ref") {
                            attribute_group_refs.push(r);
                        }
                    }
                    _ => {}
                }
            }
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(AttributeGroup {
                        attributes,
                        attribute_group_refs,
                    });
                }
            }
            Event::Eof => anyhow::bail!("unexpected EOF in attributeGroup"),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pitch_complex_type() {
        let xsd = r#"<?xml version="1.0"?>
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
          <xs:simpleType name="step">
            <xs:restriction base="xs:string">
              <xs:enumeration value="A"/>
              <xs:enumeration value="G"/>
            </xs:restriction>
          </xs:simpleType>
          <xs:complexType name="pitch">
            <xs:sequence>
              <xs:element name="step" type="step"/>
              <xs:element name="alter" type="xs:decimal" minOccurs="0"/>
              <xs:element name="octave" type="xs:integer"/>
            </xs:sequence>
          </xs:complexType>
          <xs:element name="pitch" type="pitch"/>
        </xs:schema>"#;
        let schema = parse_xsd_str(xsd).unwrap();
        assert!(schema.complex_types.contains_key("pitch"));
        assert!(schema.elements.contains_key("pitch"));
        match &schema.simple_types["step"] {
            SimpleType::Enumeration { values, .. } => assert_eq!(values, &["A", "G"]),
            other => panic!("expected enumeration, got {other:?}"),
        }
    }

    #[test]
    fn parses_group_ref_with_unbounded_occurs() {
        let xsd = r#"<?xml version="1.0"?>
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
          <xs:group name="articulations">
            <xs:choice>
              <xs:element name="accent" type="xs:string"/>
              <xs:element name="staccato" type="xs:string"/>
            </xs:choice>
          </xs:group>
          <xs:complexType name="articulations">
            <xs:sequence>
              <xs:group ref="articulations" maxOccurs="unbounded"/>
            </xs:sequence>
          </xs:complexType>
        </xs:schema>"#;
        let schema = parse_xsd_str(xsd).unwrap();
        let ct = &schema.complex_types["articulations"];
        match &ct.content {
            ComplexContent::Model(Particle::Sequence { items, .. }) => match &items[0] {
                Particle::GroupRef { name, max_occurs, .. } => {
                    assert_eq!(name, "articulations");
                    assert_eq!(*max_occurs, Occurs::Unbounded);
                }
                other => panic!("expected group ref, got {other:?}"),
            },
            other => panic!("expected sequence model, got {other:?}"),
        }
    }
}
