//! Serializer Adapter (§4.G): pre-order traversal of a validated element
//! tree into indented XML text, grounded on `tusk-mei`'s `MeiWriter` (custom
//! `quick_xml::Writer` wrapper rather than serde, since the element tree has
//! no static Rust type to derive `Serialize` from).

use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::config::Config;
use crate::element::ElementNode;
use crate::error::MusicXmlResult;

const INFALLIBLE: &str = "writing XML events into an in-memory buffer cannot fail";

/// Serialize `root` (and its subtree) to a UTF-8 XML string per `config`.
///
/// Assumes `root` has already passed [`ElementNode::final_checks`] if the
/// caller wants completeness enforced; this function only linearizes.
pub fn serialize(root: &ElementNode, config: &Config) -> MusicXmlResult<String> {
    let mut buf = Vec::new();
    {
        let mut writer = Writer::new_with_indent(&mut buf, b' ', config.indent);
        if config.include_xml_declaration {
            writer
                .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
                .expect(INFALLIBLE);
        }
        write_element(&mut writer, root);
    }
    Ok(String::from_utf8(buf).expect("quick_xml only emits valid UTF-8 from UTF-8 input"))
}

fn write_element<W: Write>(writer: &mut Writer<W>, node: &ElementNode) {
    let name = node.name();
    let descriptor = node.descriptor();

    let mut start = BytesStart::new(name.clone());
    for decl in &descriptor.attributes {
        if let Some(value) = node.attribute(decl.name) {
            start.push_attribute((decl.name, value.as_xml_text().as_str()));
        }
    }

    let children = node.children();
    let value = node.value();

    if children.is_empty() {
        match value {
            Some(value) => {
                writer.write_event(Event::Start(start)).expect(INFALLIBLE);
                writer
                    .write_event(Event::Text(BytesText::new(&value.as_xml_text())))
                    .expect(INFALLIBLE);
                writer
                    .write_event(Event::End(BytesEnd::new(name)))
                    .expect(INFALLIBLE);
            }
            None => {
                writer.write_event(Event::Empty(start)).expect(INFALLIBLE);
            }
        }
    } else {
        writer.write_event(Event::Start(start)).expect(INFALLIBLE);
        for child in &children {
            write_element(writer, child);
        }
        writer
            .write_event(Event::End(BytesEnd::new(name)))
            .expect(INFALLIBLE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::NamedChildValue;

    #[test]
    fn pitch_serializes_with_two_space_indent() {
        let pitch = ElementNode::new("pitch").unwrap();
        pitch.set_named_child("step", NamedChildValue::Scalar("G".into())).unwrap();
        pitch.set_named_child("octave", NamedChildValue::Scalar("3".into())).unwrap();
        let xml = serialize(&pitch, &Config { include_xml_declaration: false, ..Config::default() }).unwrap();
        assert_eq!(xml, "<pitch>\n  <step>G</step>\n  <octave>3</octave>\n</pitch>");
    }

    #[test]
    fn xml_declaration_is_optional() {
        let step = ElementNode::new("step").unwrap();
        step.set_value("G").unwrap();
        let with_decl = serialize(&step, &Config::default()).unwrap();
        assert!(with_decl.starts_with("<?xml"));
        let without_decl =
            serialize(&step, &Config { include_xml_declaration: false, ..Config::default() }).unwrap();
        assert!(!without_decl.starts_with("<?xml"));
    }

    #[test]
    fn indent_width_is_configurable() {
        let pitch = ElementNode::new("pitch").unwrap();
        pitch.set_named_child("step", NamedChildValue::Scalar("G".into())).unwrap();
        let xml = serialize(
            &pitch,
            &Config { indent: 4, include_xml_declaration: false, ..Config::default() },
        )
        .unwrap();
        assert!(xml.contains("\n    <step>"));
    }
}
