//! Parser Adapter (§4.F): bridges raw XML events into element construction,
//! grounded on `tusk-mei`'s `MeiReader` event loop (custom `quick_xml`
//! reader wrapper, since the element tree has no static Rust type to derive
//! `Deserialize` onto).

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::config::Config;
use crate::element::ElementNode;
use crate::error::{MusicXmlError, MusicXmlResult};

/// Parse a plain (uncompressed) MusicXML document from a string.
///
/// `path` is used only to label errors (pass the real file path, or a
/// placeholder like `"<string>"` for in-memory input).
pub fn parse_musicxml_str(xml: &str, path: &str, config: &Config) -> MusicXmlResult<ElementNode> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<ElementNode> = Vec::new();
    let mut pending_text = String::new();
    let mut root: Option<ElementNode> = None;

    loop {
        let offset = reader.buffer_position();
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| MusicXmlError::parse_error(path, offset, e.to_string()))?;

        match event {
            Event::Start(start) => {
                let name = decode_name(start.name().as_ref(), path, offset)?;
                let node = new_node(&name, config, path, offset)?;
                apply_attributes(&node, &start, path, offset)?;
                attach(&mut stack, &mut root, node.clone(), path, offset)?;
                stack.push(node);
            }
            Event::Empty(start) => {
                let name = decode_name(start.name().as_ref(), path, offset)?;
                let node = new_node(&name, config, path, offset)?;
                apply_attributes(&node, &start, path, offset)?;
                attach(&mut stack, &mut root, node, path, offset)?;
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| MusicXmlError::parse_error(path, offset, "unmatched end tag"))?;
                let text = pending_text.trim();
                if !text.is_empty() {
                    node.set_value(text)
                        .map_err(|e| MusicXmlError::parse_error(path, offset, e.to_string()))?;
                }
                pending_text.clear();
            }
            Event::Text(t) => {
                let decoded = t
                    .unescape()
                    .map_err(|e| MusicXmlError::parse_error(path, offset, e.to_string()))?;
                pending_text.push_str(&decoded);
            }
            Event::CData(t) => {
                let bytes = t.into_inner();
                pending_text.push_str(&String::from_utf8_lossy(&bytes));
            }
            Event::Eof => break,
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(MusicXmlError::parse_error(path, reader.buffer_position(), "unexpected end of document"));
    }

    root.ok_or_else(|| MusicXmlError::parse_error(path, 0, "document has no root element"))
}

fn decode_name(raw: &[u8], path: &str, offset: u64) -> MusicXmlResult<String> {
    let full = std::str::from_utf8(raw).map_err(|e| MusicXmlError::parse_error(path, offset, e.to_string()))?;
    // MusicXML elements carry no namespace prefix in practice; strip one
    // defensively rather than rejecting documents that add one.
    Ok(match full.split_once(':') {
        Some((_, local)) => local.to_string(),
        None => full.to_string(),
    })
}

fn new_node(name: &str, config: &Config, path: &str, offset: u64) -> MusicXmlResult<ElementNode> {
    let node = if config.xsd_check {
        ElementNode::new(name)
    } else {
        ElementNode::new_unchecked(name)
    };
    node.map_err(|e| MusicXmlError::parse_error(path, offset, e.to_string()))
}

fn apply_attributes(
    node: &ElementNode,
    start: &quick_xml::events::BytesStart<'_>,
    path: &str,
    offset: u64,
) -> MusicXmlResult<()> {
    for attr in start.attributes() {
        let attr = attr.map_err(|e| MusicXmlError::parse_error(path, offset, e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| MusicXmlError::parse_error(path, offset, e.to_string()))?;
        // Skip namespace declarations; the element engine has no concept of them.
        if key == "xmlns" || key.starts_with("xmlns:") {
            continue;
        }
        let value = attr
            .unescape_value()
            .map_err(|e| MusicXmlError::parse_error(path, offset, e.to_string()))?;
        node.set_attribute(key, value.as_ref())
            .map_err(|e| MusicXmlError::parse_error(path, offset, e.to_string()))?;
    }
    Ok(())
}

fn attach(
    stack: &mut [ElementNode],
    root: &mut Option<ElementNode>,
    node: ElementNode,
    path: &str,
    offset: u64,
) -> MusicXmlResult<()> {
    match stack.last() {
        Some(parent) => parent
            .add_child(node)
            .map_err(|e| MusicXmlError::parse_error(path, offset, e.to_string())),
        None => {
            if root.is_some() {
                return Err(MusicXmlError::parse_error(path, offset, "document has more than one root element"));
            }
            *root = Some(node);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pitch_document() {
        let xml = "<pitch><step>G</step><octave>3</octave></pitch>";
        let pitch = parse_musicxml_str(xml, "<string>", &Config::default()).unwrap();
        assert_eq!(pitch.name(), "pitch");
        assert_eq!(pitch.find_child("step").unwrap().value().unwrap().as_xml_text(), "G");
        assert_eq!(pitch.find_child("octave").unwrap().value().unwrap().as_xml_text(), "3");
    }

    #[test]
    fn round_trips_through_serializer() {
        let xml = "<pitch><step>G</step><octave>3</octave></pitch>";
        let pitch = parse_musicxml_str(xml, "<string>", &Config::default()).unwrap();
        let out = pitch.to_string_with_config(&Config { include_xml_declaration: false, ..Config::default() }).unwrap();
        assert_eq!(out, "<pitch>\n  <step>G</step>\n  <octave>3</octave>\n</pitch>");
    }

    #[test]
    fn parses_attributes() {
        let xml = r#"<font font-family="Arial" font-size="17.2"/>"#;
        let font = parse_musicxml_str(xml, "<string>", &Config::default()).unwrap();
        assert_eq!(font.attribute("font-family").unwrap().as_xml_text(), "Arial");
    }

    #[test]
    fn reports_offset_on_child_rejection() {
        let xml = "<pitch><clef/></pitch>";
        let err = parse_musicxml_str(xml, "doc.xml", &Config::default()).unwrap_err();
        assert!(matches!(err, MusicXmlError::ParseError { .. }));
    }

    #[test]
    fn xsd_check_false_skips_validation() {
        let xml = "<pitch><octave>3</octave><step>G</step></pitch>";
        let config = Config { xsd_check: false, ..Config::default() };
        let pitch = parse_musicxml_str(xml, "<string>", &config).unwrap();
        let names: Vec<_> = pitch.children().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["octave", "step"]);
    }
}
