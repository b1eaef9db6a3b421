//! Generated-style constructor wrappers (§4.E.1): thin, typed convenience
//! functions over [`ElementNode::new`] for commonly used elements, grouped by
//! XSD schema section the way `musicxml-codegen`'s `generator.rs` groups
//! compiled-in tables by section. These add ergonomics only — every function
//! here is mechanically derivable from the Schema Table and none encodes
//! behavior the generic `ElementNode` API doesn't already provide.

use crate::element::ElementNode;
use crate::error::MusicXmlResult;

fn leaf(name: &str, value: impl AsRef<str>) -> MusicXmlResult<ElementNode> {
    let node = ElementNode::new(name)?;
    node.set_value(value)?;
    Ok(node)
}

// --- common.xsd: pitch group ---

/// `<step>`, one of A-G.
pub fn step(value: impl AsRef<str>) -> MusicXmlResult<ElementNode> {
    leaf("step", value)
}

/// `<alter>`, a chromatic alteration in semitones.
pub fn alter(value: impl AsRef<str>) -> MusicXmlResult<ElementNode> {
    leaf("alter", value)
}

/// `<octave>`, 0-9.
pub fn octave(value: impl AsRef<str>) -> MusicXmlResult<ElementNode> {
    leaf("octave", value)
}

/// `<pitch>` with no children attached yet; use `add_child` for `step` /
/// `alter` / `octave` in schema order.
pub fn pitch() -> MusicXmlResult<ElementNode> {
    ElementNode::new("pitch")
}

/// Convenience: a fully populated `<pitch>` from its three components.
pub fn pitch_of(step_value: &str, alter_value: Option<&str>, octave_value: &str) -> MusicXmlResult<ElementNode> {
    let p = pitch()?;
    p.add_child(step(step_value)?)?;
    if let Some(a) = alter_value {
        p.add_child(alter(a)?)?;
    }
    p.add_child(octave(octave_value)?)?;
    Ok(p)
}

// --- common.xsd: font group ---

/// `<font>` with no attributes set; use `set_attribute` for `font-family`,
/// `font-style`, `font-size`, `font-weight`.
pub fn font() -> MusicXmlResult<ElementNode> {
    ElementNode::new("font")
}

// --- note.xsd: articulations ---

/// `<articulations>`, a container for articulation marks such as
/// `staccato`/`accent`.
pub fn articulations() -> MusicXmlResult<ElementNode> {
    ElementNode::new("articulations")
}

/// `<staccato>`, an empty articulation mark.
pub fn staccato() -> MusicXmlResult<ElementNode> {
    ElementNode::new("staccato")
}

/// `<accent>`, an empty articulation mark.
pub fn accent() -> MusicXmlResult<ElementNode> {
    ElementNode::new("accent")
}

// --- score.xsd: root elements ---

/// `<score-partwise>` root, with no children attached yet.
pub fn score_partwise() -> MusicXmlResult<ElementNode> {
    ElementNode::new("score-partwise")
}

/// `<score-timewise>` root, with no children attached yet.
pub fn score_timewise() -> MusicXmlResult<ElementNode> {
    ElementNode::new("score-timewise")
}

/// `<part>`, a partwise score's per-instrument container.
pub fn part() -> MusicXmlResult<ElementNode> {
    ElementNode::new("part")
}

/// `<measure>`, a single bar of music.
pub fn measure() -> MusicXmlResult<ElementNode> {
    ElementNode::new("measure")
}

/// `<note>`, the core musical event element.
pub fn note() -> MusicXmlResult<ElementNode> {
    ElementNode::new("note")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_of_builds_expected_children() {
        let p = pitch_of("G", Some("1"), "3").unwrap();
        assert_eq!(p.find_child("step").unwrap().value().unwrap().as_xml_text(), "G");
        assert_eq!(p.find_child("alter").unwrap().value().unwrap().as_xml_text(), "1");
        assert_eq!(p.find_child("octave").unwrap().value().unwrap().as_xml_text(), "3");
    }

    #[test]
    fn pitch_of_without_alter_omits_it() {
        let p = pitch_of("G", None, "3").unwrap();
        assert!(p.find_child("alter").is_none());
    }

    #[test]
    fn font_accepts_declared_attributes() {
        let f = font().unwrap();
        f.set_attribute("font-family", "Arial").unwrap();
        assert_eq!(f.attribute("font-family").unwrap().as_xml_text(), "Arial");
    }
}
