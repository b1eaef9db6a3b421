//! Document-level integration tests exercised through the public API only
//! (§8 "Concrete end-to-end scenarios" and "Backtracking scenarios").

use musicxml::{parse_musicxml_bytes, parse_musicxml_str, Config, ElementNode, MusicXmlError};

fn build_score_part() -> ElementNode {
    let part = ElementNode::new("part").unwrap();
    part.set_attribute("id", "P1").unwrap();

    let measure = ElementNode::new("measure").unwrap();
    measure.set_attribute("number", "1").unwrap();

    let attributes = ElementNode::new("attributes").unwrap();
    let divisions = ElementNode::new("divisions").unwrap();
    divisions.set_value("1").unwrap();
    attributes.add_child(divisions).unwrap();
    measure.add_child(attributes).unwrap();

    let note = ElementNode::new("note").unwrap();
    let pitch = ElementNode::new("pitch").unwrap();
    pitch.add_child(musicxml::elements::step("C").unwrap()).unwrap();
    pitch.add_child(musicxml::elements::octave("4").unwrap()).unwrap();
    note.add_child(pitch).unwrap();
    let duration = ElementNode::new("duration").unwrap();
    duration.set_value("4").unwrap();
    note.add_child(duration).unwrap();
    measure.add_child(note).unwrap();

    part.add_child(measure).unwrap();
    part
}

#[test]
fn round_trip_preserves_structure() {
    let part = build_score_part();
    let xml = part.to_string().unwrap();

    let reparsed = parse_musicxml_str(&xml).unwrap();
    assert_eq!(reparsed.name(), "part");
    assert_eq!(reparsed.attribute("id").unwrap().as_xml_text(), "P1");

    let measure = reparsed.find_child("measure").unwrap();
    assert_eq!(measure.attribute("number").unwrap().as_xml_text(), "1");
    let note = measure.find_child("note").unwrap();
    let pitch = note.find_child("pitch").unwrap();
    assert_eq!(pitch.find_child("step").unwrap().value().unwrap().as_xml_text(), "C");
    assert_eq!(pitch.find_child("octave").unwrap().value().unwrap().as_xml_text(), "4");
    assert_eq!(note.find_child("duration").unwrap().value().unwrap().as_xml_text(), "4");

    assert_eq!(reparsed.to_string().unwrap(), xml);
}

#[test]
fn mxl_archive_round_trip() {
    use std::io::Write;

    let part_xml = build_score_part().to_string_with_config(&Config {
        include_xml_declaration: false,
        ..Config::default()
    }).unwrap();

    let mut archive_bytes = Vec::new();
    {
        let cursor = std::io::Cursor::new(&mut archive_bytes);
        let mut writer = zip::ZipWriter::new(cursor);
        let options = zip::write::SimpleFileOptions::default();
        writer.start_file("META-INF/container.xml", options).unwrap();
        writer
            .write_all(
                br#"<?xml version="1.0" encoding="UTF-8"?>
                <container>
                  <rootfiles>
                    <rootfile full-path="part.xml" media-type="application/vnd.recordare.musicxml+xml"/>
                  </rootfiles>
                </container>"#,
            )
            .unwrap();
        writer.start_file("part.xml", options).unwrap();
        writer.write_all(part_xml.as_bytes()).unwrap();
        writer.finish().unwrap();
    }

    let part = parse_musicxml_bytes(&archive_bytes).unwrap();
    assert_eq!(part.name(), "part");
    assert_eq!(part.find_child("measure").unwrap().attribute("number").unwrap().as_xml_text(), "1");
}

/// Backtracking scenario 1: Choice `(pitch | rest | unpitched)` inside
/// `note`'s content model has `maxOccurs=1` with no enclosing repeat, so once
/// one branch is committed a different branch must be rejected cleanly.
#[test]
fn backtracking_scenario_choice_rejects_second_branch() {
    let note = ElementNode::new("note").unwrap();
    let rest = ElementNode::new("rest").unwrap();
    rest.set_value("whole").unwrap();
    note.add_child(rest).unwrap();

    let pitch = ElementNode::new("pitch").unwrap();
    let err = note.add_child(pitch).unwrap_err();
    assert!(matches!(err, MusicXmlError::ChildNotAllowed { .. }));
    assert_eq!(note.children().len(), 1);
    assert_eq!(note.find_child("rest").unwrap().value().unwrap().as_xml_text(), "whole");
}

/// Backtracking scenario 1 (duplicate branch): `measure`'s content model
/// wraps the `music-data` choice `(note | attributes | direction | barline)`
/// in an unbounded sequence, so each subsequent element that doesn't fit the
/// current duplicate's committed choice opens a fresh duplicate rather than
/// being rejected.
#[test]
fn backtracking_scenario_choice_duplicates_under_unbounded_wrapper() {
    let measure = ElementNode::new("measure").unwrap();
    measure.set_attribute("number", "1").unwrap();

    let barline = ElementNode::new("barline").unwrap();
    barline.set_value("regular").unwrap();
    measure.add_child(barline).unwrap();

    let direction = ElementNode::new("direction").unwrap();
    direction.set_value("cresc.").unwrap();
    measure.add_child(direction).unwrap();

    let barline2 = ElementNode::new("barline").unwrap();
    barline2.set_value("final").unwrap();
    measure.add_child(barline2).unwrap();

    let names: Vec<_> = measure.children().iter().map(|c| c.name()).collect();
    assert_eq!(names, vec!["barline", "direction", "barline"]);
    assert!(measure.to_string().is_ok());
}

/// S5: an `articulations` element collects choice picks across as many
/// duplicates of its wrapping group as needed, preserving input order.
#[test]
fn scenario_s5_articulations_choice_backtrack() {
    let articulations = ElementNode::new("articulations").unwrap();
    articulations.add_child(ElementNode::new("accent").unwrap()).unwrap();
    articulations.add_child(ElementNode::new("staccato").unwrap()).unwrap();
    articulations.add_child(ElementNode::new("tenuto").unwrap()).unwrap();

    let xml = articulations.to_string_with_config(&Config {
        include_xml_declaration: false,
        ..Config::default()
    }).unwrap();
    assert_eq!(xml, "<articulations>\n  <accent/>\n  <staccato/>\n  <tenuto/>\n</articulations>");
}
