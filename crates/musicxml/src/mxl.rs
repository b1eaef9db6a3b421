//! Compressed MusicXML (`.mxl`) support (§2.2 supplement): a `.mxl` file is
//! a zip archive whose `META-INF/container.xml` names the root MusicXML
//! document inside it. `parse_musicxml` auto-detects the zip local-file-
//! header magic number and transparently extracts that document before
//! parsing proceeds as normal.

use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::config::Config;
use crate::element::ElementNode;
use crate::error::{MusicXmlError, MusicXmlResult};
use crate::parser;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Parse a MusicXML document (plain or `.mxl`) from a filesystem path.
pub fn parse_musicxml(path: &Path, config: &Config) -> MusicXmlResult<ElementNode> {
    let display_path = path.display().to_string();
    let bytes = std::fs::read(path)
        .map_err(|e| MusicXmlError::parse_error(display_path.clone(), 0, e.to_string()))?;
    parse_musicxml_bytes(&bytes, &display_path, config)
}

/// Parse a MusicXML document (plain or `.mxl`) from an in-memory byte
/// buffer. `path` labels errors.
pub fn parse_musicxml_bytes(bytes: &[u8], path: &str, config: &Config) -> MusicXmlResult<ElementNode> {
    if bytes.starts_with(ZIP_MAGIC) {
        let xml = extract_root_document(bytes, path)?;
        parser::parse_musicxml_str(&xml, path, config)
    } else {
        let xml = std::str::from_utf8(bytes)
            .map_err(|e| MusicXmlError::parse_error(path, 0, format!("not valid UTF-8: {e}")))?;
        parser::parse_musicxml_str(xml, path, config)
    }
}

fn extract_root_document(bytes: &[u8], path: &str) -> MusicXmlResult<String> {
    let cursor = std::io::Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(cursor)
        .map_err(|e| MusicXmlError::parse_error(path, 0, format!("invalid .mxl archive: {e}")))?;

    let container_xml = read_archive_entry(&mut archive, "META-INF/container.xml", path)?;
    let rootfile = find_rootfile_path(&container_xml).ok_or_else(|| {
        MusicXmlError::parse_error(path, 0, "META-INF/container.xml has no <rootfile full-path=\"...\">")
    })?;
    read_archive_entry(&mut archive, &rootfile, path)
}

fn read_archive_entry<R: Read + std::io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
    path: &str,
) -> MusicXmlResult<String> {
    let mut file = archive
        .by_name(name)
        .map_err(|e| MusicXmlError::parse_error(path, 0, format!("'{name}' not found in archive: {e}")))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| MusicXmlError::parse_error(path, 0, format!("reading '{name}': {e}")))?;
    Ok(contents)
}

/// Extract the `full-path` attribute of the first `<rootfile>` element in a
/// `META-INF/container.xml` document.
fn find_rootfile_path(container_xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(container_xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.name().as_ref() == b"rootfile" {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"full-path" {
                            return Some(String::from_utf8_lossy(attr.value.as_ref()).into_owned());
                        }
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn build_mxl(root_xml: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let cursor = std::io::Cursor::new(&mut buf);
            let mut zip = zip::ZipWriter::new(cursor);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("META-INF/container.xml", options).unwrap();
            zip.write_all(
                br#"<?xml version="1.0" encoding="UTF-8"?>
                <container>
                  <rootfiles>
                    <rootfile full-path="score.xml" media-type="application/vnd.recordare.musicxml+xml"/>
                  </rootfiles>
                </container>"#,
            )
            .unwrap();
            zip.start_file("score.xml", options).unwrap();
            zip.write_all(root_xml).unwrap();
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn detects_plain_xml() {
        let pitch = parse_musicxml_bytes(b"<pitch><step>G</step></pitch>", "<bytes>", &Config::default()).unwrap();
        assert_eq!(pitch.name(), "pitch");
    }

    #[test]
    fn extracts_root_document_from_mxl_archive() {
        let archive = build_mxl(b"<pitch><step>G</step></pitch>");
        let pitch = parse_musicxml_bytes(&archive, "score.mxl", &Config::default()).unwrap();
        assert_eq!(pitch.name(), "pitch");
        assert_eq!(pitch.find_child("step").unwrap().value().unwrap().as_xml_text(), "G");
    }

    #[test]
    fn missing_container_xml_is_a_parse_error() {
        let mut buf = Vec::new();
        {
            let cursor = std::io::Cursor::new(&mut buf);
            let mut zip = zip::ZipWriter::new(cursor);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("score.xml", options).unwrap();
            zip.write_all(b"<pitch/>").unwrap();
            zip.finish().unwrap();
        }
        let err = parse_musicxml_bytes(&buf, "bad.mxl", &Config::default()).unwrap_err();
        assert!(matches!(err, MusicXmlError::ParseError { .. }));
    }
}
