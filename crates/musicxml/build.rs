//! Generates the compiled-in MusicXML schema table from `schema/musicxml-4.0.xsd`.
//!
//! Output is written to `$OUT_DIR/schema_table.rs` and pulled into
//! `src/schema.rs` via `include!`.

use std::path::PathBuf;

/// Skip codegen if stamp file exists and is newer than all input paths.
fn skip_if_up_to_date(inputs: &[PathBuf], stamp: &PathBuf) -> bool {
    let stamp_meta = match std::fs::metadata(stamp) {
        Ok(m) => m,
        Err(_) => return false,
    };
    let stamp_mtime = match stamp_meta.modified() {
        Ok(t) => t,
        Err(_) => return false,
    };
    for p in inputs {
        let m = match std::fs::metadata(p) {
            Ok(m) => m,
            Err(_) => return false,
        };
        let t = match m.modified() {
            Ok(t) => t,
            Err(_) => return false,
        };
        if t > stamp_mtime {
            return false;
        }
    }
    true
}

fn main() {
    let manifest_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").unwrap());
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").unwrap());
    let xsd_path = manifest_dir.join("schema/musicxml-4.0.xsd");
    let build_rs = manifest_dir.join("build.rs");
    let stamp = out_dir.join(".codegen-stamp");

    println!("cargo::rerun-if-changed=build.rs");
    println!("cargo::rerun-if-changed={}", xsd_path.display());

    if !xsd_path.exists() {
        panic!(
            "musicxml: bundled schema not found at '{}'.\n\
             The MusicXML 4.0 XSD is expected to live under crates/musicxml/schema/.",
            xsd_path.display()
        );
    }

    if skip_if_up_to_date(&[xsd_path.clone(), build_rs], &stamp) {
        return;
    }

    let schema = musicxml_codegen::parse_xsd(&xsd_path)
        .unwrap_or_else(|e| panic!("musicxml: failed to parse bundled XSD {}: {e}", xsd_path.display()));

    musicxml_codegen::generate(&schema, &out_dir)
        .unwrap_or_else(|e| panic!("musicxml: failed to generate schema table: {e}"));

    let _ = std::fs::File::create(&stamp);
}
