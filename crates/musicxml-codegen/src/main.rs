//! CLI for the MusicXML schema-table codegen.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use musicxml_codegen::{generate, parse_xsd};

#[derive(Parser)]
#[command(name = "musicxml-codegen")]
#[command(about = "Generate a compiled schema table from a MusicXML XSD schema")]
struct Args {
    /// Path to the XSD schema (e.g. crates/musicxml/schema/musicxml-4.0.xsd)
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory for the generated Rust source
    #[arg(short, long)]
    output: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    println!("MusicXML XSD -> schema table generator");
    println!("  Input:  {}", args.input.display());
    println!("  Output: {}", args.output.display());

    let schema = parse_xsd(&args.input)?;
    println!(
        "\nCollected: {} simple types, {} complex types, {} groups, {} attribute groups, {} elements",
        schema.simple_types.len(),
        schema.complex_types.len(),
        schema.groups.len(),
        schema.attribute_groups.len(),
        schema.elements.len(),
    );

    generate(&schema, &args.output)?;
    println!("\nSchema table generation complete.");
    Ok(())
}
