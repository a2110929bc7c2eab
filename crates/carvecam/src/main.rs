use anyhow::{Context, Result};
use carvecam::*;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(|s| s.as_str()) {
        Some("convert") => {
            let Some(input) = args.get(2) else {
                usage();
                return Ok(());
            };
            demo_convert(input, args.get(3).map(|s| s.as_str()))
        }
        Some("tools") => demo_tools(),
        _ => {
            usage();
            Ok(())
        }
    }
}

fn usage() {
    println!("Usage: carvecam <command>");
    println!("  convert <file> [gcode|dxf]  - Convert an image/SVG/DXF/STL file");
    println!("  tools                       - List the tool library");
}

fn demo_convert(input: &str, format: Option<&str>) -> Result<()> {
    let bytes = std::fs::read(input).with_context(|| format!("read input file {input}"))?;

    let mut options = ConversionOptions::default();
    options.output_format = match format {
        Some("dxf") => OutputFormat::Dxf,
        _ => OutputFormat::Gcode,
    };

    let library = ToolLibrary::load_from_path(ToolLibrary::default_library_path()?)?;
    let mut converter = Converter::new(library, "output");

    let request = ConversionRequest {
        file_name: input.to_string(),
        mime_type: String::new(),
        bytes,
        options,
    };

    match converter.convert(&request) {
        Ok(result) => {
            println!("Wrote {}", result.path.display());
            println!("Operations:");
            for op in &result.preview.operations {
                println!(
                    "  #{} {} ({}) - {} path(s)",
                    op.id,
                    op.tool_name,
                    op.strategy,
                    op.polylines.len()
                );
            }
            let field = &result.preview.height_field;
            println!(
                "Simulated stock: {}x{} cells, deepest point {:.2}mm",
                field.cols,
                field.rows,
                field.thickness_mm - field.min_cell()
            );
        }
        Err(e) => {
            eprintln!("Conversion failed ({}): {e}", e.class().status_code());
        }
    }
    Ok(())
}

fn demo_tools() -> Result<()> {
    let library = ToolLibrary::load_from_path(ToolLibrary::default_library_path()?)?;
    println!("Tool library ({} tools):", library.tools.len());
    for tool in &library.tools {
        println!(
            "  {:<10} {} - {:.2}mm, max depth {:.1}mm (T{})",
            tool.id, tool.name, tool.diameter_mm, tool.max_depth_mm, tool.tool_number
        );
    }
    Ok(())
}
