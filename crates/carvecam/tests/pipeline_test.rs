use carvecam::*;

fn svg(body: &str) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100">{body}</svg>"#
    )
}

fn request(file_name: &str, bytes: Vec<u8>, options: ConversionOptions) -> ConversionRequest {
    ConversionRequest {
        file_name: file_name.to_string(),
        mime_type: String::new(),
        bytes,
        options,
    }
}

#[test]
fn straight_path_samples_every_step_plus_endpoint() {
    // A 100mm line at a 10mm step: samples at 0, 10, ..., 100 = 11 points.
    let doc = svg(r#"<path d="M 0 0 L 100 0"/>"#);
    let polylines = extract_polylines(&doc, 10.0).unwrap();
    assert_eq!(polylines.len(), 1);
    assert_eq!(polylines[0].len(), 11);
    assert_eq!(polylines[0][0].x, 0.0);
    assert_eq!(polylines[0][10].x, 100.0);

    // A fractional remainder still lands the endpoint exactly.
    let doc = svg(r#"<path d="M 0 0 L 105 0"/>"#);
    let polylines = extract_polylines(&doc, 10.0).unwrap();
    assert_eq!(polylines[0].len(), 12);
    assert!((polylines[0][11].x - 105.0).abs() < 1e-9);
}

#[test]
fn output_larger_than_material_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut converter = Converter::new(ToolLibrary::default_library(), dir.path());

    let mut options = ConversionOptions::default();
    options.material_width_mm = 50.0;
    options.output_width_mm = 60.0;
    options.output_height_mm = 40.0;

    let doc = svg(r#"<path d="M 10 10 L 90 10 L 90 90 Z"/>"#);
    let err = converter
        .convert(&request("part.svg", doc.into_bytes(), options))
        .unwrap_err();
    assert!(matches!(
        err,
        ConvertError::OutputExceedsMaterial { axis: 'x', .. }
    ));
    assert_eq!(err.class().status_code(), 400);
}

#[test]
fn generated_toolpaths_stay_inside_the_material() {
    let dir = tempfile::tempdir().unwrap();
    let mut converter = Converter::new(ToolLibrary::default_library(), dir.path());

    let mut options = ConversionOptions::default();
    options.tool_id = Some("flat-6mm".to_string());
    let doc = svg(r#"<path d="M 0 0 L 100 0 L 100 100 L 0 100 Z"/>"#);

    let result = converter
        .convert(&request("frame.svg", doc.into_bytes(), options))
        .unwrap();
    for op in &result.preview.operations {
        for polyline in &op.polylines {
            for point in polyline {
                assert!((0.0..=100.0).contains(&point.x), "x out of stock: {point:?}");
                assert!((0.0..=100.0).contains(&point.y), "y out of stock: {point:?}");
            }
        }
    }
}

#[test]
fn dxf_round_trip_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let mut converter = Converter::new(ToolLibrary::default_library(), dir.path());

    let original = generate_dxf(&[vec![
        Point::new(5.0, 5.0),
        Point::new(60.0, 5.0),
        Point::new(60.0, 60.0),
        Point::new(5.0, 60.0),
    ]])
    .into_bytes();

    let mut options = ConversionOptions::default();
    options.output_format = OutputFormat::Dxf;
    let result = converter
        .convert(&request("plate.dxf", original.clone(), options))
        .unwrap();

    let written = std::fs::read(&result.path).unwrap();
    assert_eq!(written, original);
}

#[test]
fn conversion_is_deterministic_for_the_same_input() {
    let dir = tempfile::tempdir().unwrap();
    let mut converter = Converter::new(ToolLibrary::default_library(), dir.path());

    let doc = svg(r#"<path d="M 10 10 L 90 10 L 90 90 L 10 90 Z"/>"#).into_bytes();
    let a = converter
        .convert(&request("a.svg", doc.clone(), ConversionOptions::default()))
        .unwrap();
    let b = converter
        .convert(&request("a.svg", doc, ConversionOptions::default()))
        .unwrap();

    let first = std::fs::read(&a.path).unwrap();
    let second = std::fs::read(&b.path).unwrap();
    assert_eq!(first, second);
    assert_eq!(converter.registry().len(), 2);
}

#[test]
fn unsupported_upload_is_classified_before_anything_else() {
    let dir = tempfile::tempdir().unwrap();
    let mut converter = Converter::new(ToolLibrary::default_library(), dir.path());

    let err = converter
        .convert(&request(
            "notes.txt",
            b"hello".to_vec(),
            ConversionOptions::default(),
        ))
        .unwrap_err();
    assert!(matches!(err, ConvertError::UnsupportedFileType(_)));
    assert_eq!(err.class().status_code(), 415);
}

#[test]
fn svg_with_no_paths_is_unprocessable() {
    let dir = tempfile::tempdir().unwrap();
    let mut converter = Converter::new(ToolLibrary::default_library(), dir.path());

    let doc = svg(r#"<rect x="1" y="1" width="5" height="5"/>"#);
    let err = converter
        .convert(&request(
            "empty.svg",
            doc.into_bytes(),
            ConversionOptions::default(),
        ))
        .unwrap_err();
    assert!(matches!(err, ConvertError::NoVectorPaths));
    assert_eq!(err.class().status_code(), 422);
}

#[test]
fn operations_payload_selects_tools_per_group() {
    let dir = tempfile::tempdir().unwrap();
    let mut converter = Converter::new(ToolLibrary::default_library(), dir.path());

    let doc = svg(concat!(
        r#"<path d="M 10 10 L 90 10 L 90 90 L 10 90 Z"/>"#,
        r#"<path d="M 30 30 L 70 30 L 70 70 L 30 70 Z"/>"#,
    ));
    let mut options = ConversionOptions::default();
    options.operations = Some(serde_json::json!([
        {"toolId": "flat-6mm", "polylineIndices": [0]},
        {"toolId": "ball-6mm", "strategy": "finish", "polylineIndices": [1]}
    ]));

    let result = converter
        .convert(&request("nested.svg", doc.into_bytes(), options))
        .unwrap();
    assert_eq!(result.preview.operations.len(), 2);
    assert_eq!(result.preview.operations[0].tool_id, "flat-6mm");
    assert_eq!(result.preview.operations[1].tool_id, "ball-6mm");
    assert_eq!(result.preview.operations[1].strategy, "finish");
    assert_ne!(
        result.preview.operations[0].color,
        result.preview.operations[1].color
    );

    let text = std::fs::read_to_string(&result.path).unwrap();
    // Both tools get their change lines.
    assert!(text.contains("T1 M6"));
    assert!(text.contains("T3 M6"));
}

#[test]
fn result_echoes_conversion_type_mime_and_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let mut converter = Converter::new(ToolLibrary::default_library(), dir.path());

    let doc = svg(r#"<path d="M 10 10 L 90 10 L 90 90 L 10 90 Z"/>"#);
    let mut options = ConversionOptions::default();
    options.conversion_type = "engrave".to_string();

    let result = converter
        .convert(&request("badge.svg", doc.into_bytes(), options))
        .unwrap();
    assert_eq!(result.conversion_type, "engrave");
    assert_eq!(result.mime_type, "text/plain");
    // The timestamp is the registry record's, not a second clock read.
    let record = converter.registry().get(result.output_id).unwrap();
    assert_eq!(result.created_at, record.created_at);

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["conversionType"], "engrave");
    assert_eq!(json["mimeType"], "text/plain");
    assert!(json["createdAt"].is_string());
}

#[test]
fn simulation_carves_where_the_toolpath_runs() {
    let dir = tempfile::tempdir().unwrap();
    let mut converter = Converter::new(ToolLibrary::default_library(), dir.path());

    let doc = svg(r#"<path d="M 10 30 L 90 30 L 90 70"/>"#);
    let mut options = ConversionOptions::default();
    options.tool_id = Some("flat-6mm".to_string());
    options.cut_depth_mm = -3.0;

    let result = converter
        .convert(&request("groove.svg", doc.into_bytes(), options))
        .unwrap();
    let field = &result.preview.height_field;
    // Something was removed, and never more than commanded.
    assert!(field.min_cell() < field.thickness_mm);
    assert!(field.min_cell() >= field.thickness_mm - 3.0 - 1e-9);
}
