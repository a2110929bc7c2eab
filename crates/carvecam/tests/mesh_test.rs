use carvecam::*;

/// Binary STL with the given triangles (normals zeroed).
fn binary_stl(triangles: &[[[f32; 3]; 3]]) -> Vec<u8> {
    let mut buf = vec![0u8; 80];
    buf.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
    for tri in triangles {
        buf.extend_from_slice(&[0u8; 12]);
        for v in tri {
            for c in v {
                buf.extend_from_slice(&c.to_le_bytes());
            }
        }
        buf.extend_from_slice(&[0u8; 2]);
    }
    buf
}

fn tent_stl() -> Vec<u8> {
    binary_stl(&[
        [[0.0, 0.0, 0.0], [40.0, 0.0, 0.0], [20.0, 20.0, 8.0]],
        [[0.0, 40.0, 0.0], [40.0, 40.0, 0.0], [20.0, 20.0, 8.0]],
    ])
}

fn stl_request(bytes: Vec<u8>, options: ConversionOptions) -> ConversionRequest {
    ConversionRequest {
        file_name: "relief.stl".to_string(),
        mime_type: "model/stl".to_string(),
        bytes,
        options,
    }
}

#[test]
fn undersized_stl_is_malformed() {
    // Anything below the binary header size cannot be either dialect.
    let err = parse_stl(&[0u8; 40]).unwrap_err();
    assert!(matches!(err, ConvertError::MalformedMesh(_)));
    assert_eq!(err.class().status_code(), 422);
}

#[test]
fn undersized_stl_fails_the_whole_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let mut converter = Converter::new(ToolLibrary::default_library(), dir.path());
    let err = converter
        .convert(&stl_request(vec![0u8; 40], ConversionOptions::default()))
        .unwrap_err();
    assert!(matches!(err, ConvertError::MalformedMesh(_)));
    assert_eq!(converter.registry().len(), 0);
}

#[test]
fn stl_only_converts_to_gcode() {
    let dir = tempfile::tempdir().unwrap();
    let mut converter = Converter::new(ToolLibrary::default_library(), dir.path());
    let mut options = ConversionOptions::default();
    options.output_format = OutputFormat::Dxf;

    let err = converter
        .convert(&stl_request(tent_stl(), options))
        .unwrap_err();
    assert!(matches!(err, ConvertError::IncompatibleOutput { .. }));
    assert_eq!(err.class().status_code(), 415);
}

#[test]
fn mesh_toolpaths_follow_the_surface() {
    let dir = tempfile::tempdir().unwrap();
    let mut converter = Converter::new(ToolLibrary::default_library(), dir.path());
    let mut options = ConversionOptions::default();
    options.tool_id = Some("ball-6mm".to_string());
    options.output_width_mm = 80.0;
    options.output_height_mm = 80.0;
    options.cut_depth_mm = -6.0;

    let result = converter
        .convert(&stl_request(tent_stl(), options))
        .unwrap();
    let text = std::fs::read_to_string(&result.path).unwrap();

    // Cutting moves carry their own Z words and vary across the surface.
    let zs: Vec<f64> = text
        .lines()
        .filter(|l| l.starts_with("G1 X"))
        .filter_map(|l| {
            l.split_whitespace()
                .find_map(|w| w.strip_prefix('Z'))?
                .parse()
                .ok()
        })
        .collect();
    assert!(zs.len() > 1);
    let min = zs.iter().copied().fold(f64::INFINITY, f64::min);
    let max = zs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    assert!(min < max, "surface pass should vary in depth");
    // Depths span the commanded range and never exceed it.
    assert!(min >= -6.0 - 1e-9);
    assert!(max <= 1e-9);
}

#[test]
fn mesh_depths_never_exceed_material_or_tool() {
    let dir = tempfile::tempdir().unwrap();
    let mut converter = Converter::new(ToolLibrary::default_library(), dir.path());
    let mut options = ConversionOptions::default();
    options.material_thickness_mm = 4.0;
    options.cut_depth_mm = -10.0;
    options.output_width_mm = 80.0;
    options.output_height_mm = 80.0;

    let result = converter
        .convert(&stl_request(tent_stl(), options))
        .unwrap();

    for op in &result.preview.operations {
        for polyline in &op.polylines {
            for point in polyline {
                if let Some(z) = point.z {
                    assert!(z >= -4.0 - 1e-9, "cut below the stock: {z}");
                }
            }
        }
    }
}

#[test]
fn slice_spacing_tracks_the_stepover() {
    let mesh = parse_stl(&tent_stl()).unwrap();
    // 6mm tool at 40% stepover: planes every 2.4mm across a 40mm span.
    let slices = slice_mesh(&mesh, 6.0, 40.0).unwrap();
    let xs: Vec<f64> = slices.iter().map(|s| s[0].x).collect();
    assert!(xs.len() >= 2);
    for pair in xs.windows(2) {
        assert!((pair[1] - pair[0] - 2.4).abs() < 1e-9);
    }
}

#[test]
fn ascii_stl_works_end_to_end() {
    let mut text = String::from("solid tent\n");
    for tri in [
        [[0.0, 0.0, 0.0], [40.0, 0.0, 0.0], [20.0, 20.0, 8.0]],
        [[0.0, 40.0, 0.0], [40.0, 40.0, 0.0], [20.0, 20.0, 8.0]],
    ] {
        text.push_str("facet normal 0 0 1\nouter loop\n");
        for v in tri {
            text.push_str(&format!("vertex {} {} {}\n", v[0], v[1], v[2]));
        }
        text.push_str("endloop\nendfacet\n");
    }
    text.push_str("endsolid tent\n");

    let dir = tempfile::tempdir().unwrap();
    let mut converter = Converter::new(ToolLibrary::default_library(), dir.path());
    let mut options = ConversionOptions::default();
    options.output_width_mm = 80.0;
    options.output_height_mm = 80.0;

    let result = converter
        .convert(&stl_request(text.into_bytes(), options))
        .unwrap();
    assert!(result.path.exists());
}
