use carvecam::*;

fn square_svg() -> Vec<u8> {
    br#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100">
  <path d="M 10 10 L 90 10 L 90 90 L 10 90 Z"/>
</svg>"#
        .to_vec()
}

fn convert_with(options: ConversionOptions) -> (ConversionResult, String) {
    let dir = tempfile::tempdir().unwrap();
    let mut converter = Converter::new(ToolLibrary::default_library(), dir.path());
    let result = converter
        .convert(&ConversionRequest {
            file_name: "square.svg".to_string(),
            mime_type: "image/svg+xml".to_string(),
            bytes: square_svg(),
            options,
        })
        .unwrap();
    let text = std::fs::read_to_string(&result.path).unwrap();
    (result, text)
}

#[test]
fn multi_pass_descends_to_the_requested_depth() {
    // 6mm cut at a 2mm step-down: passes at -2, -4, -6.
    let mut options = ConversionOptions::default();
    options.cut_depth_mm = -6.0;
    options.max_step_down_mm = 2.0;
    options.tool_id = Some("flat-6mm".to_string());

    let (_, text) = convert_with(options);
    let plunges: Vec<&str> = text
        .lines()
        .filter(|l| l.starts_with("G1 Z-"))
        .collect();
    assert_eq!(plunges.len() % 3, 0);
    assert!(plunges.iter().any(|l| l.starts_with("G1 Z-2.0000")));
    assert!(plunges.iter().any(|l| l.starts_with("G1 Z-4.0000")));
    assert!(plunges.iter().any(|l| l.starts_with("G1 Z-6.0000")));
    assert!(!text.contains("Z-7"));
}

#[test]
fn pass_levels_always_land_on_the_target() {
    assert_eq!(pass_levels(6.0, 2.0), vec![-2.0, -4.0, -6.0]);
    let levels = pass_levels(7.0, 2.0);
    assert_eq!(levels.len(), 4);
    assert!((levels.last().unwrap() + 7.0).abs() < 1e-12);
    assert!(pass_levels(0.0, 2.0).is_empty());
}

#[test]
fn cut_depth_clamps_to_stock_thickness() {
    let mut options = ConversionOptions::default();
    options.material_thickness_mm = 4.0;
    options.cut_depth_mm = -12.0;
    options.tool_id = Some("flat-6mm".to_string());

    let (_, text) = convert_with(options);
    assert!(text.contains("Z-4.0000"));
    assert!(!text.contains("Z-5"));
    assert!(!text.contains("Z-12"));
}

#[test]
fn cut_depth_clamps_to_the_tool_rating() {
    // The 60-degree v-bit is rated to 5mm.
    let mut options = ConversionOptions::default();
    options.cut_depth_mm = -9.0;
    options.tool_id = Some("vbit-60".to_string());

    let (_, text) = convert_with(options);
    let deepest = text
        .lines()
        .filter_map(|l| l.strip_prefix("G1 Z-"))
        .filter_map(|rest| rest.split_whitespace().next()?.parse::<f64>().ok())
        .fold(0.0f64, f64::max);
    assert!(deepest <= 5.0 + 1e-9, "deepest plunge {deepest}mm");
}

#[test]
fn program_frame_is_metric_absolute_and_parks() {
    let (_, text) = convert_with(ConversionOptions::default());
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "G21");
    assert_eq!(lines[1], "G90");
    assert!(lines[2].starts_with("G0 Z5"));
    assert_eq!(lines[lines.len() - 1], "G0 X0 Y0");
    assert_eq!(lines[lines.len() - 3], "M5");
}

#[test]
fn library_tool_emits_change_and_spindle_lines() {
    let mut options = ConversionOptions::default();
    options.tool_id = Some("ball-6mm".to_string());
    let (_, text) = convert_with(options);
    assert!(text.contains("T3 M6"));
    assert!(text.contains("M3 S"));
}

#[test]
fn legacy_default_tool_skips_the_tool_change() {
    // No toolId: the legacy cutter carries tool number 0.
    let (_, text) = convert_with(ConversionOptions::default());
    assert!(!text.lines().any(|l| l.starts_with('T')));
    assert!(text.contains("M3 S"));
}

#[test]
fn feed_and_speed_overrides_reach_the_program() {
    let mut options = ConversionOptions::default();
    options.tool_id = Some("flat-6mm".to_string());
    options.feed_rate_xy = Some(1500.0);
    options.spindle_speed = Some(18000.0);

    let (_, text) = convert_with(options);
    assert!(text.contains("M3 S18000"));
    assert!(text.contains("F1500.0"));
}

#[test]
fn every_cut_coordinate_stays_on_the_stock() {
    let mut options = ConversionOptions::default();
    options.tool_id = Some("flat-6mm".to_string());
    let (_, text) = convert_with(options);

    for line in text.lines().filter(|l| l.starts_with("G1 X")) {
        for word in line.split_whitespace() {
            if let Some(v) = word.strip_prefix('X').and_then(|v| v.parse::<f64>().ok()) {
                assert!((0.0..=100.0).contains(&v), "{line}");
            }
            if let Some(v) = word.strip_prefix('Y').and_then(|v| v.parse::<f64>().ok()) {
                assert!((0.0..=100.0).contains(&v), "{line}");
            }
        }
    }
}
