use kdp_format::*;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

#[test]
fn test_bleed_zeroes_margins() {
    let margins = Margins {
        top_in: 0.5,
        bottom_in: 0.6,
        left_in: 0.7,
        right_in: 0.8,
        gutter_in: 0.25,
    };
    let geometry = PageGeometry::from_dimensions(6.0, 9.0, margins, BleedMode::Bleed).unwrap();

    assert_eq!(geometry.margins, Margins::default());
    assert_eq!(geometry.printable_width_in(), geometry.page_width_in);
    assert_eq!(geometry.printable_height_in(), geometry.page_height_in);
    assert!(geometry.validate().is_ok());
}

#[test]
fn test_no_bleed_printable_area() {
    let geometry =
        PageGeometry::from_dimensions(6.0, 9.0, Margins::uniform(0.5), BleedMode::NoBleed)
            .unwrap();
    assert!(approx(geometry.printable_width_in(), 5.0));
    assert!(approx(geometry.printable_height_in(), 8.0));

    let mut margins = Margins::uniform(0.5);
    margins.gutter_in = 0.25;
    let geometry = PageGeometry::from_dimensions(6.0, 9.0, margins, BleedMode::NoBleed).unwrap();
    assert!(approx(geometry.printable_width_in(), 4.75));
    assert!(approx(geometry.printable_height_in(), 7.75));
}

#[test]
fn test_template_with_bleed_adds_allowance() {
    let geometry =
        PageGeometry::from_template("6 x 9 in", Margins::uniform(0.5), BleedMode::Bleed).unwrap();
    assert!(approx(geometry.page_width_in, 6.125));
    assert!(approx(geometry.page_height_in, 9.25));
    assert_eq!(geometry.margins, Margins::default());
}

#[test]
fn test_template_without_bleed_is_exact() {
    let geometry =
        PageGeometry::from_template("8.5 x 11 in", Margins::default(), BleedMode::NoBleed)
            .unwrap();
    assert!(approx(geometry.page_width_in, 8.5));
    assert!(approx(geometry.page_height_in, 11.0));
}

#[test]
fn test_parse_template() {
    assert_eq!(parse_template("6 x 9 in").unwrap(), (6.0, 9.0));
    assert_eq!(parse_template("5.5 x 8.5in").unwrap(), (5.5, 8.5));
    assert_eq!(parse_template("8.27 x 11.69").unwrap(), (8.27, 11.69));
}

#[test]
fn test_invalid_templates() {
    for template in ["", "6x9 in", "6 x 9 x 2 in", "six x 9 in", "0 x 9 in", "6 x -9 in"] {
        match parse_template(template) {
            Err(FormatError::InvalidGeometry(_)) => {}
            other => panic!("Expected InvalidGeometry for '{template}', got {other:?}"),
        }
    }
}

#[test]
fn test_non_positive_page_rejected() {
    let result = PageGeometry::from_dimensions(0.0, 9.0, Margins::default(), BleedMode::NoBleed);
    assert!(matches!(result, Err(FormatError::InvalidGeometry(_))));

    let result = PageGeometry::from_dimensions(6.0, f32::NAN, Margins::default(), BleedMode::Bleed);
    assert!(matches!(result, Err(FormatError::InvalidGeometry(_))));
}

#[test]
fn test_margins_must_leave_printable_area() {
    let geometry =
        PageGeometry::from_dimensions(6.0, 9.0, Margins::uniform(3.0), BleedMode::NoBleed)
            .unwrap();
    assert!(matches!(
        geometry.validate(),
        Err(FormatError::InvalidGeometry(_))
    ));

    let mut margins = Margins::uniform(0.5);
    margins.top_in = -0.1;
    let geometry = PageGeometry::from_dimensions(6.0, 9.0, margins, BleedMode::NoBleed).unwrap();
    assert!(geometry.validate().is_err());
}

#[test]
fn test_resolve_page_size() {
    let size = PageSize::Template("6 x 9 in".to_string());
    let geometry = PageGeometry::resolve(&size, Margins::default(), BleedMode::NoBleed).unwrap();
    assert!(approx(geometry.page_width_in, 6.0));

    let size = PageSize::Custom {
        width_in: 7.0,
        height_in: 10.0,
    };
    // Explicit dimensions never get the bleed allowance
    let geometry = PageGeometry::resolve(&size, Margins::default(), BleedMode::Bleed).unwrap();
    assert!(approx(geometry.page_width_in, 7.0));
    assert!(approx(geometry.page_height_in, 10.0));
}

#[test]
fn test_points_conversion() {
    let geometry =
        PageGeometry::from_dimensions(6.0, 9.0, Margins::default(), BleedMode::NoBleed).unwrap();
    assert!(approx(geometry.page_width_pt(), 432.0));
    assert!(approx(geometry.page_height_pt(), 648.0));
}

#[test]
fn test_trim_size_templates() {
    assert!(!TRIM_SIZES.is_empty());
    for trim in TRIM_SIZES {
        let template = trim.template();
        assert!(template.ends_with(" in"));
        assert_eq!(TrimSize::find(&template), Some(*trim));
        assert!(
            PageGeometry::from_template(&template, Margins::default(), BleedMode::Bleed).is_ok()
        );
    }
    assert_eq!(TrimSize::new(6.0, 9.0).template(), "6 x 9 in");
    assert_eq!(TrimSize::find("4 x 4 in"), None);
}
