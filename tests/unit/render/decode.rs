use super::*;

const SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="4"><rect width="4" height="4" fill="#ff0000"/></svg>"##;

#[test]
fn fast_path_parses_svg_text() {
    let decoded = FastSvgPath::default()
        .decode(&SceneDescription::from(SQUARE))
        .unwrap();
    let DecodedScene::Vector(tree) = decoded else {
        panic!("expected vector scene");
    };
    assert_eq!(tree.size().width(), 4.0);
}

#[test]
fn fast_path_rejects_malformed_text() {
    assert!(
        FastSvgPath::default()
            .decode(&SceneDescription::from("<svg"))
            .is_err()
    );
}

#[test]
fn generic_path_loads_svg_and_text_raster() {
    let decoded = GenericImagePath::default()
        .decode(&SceneDescription::from(SQUARE))
        .unwrap();
    assert!(matches!(decoded, DecodedScene::Vector(_)));

    // Plain-text PPM: 2x1, red then blue.
    let ppm = "P3\n2 1\n255\n255 0 0 0 0 255\n";
    let decoded = GenericImagePath::default()
        .decode(&SceneDescription::from(ppm))
        .unwrap();
    let DecodedScene::Raster(p) = decoded else {
        panic!("expected raster scene");
    };
    assert_eq!((p.width(), p.height()), (2, 1));
    assert_eq!(&p.data()[..4], &[255, 0, 0, 255]);
}

#[test]
fn generic_path_rejects_garbage() {
    assert!(
        GenericImagePath::default()
            .decode(&SceneDescription::from("definitely not an image"))
            .is_err()
    );
}

#[test]
fn premultiply_matches_rounding() {
    let mut px = vec![100u8, 50, 200, 128, 9, 9, 9, 0];
    premultiply_rgba8_in_place(&mut px);
    assert_eq!(
        px,
        vec![
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128,
            0,
            0,
            0,
            0
        ]
    );
}

#[test]
fn both_paths_share_the_system_font_database() {
    let fast = FastSvgPath::default();
    let generic = GenericImagePath::default();
    assert!(Arc::ptr_eq(&fast.opts.fontdb, &generic.opts.fontdb));
    assert!(Arc::ptr_eq(&fast.opts.fontdb, &system_fonts()));
}

#[test]
fn text_scenes_resolve_against_shared_fonts() {
    let scene = SceneDescription::from(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="10"><text x="0" y="9" font-size="8">step 3</text></svg>"#,
    );
    let DecodedScene::Vector(tree) = FastSvgPath::default().decode(&scene).unwrap() else {
        panic!("expected vector scene");
    };
    assert_eq!(tree.fontdb().len(), system_fonts().len());
}
