use pdfpane::ConfigError;
use pdfpane::ViewerConfig;
use pdfpane::annotations::project_annotations;
use pdfpane::pdf::{ContainerSize, DocumentInfo, PageSize, compute_layout};
use pdfpane::{Annotation, ScrollTarget};

fn mixed_document() -> DocumentInfo {
    DocumentInfo {
        page_sizes: vec![
            PageSize::LETTER,
            PageSize::new(842.0, 595.0),
            PageSize::new(400.0, 300.0),
            PageSize::LETTER,
            PageSize::new(300.0, 1200.0),
        ],
    }
}

fn configs() -> Vec<ViewerConfig> {
    [
        "{}",
        r#"{"width": 600}"#,
        r#"{"width": "50%", "showPageSeparator": false}"#,
        r#"{"width": 400, "height": 300, "pagesVerticalSpacing": 10}"#,
        r#"{"zoomLevel": 1.5, "viewerAlign": "left"}"#,
        r#"{"zoomLevel": "auto-height", "height": 500, "viewerAlign": "right"}"#,
        r#"{"zoomLevel": 0.1, "pagesVerticalSpacing": 0}"#,
    ]
    .into_iter()
    .map(|json| ViewerConfig::from_json(json).unwrap())
    .collect()
}

#[test]
fn test_content_height_is_sum_of_pages_and_gaps() {
    let doc = mixed_document();
    for config in configs() {
        for container in [
            ContainerSize::new(800.0, 600.0),
            ContainerSize::new(320.0, 0.0),
        ] {
            let layout = compute_layout(&doc, &config, container).unwrap();
            let heights: f32 = layout.pages.iter().map(|p| p.height).sum();
            let gaps = (layout.pages.len() - 1) as f32
                * (config.pages_vertical_spacing + layout.separator_height);
            let expected = heights + gaps;
            assert!(
                (layout.content_height - expected).abs() < 1e-2,
                "{config:?}: content {} != {expected}",
                layout.content_height
            );
            assert!(layout.viewer_width <= config.width.resolve(container.width) + 1e-3);
        }
    }
}

#[test]
fn test_layout_is_idempotent() {
    let doc = mixed_document();
    for config in configs() {
        let container = ContainerSize::new(777.0, 555.0);
        let first = compute_layout(&doc, &config, container).unwrap();
        let second = compute_layout(&doc, &config, container).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn test_resolution_boost_leaves_layout_unchanged() {
    let doc = mixed_document();
    let container = ContainerSize::new(800.0, 600.0);
    let base = ViewerConfig::from_json(r#"{"width": 600}"#).unwrap();
    let boosted = ViewerConfig::from_json(r#"{"width": 600, "resolutionBoost": 4}"#).unwrap();

    let a = compute_layout(&doc, &base, container).unwrap();
    let b = compute_layout(&doc, &boosted, container).unwrap();
    assert_eq!(a.pages, b.pages);

    for page in &b.pages {
        let (w1, h1) = page.bitmap_size(1);
        let (w4, h4) = page.bitmap_size(4);
        assert!((w4 as f32 - 4.0 * w1 as f32).abs() <= 4.0);
        assert!((h4 as f32 - 4.0 * h1 as f32).abs() <= 4.0);
    }
}

#[test]
fn test_resolution_boost_boundaries() {
    for boost in [0, 11, -1] {
        let json = format!(r#"{{"resolutionBoost": {boost}}}"#);
        assert_eq!(
            ViewerConfig::from_json(&json).unwrap_err(),
            ConfigError::ResolutionBoostOutOfRange(boost)
        );
    }
    for boost in [1, 10] {
        let json = format!(r#"{{"resolutionBoost": {boost}}}"#);
        assert_eq!(
            ViewerConfig::from_json(&json).unwrap().resolution_boost,
            boost as u8
        );
    }
}

#[test]
fn test_scroll_to_page_zero_means_no_target() {
    let config = ViewerConfig::from_json(r#"{"scrollToPage": 0}"#).unwrap();
    assert_eq!(config.scroll_target, None);

    let config = ViewerConfig::from_json(r#"{"scrollToPage": 3}"#).unwrap();
    assert_eq!(config.scroll_target, Some(ScrollTarget::Page(3)));

    assert_eq!(
        ViewerConfig::from_json(r#"{"scrollToPage": 1, "scrollToAnnotation": 1}"#).unwrap_err(),
        ConfigError::ConflictingScrollTarget
    );
}

#[test]
fn test_annotation_projection_round_trip() {
    let doc = DocumentInfo {
        page_sizes: vec![PageSize::new(400.0, 300.0); 3],
    };
    let annotation = Annotation {
        page: 2,
        x: 40.0,
        y: 60.0,
        width: 100.0,
        height: 20.0,
        color: "red".into(),
        id: Some("a".into()),
    };

    for scale in [0.5_f32, 1.0, 2.0] {
        let json = format!(r#"{{"zoomLevel": {scale}, "width": 1000}}"#);
        let config = ViewerConfig::from_json(&json).unwrap();
        let layout = compute_layout(&doc, &config, ContainerSize::new(1000.0, 0.0)).unwrap();
        let page = layout.page(2).unwrap();

        let boxes = project_annotations(std::slice::from_ref(&annotation), &layout.pages);
        assert_eq!(boxes.len(), 1);
        let rect = boxes[0].rect;
        assert!((rect.x - (40.0 * scale + page.left)).abs() < 1e-3);
        assert!((rect.y - (60.0 * scale + page.top)).abs() < 1e-3);
        assert!((rect.width - 100.0 * scale).abs() < 1e-3);
        assert!((rect.height - 20.0 * scale).abs() < 1e-3);
        assert_eq!(boxes[0].annotation, annotation);
    }
}
