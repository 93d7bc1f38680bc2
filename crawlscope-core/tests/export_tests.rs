// Export of rendered scenes to disk

use crawlscope_client::TreeData;
use crawlscope_core::export::{export, save_artifact};
use crawlscope_core::layout::{LayoutConfig, NetworkScene, TreeScene};
use crawlscope_core::map::{GraphData, GraphLink, GraphNode};
use crawlscope_core::{CategoryTable, ExportFormat, RenderedGraph};
use image::GenericImageView;
use tempfile::TempDir;

fn small_config() -> LayoutConfig {
    LayoutConfig {
        width: 300.0,
        height: 200.0,
        ..LayoutConfig::default()
    }
}

fn network() -> RenderedGraph {
    let graph = GraphData {
        nodes: (1..=3)
            .map(|id| GraphNode {
                id,
                url: format!("https://example.com/{}", id),
                title: Some(format!("Page {}", id)),
                category: Some("BLOG".to_string()),
                level: 1,
                value: id as u32,
            })
            .collect(),
        links: vec![GraphLink { source: 1, target: 2 }, GraphLink { source: 2, target: 3 }],
    };
    let mut scene = NetworkScene::new(&graph, &CategoryTable::default(), &small_config());
    scene.settle(400);
    RenderedGraph::Network(scene)
}

// ============================================================================
// Precondition
// ============================================================================

#[test]
fn test_export_with_nothing_rendered_writes_nothing() {
    let dir = TempDir::new().unwrap();
    for format in [ExportFormat::Svg, ExportFormat::Png, ExportFormat::Jpeg] {
        let artifact = export(None, format).unwrap();
        assert!(artifact.is_none());
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

// ============================================================================
// Formats
// ============================================================================

#[test]
fn test_svg_export_is_saved_with_timestamped_name() {
    let dir = TempDir::new().unwrap();
    let rendered = network();
    let artifact = export(Some(&rendered), ExportFormat::Svg).unwrap().unwrap();
    assert!(artifact.filename.starts_with("crawler-graph-"));
    assert!(artifact.filename.ends_with(".svg"));
    assert_eq!(artifact.mime, "image/svg+xml;charset=utf-8");

    let path = save_artifact(&artifact, dir.path()).unwrap();
    let contents = std::fs::read_to_string(path).unwrap();
    assert!(contents.starts_with("<svg"));
    assert!(contents.contains("id=\"network-graph\""));
}

#[test]
fn test_png_export_is_double_density() {
    let rendered = network();
    let artifact = export(Some(&rendered), ExportFormat::Png).unwrap().unwrap();
    assert!(artifact.filename.ends_with(".png"));
    let img = image::load_from_memory(&artifact.bytes).unwrap();
    assert_eq!(img.dimensions(), (600, 400));
}

#[test]
fn test_jpeg_export_has_white_background() {
    let mut root = TreeData::leaf("root");
    root.children.push(TreeData::leaf("child"));
    let rendered = RenderedGraph::Tree(TreeScene::new(&root, &CategoryTable::default(), &small_config()));

    let artifact = export(Some(&rendered), ExportFormat::Jpeg).unwrap().unwrap();
    assert!(artifact.filename.ends_with(".jpeg"));
    let img = image::load_from_memory(&artifact.bytes).unwrap().to_rgb8();
    assert_eq!(img.dimensions(), (600, 400));

    // Bottom-left corner is outside every drawn element.
    let corner = img.get_pixel(0, 399);
    assert!(corner.0.iter().all(|&c| c > 240), "corner = {:?}", corner);
}

#[test]
fn test_save_creates_missing_directory() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("exports").join("graphs");
    let artifact = export(Some(&network()), ExportFormat::Svg).unwrap().unwrap();
    let path = save_artifact(&artifact, &nested).unwrap();
    assert!(path.exists());
}
