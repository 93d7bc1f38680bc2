// Snapshot export of the rendered graph to SVG, PNG and JPEG

use crate::error::{CoreError, Result};
use crate::layout::RenderedGraph;
use crate::svg::render_svg;
use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;
use resvg::{tiny_skia, usvg};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const PIXEL_DENSITY: f32 = 2.0;
const JPEG_QUALITY: u8 = 95;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Svg,
    Png,
    Jpeg,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "svg" => Some(ExportFormat::Svg),
            "png" => Some(ExportFormat::Png),
            "jpeg" | "jpg" => Some(ExportFormat::Jpeg),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Svg => "svg",
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpeg",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ExportFormat::Svg => "image/svg+xml;charset=utf-8",
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub filename: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

pub fn artifact_filename(format: ExportFormat) -> String {
    format!(
        "crawler-graph-{}.{}",
        chrono::Utc::now().timestamp_millis(),
        format.extension()
    )
}

/// Serialize the rendered graph. Returns `Ok(None)` when nothing is rendered.
pub fn export(rendered: Option<&RenderedGraph>, format: ExportFormat) -> Result<Option<ExportArtifact>> {
    let Some(graph) = rendered else {
        warn!("Export requested with no rendered graph");
        return Ok(None);
    };

    let svg = render_svg(graph);
    let bytes = match format {
        ExportFormat::Svg => svg.into_bytes(),
        ExportFormat::Png => rasterize(&svg)?
            .encode_png()
            .map_err(|e| CoreError::Encode(e.to_string()))?,
        ExportFormat::Jpeg => encode_jpeg(&rasterize(&svg)?)?,
    };

    Ok(Some(ExportArtifact {
        filename: artifact_filename(format),
        mime: format.mime(),
        bytes,
    }))
}

/// Render at twice the canvas size on an opaque white background.
fn rasterize(svg: &str) -> Result<tiny_skia::Pixmap> {
    let mut options = usvg::Options::default();
    options.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &options).map_err(|e| CoreError::Render(e.to_string()))?;
    let size = tree.size();
    let width = (size.width() * PIXEL_DENSITY).ceil() as u32;
    let height = (size.height() * PIXEL_DENSITY).ceil() as u32;

    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| CoreError::Render(format!("cannot allocate {}x{} pixmap", width, height)))?;
    pixmap.fill(tiny_skia::Color::WHITE);
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(PIXEL_DENSITY, PIXEL_DENSITY),
        &mut pixmap.as_mut(),
    );
    Ok(pixmap)
}

fn encode_jpeg(pixmap: &tiny_skia::Pixmap) -> Result<Vec<u8>> {
    // The background is opaque, so premultiplied RGBA equals straight RGB.
    let rgb: Vec<u8> = pixmap
        .data()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY)
        .encode(&rgb, pixmap.width(), pixmap.height(), ExtendedColorType::Rgb8)
        .map_err(|e| CoreError::Encode(e.to_string()))?;
    Ok(bytes)
}

/// Write an artifact into `dir`, returning the full path.
pub fn save_artifact(artifact: &ExportArtifact, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(&artifact.filename);
    std::fs::write(&path, &artifact.bytes)?;
    info!("Exported {} ({} bytes)", path.display(), artifact.bytes.len());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_rendered_is_not_an_error() {
        for format in [ExportFormat::Svg, ExportFormat::Png, ExportFormat::Jpeg] {
            assert!(export(None, format).unwrap().is_none());
        }
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(ExportFormat::from_str("JPG"), Some(ExportFormat::Jpeg));
        assert_eq!(ExportFormat::from_str("gif"), None);
        assert_eq!(ExportFormat::Png.extension(), "png");
    }

    #[test]
    fn test_filename_pattern() {
        let name = artifact_filename(ExportFormat::Jpeg);
        let stamp = name
            .strip_prefix("crawler-graph-")
            .and_then(|rest| rest.strip_suffix(".jpeg"))
            .unwrap();
        assert!(stamp.parse::<i64>().unwrap() > 0);
    }
}
