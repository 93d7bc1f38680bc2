// SVG serialization of rendered scenes

use crate::layout::{NetworkScene, RenderedGraph, TreeOrientation, TreeScene};
use std::borrow::Cow;
use std::fmt::Write;

pub const NETWORK_SVG_ID: &str = "network-graph";
pub const TREE_SVG_ID: &str = "tree-graph";
const BACKGROUND: &str = "#f9fafb";
const LINK_COLOR: &str = "#999";

/// Escape text for use in XML character data and attribute values.
pub fn escape_xml(text: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(text)
}

pub fn render_svg(graph: &RenderedGraph) -> String {
    match graph {
        RenderedGraph::Network(scene) => network_svg(scene, graph),
        RenderedGraph::Tree(scene) => tree_svg(scene, graph),
    }
}

fn open_svg(out: &mut String, id: &str, width: f64, height: f64) {
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" id="{id}" style="background: {bg}">"#,
        w = width,
        h = height,
        id = id,
        bg = BACKGROUND
    );
}

fn network_svg(scene: &NetworkScene, graph: &RenderedGraph) -> String {
    let mut out = String::new();
    open_svg(&mut out, NETWORK_SVG_ID, scene.width(), scene.height());
    let _ = writeln!(
        out,
        r#"<defs><marker id="arrowhead" viewBox="-0 -5 10 10" refX="20" refY="0" orient="auto" markerWidth="8" markerHeight="8"><path d="M 0,-5 L 10,0 L 0,5" fill="{}"/></marker></defs>"#,
        LINK_COLOR
    );
    let _ = writeln!(out, r#"<g transform="{}">"#, graph.viewport().to_svg_transform());

    out.push_str("<g class=\"category-boxes\">\n");
    for cluster in scene.clusters() {
        let (lx, ly) = cluster.label_position();
        let _ = writeln!(
            out,
            r#"<g class="category-box"><rect class="category-rect" x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" rx="8" fill="{c}" fill-opacity="0.1" stroke="{c}" stroke-width="2" stroke-dasharray="5,5"/><text class="category-label" x="{:.2}" y="{:.2}" text-anchor="middle" font-size="14" font-weight="bold" font-family="Arial, sans-serif" fill="{c}">{}</text></g>"#,
            cluster.x,
            cluster.y,
            cluster.width,
            cluster.height,
            lx,
            ly,
            escape_xml(&cluster.label),
            c = escape_xml(&cluster.color),
        );
    }
    out.push_str("</g>\n");

    let nodes = scene.nodes();
    out.push_str("<g class=\"links\">\n");
    for &(s, t) in scene.links() {
        let _ = writeln!(
            out,
            r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-opacity="0.4" stroke-width="1.5" marker-end="url(#arrowhead)"/>"#,
            nodes[s].x, nodes[s].y, nodes[t].x, nodes[t].y, LINK_COLOR
        );
    }
    out.push_str("</g>\n");

    out.push_str("<g class=\"nodes\">\n");
    for node in nodes {
        let _ = writeln!(
            out,
            r##"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" fill="{}" stroke="#fff" stroke-width="2"/>"##,
            node.x,
            node.y,
            node.radius,
            escape_xml(&node.color)
        );
    }
    out.push_str("</g>\n");

    out.push_str("<g class=\"labels\">\n");
    for node in nodes {
        let _ = writeln!(
            out,
            r#"<text x="{:.2}" y="{:.2}" dx="12" dy="4" font-size="9" font-family="Arial, sans-serif">{}</text>"#,
            node.x,
            node.y,
            escape_xml(&node.label)
        );
    }
    out.push_str("</g>\n</g>\n</svg>\n");
    out
}

fn tree_svg(scene: &TreeScene, graph: &RenderedGraph) -> String {
    let mut out = String::new();
    open_svg(&mut out, TREE_SVG_ID, scene.width(), scene.height());
    let _ = writeln!(out, r#"<g transform="{}">"#, graph.viewport().to_svg_transform());

    let nodes = scene.nodes();
    for &(s, t) in scene.links() {
        let (a, b) = (&nodes[s], &nodes[t]);
        // Cubic link bending along the depth axis.
        let d = match scene.orientation() {
            TreeOrientation::LeftToRight => {
                let mx = (a.x + b.x) / 2.0;
                format!("M{:.2},{:.2}C{:.2},{:.2},{:.2},{:.2},{:.2},{:.2}", a.x, a.y, mx, a.y, mx, b.y, b.x, b.y)
            }
            TreeOrientation::TopToBottom => {
                let my = (a.y + b.y) / 2.0;
                format!("M{:.2},{:.2}C{:.2},{:.2},{:.2},{:.2},{:.2},{:.2}", a.x, a.y, a.x, my, b.x, my, b.x, b.y)
            }
        };
        let _ = writeln!(
            out,
            r#"<path class="tree-link" d="{}" fill="none" stroke="{}" stroke-width="2"/>"#,
            d, LINK_COLOR
        );
    }

    for node in nodes {
        let _ = writeln!(
            out,
            r##"<g class="tree-node" transform="translate({:.2},{:.2})"><circle r="{:.2}" fill="{c}" stroke="#fff" stroke-width="2"/><rect x="10" y="-10" width="{:.0}" height="16" rx="8" fill="{c}" fill-opacity="0.2" stroke="{c}" stroke-width="1"/><text x="14" y="1" font-size="9" font-weight="bold" font-family="Arial, sans-serif" fill="{c}">{}</text><text x="{:.0}" dy="0.31em" text-anchor="start" font-size="11" font-family="Arial, sans-serif" fill="#333">{}</text></g>"##,
            node.x,
            node.y,
            node.radius,
            node.badge_width(),
            escape_xml(&node.badge),
            node.label_offset(),
            escape_xml(&node.label),
            c = escape_xml(&node.color),
        );
    }
    out.push_str("</g>\n");

    let _ = writeln!(
        out,
        r#"<g class="legend" transform="translate({:.0}, 20)"><text x="0" y="0" font-size="14" font-weight="bold" font-family="Arial, sans-serif">Categories</text>"#,
        scene.width() - 150.0
    );
    for (i, entry) in scene.legend().iter().enumerate() {
        let _ = writeln!(
            out,
            r#"<g transform="translate(0, {})"><circle cx="5" cy="0" r="5" fill="{}"/><text x="15" y="4" font-size="12" font-family="Arial, sans-serif">{}</text></g>"#,
            (i + 1) * 20,
            escape_xml(&entry.color),
            escape_xml(&entry.label)
        );
    }
    out.push_str("</g>\n</svg>\n");
    out
}
