// Braille canvas rendering of the current scene and cell <-> scene mapping

use crawlscope_core::category::parse_hex_color;
use crawlscope_core::layout::{NetworkScene, Tooltip, TreeOrientation, TreeScene};
use crawlscope_core::viewport::Viewport;
use crawlscope_core::RenderedGraph;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Block, Borders, Clear, Paragraph,
        canvas::{Canvas, Circle, Context, Line as CanvasLine, Rectangle},
    },
};

const LINK_COLOR: Color = Color::DarkGray;
const HOVER_COLOR: Color = Color::White;
const CURVE_SEGMENTS: usize = 8;
// Labels get unreadable past this many nodes unless zoomed in.
const LABEL_NODE_LIMIT: usize = 60;

pub fn hex_color(hex: &str) -> Color {
    parse_hex_color(hex)
        .map(|(r, g, b)| Color::Rgb(r, g, b))
        .unwrap_or(Color::Gray)
}

/// Maps terminal cells of the graph panel onto scene pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CellMapping {
    pub area: Rect,
    pub scene_width: f64,
    pub scene_height: f64,
}

impl CellMapping {
    pub fn new(area: Rect, scene_width: f64, scene_height: f64) -> Self {
        Self {
            area,
            scene_width,
            scene_height,
        }
    }

    pub fn contains(&self, column: u16, row: u16) -> bool {
        self.area.width > 0
            && self.area.height > 0
            && column >= self.area.x
            && column < self.area.x + self.area.width
            && row >= self.area.y
            && row < self.area.y + self.area.height
    }

    /// Scene point at the center of the cell, if it lies inside the panel.
    pub fn to_scene(&self, column: u16, row: u16) -> Option<(f64, f64)> {
        if !self.contains(column, row) {
            return None;
        }
        let fx = (column - self.area.x) as f64 + 0.5;
        let fy = (row - self.area.y) as f64 + 0.5;
        Some((
            fx / self.area.width as f64 * self.scene_width,
            fy / self.area.height as f64 * self.scene_height,
        ))
    }

    pub fn cell_width(&self) -> f64 {
        self.scene_width / self.area.width.max(1) as f64
    }

    pub fn cell_height(&self) -> f64 {
        self.scene_height / self.area.height.max(1) as f64
    }

    /// Scene-space distance covered by moving the pointer by whole cells.
    pub fn cell_delta(&self, dcol: i32, drow: i32) -> (f64, f64) {
        (dcol as f64 * self.cell_width(), drow as f64 * self.cell_height())
    }
}

/// Draw the scene into `area` and return the mapping of its inner region.
pub fn render_graph(f: &mut Frame, area: Rect, graph: &RenderedGraph, hover: Option<usize>, title: String) -> CellMapping {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let (width, height) = (graph.width(), graph.height());
    let mapping = CellMapping::new(inner, width, height);
    let canvas = Canvas::default()
        .marker(Marker::Braille)
        .x_bounds([0.0, width])
        .y_bounds([0.0, height])
        .paint(|ctx| match graph {
            RenderedGraph::Network(scene) => paint_network(ctx, scene, graph.viewport(), hover, &mapping),
            RenderedGraph::Tree(scene) => paint_tree(ctx, scene, graph.viewport(), hover),
        });
    f.render_widget(canvas, inner);

    if let RenderedGraph::Tree(scene) = graph {
        render_legend(f, inner, scene);
    }
    mapping
}

fn paint_network(ctx: &mut Context, scene: &NetworkScene, viewport: &Viewport, hover: Option<usize>, mapping: &CellMapping) {
    let height = scene.height();
    let flip = |y: f64| height - y;

    for cluster in scene.clusters() {
        let color = hex_color(&cluster.color);
        let (x, y) = viewport.to_screen(cluster.x, cluster.y);
        let (w, h) = (cluster.width * viewport.scale, cluster.height * viewport.scale);
        ctx.draw(&Rectangle {
            x,
            y: flip(y + h),
            width: w,
            height: h,
            color,
        });
        let (lx, ly) = cluster.label_position();
        let (lx, ly) = viewport.to_screen(lx, ly);
        let half = cluster.label.chars().count() as f64 * mapping.cell_width() / 2.0;
        ctx.print(lx - half, flip(ly), Span::styled(cluster.label.clone(), Style::default().fg(color)));
    }
    ctx.layer();

    let nodes = scene.nodes();
    for &(source, target) in scene.links() {
        let (x1, y1) = viewport.to_screen(nodes[source].x, nodes[source].y);
        let (x2, y2) = viewport.to_screen(nodes[target].x, nodes[target].y);
        ctx.draw(&CanvasLine {
            x1,
            y1: flip(y1),
            x2,
            y2: flip(y2),
            color: LINK_COLOR,
        });
    }
    ctx.layer();

    let show_labels = nodes.len() <= LABEL_NODE_LIMIT || viewport.scale >= 2.0;
    for (i, node) in nodes.iter().enumerate() {
        let hovered = hover == Some(i);
        let color = if hovered { HOVER_COLOR } else { hex_color(&node.color) };
        let (x, y) = viewport.to_screen(node.x, node.y);
        let radius = node.radius * viewport.scale;
        ctx.draw(&Circle {
            x,
            y: flip(y),
            radius,
            color,
        });
        if show_labels || hovered {
            ctx.print(x + radius + 2.0, flip(y), Span::styled(node.label.clone(), Style::default().fg(Color::Gray)));
        }
    }
}

/// Cubic curve between parent and child, bending along the tree's growth axis.
fn tree_link_points(orientation: TreeOrientation, from: (f64, f64), to: (f64, f64)) -> Vec<(f64, f64)> {
    let (c1, c2) = match orientation {
        TreeOrientation::LeftToRight => {
            let mid = (from.0 + to.0) / 2.0;
            ((mid, from.1), (mid, to.1))
        }
        TreeOrientation::TopToBottom => {
            let mid = (from.1 + to.1) / 2.0;
            ((from.0, mid), (to.0, mid))
        }
    };
    (0..=CURVE_SEGMENTS)
        .map(|i| {
            let t = i as f64 / CURVE_SEGMENTS as f64;
            let u = 1.0 - t;
            let a = u * u * u;
            let b = 3.0 * u * u * t;
            let c = 3.0 * u * t * t;
            let d = t * t * t;
            (
                a * from.0 + b * c1.0 + c * c2.0 + d * to.0,
                a * from.1 + b * c1.1 + c * c2.1 + d * to.1,
            )
        })
        .collect()
}

fn paint_tree(ctx: &mut Context, scene: &TreeScene, viewport: &Viewport, hover: Option<usize>) {
    let height = scene.height();
    let nodes = scene.nodes();

    for &(parent, child) in scene.links() {
        let from = viewport.to_screen(nodes[parent].x, nodes[parent].y);
        let to = viewport.to_screen(nodes[child].x, nodes[child].y);
        let points = tree_link_points(scene.orientation(), from, to);
        for pair in points.windows(2) {
            ctx.draw(&CanvasLine {
                x1: pair[0].0,
                y1: height - pair[0].1,
                x2: pair[1].0,
                y2: height - pair[1].1,
                color: LINK_COLOR,
            });
        }
    }
    ctx.layer();

    for (i, node) in nodes.iter().enumerate() {
        let color = hex_color(&node.color);
        let (x, y) = viewport.to_screen(node.x, node.y);
        let radius = node.radius * viewport.scale;
        ctx.draw(&Circle {
            x,
            y: height - y,
            radius,
            color: if hover == Some(i) { HOVER_COLOR } else { color },
        });
        let label = Line::from(vec![
            Span::styled(format!(" {} ", node.badge), Style::default().fg(Color::Black).bg(color)),
            Span::styled(format!(" {}", node.label), Style::default().fg(Color::Gray)),
        ]);
        ctx.print(x + radius + 2.0, height - y, label);
    }
}

fn render_legend(f: &mut Frame, area: Rect, scene: &TreeScene) {
    if scene.legend().is_empty() {
        return;
    }
    let mut lines = vec![Line::from(Span::styled("Categories", Style::default().fg(Color::White)))];
    lines.extend(scene.legend().iter().map(|entry| {
        Line::from(vec![
            Span::styled("● ", Style::default().fg(hex_color(&entry.color))),
            Span::raw(entry.label.clone()),
        ])
    }));

    let width = lines.iter().map(Line::width).max().unwrap_or(0) as u16 + 2;
    let height = lines.len() as u16;
    if width > area.width || height > area.height {
        return;
    }
    let legend_area = Rect {
        x: area.x + area.width - width,
        y: area.y,
        width,
        height,
    };
    f.render_widget(Clear, legend_area);
    f.render_widget(Paragraph::new(lines), legend_area);
}

/// Popup next to the pointer, kept inside `bounds`.
pub fn render_tooltip(f: &mut Frame, bounds: Rect, pointer: (u16, u16), tooltip: &Tooltip) {
    let color = hex_color(&tooltip.color);
    let mut lines = vec![
        Line::from(Span::styled(tooltip.title.clone(), Style::default().fg(Color::White))),
        Line::from(Span::styled(tooltip.category.clone(), Style::default().fg(color))),
    ];
    lines.extend(tooltip.rows.iter().map(|(label, value)| {
        Line::from(vec![
            Span::styled(format!("{}: ", label), Style::default().fg(Color::DarkGray)),
            Span::raw(value.clone()),
        ])
    }));

    let content_width = lines.iter().map(Line::width).max().unwrap_or(0) as u16;
    let width = (content_width + 2).min(bounds.width);
    let height = (lines.len() as u16 + 2).min(bounds.height);
    if width < 4 || height < 3 {
        return;
    }

    let mut x = pointer.0.saturating_add(2);
    if x + width > bounds.x + bounds.width {
        x = (bounds.x + bounds.width).saturating_sub(width);
    }
    let mut y = pointer.1.saturating_add(1);
    if y + height > bounds.y + bounds.height {
        y = pointer.1.saturating_sub(height).max(bounds.y);
    }
    let area = Rect { x, y, width, height };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));
    f.render_widget(Clear, area);
    f.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_center_maps_into_scene() {
        let mapping = CellMapping::new(Rect::new(10, 5, 100, 40), 1200.0, 800.0);
        assert_eq!(mapping.to_scene(9, 5), None);
        assert_eq!(mapping.to_scene(110, 5), None);
        let (x, y) = mapping.to_scene(10, 5).unwrap();
        assert!((x - 6.0).abs() < 1e-9);
        assert!((y - 10.0).abs() < 1e-9);
        let (x, y) = mapping.to_scene(109, 44).unwrap();
        assert!((x - 1194.0).abs() < 1e-9);
        assert!((y - 790.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_mapping_contains_nothing() {
        let mapping = CellMapping::default();
        assert!(!mapping.contains(0, 0));
        assert_eq!(mapping.cell_width(), 0.0);
    }

    #[test]
    fn test_cell_delta_scales_by_cell_size() {
        let mapping = CellMapping::new(Rect::new(0, 0, 120, 40), 1200.0, 800.0);
        assert_eq!(mapping.cell_delta(3, -2), (30.0, -40.0));
    }

    #[test]
    fn test_hex_color_falls_back_to_gray() {
        assert_eq!(hex_color("#3b82f6"), Color::Rgb(0x3b, 0x82, 0xf6));
        assert_eq!(hex_color("blue"), Color::Gray);
    }

    #[test]
    fn test_tree_curve_starts_and_ends_on_nodes() {
        let points = tree_link_points(TreeOrientation::LeftToRight, (0.0, 0.0), (100.0, 50.0));
        assert_eq!(points.len(), CURVE_SEGMENTS + 1);
        assert_eq!(points[0], (0.0, 0.0));
        let last = points[CURVE_SEGMENTS];
        assert!((last.0 - 100.0).abs() < 1e-9 && (last.1 - 50.0).abs() < 1e-9);
        // Leaves the parent horizontally.
        assert!(points[1].1 < 5.0);
    }
}
