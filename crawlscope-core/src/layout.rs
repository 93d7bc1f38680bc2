// Network and tree scenes: positions, clusters, hit-testing and interaction

use crate::category::{CategoryTable, category_key};
use crate::map::GraphData;
use crate::simulation::{Axis, Body, CollideForce, LinkForce, ManyBodyForce, PositionForce, Simulation, phyllotaxis};
use crate::viewport::{MIN_ZOOM, Viewport};
use crawlscope_client::{PageId, TreeData};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

pub const DEFAULT_WIDTH: f64 = 1200.0;
pub const DEFAULT_HEIGHT: f64 = 800.0;

const LINK_DISTANCE: f64 = 80.0;
const CHARGE: f64 = -150.0;
const COLLIDE_PADDING: f64 = 10.0;
const CLUSTER_PADDING: f64 = 40.0;
const CLUSTER_LABEL_OFFSET: f64 = 10.0;
const MIN_RADIUS: f64 = 5.0;
const MAX_RADIUS: f64 = 20.0;
const DRAG_ALPHA_TARGET: f64 = 0.3;
const NETWORK_LABEL_CHARS: usize = 20;
const TREE_NAME_CHARS: usize = 30;
// Approximate glyph advance of the 11px node font.
const CHAR_WIDTH: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TreeOrientation {
    #[default]
    LeftToRight,
    TopToBottom,
}

impl TreeOrientation {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "left-to-right" | "horizontal" | "ltr" => Some(TreeOrientation::LeftToRight),
            "top-to-bottom" | "vertical" | "ttb" => Some(TreeOrientation::TopToBottom),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Network,
    Tree,
}

impl ViewMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "network" => Some(ViewMode::Network),
            "tree" => Some(ViewMode::Tree),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Network => "network",
            ViewMode::Tree => "tree",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            ViewMode::Network => ViewMode::Tree,
            ViewMode::Tree => ViewMode::Network,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    pub width: f64,
    pub height: f64,
    pub cluster_strength: f64,
    pub tree_orientation: TreeOrientation,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            cluster_strength: 0.3,
            tree_orientation: TreeOrientation::LeftToRight,
        }
    }
}

/// Hover details for a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub title: String,
    pub category: String,
    pub color: String,
    pub rows: Vec<(&'static str, String)>,
}

/// Cut `text` to `max` characters, appending `...` when shortened.
pub fn truncate_label(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let mut cut: String = text.chars().take(max).collect();
        cut.push_str("...");
        cut
    } else {
        text.to_string()
    }
}

/// Linear map `[0, max] -> [5, 20]`. A degenerate domain maps to the midpoint.
pub fn node_radius(value: u32, max_value: u32) -> f64 {
    if max_value == 0 {
        return (MIN_RADIUS + MAX_RADIUS) / 2.0;
    }
    MIN_RADIUS + (MAX_RADIUS - MIN_RADIUS) * value as f64 / max_value as f64
}

/// Grid column and row count for `k` clusters.
pub fn cluster_grid(k: usize) -> (usize, usize) {
    if k == 0 {
        return (0, 0);
    }
    let cols = (k as f64).sqrt().ceil() as usize;
    (cols, k.div_ceil(cols))
}

fn network_label(title: Option<&str>, url: &str) -> String {
    let text = title
        .filter(|t| !t.is_empty())
        .or_else(|| url.rsplit('/').next().filter(|s| !s.is_empty()))
        .unwrap_or(url);
    truncate_label(text, NETWORK_LABEL_CHARS)
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkNode {
    pub id: PageId,
    pub url: String,
    pub title: Option<String>,
    pub category: String,
    pub color: String,
    pub label: String,
    pub level: u32,
    pub value: u32,
    pub radius: f64,
    pub x: f64,
    pub y: f64,
}

/// Dashed box drawn behind the members of one category.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterBox {
    pub category: String,
    pub label: String,
    pub color: String,
    pub center: (f64, f64),
    pub members: Vec<usize>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ClusterBox {
    pub fn label_position(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y - CLUSTER_LABEL_OFFSET)
    }
}

pub struct NetworkScene {
    nodes: Vec<NetworkNode>,
    links: Vec<(usize, usize)>,
    clusters: Vec<ClusterBox>,
    simulation: Simulation,
    viewport: Viewport,
    width: f64,
    height: f64,
    dragging: Option<usize>,
}

impl NetworkScene {
    pub fn new(graph: &GraphData, table: &CategoryTable, config: &LayoutConfig) -> Self {
        let (width, height) = (config.width, config.height);

        let mut categories: Vec<String> = Vec::new();
        let mut membership = Vec::with_capacity(graph.nodes.len());
        for node in &graph.nodes {
            let key = category_key(node.category.as_deref());
            let slot = match categories.iter().position(|c| *c == key) {
                Some(slot) => slot,
                None => {
                    categories.push(key);
                    categories.len() - 1
                }
            };
            membership.push(slot);
        }

        let (cols, rows) = cluster_grid(categories.len());
        let cell_w = if cols > 0 { width / cols as f64 } else { width };
        let cell_h = if rows > 0 { height / rows as f64 } else { height };

        let mut clusters: Vec<ClusterBox> = categories
            .iter()
            .enumerate()
            .map(|(i, category)| {
                let (row, col) = (i / cols, i % cols);
                let center = (col as f64 * cell_w + cell_w / 2.0, row as f64 * cell_h + cell_h / 2.0);
                ClusterBox {
                    category: category.clone(),
                    label: String::new(),
                    color: table.color(Some(category)).to_string(),
                    center,
                    members: Vec::new(),
                    x: center.0,
                    y: center.1,
                    width: 0.0,
                    height: 0.0,
                }
            })
            .collect();

        for (i, slot) in membership.iter().enumerate() {
            clusters[*slot].members.push(i);
        }
        for cluster in clusters.iter_mut() {
            cluster.label = format!(
                "{} ({})",
                table.label(Some(&cluster.category)),
                cluster.members.len()
            );
        }

        let max_value = graph.nodes.iter().map(|n| n.value).max().unwrap_or(0);
        let nodes: Vec<NetworkNode> = graph
            .nodes
            .iter()
            .zip(&membership)
            .enumerate()
            .map(|(i, (node, slot))| {
                let (cx, cy) = clusters[*slot].center;
                let (dx, dy) = phyllotaxis(i);
                NetworkNode {
                    id: node.id,
                    url: node.url.clone(),
                    title: node.title.clone(),
                    category: clusters[*slot].category.clone(),
                    color: clusters[*slot].color.clone(),
                    label: network_label(node.title.as_deref(), &node.url),
                    level: node.level,
                    value: node.value,
                    radius: node_radius(node.value, max_value),
                    x: cx + dx,
                    y: cy + dy,
                }
            })
            .collect();

        let index: HashMap<PageId, usize> = nodes.iter().enumerate().map(|(i, n)| (n.id, i)).collect();
        let links: Vec<(usize, usize)> = graph
            .links
            .iter()
            .filter_map(|l| Some((*index.get(&l.source)?, *index.get(&l.target)?)))
            .collect();

        let bodies = nodes.iter().map(|n| Body::at(n.x, n.y)).collect();
        let targets_x = membership.iter().map(|s| clusters[*s].center.0).collect();
        let targets_y = membership.iter().map(|s| clusters[*s].center.1).collect();
        let radii = nodes.iter().map(|n| n.radius + COLLIDE_PADDING).collect();

        let simulation = Simulation::new(bodies)
            .with_force("link", LinkForce::new(links.clone(), nodes.len(), LINK_DISTANCE))
            .with_force("charge", ManyBodyForce::new(CHARGE))
            .with_force("collision", CollideForce::new(radii))
            .with_force("x", PositionForce::new(Axis::X, targets_x, config.cluster_strength))
            .with_force("y", PositionForce::new(Axis::Y, targets_y, config.cluster_strength));

        debug!(
            "Network scene: {} nodes, {} links, {} clusters, forces {:?}",
            nodes.len(),
            links.len(),
            clusters.len(),
            simulation.force_names()
        );

        let mut scene = Self {
            nodes,
            links,
            clusters,
            simulation,
            viewport: Viewport::identity(),
            width,
            height,
            dragging: None,
        };
        scene.update_clusters();
        scene
    }

    pub fn nodes(&self) -> &[NetworkNode] {
        &self.nodes
    }

    pub fn links(&self) -> &[(usize, usize)] {
        &self.links
    }

    pub fn clusters(&self) -> &[ClusterBox] {
        &self.clusters
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn is_settled(&self) -> bool {
        self.simulation.is_settled()
    }

    /// Advance the simulation one tick. Returns false once it has cooled down.
    pub fn tick(&mut self) -> bool {
        if !self.simulation.step() {
            return false;
        }
        self.sync_positions();
        true
    }

    /// Run the simulation to rest, bounded by `max_ticks`.
    pub fn settle(&mut self, max_ticks: usize) -> usize {
        let ticks = self.simulation.run(max_ticks);
        self.sync_positions();
        ticks
    }

    fn sync_positions(&mut self) {
        for (node, body) in self.nodes.iter_mut().zip(self.simulation.bodies()) {
            node.x = body.x;
            node.y = body.y;
        }
        self.update_clusters();
    }

    fn update_clusters(&mut self) {
        for cluster in self.clusters.iter_mut() {
            if cluster.members.is_empty() {
                continue;
            }
            let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
            let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
            for &m in &cluster.members {
                let node = &self.nodes[m];
                min_x = min_x.min(node.x);
                min_y = min_y.min(node.y);
                max_x = max_x.max(node.x);
                max_y = max_y.max(node.y);
            }
            cluster.x = min_x - CLUSTER_PADDING;
            cluster.y = min_y - CLUSTER_PADDING;
            cluster.width = max_x - min_x + 2.0 * CLUSTER_PADDING;
            cluster.height = max_y - min_y + 2.0 * CLUSTER_PADDING;
        }
    }

    /// Topmost node under the screen point, widened by `slack` screen units.
    pub fn node_at(&self, sx: f64, sy: f64, slack: f64) -> Option<usize> {
        let (wx, wy) = self.viewport.to_world(sx, sy);
        let slack = slack / self.viewport.scale;
        self.nodes.iter().enumerate().rev().find_map(|(i, n)| {
            let reach = n.radius + slack;
            ((n.x - wx).powi(2) + (n.y - wy).powi(2) <= reach * reach).then_some(i)
        })
    }

    pub fn tooltip(&self, index: usize) -> Option<Tooltip> {
        let node = self.nodes.get(index)?;
        Some(Tooltip {
            title: node.title.clone().filter(|t| !t.is_empty()).unwrap_or_else(|| "No Title".to_string()),
            category: node.category.clone(),
            color: node.color.clone(),
            rows: vec![
                ("URL", node.url.clone()),
                ("Level", node.level.to_string()),
                ("Links", node.value.saturating_sub(1).to_string()),
            ],
        })
    }

    pub fn url_of(&self, index: usize) -> Option<&str> {
        self.nodes.get(index).map(|n| n.url.as_str())
    }

    /// Pin a node under the pointer and reheat the simulation.
    pub fn drag_start(&mut self, index: usize) -> bool {
        let Some(node) = self.nodes.get(index) else {
            return false;
        };
        let (x, y) = (node.x, node.y);
        self.simulation.set_alpha_target(DRAG_ALPHA_TARGET);
        self.simulation.restart();
        self.simulation.pin(index, x, y);
        self.dragging = Some(index);
        true
    }

    pub fn drag_move(&mut self, sx: f64, sy: f64) {
        if let Some(index) = self.dragging {
            let (wx, wy) = self.viewport.to_world(sx, sy);
            self.simulation.pin(index, wx, wy);
        }
    }

    pub fn drag_end(&mut self) {
        if let Some(index) = self.dragging.take() {
            self.simulation.set_alpha_target(0.0);
            self.simulation.unpin(index);
        }
    }

    pub fn dragging(&self) -> Option<usize> {
        self.dragging
    }

    pub fn is_pinned(&self, index: usize) -> bool {
        self.simulation.bodies().get(index).is_some_and(Body::is_pinned)
    }

    pub fn alpha_target(&self) -> f64 {
        self.simulation.alpha_target()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub name: String,
    pub label: String,
    pub url: Option<String>,
    pub category: String,
    pub badge: String,
    pub color: String,
    pub radius: f64,
    pub depth: usize,
    pub parent: Option<usize>,
    pub children: usize,
    pub x: f64,
    pub y: f64,
}

impl TreeNode {
    pub fn badge_width(&self) -> f64 {
        self.badge.chars().count() as f64 * CHAR_WIDTH + 8.0
    }

    /// Horizontal offset of the name text from the node center.
    pub fn label_offset(&self) -> f64 {
        self.badge.chars().count() as f64 * CHAR_WIDTH + 20.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub category: String,
    pub label: String,
    pub color: String,
}

pub struct TreeScene {
    nodes: Vec<TreeNode>,
    links: Vec<(usize, usize)>,
    legend: Vec<LegendEntry>,
    viewport: Viewport,
    orientation: TreeOrientation,
    width: f64,
    height: f64,
}

impl TreeScene {
    pub fn new(tree: &TreeData, table: &CategoryTable, config: &LayoutConfig) -> Self {
        let (width, height) = (config.width, config.height);

        // Breadth-first flatten keeps parents ahead of children.
        let mut flat: Vec<(&TreeData, Option<usize>, usize)> = Vec::new();
        let mut queue = VecDeque::from([(tree, None, 0usize)]);
        while let Some((data, parent, depth)) = queue.pop_front() {
            let index = flat.len();
            flat.push((data, parent, depth));
            for child in &data.children {
                queue.push_back((child, Some(index), depth + 1));
            }
        }

        let mut child_lists: Vec<Vec<usize>> = vec![Vec::new(); flat.len()];
        for (i, (_, parent, _)) in flat.iter().enumerate() {
            if let Some(p) = parent {
                child_lists[*p].push(i);
            }
        }

        let mut nodes: Vec<TreeNode> = flat
            .iter()
            .enumerate()
            .map(|(i, (data, parent, depth))| {
                let category = category_key(data.category.as_deref());
                let name = Some(data.name.as_str())
                    .filter(|n| !n.is_empty())
                    .or(data.url.as_deref())
                    .unwrap_or("Unknown")
                    .to_string();
                TreeNode {
                    label: truncate_label(&name, TREE_NAME_CHARS),
                    name,
                    url: data.url.clone(),
                    badge: table.label(data.category.as_deref()).to_string(),
                    color: table.color(Some(&category)).to_string(),
                    category,
                    radius: match data.value {
                        Some(v) if v > 0 => (v as f64).clamp(5.0, 15.0),
                        _ => 7.0,
                    },
                    depth: *depth,
                    parent: *parent,
                    children: child_lists[i].len(),
                    x: 0.0,
                    y: 0.0,
                }
            })
            .collect();

        let links = nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.parent.map(|p| (p, i)))
            .collect();

        let mut legend: Vec<LegendEntry> = Vec::new();
        for (data, _, _) in &flat {
            let Some(raw) = data.category.as_deref().filter(|c| !c.trim().is_empty()) else {
                continue;
            };
            let key = category_key(Some(raw));
            if legend.iter().any(|e| e.category == key) {
                continue;
            }
            legend.push(LegendEntry {
                label: table.label(Some(raw)).to_string(),
                color: table.color(Some(&key)).to_string(),
                category: key,
            });
        }

        let (breadth_span, depth_span) = match config.tree_orientation {
            TreeOrientation::LeftToRight => (height - 100.0, width - 200.0),
            TreeOrientation::TopToBottom => (width - 200.0, height - 100.0),
        };
        let breadth = tidy_breadth(&child_lists, &nodes, breadth_span);
        let max_depth = nodes.iter().map(|n| n.depth).max().unwrap_or(0).max(1) as f64;
        for (node, b) in nodes.iter_mut().zip(breadth) {
            let d = node.depth as f64 * depth_span / max_depth;
            (node.x, node.y) = match config.tree_orientation {
                TreeOrientation::LeftToRight => (d, b),
                TreeOrientation::TopToBottom => (b, d),
            };
        }

        let mut scene = Self {
            nodes,
            links,
            legend,
            viewport: Viewport::identity(),
            orientation: config.tree_orientation,
            width,
            height,
        };
        scene.viewport = scene.fit_transform();
        debug!("Tree scene: {} nodes, scale {:.3}", scene.nodes.len(), scene.viewport.scale);
        scene
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn links(&self) -> &[(usize, usize)] {
        &self.links
    }

    pub fn legend(&self) -> &[LegendEntry] {
        &self.legend
    }

    pub fn orientation(&self) -> TreeOrientation {
        self.orientation
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// World-space bounding box `(x, y, w, h)` of nodes, badges and labels.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for node in &self.nodes {
            let text_right = node.x + node.label_offset() + node.label.chars().count() as f64 * CHAR_WIDTH;
            min_x = min_x.min(node.x - node.radius);
            max_x = max_x.max(text_right);
            min_y = min_y.min(node.y - node.radius.max(10.0));
            max_y = max_y.max(node.y + node.radius.max(6.0));
        }
        if self.nodes.is_empty() {
            return (0.0, 0.0, 0.0, 0.0);
        }
        (min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Scale the whole tree into the canvas (never enlarging) and center it.
    pub fn fit_transform(&self) -> Viewport {
        let (bx, by, bw, bh) = self.bounds();
        if bw <= 0.0 || bh <= 0.0 {
            return Viewport::new(1.0, self.width / 2.0 - bx, self.height / 2.0 - by);
        }
        let scale = ((self.width / bw).min(self.height / bh) * 0.9).clamp(MIN_ZOOM, 1.0);
        let (mid_x, mid_y) = (bx + bw / 2.0, by + bh / 2.0);
        Viewport::new(scale, self.width / 2.0 - mid_x * scale, self.height / 2.0 - mid_y * scale)
    }

    pub fn node_at(&self, sx: f64, sy: f64, slack: f64) -> Option<usize> {
        let (wx, wy) = self.viewport.to_world(sx, sy);
        let slack = slack / self.viewport.scale;
        self.nodes.iter().enumerate().rev().find_map(|(i, n)| {
            let reach = n.radius + slack;
            ((n.x - wx).powi(2) + (n.y - wy).powi(2) <= reach * reach).then_some(i)
        })
    }

    pub fn tooltip(&self, index: usize) -> Option<Tooltip> {
        let node = self.nodes.get(index)?;
        Some(Tooltip {
            title: if node.name.is_empty() { "No Name".to_string() } else { node.name.clone() },
            category: node.category.clone(),
            color: node.color.clone(),
            rows: vec![
                ("URL", node.url.clone().unwrap_or_else(|| "N/A".to_string())),
                ("Depth", node.depth.to_string()),
                ("Children", node.children.to_string()),
            ],
        })
    }

    pub fn url_of(&self, index: usize) -> Option<&str> {
        self.nodes.get(index)?.url.as_deref()
    }
}

/// Breadth coordinate per node, packed like a tidy tree.
///
/// Each subtree keeps its contour (leftmost and rightmost breadth per depth).
/// Sibling subtrees are pushed apart until their contours clear by 1 between
/// siblings and 2 between cousins, and every parent sits midway over its first
/// and last child. The result is scaled into `[0, span]` with half a gap at
/// each edge.
fn tidy_breadth(children: &[Vec<usize>], nodes: &[TreeNode], span: f64) -> Vec<f64> {
    if nodes.is_empty() {
        return Vec::new();
    }

    let separation = |a: usize, b: usize| if nodes[a].parent == nodes[b].parent { 1.0 } else { 2.0 };

    // Post-order walk from the root (index 0).
    let mut order = Vec::with_capacity(nodes.len());
    let mut stack = vec![(0usize, false)];
    while let Some((i, expanded)) = stack.pop() {
        if expanded {
            order.push(i);
            continue;
        }
        stack.push((i, true));
        for &c in children[i].iter().rev() {
            stack.push((c, false));
        }
    }

    // Offset of each node from its parent.
    let mut relative = vec![0.0; nodes.len()];
    let mut contours: Vec<Vec<(f64, f64)>> = vec![Vec::new(); nodes.len()];
    for &i in &order {
        let Some((&first, rest)) = children[i].split_first() else {
            contours[i] = vec![(0.0, 0.0)];
            continue;
        };

        let mut merged = std::mem::take(&mut contours[first]);
        let mut offsets = vec![0.0];
        for &child in rest {
            let contour = std::mem::take(&mut contours[child]);
            let shift = merged
                .iter()
                .zip(&contour)
                .enumerate()
                .map(|(d, (left, right))| left.1 - right.0 + if d == 0 { 1.0 } else { 2.0 })
                .fold(f64::NEG_INFINITY, f64::max);
            for (d, &(lo, hi)) in contour.iter().enumerate() {
                match merged.get_mut(d) {
                    Some(level) => *level = (level.0.min(lo + shift), level.1.max(hi + shift)),
                    None => merged.push((lo + shift, hi + shift)),
                }
            }
            offsets.push(shift);
        }

        let mid = offsets[offsets.len() - 1] / 2.0;
        for (&child, offset) in children[i].iter().zip(&offsets) {
            relative[child] = offset - mid;
        }
        let mut contour = Vec::with_capacity(merged.len() + 1);
        contour.push((0.0, 0.0));
        contour.extend(merged.into_iter().map(|(lo, hi)| (lo - mid, hi - mid)));
        contours[i] = contour;
    }

    // Parents precede children in the breadth-first node order.
    let mut raw = vec![0.0; nodes.len()];
    for i in 1..nodes.len() {
        if let Some(p) = nodes[i].parent {
            raw[i] = raw[p] + relative[i];
        }
    }

    let by_breadth = |a: &usize, b: &usize| raw[*a].total_cmp(&raw[*b]);
    let left = (0..nodes.len()).min_by(by_breadth).unwrap_or(0);
    let right = (0..nodes.len()).max_by(by_breadth).unwrap_or(0);
    let gap = if left == right { 1.0 } else { separation(left, right) / 2.0 };
    let offset = gap - raw[left];
    let scale = span / (raw[right] + gap + offset);
    raw.iter().map(|x| (x + offset) * scale).collect()
}

/// The scene currently on screen. Switching views replaces it wholesale.
pub enum RenderedGraph {
    Network(NetworkScene),
    Tree(TreeScene),
}

impl RenderedGraph {
    pub fn mode(&self) -> ViewMode {
        match self {
            RenderedGraph::Network(_) => ViewMode::Network,
            RenderedGraph::Tree(_) => ViewMode::Tree,
        }
    }

    pub fn width(&self) -> f64 {
        match self {
            RenderedGraph::Network(s) => s.width(),
            RenderedGraph::Tree(s) => s.width(),
        }
    }

    pub fn height(&self) -> f64 {
        match self {
            RenderedGraph::Network(s) => s.height(),
            RenderedGraph::Tree(s) => s.height(),
        }
    }

    pub fn viewport(&self) -> &Viewport {
        match self {
            RenderedGraph::Network(s) => &s.viewport,
            RenderedGraph::Tree(s) => &s.viewport,
        }
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        match self {
            RenderedGraph::Network(s) => &mut s.viewport,
            RenderedGraph::Tree(s) => &mut s.viewport,
        }
    }

    /// Animate one frame. Trees are static.
    pub fn tick(&mut self) -> bool {
        match self {
            RenderedGraph::Network(s) => s.tick(),
            RenderedGraph::Tree(_) => false,
        }
    }

    pub fn settle(&mut self, max_ticks: usize) {
        if let RenderedGraph::Network(s) = self {
            s.settle(max_ticks);
        }
    }

    pub fn node_at(&self, sx: f64, sy: f64, slack: f64) -> Option<usize> {
        match self {
            RenderedGraph::Network(s) => s.node_at(sx, sy, slack),
            RenderedGraph::Tree(s) => s.node_at(sx, sy, slack),
        }
    }

    pub fn tooltip(&self, index: usize) -> Option<Tooltip> {
        match self {
            RenderedGraph::Network(s) => s.tooltip(index),
            RenderedGraph::Tree(s) => s.tooltip(index),
        }
    }

    /// URL to open for a click at the screen point, if a node was hit.
    pub fn click(&self, sx: f64, sy: f64, slack: f64) -> Option<String> {
        let index = self.node_at(sx, sy, slack)?;
        match self {
            RenderedGraph::Network(s) => s.url_of(index),
            RenderedGraph::Tree(s) => s.url_of(index),
        }
        .map(str::to_string)
    }

    pub fn node_count(&self) -> usize {
        match self {
            RenderedGraph::Network(s) => s.nodes().len(),
            RenderedGraph::Tree(s) => s.nodes().len(),
        }
    }

    /// Begin dragging a node. Tree nodes are not draggable.
    pub fn drag_start(&mut self, index: usize) -> bool {
        match self {
            RenderedGraph::Network(s) => s.drag_start(index),
            RenderedGraph::Tree(_) => false,
        }
    }

    pub fn drag_move(&mut self, sx: f64, sy: f64) {
        if let RenderedGraph::Network(s) = self {
            s.drag_move(sx, sy);
        }
    }

    pub fn drag_end(&mut self) {
        if let RenderedGraph::Network(s) = self {
            s.drag_end();
        }
    }

    /// Restore the initial transform: identity for networks, fitted for trees.
    pub fn reset_view(&mut self) {
        match self {
            RenderedGraph::Network(s) => s.viewport = Viewport::identity(),
            RenderedGraph::Tree(s) => s.viewport = s.fit_transform(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{GraphLink, GraphNode};

    fn graph(categories: &[Option<&str>]) -> GraphData {
        GraphData {
            nodes: categories
                .iter()
                .enumerate()
                .map(|(i, c)| GraphNode {
                    id: i as PageId + 1,
                    url: format!("https://example.com/page-{}", i + 1),
                    title: None,
                    category: c.map(str::to_string),
                    level: 0,
                    value: i as u32 + 1,
                })
                .collect(),
            links: vec![GraphLink { source: 1, target: 2 }],
        }
    }

    #[test]
    fn test_cluster_grid_dimensions() {
        assert_eq!(cluster_grid(1), (1, 1));
        assert_eq!(cluster_grid(3), (2, 2));
        assert_eq!(cluster_grid(5), (3, 2));
        assert_eq!(cluster_grid(9), (3, 3));
        assert_eq!(cluster_grid(10), (4, 3));
    }

    #[test]
    fn test_radius_scale() {
        assert_eq!(node_radius(0, 10), 5.0);
        assert_eq!(node_radius(10, 10), 20.0);
        assert_eq!(node_radius(5, 10), 12.5);
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("short", 20), "short");
        assert_eq!(truncate_label(&"x".repeat(25), 20), format!("{}...", "x".repeat(20)));
    }

    #[test]
    fn test_network_clusters_in_first_seen_order() {
        let data = graph(&[Some("BLOG"), None, Some("blog"), Some("PRODUCT")]);
        let scene = NetworkScene::new(&data, &CategoryTable::default(), &LayoutConfig::default());
        let names: Vec<_> = scene.clusters().iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["BLOG", "UNKNOWN", "PRODUCT"]);
        assert_eq!(scene.clusters()[0].label, "Blog (2)");
        assert_eq!(scene.clusters()[0].center, (300.0, 200.0));
        assert_eq!(scene.clusters()[2].center, (300.0, 600.0));
    }

    #[test]
    fn test_cluster_boxes_enclose_members() {
        let data = graph(&[Some("BLOG"), Some("BLOG"), Some("HOME")]);
        let mut scene = NetworkScene::new(&data, &CategoryTable::default(), &LayoutConfig::default());
        scene.settle(500);
        for cluster in scene.clusters() {
            for &m in &cluster.members {
                let node = &scene.nodes()[m];
                assert!(node.x >= cluster.x + CLUSTER_PADDING - 1e-9);
                assert!(node.x <= cluster.x + cluster.width - CLUSTER_PADDING + 1e-9);
            }
            assert_eq!(cluster.label_position().1, cluster.y - 10.0);
        }
    }

    #[test]
    fn test_drag_pins_then_releases() {
        let data = graph(&[Some("BLOG"), Some("HOME")]);
        let mut scene = NetworkScene::new(&data, &CategoryTable::default(), &LayoutConfig::default());
        scene.settle(1000);
        assert!(scene.drag_start(0));
        assert_eq!(scene.alpha_target(), 0.3);
        scene.drag_move(100.0, 100.0);
        scene.tick();
        assert!(scene.is_pinned(0));
        assert_eq!((scene.nodes()[0].x, scene.nodes()[0].y), (100.0, 100.0));
        scene.drag_end();
        assert!(!scene.is_pinned(0));
        assert_eq!(scene.alpha_target(), 0.0);
        assert_eq!(scene.dragging(), None);
    }

    #[test]
    fn test_network_hit_test_and_tooltip() {
        let data = graph(&[Some("BLOG"), Some("HOME")]);
        let scene = NetworkScene::new(&data, &CategoryTable::default(), &LayoutConfig::default());
        let node = &scene.nodes()[1];
        let hit = scene.node_at(node.x, node.y, 0.0);
        assert_eq!(hit, Some(1));
        let tip = scene.tooltip(1).unwrap();
        assert_eq!(tip.title, "No Title");
        assert_eq!(tip.rows[2], ("Links", "1".to_string()));
        assert_eq!(scene.nodes()[1].label, "page-2");
    }

    fn tree() -> TreeData {
        let mut root = TreeData::leaf("Home");
        root.category = Some("HOME".to_string());
        root.url = Some("https://example.com".to_string());
        for (name, category) in [("A", "BLOG"), ("B", "PRODUCT"), ("C", "BLOG")] {
            let mut child = TreeData::leaf(name);
            child.category = Some(category.to_string());
            child.value = Some(40);
            root.children.push(child);
        }
        root
    }

    #[test]
    fn test_tree_positions_left_to_right() {
        let scene = TreeScene::new(&tree(), &CategoryTable::default(), &LayoutConfig::default());
        let nodes = scene.nodes();
        assert_eq!(nodes[0].x, 0.0);
        assert!(nodes[1..].iter().all(|n| n.x == 1000.0));
        // Three siblings spread over 700 with half-gaps at the edges.
        let ys: Vec<f64> = nodes[1..].iter().map(|n| n.y).collect();
        assert!((ys[0] - 700.0 / 6.0).abs() < 1e-9);
        assert!((ys[2] - 700.0 * 5.0 / 6.0).abs() < 1e-9);
        assert!((nodes[0].y - ys[1]).abs() < 1e-9);
        assert_eq!(nodes[1].radius, 15.0);
        assert_eq!(nodes[0].radius, 7.0);
    }

    #[test]
    fn test_tree_legend_breadth_first_distinct() {
        let scene = TreeScene::new(&tree(), &CategoryTable::default(), &LayoutConfig::default());
        let legend: Vec<_> = scene.legend().iter().map(|e| e.label.as_str()).collect();
        assert_eq!(legend, vec!["Home", "Blog", "Products"]);
    }

    #[test]
    fn test_tree_fit_never_enlarges() {
        let scene = TreeScene::new(&TreeData::leaf("only"), &CategoryTable::default(), &LayoutConfig::default());
        assert!(scene.fit_transform().scale <= 1.0);
        let tip = scene.tooltip(0).unwrap();
        assert_eq!(tip.rows[0].1, "N/A");
        assert_eq!(tip.rows[2].1, "0");
    }

    #[test]
    fn test_top_to_bottom_swaps_axes() {
        let config = LayoutConfig {
            tree_orientation: TreeOrientation::TopToBottom,
            ..LayoutConfig::default()
        };
        let scene = TreeScene::new(&tree(), &CategoryTable::default(), &config);
        assert_eq!(scene.nodes()[0].y, 0.0);
        assert!(scene.nodes()[1..].iter().all(|n| n.y == 700.0));
    }

    #[test]
    fn test_cousins_are_spaced_wider_than_siblings() {
        let mut root = TreeData::leaf("root");
        for _ in 0..2 {
            let mut mid = TreeData::leaf("mid");
            mid.children = vec![TreeData::leaf("a"), TreeData::leaf("b")];
            root.children.push(mid);
        }
        let scene = TreeScene::new(&root, &CategoryTable::default(), &LayoutConfig::default());
        let leaves: Vec<f64> = scene.nodes().iter().filter(|n| n.children == 0).map(|n| n.y).collect();
        let sibling_gap = leaves[1] - leaves[0];
        let cousin_gap = leaves[2] - leaves[1];
        assert!((cousin_gap - 2.0 * sibling_gap).abs() < 1e-9);
    }

    #[test]
    fn test_switching_views_replaces_scene() {
        let data = graph(&[Some("BLOG")]);
        let mut rendered = RenderedGraph::Network(NetworkScene::new(&data, &CategoryTable::default(), &LayoutConfig::default()));
        assert_eq!(rendered.mode(), ViewMode::Network);
        rendered = RenderedGraph::Tree(TreeScene::new(&tree(), &CategoryTable::default(), &LayoutConfig::default()));
        assert_eq!(rendered.mode(), ViewMode::Tree);
        assert_eq!(rendered.node_count(), 4);
        assert!(!rendered.tick());
    }

    #[test]
    fn test_legend_merges_category_spellings() {
        let mut root = TreeData::leaf("Home");
        root.category = Some("blog".to_string());
        for category in ["BLOG", " Blog ", "product"] {
            let mut child = TreeData::leaf("child");
            child.category = Some(category.to_string());
            root.children.push(child);
        }
        let scene = TreeScene::new(&root, &CategoryTable::default(), &LayoutConfig::default());
        let legend: Vec<_> = scene.legend().iter().map(|e| (e.category.as_str(), e.label.as_str())).collect();
        assert_eq!(legend, vec![("BLOG", "Blog"), ("PRODUCT", "Products")]);
    }

    #[test]
    fn test_oversized_tree_fit_clamps_and_stays_centered() {
        let mut scene = TreeScene::new(&tree(), &CategoryTable::default(), &LayoutConfig::default());
        scene.nodes[2].x = 100_000.0;
        scene.nodes[3].y = -40_000.0;

        let fit = scene.fit_transform();
        assert_eq!(fit.scale, MIN_ZOOM);
        let (bx, by, bw, bh) = scene.bounds();
        let (cx, cy) = fit.to_screen(bx + bw / 2.0, by + bh / 2.0);
        assert!((cx - scene.width() / 2.0).abs() < 1e-6, "cx = {}", cx);
        assert!((cy - scene.height() / 2.0).abs() < 1e-6, "cy = {}", cy);
    }

    #[test]
    fn test_small_subtree_packs_next_to_deep_sibling() {
        // root -> [x -> [x1 -> 4 leaves], y]
        let mut x1 = TreeData::leaf("x1");
        x1.children = (0..4).map(|i| TreeData::leaf(format!("leaf {}", i))).collect();
        let mut x = TreeData::leaf("x");
        x.children.push(x1);
        let mut root = TreeData::leaf("root");
        root.children = vec![x, TreeData::leaf("y")];

        let scene = TreeScene::new(&root, &CategoryTable::default(), &LayoutConfig::default());
        let nodes = scene.nodes();
        let (x, y) = (&nodes[1], &nodes[2]);
        assert_eq!((x.name.as_str(), y.name.as_str()), ("x", "y"));

        let leaves: Vec<f64> = nodes.iter().filter(|n| n.depth == 3).map(|n| n.y).collect();
        let unit = leaves[1] - leaves[0];
        // Siblings one unit apart even though x's grandchildren span three.
        assert!((y.y - x.y - unit).abs() < 1e-9, "gap = {}, unit = {}", y.y - x.y, unit);
        assert!((leaves[3] - leaves[0] - 3.0 * unit).abs() < 1e-9);
        assert!((nodes[0].y - (x.y + y.y) / 2.0).abs() < 1e-9);
    }
}
