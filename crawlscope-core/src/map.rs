// Mapping of backend page/link records into graph and tree models

use crate::category::category_key;
use crawlscope_client::{CategoryStats, Page, PageId, RawGraph, RawLink, TreeData};
use petgraph::Direction;
use petgraph::graphmap::DiGraphMap;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: PageId,
    pub url: String,
    pub title: Option<String>,
    pub category: Option<String>,
    pub level: u32,
    /// Outgoing link count plus one; drives node size.
    pub value: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GraphLink {
    pub source: PageId,
    pub target: PageId,
}

/// Flat node/edge snapshot. Every link endpoint is a node of the same snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

impl GraphData {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: PageId) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Problems found in a backend snapshot. They never abort a render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityWarning {
    DanglingLink { source: PageId, target: PageId },
    DuplicateNode { id: PageId },
}

impl fmt::Display for IntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityWarning::DanglingLink { source, target } => {
                write!(f, "link {} -> {} references a missing page", source, target)
            }
            IntegrityWarning::DuplicateNode { id } => write!(f, "page {} appears more than once", id),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedGraph {
    pub graph: GraphData,
    pub warnings: Vec<IntegrityWarning>,
}

/// Map a backend `graph-data` payload.
pub fn map_graph(raw: &RawGraph) -> MappedGraph {
    let nodes = raw.nodes.iter().map(|n| GraphNode {
        id: n.id,
        url: n.url.clone(),
        title: n.title.clone(),
        category: n.category.clone(),
        level: n.level,
        value: n
            .value
            .or_else(|| n.outgoing_links_count.map(|c| c.saturating_add(1)))
            .unwrap_or(1),
    });
    assemble(nodes, &raw.links)
}

/// Map a page list and the links between pages.
pub fn map_pages(pages: &[Page], links: &[RawLink]) -> MappedGraph {
    let nodes = pages.iter().map(|p| GraphNode {
        id: p.id,
        url: p.url.clone(),
        title: p.title.clone(),
        category: p.category.clone(),
        level: p.hierarchy_level,
        value: p.outgoing_links_count.saturating_add(1),
    });
    assemble(nodes, links)
}

fn assemble(candidates: impl Iterator<Item = GraphNode>, links: &[RawLink]) -> MappedGraph {
    let mut warnings = Vec::new();
    let mut seen = HashSet::new();
    let mut nodes = Vec::new();

    for node in candidates {
        if seen.insert(node.id) {
            nodes.push(node);
        } else {
            warnings.push(IntegrityWarning::DuplicateNode { id: node.id });
        }
    }

    let mut kept = Vec::with_capacity(links.len());
    for link in links {
        if seen.contains(&link.source) && seen.contains(&link.target) {
            kept.push(GraphLink {
                source: link.source,
                target: link.target,
            });
        } else {
            warnings.push(IntegrityWarning::DanglingLink {
                source: link.source,
                target: link.target,
            });
        }
    }

    for warning in &warnings {
        warn!("Graph data integrity: {}", warning);
    }

    MappedGraph {
        graph: GraphData { nodes, links: kept },
        warnings,
    }
}

/// Build a single-root tree from pages by discovery depth.
///
/// A page hangs under the first page one level up that links to it, or under
/// the first page of the deepest shallower level when no such link exists.
/// Several top-level pages are gathered under a synthetic root named `root_name`.
pub fn build_tree(pages: &[Page], links: &[RawLink], root_name: &str) -> Option<TreeData> {
    let mut seen = HashSet::new();
    let pages: Vec<&Page> = pages.iter().filter(|p| seen.insert(p.id)).collect();
    let min_level = pages.iter().map(|p| p.hierarchy_level).min()?;

    let position: HashMap<PageId, usize> = pages.iter().enumerate().map(|(i, p)| (p.id, i)).collect();

    let mut graph: DiGraphMap<PageId, ()> = DiGraphMap::new();
    for link in links {
        if position.contains_key(&link.source) && position.contains_key(&link.target) {
            graph.add_edge(link.source, link.target, ());
        }
    }

    // First page (input order) at each level.
    let mut first_at_level: HashMap<u32, usize> = HashMap::new();
    for (i, page) in pages.iter().enumerate() {
        first_at_level.entry(page.hierarchy_level).or_insert(i);
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); pages.len()];
    let mut roots = Vec::new();

    for (i, page) in pages.iter().enumerate() {
        let level = page.hierarchy_level;
        if level == min_level {
            roots.push(i);
            continue;
        }

        let linked_parent = graph
            .neighbors_directed(page.id, Direction::Incoming)
            .filter_map(|src| position.get(&src).copied())
            .filter(|&p| pages[p].hierarchy_level + 1 == level)
            .min();

        let parent = linked_parent.or_else(|| {
            first_at_level
                .iter()
                .filter(|(l, _)| **l < level)
                .max_by_key(|(l, _)| **l)
                .map(|(_, idx)| *idx)
        });

        // min_level < level guarantees a shallower page exists.
        if let Some(parent) = parent {
            children[parent].push(i);
        }
    }

    fn node(idx: usize, pages: &[&Page], children: &[Vec<usize>]) -> TreeData {
        let page = pages[idx];
        TreeData {
            name: page.title.clone().filter(|t| !t.is_empty()).unwrap_or_else(|| page.url.clone()),
            url: Some(page.url.clone()),
            category: page.category.clone(),
            value: Some(page.outgoing_links_count.saturating_add(1)),
            children: children[idx].iter().map(|&c| node(c, pages, children)).collect(),
        }
    }

    if roots.len() == 1 {
        Some(node(roots[0], &pages, &children))
    } else {
        let mut root = TreeData::leaf(root_name);
        root.children = roots.iter().map(|&r| node(r, &pages, &children)).collect();
        Some(root)
    }
}

/// Count pages per category, for when the backend has no classification stats.
pub fn category_stats(pages: &[Page]) -> CategoryStats {
    let mut stats = CategoryStats::new();
    for page in pages {
        *stats.entry(category_key(page.category.as_deref())).or_insert(0) += 1;
    }
    stats
}
