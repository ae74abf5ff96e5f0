use anyhow::{bail, Result};
use image::RgbImage;
use log::info;
use std::collections::{BTreeMap, BTreeSet};

use crate::color::{color_diff, rgb_to_vec3, Vec3};
use crate::labels::Labels;
use crate::merge::MergePolicy;

/// Pixel neighborhood used to decide which regions touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    Four,
    #[default]
    Eight,
}

/// How a mean-color difference `d` becomes an edge weight.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum WeightMode {
    /// `d` itself; low weight means similar.
    #[default]
    Distance,
    /// `exp(-d^2 / sigma)`; high weight means similar.
    Similarity { sigma: f64 },
}

impl WeightMode {
    /// Similarity weights with a positive, finite `sigma`.
    pub fn similarity(sigma: f64) -> Result<Self> {
        let mode = WeightMode::Similarity { sigma };
        mode.validate()?;
        Ok(mode)
    }

    pub fn validate(&self) -> Result<()> {
        if let WeightMode::Similarity { sigma } = *self {
            if !(sigma > 0.0) || !sigma.is_finite() {
                bail!("similarity sigma must be positive and finite, got {}", sigma)
            }
        }
        Ok(())
    }

    pub fn weight(&self, d: f64) -> f64 {
        match *self {
            WeightMode::Distance => d,
            WeightMode::Similarity { sigma } => (-(d * d) / sigma).exp(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    pub total_color: Vec3,
    pub pixel_count: u64,
    pub mean_color: Vec3,
    /// Original segmentation labels absorbed by this node.
    pub labels: Vec<u32>,
}

impl NodeData {
    pub fn new(label: u32) -> Self {
        Self { total_color: Vec3::default(), pixel_count: 0, mean_color: Vec3::default(), labels: vec![label] }
    }
}

/// Undirected weighted graph over region ids. Ids are never reused:
/// `next_id` stays above every id ever inserted.
#[derive(Debug, Clone, Default)]
pub struct RegionAdjacencyGraph {
    nodes: BTreeMap<u32, NodeData>,
    adj: BTreeMap<u32, BTreeMap<u32, f64>>,
    max_id: Option<u32>,
}

pub type Rag = RegionAdjacencyGraph;

impl RegionAdjacencyGraph {
    pub fn new() -> Self { Self::default() }

    pub fn add_node(&mut self, id: u32, data: NodeData) {
        self.nodes.insert(id, data);
        self.adj.entry(id).or_default();
        self.max_id = Some(self.max_id.map_or(id, |m| m.max(id)));
    }

    /// Inserts or overwrites the edge `a - b`. Self loops are ignored.
    pub fn add_edge(&mut self, a: u32, b: u32, weight: f64) {
        if a == b { return; }
        self.adj.entry(a).or_default().insert(b, weight);
        self.adj.entry(b).or_default().insert(a, weight);
    }

    pub fn remove_node(&mut self, id: u32) -> Option<NodeData> {
        if let Some(nbrs) = self.adj.remove(&id) {
            for n in nbrs.keys() {
                if let Some(e) = self.adj.get_mut(n) { e.remove(&id); }
            }
        }
        self.nodes.remove(&id)
    }

    /// Moves node `old` and all its edges to the unused id `new`.
    pub fn rename_node(&mut self, old: u32, new: u32) {
        let Some(data) = self.nodes.get(&old).cloned() else { return };
        let edges: Vec<(u32, f64)> = self.adj.get(&old).map(|m| m.iter().map(|(&n, &w)| (n, w)).collect()).unwrap_or_default();
        self.remove_node(old);
        self.add_node(new, data);
        for (n, w) in edges { self.add_edge(new, n, w); }
    }

    pub fn contains(&self, id: u32) -> bool { self.nodes.contains_key(&id) }

    pub fn has_edge(&self, a: u32, b: u32) -> bool {
        self.adj.get(&a).map_or(false, |m| m.contains_key(&b))
    }

    pub fn weight(&self, a: u32, b: u32) -> Option<f64> {
        self.adj.get(&a).and_then(|m| m.get(&b)).copied()
    }

    pub fn neighbors(&self, id: u32) -> Vec<u32> {
        self.adj.get(&id).map(|m| m.keys().copied().collect()).unwrap_or_default()
    }

    pub fn node(&self, id: u32) -> Option<&NodeData> { self.nodes.get(&id) }
    pub fn node_mut(&mut self, id: u32) -> Option<&mut NodeData> { self.nodes.get_mut(&id) }

    /// Node ids in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = u32> + '_ { self.nodes.keys().copied() }

    /// Every edge once, as `(a, b, weight)` with `a < b`.
    pub fn edges(&self) -> Vec<(u32, u32, f64)> {
        self.adj
            .iter()
            .flat_map(|(&a, m)| m.iter().filter(move |&(&b, _)| a < b).map(move |(&b, &w)| (a, b, w)))
            .collect()
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn edge_count(&self) -> usize { self.adj.values().map(|m| m.len()).sum::<usize>() / 2 }

    pub fn next_id(&self) -> u32 { self.max_id.map_or(0, |m| m + 1) }

    /// Merges `src` into `dst`.
    ///
    /// Every node adjacent to either of them is reconnected to the merged
    /// node with a weight from `policy.weight`. With `in_place` the merged
    /// node keeps `dst`'s id, otherwise it gets `next_id()` and `dst` is
    /// removed as well. Returns the merged node's id.
    pub fn merge_nodes<P: MergePolicy + ?Sized>(&mut self, src: u32, dst: u32, policy: &P, in_place: bool) -> u32 {
        let mut nbrs: BTreeSet<u32> = self.neighbors(src).into_iter().collect();
        nbrs.extend(self.neighbors(dst));
        nbrs.remove(&src);
        nbrs.remove(&dst);

        let new = if in_place {
            dst
        } else {
            let id = self.next_id();
            let data = self.nodes.get(&dst).cloned().unwrap_or_else(|| NodeData::new(dst));
            self.add_node(id, data);
            id
        };

        for n in nbrs {
            let w = policy.weight(self, src, new, n);
            self.add_edge(n, new, w);
        }

        let mut labels = self.nodes.get(&src).map(|d| d.labels.clone()).unwrap_or_default();
        if let Some(d) = self.nodes.get(&dst) { labels.extend_from_slice(&d.labels); }
        if let Some(d) = self.nodes.get_mut(&new) { d.labels = labels; }

        self.remove_node(src);
        if !in_place { self.remove_node(dst); }
        new
    }
}

/// Builds a graph with one node per label, holding the region's total and
/// mean RGB color (0..=255 scale), and an edge between every pair of labels
/// that touch under `connectivity`.
pub fn rag_mean_color(img: &RgbImage, labels: &Labels, connectivity: Connectivity, mode: WeightMode) -> Result<Rag> {
    if img.dimensions() != labels.dimensions() {
        bail!(
            "image is {:?} but labels are {:?}",
            img.dimensions(),
            labels.dimensions()
        )
    }
    mode.validate()?;
    let (w, h) = labels.dimensions();
    let mut graph = Rag::new();

    for (x, y, l) in labels.enumerate_pixels() {
        let label = l[0];
        if !graph.contains(label) { graph.add_node(label, NodeData::new(label)); }
        if let Some(node) = graph.node_mut(label) {
            node.total_color = node.total_color.add(rgb_to_vec3(img.get_pixel(x, y)));
            node.pixel_count += 1;
        }
    }
    for node in graph.nodes.values_mut() {
        node.mean_color = node.total_color.scale(1.0 / node.pixel_count as f64);
    }

    // forward offsets only; each pair is visited from one side
    let offsets: &[(i64, i64)] = match connectivity {
        Connectivity::Four => &[(1, 0), (0, 1)],
        Connectivity::Eight => &[(1, 0), (0, 1), (1, 1), (-1, 1)],
    };
    for y in 0..h as i64 {
        for x in 0..w as i64 {
            let a = labels.get_pixel(x as u32, y as u32)[0];
            for &(dx, dy) in offsets {
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 { continue; }
                let b = labels.get_pixel(nx as u32, ny as u32)[0];
                if a != b && !graph.has_edge(a, b) {
                    let (ca, cb) = (graph.nodes[&a].mean_color, graph.nodes[&b].mean_color);
                    graph.add_edge(a, b, mode.weight(color_diff(ca, cb)));
                }
            }
        }
    }

    info!("RAG: {} regions, {} edges", graph.node_count(), graph.edge_count());
    Ok(graph)
}
