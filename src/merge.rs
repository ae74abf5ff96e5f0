use image::Luma;
use log::{debug, info};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::color::color_diff;
use crate::labels::Labels;
use crate::rag::{Rag, WeightMode};

/// Callbacks that drive `merge_hierarchical`.
pub trait MergePolicy {
    /// Called before `src` is merged into `dst`; updates `dst`'s attributes.
    fn merge(&self, graph: &mut Rag, src: u32, dst: u32);
    /// Weight of the edge between the merged node `dst` and its neighbor `n`.
    fn weight(&self, graph: &Rag, src: u32, dst: u32, n: u32) -> f64;
}

/// Keeps the running total color of every region and weighs edges by the
/// difference of mean colors.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanColor {
    pub mode: WeightMode,
}

impl MeanColor {
    pub fn new(mode: WeightMode) -> Self { Self { mode } }
}

impl MergePolicy for MeanColor {
    fn merge(&self, graph: &mut Rag, src: u32, dst: u32) {
        let Some((total, count)) = graph.node(src).map(|d| (d.total_color, d.pixel_count)) else { return };
        if let Some(d) = graph.node_mut(dst) {
            d.total_color = d.total_color.add(total);
            d.pixel_count += count;
            d.mean_color = d.total_color.scale(1.0 / d.pixel_count as f64);
        }
    }

    fn weight(&self, graph: &Rag, _src: u32, dst: u32, n: u32) -> f64 {
        match (graph.node(dst), graph.node(n)) {
            (Some(a), Some(b)) => self.mode.weight(color_diff(a.mean_color, b.mean_color)),
            _ => f64::INFINITY,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct HeapEdge { weight: f64, a: u32, b: u32, stamp: u64 }

// reversed: BinaryHeap pops the lightest edge first
impl Ord for HeapEdge {
    fn cmp(&self, other: &Self) -> Ordering {
        other.weight.total_cmp(&self.weight)
            .then_with(|| other.a.cmp(&self.a))
            .then_with(|| other.b.cmp(&self.b))
            .then_with(|| other.stamp.cmp(&self.stamp))
    }
}
impl PartialOrd for HeapEdge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}
impl PartialEq for HeapEdge {
    fn eq(&self, other: &Self) -> bool { self.cmp(other) == Ordering::Equal }
}
impl Eq for HeapEdge {}

/// Min-queue of edges with lazy deletion: an entry is live only while its
/// stamp is the latest one recorded for that pair.
#[derive(Default)]
struct EdgeQueue { heap: BinaryHeap<HeapEdge>, live: HashMap<(u32, u32), u64>, stamp: u64 }

impl EdgeQueue {
    fn key(a: u32, b: u32) -> (u32, u32) { (a.min(b), a.max(b)) }

    fn push(&mut self, a: u32, b: u32, weight: f64) {
        self.stamp += 1;
        self.live.insert(Self::key(a, b), self.stamp);
        self.heap.push(HeapEdge { weight, a, b, stamp: self.stamp });
    }

    fn pop_below(&mut self, thresh: f64) -> Option<HeapEdge> {
        if self.heap.peek()?.weight < thresh { self.heap.pop() } else { None }
    }

    fn is_live(&self, e: &HeapEdge) -> bool {
        self.live.get(&Self::key(e.a, e.b)) == Some(&e.stamp)
    }

    fn invalidate_node(&mut self, graph: &Rag, n: u32) {
        for nbr in graph.neighbors(n) { self.live.remove(&Self::key(n, nbr)); }
    }

    fn revalidate_node(&mut self, graph: &Rag, n: u32) {
        for nbr in graph.neighbors(n) {
            if let Some(w) = graph.weight(n, nbr) { self.push(n, nbr, w); }
        }
    }
}

/// Repeatedly merges the lightest edge of `graph` while its weight is below
/// `thresh`, and returns `labels` rewritten so every pixel carries the index
/// (in ascending node id order) of the region that absorbed it.
///
/// With `in_place_merge` the merged region keeps the id of the second node of
/// the edge; otherwise that node is first moved to a fresh id.
pub fn merge_hierarchical<P: MergePolicy + ?Sized>(
    labels: &Labels,
    graph: &mut Rag,
    thresh: f64,
    in_place_merge: bool,
    policy: &P,
) -> Labels {
    let mut queue = EdgeQueue::default();
    for (a, b, w) in graph.edges() { queue.push(a, b, w); }

    let mut merges = 0usize;
    while let Some(edge) = queue.pop_below(thresh) {
        if !queue.is_live(&edge) || !graph.has_edge(edge.a, edge.b) { continue; }
        queue.invalidate_node(graph, edge.a);
        queue.invalidate_node(graph, edge.b);

        let (src, dst) = if in_place_merge {
            (edge.a, edge.b)
        } else {
            let id = graph.next_id();
            graph.rename_node(edge.b, id);
            (edge.a, id)
        };
        policy.merge(graph, src, dst);
        let new = graph.merge_nodes(src, dst, policy, true);
        queue.revalidate_node(graph, new);
        merges += 1;
        debug!("merged {} into {} (weight {:.3})", src, new, edge.weight);
    }
    info!("Hierarchical merge: {} merges, {} regions left", merges, graph.node_count());

    let mut label_map: HashMap<u32, u32> = HashMap::new();
    for (ix, id) in graph.node_ids().enumerate() {
        if let Some(d) = graph.node(id) {
            for &l in &d.labels { label_map.insert(l, ix as u32); }
        }
    }
    Labels::from_fn(labels.width(), labels.height(), |x, y| {
        let l = labels.get_pixel(x, y)[0];
        Luma([label_map.get(&l).copied().unwrap_or(l)])
    })
}
