use image::{ImageBuffer, Luma, Rgb, RgbImage};
use rag_merge::{merge_hierarchical, rag_mean_color, Connectivity, Labels, MeanColor, WeightMode};

/// Two-pixel-wide columns, one label per column, one color per label.
fn columns(colors: &[[u8; 3]]) -> (RgbImage, Labels) {
    let w = colors.len() as u32 * 2;
    let img = ImageBuffer::from_fn(w, 2, |x, _y| Rgb(colors[(x / 2) as usize]));
    let labels = ImageBuffer::from_fn(w, 2, |x, _y| Luma([x / 2]));
    (img, labels)
}

fn column_labels(labels: &Labels) -> Vec<u32> {
    (0..labels.width()).step_by(2).map(|x| labels.get_pixel(x, 0)[0]).collect()
}

#[test]
fn builds_nodes_and_weighted_edges() {
    let (img, labels) = columns(&[[10, 10, 10], [20, 10, 10], [200, 200, 200]]);
    let g = rag_mean_color(&img, &labels, Connectivity::Eight, WeightMode::Distance).expect("rag should build");
    assert_eq!(g.node_count(), 3);
    assert_eq!(g.edge_count(), 2);
    assert!(!g.has_edge(0, 2));
    assert!((g.weight(0, 1).unwrap() - 10.0).abs() < 1e-9);
    let expected = (180f64 * 180.0 + 190.0 * 190.0 + 190.0 * 190.0).sqrt();
    assert!((g.weight(1, 2).unwrap() - expected).abs() < 1e-9);

    let n = g.node(1).unwrap();
    assert_eq!(n.pixel_count, 4);
    assert_eq!(n.labels, vec![1]);
    assert!((n.mean_color.x - 20.0).abs() < 1e-9);
}

#[test]
fn diagonal_neighbors_depend_on_connectivity() {
    let img: RgbImage = ImageBuffer::from_fn(2, 2, |_x, _y| Rgb([0, 0, 0]));
    let labels: Labels = ImageBuffer::from_fn(2, 2, |x, y| Luma([y * 2 + x]));
    let four = rag_mean_color(&img, &labels, Connectivity::Four, WeightMode::Distance).unwrap();
    let eight = rag_mean_color(&img, &labels, Connectivity::Eight, WeightMode::Distance).unwrap();
    assert_eq!(four.edge_count(), 4);
    assert_eq!(eight.edge_count(), 6);
    assert!(eight.has_edge(0, 3) && eight.has_edge(1, 2));
}

#[test]
fn similarity_weights_are_one_for_identical_regions() {
    let (img, labels) = columns(&[[50, 50, 50], [50, 50, 50]]);
    let g = rag_mean_color(&img, &labels, Connectivity::Eight, WeightMode::Similarity { sigma: 255.0 }).unwrap();
    assert!((g.weight(0, 1).unwrap() - 1.0).abs() < 1e-12);
}

#[test]
fn similarity_sigma_must_be_positive_and_finite() {
    for sigma in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        assert!(WeightMode::similarity(sigma).is_err(), "sigma {} accepted", sigma);
    }
    assert_eq!(WeightMode::similarity(255.0).unwrap(), WeightMode::Similarity { sigma: 255.0 });

    // identical neighbors would get a NaN weight and stall the merge queue
    let (img, labels) = columns(&[[40, 40, 40], [40, 40, 40], [90, 0, 0]]);
    let built = rag_mean_color(&img, &labels, Connectivity::Eight, WeightMode::Similarity { sigma: 0.0 });
    assert!(built.is_err());
}

#[test]
fn mismatched_dimensions_are_rejected() {
    let img: RgbImage = ImageBuffer::new(3, 3);
    let labels: Labels = ImageBuffer::new(2, 3);
    assert!(rag_mean_color(&img, &labels, Connectivity::Eight, WeightMode::Distance).is_err());
}

#[test]
fn merges_similar_regions_and_keeps_distinct_ones() {
    let (img, labels) = columns(&[[10, 10, 10], [20, 10, 10], [200, 200, 200]]);
    let mut g = rag_mean_color(&img, &labels, Connectivity::Eight, WeightMode::Distance).unwrap();
    let merged = merge_hierarchical(&labels, &mut g, 35.0, true, &MeanColor::default());

    assert_eq!(g.node_count(), 2);
    assert_eq!(column_labels(&merged), vec![0, 0, 1]);
    let region = g.node(1).expect("in-place merge keeps the second id");
    assert_eq!(region.pixel_count, 8);
    assert_eq!(region.labels, vec![0, 1]);
    assert!((region.mean_color.x - 15.0).abs() < 1e-9);
    assert!((region.mean_color.y - 10.0).abs() < 1e-9);
}

#[test]
fn weights_are_recomputed_after_each_merge() {
    // 0-1 and 1-2 both weigh 30; after 0 joins 1 the new mean is 15 away
    // from 0 and 45 away from region 2, so the chain stops there.
    let (img, labels) = columns(&[[0, 0, 0], [30, 0, 0], [60, 0, 0]]);
    let mut g = rag_mean_color(&img, &labels, Connectivity::Eight, WeightMode::Distance).unwrap();
    let merged = merge_hierarchical(&labels, &mut g, 35.0, true, &MeanColor::default());

    assert_eq!(g.node_count(), 2);
    assert_eq!(column_labels(&merged), vec![0, 0, 1]);
    assert!((g.weight(1, 2).unwrap() - 45.0).abs() < 1e-9);
    for (_, _, w) in g.edges() { assert!(w >= 35.0); }
}

#[test]
fn non_positive_threshold_changes_nothing() {
    let (img, labels) = columns(&[[0, 0, 0], [0, 0, 0], [9, 9, 9]]);
    let mut g = rag_mean_color(&img, &labels, Connectivity::Eight, WeightMode::Distance).unwrap();
    let merged = merge_hierarchical(&labels, &mut g, 0.0, true, &MeanColor::default());
    assert_eq!(g.node_count(), 3);
    assert_eq!(merged, labels);
}

#[test]
fn copy_merge_moves_regions_to_fresh_ids() {
    let (img, labels) = columns(&[[10, 10, 10], [20, 10, 10], [200, 200, 200]]);
    let mut g = rag_mean_color(&img, &labels, Connectivity::Eight, WeightMode::Distance).unwrap();
    let merged = merge_hierarchical(&labels, &mut g, 35.0, false, &MeanColor::default());

    let ids: Vec<u32> = g.node_ids().collect();
    assert_eq!(ids, vec![2, 3]);
    assert_eq!(g.node(3).unwrap().labels, vec![0, 1]);
    assert_eq!(column_labels(&merged), vec![1, 1, 0]);
}

#[test]
fn pixel_counts_are_conserved() {
    let colors: Vec<[u8; 3]> = (0..8).map(|i| [(i * 12) as u8, 0, (i * 3) as u8]).collect();
    let (img, labels) = columns(&colors);
    let mut g = rag_mean_color(&img, &labels, Connectivity::Eight, WeightMode::Distance).unwrap();
    merge_hierarchical(&labels, &mut g, 40.0, true, &MeanColor::default());
    let total: u64 = g.node_ids().map(|id| g.node(id).unwrap().pixel_count).sum();
    assert_eq!(total, (img.width() * img.height()) as u64);
}

#[test]
fn merge_nodes_out_of_place_concatenates_labels() {
    let (img, labels) = columns(&[[0, 0, 0], [1, 1, 1], [2, 2, 2]]);
    let mut g = rag_mean_color(&img, &labels, Connectivity::Eight, WeightMode::Distance).unwrap();
    let new = g.merge_nodes(1, 0, &MeanColor::default(), false);
    assert_eq!(new, 3);
    assert!(!g.contains(0) && !g.contains(1));
    assert_eq!(g.node(3).unwrap().labels, vec![1, 0]);
    assert!(g.has_edge(3, 2));
    assert_eq!(g.next_id(), 4);
}
