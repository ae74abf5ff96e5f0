use image::{ImageBuffer, Luma};
use std::collections::{BTreeSet, HashMap};

/// One region label per pixel.
pub type Labels = ImageBuffer<Luma<u32>, Vec<u32>>;

pub fn max_label(labels: &Labels) -> u32 {
    labels.as_raw().iter().copied().max().unwrap_or(0)
}

pub fn distinct_labels(labels: &Labels) -> BTreeSet<u32> {
    labels.as_raw().iter().copied().collect()
}

/// Maps the distinct labels, in ascending order, onto `0..n`.
pub fn relabel_sequential(labels: &Labels) -> Labels {
    let map: HashMap<u32, u32> = distinct_labels(labels)
        .into_iter()
        .enumerate()
        .map(|(i, l)| (l, i as u32))
        .collect();
    Labels::from_fn(labels.width(), labels.height(), |x, y| Luma([map[&labels.get_pixel(x, y)[0]]]))
}
