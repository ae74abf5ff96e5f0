use anyhow::{bail, Result};
use image::{Rgb, RgbImage};
use std::collections::HashMap;

use crate::labels::Labels;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundaryMode {
    /// Pixels on both sides of a label change.
    Thick,
    /// Only the side that is not background.
    Inner,
    /// Background pixels next to an object, plus object pixels touching another object.
    #[default]
    Outer,
}

impl BoundaryMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "thick" => Some(Self::Thick),
            "inner" => Some(Self::Inner),
            "outer" => Some(Self::Outer),
            _ => None,
        }
    }
}

fn check_dims(img: &RgbImage, labels: &Labels) -> Result<()> {
    if img.dimensions() != labels.dimensions() {
        bail!("image is {:?} but labels are {:?}", img.dimensions(), labels.dimensions())
    }
    Ok(())
}

/// Paints every region with the mean color of its pixels in `img`. Pixels
/// labelled `bg.0` get the color `bg.1` instead.
pub fn label2rgb_avg(labels: &Labels, img: &RgbImage, bg: Option<(u32, [u8; 3])>) -> Result<RgbImage> {
    check_dims(img, labels)?;
    let mut sums: HashMap<u32, ([u64; 3], u64)> = HashMap::new();
    for (x, y, l) in labels.enumerate_pixels() {
        let p = img.get_pixel(x, y);
        let e = sums.entry(l[0]).or_insert(([0; 3], 0));
        for c in 0..3 { e.0[c] += p[c] as u64; }
        e.1 += 1;
    }
    // integer division truncates like a float mean cast to u8
    let means: HashMap<u32, Rgb<u8>> = sums
        .into_iter()
        .map(|(l, (s, n))| (l, Rgb([(s[0] / n) as u8, (s[1] / n) as u8, (s[2] / n) as u8])))
        .collect();

    Ok(RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let l = labels.get_pixel(x, y)[0];
        match bg {
            Some((bg_label, color)) if bg_label == l => Rgb(color),
            _ => means[&l],
        }
    }))
}

/// Row-major boundary mask.
pub fn find_boundaries(labels: &Labels, mode: BoundaryMode, background: u32) -> Vec<bool> {
    let (w, h) = labels.dimensions();
    let (w, h) = (w as i64, h as i64);
    let at = |x: i64, y: i64| labels.get_pixel(x as u32, y as u32)[0];
    let inside = |x: i64, y: i64| x >= 0 && y >= 0 && x < w && y < h;

    let mut mask = Vec::with_capacity((w * h) as usize);
    for y in 0..h {
        for x in 0..w {
            let l = at(x, y);
            let thick = [(-1, 0), (1, 0), (0, -1), (0, 1)]
                .iter()
                .any(|&(dx, dy)| inside(x + dx, y + dy) && at(x + dx, y + dy) != l);
            let b = match mode {
                BoundaryMode::Thick => thick,
                BoundaryMode::Inner => thick && l != background,
                BoundaryMode::Outer => {
                    thick && (l == background || {
                        // some 8-neighbor holds another object
                        let (mut max, mut min) = (0u32, u32::MAX);
                        for dy in -1..=1 {
                            for dx in -1..=1 {
                                if !inside(x + dx, y + dy) { continue; }
                                let n = at(x + dx, y + dy);
                                max = max.max(n);
                                min = min.min(if n == background { u32::MAX } else { n });
                            }
                        }
                        max != min
                    })
                }
            };
            mask.push(b);
        }
    }
    mask
}

/// Copies `img` and paints the region boundaries of `labels` with `color`.
pub fn mark_boundaries(img: &RgbImage, labels: &Labels, color: [u8; 3], mode: BoundaryMode, background: u32) -> Result<RgbImage> {
    check_dims(img, labels)?;
    let mask = find_boundaries(labels, mode, background);
    let mut out = img.clone();
    let w = img.width() as usize;
    for (i, &b) in mask.iter().enumerate() {
        if b { out.put_pixel((i % w) as u32, (i / w) as u32, Rgb(color)); }
    }
    Ok(out)
}
