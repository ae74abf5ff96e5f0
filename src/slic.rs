//! SLIC superpixels: k-means over (Lab, x, y) restricted to a window around
//! each center, followed by an optional connectivity pass.

use anyhow::{anyhow, bail, Result};
use image::{imageops, RgbImage};
use log::{debug, info};
use parking_lot::Mutex;
use std::thread;

use crate::color::{to_lab_image, Vec3};
use crate::labels::{relabel_sequential, Labels};

#[derive(Debug, Clone)]
pub struct SlicConfig {
    /// Approximate number of superpixels.
    pub n_segments: usize,
    /// Weight of color proximity against space proximity. Higher values give
    /// more square superpixels.
    pub compactness: f64,
    pub max_iter: usize,
    /// Gaussian pre-smoothing width, 0 disables it.
    pub sigma: f32,
    pub enforce_connectivity: bool,
    pub min_size_factor: f64,
    pub max_size_factor: f64,
    pub num_threads: usize,
}

impl Default for SlicConfig {
    fn default() -> Self {
        Self {
            n_segments: 400,
            compactness: 30.0,
            max_iter: 10,
            sigma: 0.0,
            enforce_connectivity: true,
            min_size_factor: 0.5,
            max_size_factor: 3.0,
            num_threads: num_cpus::get().max(1),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Center { x: f64, y: f64, color: Vec3 }

#[derive(Default, Clone, Copy)]
struct Accum { count: usize, sum_x: f64, sum_y: f64, sum_l: f64, sum_a: f64, sum_b: f64 }

impl Accum {
    fn add_pixel(&mut self, x: usize, y: usize, p: Vec3) {
        self.count += 1;
        self.sum_x += x as f64; self.sum_y += y as f64;
        self.sum_l += p.x; self.sum_a += p.y; self.sum_b += p.z;
    }
}

/// Hands out bands of rows to the assignment workers.
struct Bands { n: Mutex<usize>, rows: usize, height: usize }

impl Bands {
    fn new(height: usize, num_threads: usize) -> Self {
        // a few bands per thread so uneven windows balance out
        let rows = (height + num_threads * 4 - 1) / (num_threads * 4);
        Self { n: Mutex::new(0), rows: rows.max(1), height }
    }
    fn next(&self) -> Option<(usize, usize)> {
        let mut guard = self.n.lock();
        let y0 = *guard * self.rows;
        if y0 >= self.height { return None; }
        *guard += 1;
        Some((y0, (y0 + self.rows).min(self.height)))
    }
}

struct Grid<'a> {
    lab: &'a [Vec3],
    width: usize,
    height: usize,
    step: usize,
    inv_m2: f64,
    inv_s2: f64,
}

impl Grid<'_> {
    fn assign_band(&self, centers: &[Center], prev: &[u32], y0: usize, y1: usize) -> Vec<u32> {
        let w = self.width;
        let mut labels = prev[y0 * w..y1 * w].to_vec();
        let mut dist = vec![f64::INFINITY; labels.len()];
        let reach = 2.0 * self.step as f64;
        for (k, c) in centers.iter().enumerate() {
            let ymin = ((c.y - reach).ceil().max(0.0) as usize).max(y0);
            let ymax = ((c.y + reach).floor() as usize + 1).min(y1);
            if ymin >= ymax { continue; }
            let xmin = (c.x - reach).ceil().max(0.0) as usize;
            let xmax = ((c.x + reach).floor() as usize + 1).min(w);
            for y in ymin..ymax {
                let dy = y as f64 - c.y;
                for x in xmin..xmax {
                    let dx = x as f64 - c.x;
                    let dc = self.lab[y * w + x].sub(c.color);
                    let d = dc.dot(dc) * self.inv_m2 + (dx * dx + dy * dy) * self.inv_s2;
                    let i = (y - y0) * w + x;
                    if d < dist[i] { dist[i] = d; labels[i] = k as u32; }
                }
            }
        }
        labels
    }

    /// Labels every pixel, bands of rows in parallel, then accumulates the
    /// per-center sums in scan order so the result does not depend on the
    /// thread count.
    fn assign(&self, centers: &[Center], prev: &[u32], num_threads: usize) -> Result<(Vec<u32>, Vec<Accum>)> {
        let bands = Bands::new(self.height, num_threads);
        let per_thread = thread::scope(|s| {
            let handles: Vec<_> = (0..num_threads)
                .map(|_| {
                    let bands = &bands;
                    s.spawn(move || {
                        let mut done = Vec::new();
                        while let Some((y0, y1)) = bands.next() {
                            done.push((y0, self.assign_band(centers, prev, y0, y1)));
                        }
                        done
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().map_err(|_| anyhow!("slic worker panicked")))
                .collect::<Result<Vec<_>>>()
        })?;

        let mut labels = vec![0u32; prev.len()];
        for (y0, band) in per_thread.into_iter().flatten() {
            let start = y0 * self.width;
            labels[start..start + band.len()].copy_from_slice(&band);
        }
        let mut accum = vec![Accum::default(); centers.len()];
        for (i, &k) in labels.iter().enumerate() {
            accum[k as usize].add_pixel(i % self.width, i / self.width, self.lab[i]);
        }
        Ok((labels, accum))
    }
}

fn init_centers(lab: &[Vec3], width: usize, height: usize, step: usize) -> Vec<Center> {
    let ox = (step / 2).min(width - 1);
    let oy = (step / 2).min(height - 1);
    let mut centers = Vec::new();
    for y in (oy..height).step_by(step) {
        for x in (ox..width).step_by(step) {
            centers.push(Center { x: x as f64, y: y as f64, color: lab[y * width + x] });
        }
    }
    centers
}

fn update_centers(centers: &mut [Center], accum: &[Accum]) {
    for (c, a) in centers.iter_mut().zip(accum) {
        if a.count == 0 { continue; }
        let n = a.count as f64;
        c.x = a.sum_x / n;
        c.y = a.sum_y / n;
        c.color = Vec3::new(a.sum_l / n, a.sum_a / n, a.sum_b / n);
    }
}

fn neighbors4(p: usize, w: usize, h: usize) -> impl Iterator<Item = usize> {
    let (x, y) = (p % w, p / w);
    [
        (x > 0).then(|| p - 1),
        (x + 1 < w).then(|| p + 1),
        (y > 0).then(|| p - w),
        (y + 1 < h).then(|| p + w),
    ]
    .into_iter()
    .flatten()
}

/// Relabels 4-connected components. Floods stop at `max_size` pixels; a
/// flood smaller than `min_size` takes the label of an already-visited
/// neighbor of its seed.
fn enforce_connectivity(labels: &[u32], width: usize, height: usize, min_size: usize, max_size: usize) -> Vec<u32> {
    const UNSET: u32 = u32::MAX;
    let mut out = vec![UNSET; labels.len()];
    let mut queue: Vec<usize> = Vec::new();
    let mut next_label = 0u32;
    for start in 0..labels.len() {
        if out[start] != UNSET { continue; }
        let label = labels[start];
        let mut adjacent = 0u32;
        for nb in neighbors4(start, width, height) {
            if out[nb] != UNSET { adjacent = out[nb]; }
        }

        queue.clear();
        queue.push(start);
        out[start] = next_label;
        let mut head = 0;
        while head < queue.len() && queue.len() < max_size {
            let p = queue[head];
            head += 1;
            for nb in neighbors4(p, width, height) {
                if out[nb] == UNSET && labels[nb] == label && queue.len() < max_size {
                    out[nb] = next_label;
                    queue.push(nb);
                }
            }
        }

        if queue.len() < min_size {
            for &p in &queue { out[p] = adjacent; }
        } else {
            next_label += 1;
        }
    }
    out
}

/// Segments `img` into superpixels. Labels are dense and start at 0.
pub fn slic(img: &RgbImage, config: &SlicConfig) -> Result<Labels> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 { bail!("cannot segment an empty image ({}x{})", w, h) }
    if config.n_segments == 0 { bail!("n_segments must be positive") }
    if !(config.compactness > 0.0) || !config.compactness.is_finite() {
        bail!("compactness must be a positive number, got {}", config.compactness)
    }
    if config.max_iter == 0 { bail!("max_iter must be at least 1") }
    if !(config.min_size_factor >= 0.0 && config.max_size_factor >= 0.0)
        || !config.min_size_factor.is_finite()
        || !config.max_size_factor.is_finite()
    {
        bail!("size factors must be finite and non-negative")
    }

    let blurred;
    let src = if config.sigma > 0.0 {
        blurred = imageops::blur(img, config.sigma);
        &blurred
    } else {
        img
    };
    let lab = to_lab_image(src);
    let (width, height) = (w as usize, h as usize);
    let step = ((width * height) as f64 / config.n_segments as f64).sqrt().round().max(1.0) as usize;
    let mut centers = init_centers(&lab, width, height, step);
    info!("SLIC: {}x{} image, step={}, centers={}", width, height, step, centers.len());

    let grid = Grid {
        lab: &lab,
        width,
        height,
        step,
        inv_m2: 1.0 / (config.compactness * config.compactness),
        inv_s2: 1.0 / (step * step) as f64,
    };
    let num_threads = config.num_threads.max(1);
    let mut labels = vec![0u32; width * height];
    for iter in 0..config.max_iter {
        let (next, accum) = grid.assign(&centers, &labels, num_threads)?;
        let changed = next.iter().zip(&labels).filter(|(a, b)| a != b).count();
        labels = next;
        update_centers(&mut centers, &accum);
        debug!("SLIC iter={} changed={}", iter + 1, changed);
        if changed == 0 { break; }
    }

    if config.enforce_connectivity {
        let segment_size = (width * height) as f64 / centers.len() as f64;
        let min_size = (config.min_size_factor * segment_size) as usize;
        let max_size = ((config.max_size_factor * segment_size) as usize).max(1);
        labels = enforce_connectivity(&labels, width, height, min_size, max_size);
    }

    let labels = Labels::from_raw(w, h, labels).ok_or_else(|| anyhow!("label buffer size mismatch"))?;
    Ok(relabel_sequential(&labels))
}
