use anyhow::{Context, Result};
use image::{io::Reader as ImageReader, DynamicImage, RgbImage};
use log::info;
use std::time::Instant;

pub mod color;
pub mod colors;
pub mod labels;
pub mod merge;
pub mod rag;
pub mod render;
pub mod slic;

pub use color::{parse_hex, rgb2hex, Vec3};
pub use colors::{distinct_hex_colors, distinct_hex_colors_file, format_hex_list};
pub use labels::Labels;
pub use merge::{merge_hierarchical, MeanColor, MergePolicy};
pub use rag::{rag_mean_color, Connectivity, NodeData, Rag, RegionAdjacencyGraph, WeightMode};
pub use render::{find_boundaries, label2rgb_avg, mark_boundaries, BoundaryMode};
pub use slic::{slic, SlicConfig};

#[derive(Debug, Clone)]
pub struct Config {
    pub slic: SlicConfig,
    pub connectivity: Connectivity,
    pub weight_mode: WeightMode,
    /// Adjacent regions closer than this are merged.
    pub thresh: f64,
    pub in_place_merge: bool,
    pub boundary_color: [u8; 3],
    pub boundary_mode: BoundaryMode,
    /// Label painted with a fixed color instead of its average, and treated
    /// as background when finding boundaries.
    pub bg_label: Option<(u32, [u8; 3])>,
}

pub fn default_config(fast: bool) -> Config {
    let mut slic = SlicConfig::default();
    if fast { slic.max_iter = 4; }
    Config {
        slic,
        connectivity: Connectivity::Eight,
        weight_mode: WeightMode::Distance,
        thresh: 35.0,
        in_place_merge: true,
        boundary_color: [0, 0, 0],
        boundary_mode: BoundaryMode::Outer,
        bg_label: None,
    }
}

#[derive(Debug, Clone)]
pub struct Params {
    pub in_image_name: String,
    pub out_image_name: String,
    pub config: Config,
}

/// Intermediate and final results of one run.
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub superpixels: Labels,
    pub merged: Labels,
    pub region_count: usize,
    pub rendered: RgbImage,
}

/// Core pipeline on an in-memory image: superpixels, mean-color RAG,
/// hierarchical merge, average-color rendering with boundaries.
pub fn process_dynamic(dyn_img: &DynamicImage, config: &Config) -> Result<Segmentation> {
    let img = dyn_img.to_rgb8();
    info!("Segmenting {}x{} image, n_segments={}, compactness={}", img.width(), img.height(), config.slic.n_segments, config.slic.compactness);

    let start = Instant::now();
    let superpixels = slic(&img, &config.slic)?;
    info!("slic_time_ms={}", start.elapsed().as_millis());

    let start = Instant::now();
    let mut graph = rag_mean_color(&img, &superpixels, config.connectivity, config.weight_mode)?;
    let policy = MeanColor::new(config.weight_mode);
    let merged = merge_hierarchical(&superpixels, &mut graph, config.thresh, config.in_place_merge, &policy);
    info!("merge_time_ms={}", start.elapsed().as_millis());

    let background = config.bg_label.map_or(0, |(l, _)| l);
    let avg = label2rgb_avg(&merged, &img, config.bg_label)?;
    let rendered = mark_boundaries(&avg, &merged, config.boundary_color, config.boundary_mode, background)?;

    Ok(Segmentation { superpixels, merged, region_count: graph.node_count(), rendered })
}

/// Reads the input, runs the pipeline, writes the output and returns the
/// distinct colors of the written file. Lossy formats such as JPEG add
/// colors that are not in the rendered image.
pub fn process(params: Params) -> Result<Vec<String>> {
    let Params { in_image_name, out_image_name, config } = params;
    info!("Input image: {}", in_image_name);
    info!("Output image: {}", out_image_name);

    let dyn_img = ImageReader::open(&in_image_name)
        .with_context(|| format!("opening {}", in_image_name))?
        .decode()
        .with_context(|| format!("decoding {}", in_image_name))?;
    let seg = process_dynamic(&dyn_img, &config)?;
    info!("{} regions after merging", seg.region_count);

    seg.rendered.save(&out_image_name).with_context(|| format!("writing {}", out_image_name))?;
    info!("Final output saved");

    distinct_hex_colors_file(&out_image_name)
}
