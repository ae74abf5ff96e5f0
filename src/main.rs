// CLI entry for rag_merge
use anyhow::{bail, Result};
use clap::{ArgAction, Parser, ValueHint};
use rag_merge::{
    default_config, format_hex_list, parse_hex, process, BoundaryMode, Config, Connectivity, Params, WeightMode,
};

#[derive(Parser, Debug)]
#[command(name = "rag_merge", version, about = "Superpixel segmentation with RAG merging and palette extraction")]
struct Cli {
    /// Fast preset (fewer SLIC iterations)
    #[arg(short = 'f', long = "fast", action = ArgAction::SetTrue)]
    fast: bool,

    /// Approximate number of superpixels
    #[arg(long = "segments")]
    segments: Option<usize>,
    /// SLIC compactness
    #[arg(long = "compactness")]
    compactness: Option<f64>,
    /// SLIC iteration limit
    #[arg(long = "max-iter")]
    max_iter: Option<usize>,
    /// Gaussian pre-smoothing width
    #[arg(long = "sigma")]
    sigma: Option<f32>,
    /// Keep disconnected superpixel fragments
    #[arg(long = "no-connectivity", action = ArgAction::SetTrue)]
    no_connectivity: bool,

    /// Merge threshold on the mean color distance
    #[arg(long = "thresh")]
    thresh: Option<f64>,
    /// Region adjacency: 4 or 8
    #[arg(long = "rag-connectivity")]
    rag_connectivity: Option<u8>,
    /// Use exp(-d^2/sigma) similarity weights instead of distances
    #[arg(long = "similarity")]
    similarity: Option<f64>,
    /// Give merged regions fresh ids instead of reusing one
    #[arg(long = "copy-merge", action = ArgAction::SetTrue)]
    copy_merge: bool,

    /// Boundary color as #rrggbb
    #[arg(long = "boundary-color")]
    boundary_color: Option<String>,
    /// Boundary mode: thick, inner or outer
    #[arg(long = "boundary-mode")]
    boundary_mode: Option<String>,

    /// Number of threads
    #[arg(long = "threads")]
    threads: Option<usize>,

    /// Input image path
    #[arg(value_hint = ValueHint::FilePath, default_value = "sawah.jpg")]
    input: String,
    /// Output image path
    #[arg(value_hint = ValueHint::FilePath, default_value = "out.jpg")]
    output: String,
}

fn build_config(cli: &Cli) -> Result<Config> {
    let mut cfg = default_config(cli.fast);
    if let Some(v) = cli.segments { cfg.slic.n_segments = v; }
    if let Some(v) = cli.compactness { cfg.slic.compactness = v; }
    if let Some(v) = cli.max_iter { cfg.slic.max_iter = v; }
    if let Some(v) = cli.sigma { cfg.slic.sigma = v; }
    if cli.no_connectivity { cfg.slic.enforce_connectivity = false; }
    if let Some(v) = cli.threads { cfg.slic.num_threads = v.max(1); }
    if let Some(v) = cli.thresh { cfg.thresh = v; }
    match cli.rag_connectivity {
        None => {}
        Some(4) => cfg.connectivity = Connectivity::Four,
        Some(8) => cfg.connectivity = Connectivity::Eight,
        Some(v) => bail!("rag connectivity must be 4 or 8, got {}", v),
    }
    if let Some(sigma) = cli.similarity { cfg.weight_mode = WeightMode::similarity(sigma)?; }
    if cli.copy_merge { cfg.in_place_merge = false; }
    if let Some(v) = &cli.boundary_color { cfg.boundary_color = parse_hex(v)?; }
    if let Some(v) = &cli.boundary_mode {
        cfg.boundary_mode = match BoundaryMode::from_str(v) {
            Some(m) => m,
            None => bail!("unknown boundary mode: {}", v),
        };
    }
    Ok(cfg)
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let cfg = build_config(&cli)?;
    let params = Params { in_image_name: cli.input, out_image_name: cli.output, config: cfg };
    let colors = process(params)?;
    println!("{}", format_hex_list(&colors));
    Ok(())
}
