use anyhow::{Context, Result};
use image::{io::Reader as ImageReader, RgbImage};
use std::collections::HashSet;
use std::path::Path;

use crate::color::rgb2hex;

/// Distinct colors of `img` as `#rrggbb`, in first-seen order scanning
/// column by column.
pub fn distinct_hex_colors(img: &RgbImage) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for x in 0..img.width() {
        for y in 0..img.height() {
            let [r, g, b] = img.get_pixel(x, y).0;
            if seen.insert([r, g, b]) { out.push(rgb2hex(r, g, b)); }
        }
    }
    out
}

/// Renders colors as `['#rrggbb', ...]`, the form the colors are printed in.
pub fn format_hex_list(colors: &[String]) -> String {
    let quoted: Vec<String> = colors.iter().map(|c| format!("'{}'", c)).collect();
    format!("[{}]", quoted.join(", "))
}

pub fn distinct_hex_colors_file(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let img = ImageReader::open(path)
        .with_context(|| format!("opening {}", path.display()))?
        .decode()
        .with_context(|| format!("decoding {}", path.display()))?;
    Ok(distinct_hex_colors(&img.to_rgb8()))
}
