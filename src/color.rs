use anyhow::{bail, Result};
use image::{Rgb, RgbImage};
use palette::{FromColor, Lab, LinSrgb, Srgb};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self { Self { x, y, z } }
    pub fn add(self, o: Self) -> Self { Self { x: self.x + o.x, y: self.y + o.y, z: self.z + o.z } }
    pub fn sub(self, o: Self) -> Self { Self { x: self.x - o.x, y: self.y - o.y, z: self.z - o.z } }
    pub fn scale(self, s: f64) -> Self { Self { x: self.x * s, y: self.y * s, z: self.z * s } }
    pub fn dot(self, o: Self) -> f64 { self.x * o.x + self.y * o.y + self.z * o.z }
    pub fn norm(self) -> f64 { self.dot(self).sqrt() }
}

/// Euclidean distance between two colors.
pub fn color_diff(c1: Vec3, c2: Vec3) -> f64 { c1.sub(c2).norm() }

/// Raw channel values, still on the 0..=255 scale.
pub fn rgb_to_vec3(p: &Rgb<u8>) -> Vec3 {
    Vec3::new(p[0] as f64, p[1] as f64, p[2] as f64)
}

#[inline]
pub fn rgb_to_lab(p: &Rgb<u8>) -> Vec3 {
    let srgb: Srgb<f32> = Srgb::new(p[0] as f32 / 255.0, p[1] as f32 / 255.0, p[2] as f32 / 255.0);
    let lin: LinSrgb<f32> = srgb.into_linear();
    let lab: Lab = Lab::from_color(lin);
    Vec3::new(lab.l as f64, lab.a as f64, lab.b as f64)
}

/// Row-major Lab buffer, index `y * width + x`.
pub fn to_lab_image(rgb: &RgbImage) -> Vec<Vec3> {
    rgb.pixels().map(rgb_to_lab).collect()
}

pub fn rgb2hex(r: u8, g: u8, b: u8) -> String {
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

/// Parses `#rrggbb` or `rrggbb`.
pub fn parse_hex(s: &str) -> Result<[u8; 3]> {
    let digits = s.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("invalid hex color: {:?}", s);
    }
    let mut out = [0u8; 3];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16)?;
    }
    Ok(out)
}
