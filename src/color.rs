//! Color space conversion and color similarity used by the explanation test.
//!
//! Colors are converted once per verification call into a normalized triple
//! in the configured [`ColorSpace`]. Similarity is split into a luminance and
//! a chrominance difference so that illumination changes can be tolerated
//! separately from hue changes (`color_sigma_l` vs `color_sigma_ab`).
use crate::types::Rgb;
use serde::{Deserialize, Serialize};

/// Color space in which model and scene colors are compared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSpace {
    /// CIELAB normalized to `[-1, 1]` per channel.
    #[default]
    Lab,
    /// RGB normalized to `[0, 1]` per channel.
    Rgb,
    /// Single intensity channel in `[0, 1]`, stored in the first slot.
    Grayscale,
}

/// Luminance and chrominance difference between two converted colors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorDifference {
    pub luminance: f32,
    pub chroma: f32,
}

impl ColorSpace {
    pub fn convert(self, rgb: Rgb) -> [f32; 3] {
        match self {
            ColorSpace::Lab => rgb_to_lab_normalized(rgb),
            ColorSpace::Rgb => [
                rgb[0] as f32 / 255.0,
                rgb[1] as f32 / 255.0,
                rgb[2] as f32 / 255.0,
            ],
            ColorSpace::Grayscale => [grayscale(rgb), 0.0, 0.0],
        }
    }

    pub fn difference(self, a: &[f32; 3], b: &[f32; 3]) -> ColorDifference {
        match self {
            ColorSpace::Lab => ColorDifference {
                luminance: (a[0] - b[0]).abs(),
                chroma: ((a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt(),
            },
            ColorSpace::Rgb => {
                let d = [a[0] - b[0], a[1] - b[1], a[2] - b[2]];
                let mean = (d[0] + d[1] + d[2]) / 3.0;
                let chroma =
                    ((d[0] - mean).powi(2) + (d[1] - mean).powi(2) + (d[2] - mean).powi(2)).sqrt();
                ColorDifference {
                    luminance: mean.abs(),
                    chroma,
                }
            }
            ColorSpace::Grayscale => ColorDifference {
                luminance: (a[0] - b[0]).abs(),
                chroma: 0.0,
            },
        }
    }
}

/// Tolerances for the color gate and the color weight.
#[derive(Clone, Copy, Debug)]
pub struct ColorTolerance {
    pub sigma_l: f32,
    pub sigma_ab: f32,
}

impl ColorTolerance {
    /// Hard gate: both differences inside their sigma.
    pub fn accepts(&self, diff: &ColorDifference) -> bool {
        diff.luminance <= self.sigma_l && diff.chroma <= self.sigma_ab
    }

    /// Gaussian similarity in `(0, 1]`.
    pub fn weight(&self, diff: &ColorDifference) -> f32 {
        let sl = self.sigma_l.max(1e-6);
        let sab = self.sigma_ab.max(1e-6);
        let e = diff.luminance * diff.luminance / (2.0 * sl * sl)
            + diff.chroma * diff.chroma / (2.0 * sab * sab);
        (-e).exp()
    }
}

fn grayscale(rgb: Rgb) -> f32 {
    (0.299 * rgb[0] as f32 + 0.587 * rgb[1] as f32 + 0.114 * rgb[2] as f32) / 255.0
}

fn srgb_to_linear(c: u8) -> f32 {
    let v = c as f32 / 255.0;
    if v > 0.04045 {
        ((v + 0.055) / 1.055).powf(2.4)
    } else {
        v / 12.92
    }
}

fn lab_f(t: f32) -> f32 {
    if t > 0.008856 {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

/// sRGB (D65) to CIELAB with `L ∈ [0, 100]`, `a, b ≈ [-128, 127]`.
pub fn rgb_to_lab(rgb: Rgb) -> [f32; 3] {
    let r = srgb_to_linear(rgb[0]);
    let g = srgb_to_linear(rgb[1]);
    let b = srgb_to_linear(rgb[2]);

    let x = (0.412_456_4 * r + 0.357_576_1 * g + 0.180_437_5 * b) / 0.950_47;
    let y = 0.212_672_9 * r + 0.715_152_2 * g + 0.072_175 * b;
    let z = (0.019_333_9 * r + 0.119_192 * g + 0.950_304_1 * b) / 1.088_83;

    let fx = lab_f(x);
    let fy = lab_f(y);
    let fz = lab_f(z);
    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

/// CIELAB rescaled so every channel lies in `[-1, 1]`.
pub fn rgb_to_lab_normalized(rgb: Rgb) -> [f32; 3] {
    let [l, a, b] = rgb_to_lab(rgb);
    [(l - 50.0) / 50.0, a / 128.0, b / 128.0]
}

/// Convert a whole color array; runs on the rayon pool with `parallel`.
pub fn convert_all(space: ColorSpace, colors: &[Rgb]) -> Vec<[f32; 3]> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        colors.par_iter().map(|&c| space.convert(c)).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        colors.iter().map(|&c| space.convert(c)).collect()
    }
}
