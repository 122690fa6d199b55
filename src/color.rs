//! Colors and the proportion-to-color mapping used by height maps and 2-D histograms.

use statrs::function::beta::checked_beta_reg;
use tracing::debug;

/// A color in straight (non-premultiplied) RGBA, each channel in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);
    pub const YELLOW: Color = Color::rgb(1.0, 1.0, 0.0);
    pub const CYAN: Color = Color::rgb(0.0, 1.0, 1.0);
    pub const PURPLE: Color = Color::rgb(0.5, 0.0, 0.5);
    pub const ORANGE: Color = Color::rgb(1.0, 0.65, 0.0);
    pub const GREY: Color = Color::rgb(0.5, 0.5, 0.5);
    pub const BROWN: Color = Color::rgb(0.65, 0.16, 0.16);
    pub const DARK_BLUE: Color = Color::rgb(0.0, 0.0, 0.55);
    pub const INDIGO: Color = Color::rgb(0.29, 0.0, 0.51);
    pub const CADET_BLUE: Color = Color::rgb(0.37, 0.62, 0.63);
    pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// The palette [`Color::by_id`] cycles through.
    pub fn palette() -> &'static [Color] {
        const PALETTE: [Color; 10] = [
            Color::BLACK,
            Color::RED,
            Color::GREEN,
            Color::BLUE,
            Color::ORANGE,
            Color::PURPLE,
            Color::BROWN,
            Color::CADET_BLUE,
            Color::INDIGO,
            Color::GREY,
        ];
        &PALETTE
    }

    /// A distinct color for a line or series id. Ids wrap around the palette.
    pub fn by_id(id: usize) -> Color {
        let palette = Self::palette();
        palette[id % palette.len()]
    }

    pub fn with_alpha(self, a: f64) -> Self {
        Self { a, ..self }
    }

    /// Linear interpolation between two colors, `t` clamped to `[0, 1]`.
    pub fn lerp(self, other: Color, t: f64) -> Color {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        Color {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [channel(self.r), channel(self.g), channel(self.b), channel(self.a)]
    }

    pub fn from_rgba8([r, g, b, a]: [u8; 4]) -> Self {
        Color::new(
            f64::from(r) / 255.0,
            f64::from(g) / 255.0,
            f64::from(b) / 255.0,
            f64::from(a) / 255.0,
        )
    }
}

impl Default for Color {
    /// Fully transparent white.
    fn default() -> Self {
        Color::new(1.0, 1.0, 1.0, 0.0)
    }
}

/// Gradient stops of the color map, from the lowest to the highest proportion.
const GRADIENT: [Color; 6] = [
    Color::DARK_BLUE,
    Color::BLUE,
    Color::CYAN,
    Color::GREEN,
    Color::YELLOW,
    Color::RED,
];

/// Maps a proportion in `[0, 1]` onto a color gradient.
///
/// When `scaling` is enabled the proportion is first passed through the
/// cumulative distribution of a Beta(`alpha`, `beta`) distribution, which
/// spreads the densest part of the value range over more of the gradient.
/// The parameters are fitted with [`ColorMap::calculate_height_scaling`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMap {
    pub alpha: f64,
    pub beta: f64,
    pub scaling: bool,
}

impl Default for ColorMap {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
            scaling: false,
        }
    }
}

impl ColorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Color for `proportion`. Values outside `[0, 1]` are clamped.
    pub fn color(&self, proportion: f64) -> Color {
        let p = self.scale(proportion);
        let segments = (GRADIENT.len() - 1) as f64;
        let position = p * segments;
        let index = (position.floor() as usize).min(GRADIENT.len() - 2);
        GRADIENT[index].lerp(GRADIENT[index + 1], position - index as f64)
    }

    /// The scaled proportion in `[0, 1]`.
    pub fn scale(&self, proportion: f64) -> f64 {
        let p = if proportion.is_nan() {
            0.0
        } else {
            proportion.clamp(0.0, 1.0)
        };
        if self.scaling {
            checked_beta_reg(self.alpha, self.beta, p).unwrap_or(p)
        } else {
            p
        }
    }

    /// Fit `alpha`/`beta` by the method of moments from the mean and variance
    /// of proportions in `[0, 1]`.
    ///
    /// A fit that would produce non-positive or non-finite parameters falls
    /// back to the identity mapping (`alpha = beta = 1`, scaling off).
    pub fn calculate_height_scaling(&mut self, mean: f64, var: f64) {
        let common = mean * (1.0 - mean) / var - 1.0;
        let alpha = mean * common;
        let beta = (1.0 - mean) * common;
        if var > 0.0 && alpha.is_finite() && beta.is_finite() && alpha > 0.0 && beta > 0.0 {
            debug!(mean, var, alpha, beta, "fitted color scaling");
            self.alpha = alpha;
            self.beta = beta;
            self.scaling = true;
        } else {
            debug!(mean, var, "color scaling fit rejected, using identity mapping");
            *self = ColorMap::default();
        }
    }

    /// Fit the scaling to a sample of proportions. Values outside `[0, 1]` are ignored.
    pub fn fit(&mut self, proportions: impl IntoIterator<Item = f64>) {
        let (count, sum, sum_squares) = proportions
            .into_iter()
            .filter(|p| (0.0..=1.0).contains(p))
            .fold((0usize, 0.0, 0.0), |(n, s, ss), p| (n + 1, s + p, ss + p * p));
        if count == 0 {
            return;
        }
        let mean = sum / count as f64;
        let var = sum_squares / count as f64 - mean * mean;
        self.calculate_height_scaling(mean, var);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn by_id_wraps_palette() {
        let n = Color::palette().len();
        assert_eq!(Color::by_id(0), Color::BLACK);
        assert_eq!(Color::by_id(1), Color::by_id(n + 1));
        assert_ne!(Color::by_id(1), Color::by_id(2));
    }

    #[test]
    fn rgba8_conversion_rounds_and_clamps() {
        assert_eq!(Color::WHITE.to_rgba8(), [255, 255, 255, 255]);
        assert_eq!(Color::new(2.0, -1.0, 0.5, 0.0).to_rgba8(), [255, 0, 128, 0]);
        assert_eq!(Color::from_rgba8([255, 0, 0, 255]), Color::RED);
    }

    #[test]
    fn scaled_map_follows_beta_cdf() {
        let map = |alpha, beta| ColorMap {
            alpha,
            beta,
            scaling: true,
        };
        for x in [0.1, 0.25, 0.5, 0.9] {
            assert!(approx(map(1.0, 1.0).scale(x), x));
            assert!(approx(map(2.0, 1.0).scale(x), x * x));
        }
        assert!(approx(map(3.0, 3.0).scale(0.5), 0.5));
        assert!(approx(map(2.0, 5.0).scale(-1.0), 0.0));
        assert!(approx(map(2.0, 5.0).scale(2.0), 1.0));
    }

    #[test]
    fn invalid_parameters_leave_proportion_unscaled() {
        let map = ColorMap {
            alpha: -1.0,
            beta: 2.0,
            scaling: true,
        };
        assert_eq!(map.scale(0.3), 0.3);
    }

    #[test]
    fn unscaled_map_hits_gradient_ends() {
        let map = ColorMap::new();
        assert_eq!(map.color(0.0), Color::DARK_BLUE);
        assert_eq!(map.color(1.0), Color::RED);
        assert_eq!(map.color(-3.0), Color::DARK_BLUE);
        assert_eq!(map.color(f64::NAN), Color::DARK_BLUE);
    }

    #[test]
    fn height_scaling_fits_beta_parameters() {
        let mut map = ColorMap::new();
        // Beta(2, 2) has mean 1/2 and variance 1/20.
        map.calculate_height_scaling(0.5, 0.05);
        assert!(map.scaling);
        assert!(approx(map.alpha, 2.0));
        assert!(approx(map.beta, 2.0));
        assert!(approx(map.scale(0.5), 0.5));
        assert!(map.scale(0.25) < 0.25);
    }

    #[test]
    fn height_scaling_falls_back_on_invalid_fit() {
        let mut map = ColorMap::new();
        map.calculate_height_scaling(0.5, 0.05);
        // Variance above m(1-m) would give negative parameters.
        map.calculate_height_scaling(0.5, 0.5);
        assert_eq!(map, ColorMap::default());

        map.calculate_height_scaling(0.3, 0.0);
        assert_eq!(map, ColorMap::default());

        map.calculate_height_scaling(f64::NAN, 0.1);
        assert!(!map.scaling);
    }

    #[test]
    fn fit_ignores_out_of_range_samples() {
        let mut map = ColorMap::new();
        map.fit([0.2, 0.4, 0.6, 0.8, 1.5, -2.0, f64::NAN]);
        // Mean 0.5 and variance 0.05 of the four valid samples.
        assert!(map.scaling);
        assert!((map.alpha - 2.0).abs() < 1e-9);
        assert!((map.beta - 2.0).abs() < 1e-9);

        let before = map;
        map.fit(std::iter::empty());
        assert_eq!(map, before);
    }
}
