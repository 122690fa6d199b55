//! Two-dimensional histograms, drawn as a grid of cells colored by their count.

use glam::DVec2;
use tracing::trace;

use crate::color::{Color, ColorMap};
use crate::config::{PlotConfig, Viewport};

/// One grid cell ready to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub min: DVec2,
    pub size: DVec2,
    pub count: usize,
    pub color: Color,
}

#[derive(Debug, Clone)]
pub struct HistogramGrid {
    no_bins_x: usize,
    no_bins_y: usize,
    /// Counts, indexed `x * no_bins_y + y`.
    bins: Vec<usize>,
    data: Vec<DVec2>,
    data_min: DVec2,
    data_max: DVec2,
    fixed: Option<Viewport>,
    max_z: usize,
    rebin: bool,
    color_map: ColorMap,
}

impl HistogramGrid {
    /// A grid over a fixed domain.
    pub fn fixed(domain: Viewport, no_bins_x: usize, no_bins_y: usize) -> Self {
        Self {
            fixed: Some(domain),
            ..Self::adaptive(no_bins_x, no_bins_y)
        }
    }

    /// A grid whose domain follows the data.
    pub fn adaptive(no_bins_x: usize, no_bins_y: usize) -> Self {
        let no_bins_x = no_bins_x.max(1);
        let no_bins_y = no_bins_y.max(1);
        Self {
            no_bins_x,
            no_bins_y,
            bins: vec![0; no_bins_x * no_bins_y],
            data: Vec::new(),
            data_min: DVec2::ZERO,
            data_max: DVec2::ZERO,
            fixed: None,
            max_z: 1,
            rebin: false,
            color_map: ColorMap::default(),
        }
    }

    pub fn from_config(config: &PlotConfig, no_bins_x: usize, no_bins_y: usize) -> Self {
        if config.fixed_plot_area {
            Self::fixed(config.viewport(), no_bins_x, no_bins_y)
        } else {
            Self::adaptive(no_bins_x, no_bins_y)
        }
    }

    pub fn bins(&self) -> &[usize] {
        &self.bins
    }

    pub fn data(&self) -> &[DVec2] {
        &self.data
    }

    pub fn max_z(&self) -> usize {
        self.max_z
    }

    pub fn needs_rebin(&self) -> bool {
        self.rebin
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed.is_some()
    }

    pub fn color_map(&self) -> &ColorMap {
        &self.color_map
    }

    /// Binned region. An adaptive grid leaves a tenth of a bin around the data.
    pub fn domain(&self) -> Viewport {
        if let Some(domain) = self.fixed {
            return domain;
        }
        if self.data.is_empty() {
            return Viewport::new(0.0, 1.0, 0.0, 1.0);
        }
        let (min_x, max_x) = axis_domain(self.data_min.x, self.data_max.x, self.no_bins_x);
        let (min_y, max_y) = axis_domain(self.data_min.y, self.data_max.y, self.no_bins_y);
        Viewport::new(min_x, max_x, min_y, max_y)
    }

    pub fn bin_size(&self) -> DVec2 {
        let domain = self.domain();
        DVec2::new(
            domain.width() / self.no_bins_x as f64,
            domain.height() / self.no_bins_y as f64,
        )
    }

    fn bin_index(&self, domain: &Viewport, size: DVec2, point: DVec2) -> Option<usize> {
        if point.x < domain.min_x
            || point.x >= domain.max_x
            || point.y < domain.min_y
            || point.y >= domain.max_y
        {
            return None;
        }
        let x = (((point.x - domain.min_x) / size.x) as usize).min(self.no_bins_x - 1);
        let y = (((point.y - domain.min_y) / size.y) as usize).min(self.no_bins_y - 1);
        Some(x * self.no_bins_y + y)
    }

    /// Record an observation. Non-finite points are ignored.
    pub fn add(&mut self, x: f64, y: f64) -> bool {
        let point = DVec2::new(x, y);
        if !point.is_finite() {
            trace!(x, y, "ignoring non-finite histogram point");
            return false;
        }
        self.data.push(point);
        if self.data.len() == 1 {
            self.data_min = point;
            self.data_max = point;
            self.rebin = true;
        } else if point.cmplt(self.data_min).any() || point.cmpgt(self.data_max).any() {
            self.data_min = self.data_min.min(point);
            self.data_max = self.data_max.max(point);
            self.rebin = true;
        }
        if self.fixed.is_some() {
            self.rebin = false;
        }

        if !self.rebin {
            let domain = self.domain();
            if let Some(index) = self.bin_index(&domain, self.bin_size(), point) {
                self.bins[index] += 1;
                self.max_z = self.max_z.max(self.bins[index]);
            }
        }
        true
    }

    /// Recount every cell from the retained observations.
    pub fn rebin_data(&mut self) {
        let domain = self.domain();
        let size = self.bin_size();
        let mut bins = vec![0; self.no_bins_x * self.no_bins_y];
        for &point in &self.data {
            if let Some(index) = self.bin_index(&domain, size, point) {
                bins[index] += 1;
            }
        }
        self.max_z = bins.iter().copied().max().unwrap_or(0).max(1);
        self.bins = bins;
        self.rebin = false;
    }

    pub fn prepare(&mut self) {
        if self.rebin {
            self.rebin_data();
        }
    }

    /// Every cell with its color. Call [`HistogramGrid::prepare`] first.
    pub fn cells(&self) -> Vec<Cell> {
        let domain = self.domain();
        let size = self.bin_size();
        self.bins
            .iter()
            .enumerate()
            .map(|(index, &count)| {
                let (x, y) = (index / self.no_bins_y, index % self.no_bins_y);
                Cell {
                    min: DVec2::new(
                        domain.min_x + x as f64 * size.x,
                        domain.min_y + y as f64 * size.y,
                    ),
                    size,
                    count,
                    color: self.color_map.color(count as f64 / self.max_z as f64),
                }
            })
            .collect()
    }

    /// Refit the color scaling to the occupied cells. Empty cells are left
    /// out, they would dominate the fit.
    pub fn calculate_height_scaling(&mut self) {
        self.prepare();
        let max_z = self.max_z as f64;
        let fractions: Vec<f64> = self
            .bins
            .iter()
            .filter(|&&count| count > 0)
            .map(|&count| count as f64 / max_z)
            .collect();
        self.color_map.fit(fractions);
    }
}

/// Domain along one axis with a tenth of a bin beyond each data extreme.
fn axis_domain(min: f64, max: f64, no_bins: usize) -> (f64, f64) {
    if min < max {
        let width = (max - min) / (no_bins as f64 - 0.2);
        (min - 0.1 * width, max + 0.1 * width)
    } else {
        (min - 0.5, min + 0.5)
    }
}
