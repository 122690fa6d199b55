//! Incremental one-dimensional binning.
//!
//! Two regimes are supported. A fixed domain classifies every value straight
//! into its bin. An adaptive domain starts at the first observation and grows
//! to include later ones; growing only marks the bins dirty, and the full
//! recount from the retained data is deferred until the histogram is drawn.

use tracing::{debug, trace};

use crate::config::PlotConfig;

/// Smallest bin width of an adaptive histogram's initial domain.
pub const DEFAULT_MIN_BIN_SIZE: f64 = 0.05;

/// Headroom above the tallest bar.
const HEADROOM: f64 = 1.2;

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBins {
    no_bins: usize,
    min_x: f64,
    max_x: f64,
    bins: Vec<usize>,
    data: Vec<f64>,
    rebin: bool,
    frequency: bool,
    fixed: bool,
    min_bin_size: f64,
}

impl HistogramBins {
    /// Bins over the fixed domain `[min_x, max_x)`.
    pub fn fixed(min_x: f64, max_x: f64, no_bins: usize, frequency: bool) -> Self {
        let (min_x, max_x) = if min_x < max_x {
            (min_x, max_x)
        } else {
            (max_x - 1.0, max_x)
        };
        let no_bins = no_bins.max(1);
        Self {
            no_bins,
            min_x,
            max_x,
            bins: vec![0; no_bins],
            data: Vec::new(),
            rebin: false,
            frequency,
            fixed: true,
            min_bin_size: DEFAULT_MIN_BIN_SIZE,
        }
    }

    /// Bins whose domain follows the data.
    pub fn adaptive(no_bins: usize, frequency: bool) -> Self {
        let no_bins = no_bins.max(1);
        Self {
            fixed: false,
            ..Self::fixed(0.0, no_bins as f64 * DEFAULT_MIN_BIN_SIZE, no_bins, frequency)
        }
    }

    /// Fixed over the config's x range when its plot area is fixed, adaptive otherwise.
    pub fn from_config(config: &PlotConfig, no_bins: usize, frequency: bool) -> Self {
        if config.fixed_plot_area {
            Self::fixed(config.min_x, config.max_x, no_bins, frequency)
        } else {
            Self::adaptive(no_bins, frequency)
        }
    }

    /// Width of a bin in the domain an adaptive histogram starts from.
    pub fn with_min_bin_size(mut self, min_bin_size: f64) -> Self {
        if min_bin_size > 0.0 && min_bin_size.is_finite() {
            self.min_bin_size = min_bin_size;
            if !self.fixed && self.data.is_empty() {
                self.max_x = self.min_x + self.no_bins as f64 * min_bin_size;
            }
        }
        self
    }

    pub fn no_bins(&self) -> usize {
        self.no_bins
    }

    pub fn min_x(&self) -> f64 {
        self.min_x
    }

    pub fn max_x(&self) -> f64 {
        self.max_x
    }

    pub fn bin_width(&self) -> f64 {
        (self.max_x - self.min_x) / self.no_bins as f64
    }

    /// Bin counts. Stale while [`HistogramBins::needs_rebin`] is true.
    pub fn bins(&self) -> &[usize] {
        &self.bins
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn needs_rebin(&self) -> bool {
        self.rebin
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    pub fn frequency(&self) -> bool {
        self.frequency
    }

    /// Bin holding `value`, if it lies in the domain.
    pub fn bin_id(&self, value: f64) -> Option<usize> {
        if value >= self.min_x && value < self.max_x {
            let id = ((value - self.min_x) / self.bin_width()).floor() as usize;
            Some(id.min(self.no_bins - 1))
        } else {
            None
        }
    }

    /// Record an observation. Non-finite values are ignored.
    pub fn add(&mut self, value: f64) -> bool {
        if !value.is_finite() {
            trace!(value, "ignoring non-finite histogram value");
            return false;
        }
        self.data.push(value);

        if !self.fixed && self.data.len() == 1 {
            self.min_x = value;
            self.max_x = value + self.no_bins as f64 * self.min_bin_size;
            self.bins.fill(0);
            self.bins[0] = 1;
            self.rebin = false;
            return true;
        }

        match self.bin_id(value) {
            Some(_) if self.rebin => {}
            Some(id) => self.bins[id] += 1,
            None if self.fixed => {}
            None => self.extend(value),
        }
        true
    }

    /// Replace all observations.
    pub fn set_data(&mut self, data: impl IntoIterator<Item = f64>) {
        self.data.clear();
        self.bins.fill(0);
        self.rebin = false;
        for value in data {
            self.add(value);
        }
    }

    fn extend(&mut self, value: f64) {
        if value < self.min_x {
            self.min_x = value;
        } else {
            self.max_x = value + 0.5 * self.bin_width();
        }
        self.rebin = true;
        trace!(min_x = self.min_x, max_x = self.max_x, "histogram domain extended");
    }

    /// Recount every bin from the retained observations.
    pub fn rebin_data(&mut self) {
        self.bins = calculate_bins(self.min_x, self.max_x, self.no_bins, &self.data);
        self.rebin = false;
    }

    /// Rebin if the domain changed since the last count.
    pub fn prepare(&mut self) {
        if self.rebin {
            self.rebin_data();
        }
    }

    /// Bar heights: relative frequencies or raw counts.
    pub fn heights(&self) -> Vec<f64> {
        let total = self.data.len();
        self.bins
            .iter()
            .map(|&count| {
                if self.frequency && total > 0 {
                    count as f64 / total as f64
                } else {
                    count as f64
                }
            })
            .collect()
    }

    /// Data range to show: `(min_x, max_x, min_y, max_y)`.
    pub fn plot_range(&self) -> (f64, f64, f64, f64) {
        let max_y = if self.frequency {
            HEADROOM
        } else {
            let tallest = self.bins.iter().copied().max().unwrap_or(0).max(1);
            HEADROOM * tallest as f64
        };
        if self.fixed {
            (self.min_x, self.max_x, 0.0, max_y)
        } else {
            let half = 0.5 * self.bin_width();
            (self.min_x - half, self.max_x + half, 0.0, max_y)
        }
    }

    /// Shrink the domain to the fewest adjacent bins holding `proportion` of
    /// the binned observations, and fix it there.
    ///
    /// When a single bin suffices the domain is narrowed to that bin and the
    /// search repeats on the finer bins, so the result spans at least two bins
    /// unless the data cannot be separated any further.
    pub fn optimize_bounds(&mut self, proportion: f64) {
        const MAX_ROUNDS: usize = 64;
        if self.data.is_empty() || !(proportion > 0.0) {
            return;
        }
        let proportion = proportion.min(1.0);
        self.prepare();

        for _ in 0..MAX_ROUNDS {
            let Some((first, last)) = covering_bins(&self.bins, proportion) else {
                break;
            };
            let width = self.bin_width();
            let min_x = self.min_x + first as f64 * width;
            let max_x = self.min_x + (last + 1) as f64 * width;
            if !(min_x < max_x) {
                break;
            }
            self.min_x = min_x;
            self.max_x = max_x;
            self.rebin_data();
            if last > first {
                break;
            }
        }
        self.fixed = true;
        debug!(min_x = self.min_x, max_x = self.max_x, proportion, "optimized histogram bounds");
    }
}

/// Count `data` into `no_bins` bins over `[min_x, max_x)`.
pub fn calculate_bins(min_x: f64, max_x: f64, no_bins: usize, data: &[f64]) -> Vec<usize> {
    let mut bins = vec![0; no_bins];
    if no_bins == 0 {
        return bins;
    }
    let width = (max_x - min_x) / no_bins as f64;
    for &value in data {
        if value >= min_x && value < max_x {
            let id = ((value - min_x) / width).floor() as usize;
            bins[id.min(no_bins - 1)] += 1;
        }
    }
    bins
}

/// Shortest run of adjacent bins whose counts reach `proportion` of the total.
fn covering_bins(bins: &[usize], proportion: f64) -> Option<(usize, usize)> {
    let total: usize = bins.iter().sum();
    if total == 0 {
        return None;
    }
    let target = proportion * total as f64;
    let mut best: Option<(usize, usize)> = None;
    let mut start = 0;
    let mut sum = 0;
    for (end, &count) in bins.iter().enumerate() {
        sum += count;
        while start < end && (sum - bins[start]) as f64 >= target {
            sum -= bins[start];
            start += 1;
        }
        if sum as f64 >= target && best.is_none_or(|(s, e)| end - start < e - s) {
            best = Some((start, end));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_distr::{Distribution, Normal};

    #[test]
    fn fixed_domain_bins_directly() {
        let mut histogram = HistogramBins::fixed(0.0, 5.0, 20, true);
        assert_eq!(histogram.bin_width(), 0.25);
        histogram.add(1.1);
        assert_eq!(histogram.bins()[4], 1);
        assert_eq!(histogram.bins().iter().sum::<usize>(), 1);
        assert!(!histogram.needs_rebin());
    }

    #[test]
    fn fixed_domain_keeps_outliers_out_of_bins() {
        let mut histogram = HistogramBins::fixed(-5.0, 5.0, 20, false);
        assert_eq!(histogram.bin_width(), 0.5);
        for value in [-6.0, 5.0, 4.99, 0.0] {
            histogram.add(value);
        }
        assert_eq!(histogram.data().len(), 4);
        assert_eq!(histogram.bins().iter().sum::<usize>(), 2);
        assert_eq!(histogram.bins()[19], 1);
        assert_eq!(histogram.bins()[10], 1);
        assert!(!histogram.needs_rebin());
        assert_eq!(histogram.plot_range(), (-5.0, 5.0, 0.0, 1.2));
    }

    #[test]
    fn adaptive_defaults() {
        let histogram = HistogramBins::adaptive(20, true);
        assert_eq!(histogram.min_x(), 0.0);
        assert_eq!(histogram.max_x(), 1.0);
        assert!((histogram.bin_width() - 0.05).abs() < 1e-12);
        assert!(!histogram.needs_rebin());
    }

    #[test]
    fn adaptive_domain_bootstraps_and_extends() {
        let mut histogram = HistogramBins::adaptive(20, false);
        histogram.add(3.0);
        assert_eq!(histogram.min_x(), 3.0);
        assert!((histogram.max_x() - 4.0).abs() < 1e-12);
        assert_eq!(histogram.bins()[0], 1);

        histogram.add(3.5);
        assert_eq!(histogram.bins()[10], 1);
        assert!(!histogram.needs_rebin());

        histogram.add(10.0);
        assert!(histogram.needs_rebin());
        assert!((histogram.max_x() - 10.025).abs() < 1e-12);

        histogram.add(-1.0);
        assert_eq!(histogram.min_x(), -1.0);

        histogram.prepare();
        assert!(!histogram.needs_rebin());
        assert_eq!(histogram.bins().iter().sum::<usize>(), 4);
    }

    #[test]
    fn rebinning_is_idempotent_and_counts_everything() {
        let normal = Normal::new(2.0, 3.0).unwrap();
        let mut rng = rand::rng();
        let mut histogram = HistogramBins::adaptive(30, true);
        for _ in 0..2000 {
            histogram.add(normal.sample(&mut rng));
        }
        histogram.rebin_data();
        let first = histogram.bins().to_vec();
        histogram.rebin_data();
        assert_eq!(histogram.bins(), first.as_slice());
        assert_eq!(first.iter().sum::<usize>(), histogram.data().len());

        let heights = histogram.heights();
        assert!((heights.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn set_data_replaces_observations() {
        let mut histogram = HistogramBins::fixed(0.0, 1.0, 4, false);
        histogram.add(0.1);
        histogram.set_data([0.6, 0.7, f64::NAN, 2.0]);
        assert_eq!(histogram.data(), &[0.6, 0.7, 2.0]);
        assert_eq!(histogram.bins(), &[0, 0, 2, 0]);
    }

    #[test]
    fn optimize_bounds_trims_outliers() {
        let normal = Normal::new(0.0, 1.0).unwrap();
        let mut rng = rand::rng();
        let mut histogram = HistogramBins::adaptive(20, true);
        histogram.add(0.0);
        for _ in 0..1000 {
            histogram.add(normal.sample(&mut rng));
        }
        for _ in 0..5 {
            histogram.add(100.0);
        }
        histogram.optimize_bounds(0.9);

        assert!(histogram.is_fixed());
        assert!(histogram.min_x() <= 0.0 && histogram.max_x() > 0.0);
        assert!(histogram.max_x() - histogram.min_x() < 20.0);
        let binned: usize = histogram.bins().iter().sum();
        assert!(binned as f64 >= 0.9 * 1006.0 * 0.9);
        assert!(histogram.bins().iter().filter(|&&count| count > 0).count() >= 2);
    }

    #[test]
    fn covering_bins_prefers_shortest_run() {
        assert_eq!(covering_bins(&[1, 0, 5, 4, 0], 0.8), Some((2, 3)));
        assert_eq!(covering_bins(&[0, 10, 0], 0.9), Some((1, 1)));
        assert_eq!(covering_bins(&[0, 0], 0.5), None);
    }
}
