/// A labelled position along an axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// The value at this tick in plot units
    pub value: f64,

    /// The step size between ticks
    pub step_size: f64,
}

impl Tick {
    /// Create a new tick.
    pub fn new(value: f64, step_size: f64) -> Self {
        Self { value, step_size }
    }

    /// Label text with as many decimals as the step size needs.
    pub fn label(&self) -> String {
        let log_step = self.step_size.log10();
        // Avoid printing "-0".
        let value = if self.value.abs() < self.step_size * 1e-9 {
            0.0
        } else {
            self.value
        };
        if log_step >= 0.0 {
            format!("{:.0}", value)
        } else {
            let decimal_places = (-log_step).ceil() as usize;
            format!("{:.*}", decimal_places, value)
        }
    }
}

/// Ticks covering `[min, max]`, about `target` of them, on "nice" values.
pub fn axis_ticks(min: f64, max: f64, target: u32) -> Vec<Tick> {
    let span = max - min;
    if !span.is_finite() || span <= 0.0 || target == 0 {
        return Vec::new();
    }

    let step = nice_step(span / f64::from(target));
    let first = (min / step).ceil() as i64;
    let last = (max / step).floor() as i64;

    // Multiply instead of accumulating so tick values stay on exact multiples.
    (first..=last)
        .map(|index| Tick::new(index as f64 * step, step))
        .collect()
}

/// Calculate a "nice" step size for the desired division.
/// Returns a value that is a multiple of 1, 2, 5, or 10 times a power of 10.
pub fn nice_step(raw: f64) -> f64 {
    const NICE_STEP_BASES: [f64; 4] = [1.0, 2.0, 5.0, 10.0];
    if !raw.is_finite() || raw <= 0.0 {
        return 1.0;
    }
    let exp = raw.log10().floor();
    let base = 10.0_f64.powf(exp);
    for &m in &NICE_STEP_BASES {
        if raw <= m * base {
            return m * base;
        }
    }
    base * 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nice_steps() {
        assert_eq!(nice_step(0.7), 1.0);
        assert_eq!(nice_step(1.5), 2.0);
        assert_eq!(nice_step(30.0), 50.0);
        assert_eq!(nice_step(-2.0), 1.0);
    }

    #[test]
    fn ticks_stay_within_range() {
        let ticks = axis_ticks(-5.0, 5.0, 10);
        assert_eq!(ticks.len(), 11);
        assert_eq!(ticks[0].value, -5.0);
        assert_eq!(ticks[10].value, 5.0);
        assert!(axis_ticks(1.0, 1.0, 10).is_empty());
        assert!(axis_ticks(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn labels_follow_step_precision() {
        assert_eq!(Tick::new(2.0, 1.0).label(), "2");
        assert_eq!(Tick::new(0.25, 0.05).label(), "0.25");
        assert_eq!(Tick::new(-1e-17, 0.1).label(), "0.0");
    }
}
