//! Bin a stream of normally distributed values off-screen and save the result.
use rand_distr::{Distribution, Normal};
use realtime_plot::{Frontend, HeightMap, Histogram, PlotConfig};

fn main() -> realtime_plot::Result<()> {
    let normal = Normal::new(0.0, 1.0).expect("valid distribution");
    let mut rng = rand::rng();

    let histogram = Histogram::new(PlotConfig::default().with_title("normal"), 40, true)?;
    for _ in 0..10_000 {
        histogram.add(normal.sample(&mut rng), false);
    }
    histogram.plot();
    histogram.save("histogram.png");
    histogram.optimize_bounds(0.9);
    histogram.save("histogram_optimized.png");
    histogram.finish()?;

    let config = PlotConfig::default()
        .with_x_range(-3.0, 3.0)
        .with_y_range(-3.0, 3.0)
        .with_fixed_plot_area(true);
    let map = HeightMap::new(config)?;
    for _ in 0..2_000 {
        let (x, y): (f64, f64) = (normal.sample(&mut rng), normal.sample(&mut rng));
        map.add(x, y, (x * 2.0).sin() * (y * 2.0).cos(), false);
    }
    map.calculate_height_scaling();
    map.save("heightmap.png");
    map.finish()?;
    Ok(())
}
