use realtime_plot::{
    Color, Command, Frontend, HeightMap, Histogram, Histogram3D, Plot, PlotConfig, Viewport,
};
use rand_distr::{Distribution, Normal};

fn small() -> PlotConfig {
    PlotConfig::default().with_area(120 * 120)
}

#[test]
fn rolling_viewport_follows_the_data() {
    let plot = Plot::new(
        small()
            .with_x_range(-5.0, 5.0)
            .with_y_range(-5.0, 5.0)
            .with_overlap(0.6),
    )
    .unwrap();
    plot.point(0.0, 0.0);
    plot.point(-7.0, -7.0);
    let renderer = plot.finish().unwrap();
    assert_eq!(renderer.stats().rolling_updates, 1);
    assert_eq!(renderer.viewport(), Viewport::new(-9.0, 1.0, -9.0, 1.0));
    assert_eq!(
        renderer.plot_area().sample(0.0, 0.0),
        Some(Color::BLACK.to_rgba8())
    );
}

#[test]
fn forced_stop_skips_everything_after_it() {
    let plot = Plot::new(small()).unwrap();
    plot.batch([
        Command::Point { x: 0.5, y: 0.5 },
        Command::Final { force: true },
        Command::Point { x: 0.2, y: 0.2 },
        Command::Clear,
    ]);
    let renderer = plot.finish().unwrap();
    assert_eq!(renderer.stats().commands_executed, 2);
    assert_eq!(
        renderer.plot_area().sample(0.2, 0.2),
        Some(Color::WHITE.to_rgba8())
    );
}

/// Vertical position of producer `p`'s line.
fn lane(producer: usize) -> f64 {
    0.125 + producer as f64 * 0.25
}

#[test]
fn producers_on_many_threads_keep_their_order() {
    const STEPS: usize = 20;
    let plot = Plot::new(small().with_fixed_plot_area(true)).unwrap();
    std::thread::scope(|scope| {
        for producer in 0..4 {
            let plot = &plot;
            scope.spawn(move || {
                for i in 0..=STEPS {
                    let x = i as f64 / STEPS as f64;
                    plot.line_add_colored(x, lane(producer), producer as i32, Color::by_id(i));
                }
            });
        }
    });
    let renderer = plot.finish().unwrap();
    assert_eq!(renderer.stats().commands_executed, (4 * (STEPS + 1) + 1) as u64);

    // Segment i ends at vertex i and takes its color, so a reordered pair
    // would leave the wrong color in the middle of a segment.
    let area = renderer.plot_area();
    for producer in 0..4 {
        for i in 1..=STEPS {
            let x = (i as f64 - 0.5) / STEPS as f64;
            assert_eq!(
                area.sample(x, lane(producer)),
                Some(Color::by_id(i).to_rgba8()),
                "producer {producer}, segment {i}"
            );
        }
    }
}

#[test]
fn extreme_coordinates_do_not_stop_the_plot() {
    let plot = Plot::new(small()).unwrap();
    plot.point(0.5, 0.5);
    plot.point(-1.0e17, 0.5);
    plot.line_add(0.5, 0.5, 3);
    plot.line_add(1.0e300, -1.0e300, 3);
    plot.point(f64::MAX, f64::MIN_POSITIVE);
    plot.point(0.25, 0.25);
    assert!(!plot.is_closed());
    let renderer = plot.finish().unwrap();

    assert_eq!(renderer.stats().commands_executed, 7);
    let viewport = renderer.viewport();
    assert!(viewport.width() > 0.0 && viewport.height() > 0.0);
    assert!(renderer.plot_bounds_within_surface_bounds());
}

#[test]
fn saved_png_matches_the_composited_frame() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rolling.png");

    let plot = Plot::new(small().with_overlap(0.5)).unwrap();
    for i in 0..200 {
        let x = i as f64 * 0.02;
        plot.line_add(x, (x * 3.0).sin() * 0.5 + 0.5, 0);
    }
    plot.rectangle(0.1, 0.1, 0.2, 0.3, true, Color::ORANGE);
    plot.save(&path);
    let renderer = plot.finish().unwrap();

    let written = image::open(&path).unwrap().to_rgba8();
    assert_eq!(&written, renderer.compose().unwrap().image());
    assert!(renderer.stats().rolling_updates > 0);
}

#[test]
fn adaptive_histogram_keeps_every_value() {
    let normal = Normal::new(3.0, 1.5).unwrap();
    let mut rng = rand::rng();
    let data: Vec<f64> = (0..2000).map(|_| normal.sample(&mut rng)).collect();

    let histogram = Histogram::new(small(), 25, false).unwrap();
    histogram.set_data(data.iter().copied(), false);
    for &value in &data[..10] {
        histogram.add(value, false);
    }
    histogram.plot();
    let renderer = histogram.finish().unwrap();

    let bins = renderer.histogram_bins().unwrap();
    assert!(!bins.needs_rebin());
    assert_eq!(bins.bins().iter().sum::<usize>(), 2010);
    let min = data.iter().copied().fold(f64::INFINITY, f64::min);
    let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    assert!(bins.min_x() <= min && bins.max_x() > max);
}

#[test]
fn optimized_histogram_narrows_to_the_bulk() {
    let histogram = Histogram::new(
        small().with_x_range(0.0, 10.0).with_fixed_plot_area(true),
        10,
        true,
    )
    .unwrap();
    let mut data: Vec<f64> = (0..95).map(|i| 4.0 + i as f64 / 95.0).collect();
    data.extend([0.5, 1.5, 8.5, 9.5, 9.6]);
    histogram.set_data(data, true);
    histogram.optimize_bounds(0.9);
    let renderer = histogram.finish().unwrap();

    let bins = renderer.histogram_bins().unwrap();
    assert!(bins.min_x() >= 4.0 && bins.max_x() <= 5.0);
    assert!(bins.is_fixed());
}

#[test]
fn grid_histogram_counts_points() {
    let normal = Normal::new(0.0, 1.0).unwrap();
    let mut rng = rand::rng();
    let histogram = Histogram3D::new(small(), 8, 6).unwrap();
    for _ in 0..500 {
        histogram.add(normal.sample(&mut rng), normal.sample(&mut rng), false);
    }
    histogram.plot();
    histogram.calculate_height_scaling();
    let renderer = histogram.finish().unwrap();

    let grid = renderer.histogram_grid().unwrap();
    assert_eq!(grid.bins().len(), 48);
    assert_eq!(grid.bins().iter().sum::<usize>(), 500);
    assert!(renderer.viewport().width() > grid.domain().width());
}

#[test]
fn height_map_triangulates_and_scales() {
    let normal = Normal::new(0.0, 1.0).unwrap();
    let mut rng = rand::rng();
    let map = HeightMap::new(
        small()
            .with_x_range(-3.0, 3.0)
            .with_y_range(-3.0, 3.0)
            .with_fixed_plot_area(true),
    )
    .unwrap();
    for _ in 0..300 {
        let (x, y): (f64, f64) = (normal.sample(&mut rng), normal.sample(&mut rng));
        map.add(x, y, x * x + y * y, false);
    }
    map.plot();
    map.calculate_height_scaling();
    let renderer = map.finish().unwrap();

    let mesh = renderer.height_map_mesh().unwrap();
    assert_eq!(mesh.len(), 300);
    assert!(mesh.triangles().count() > 0);
    let (low, high) = mesh.z_range().unwrap();
    assert!(low >= 0.0 && high > low);
    assert_ne!(
        renderer.plot_area().sample(0.0, 0.0),
        Some(Color::WHITE.to_rgba8())
    );
}
