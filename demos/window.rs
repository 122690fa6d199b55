//! A rolling plot in a window. Arrow keys pan, +/- zoom, space pauses, q closes.
use std::thread;
use std::time::Duration;

use realtime_plot::{Color, Display, Frontend, IcedDisplay, Plot, PlotConfig};

fn main() -> iced::Result {
    let display = IcedDisplay::new();

    let service = display.clone();
    thread::spawn(move || {
        let config = PlotConfig::default()
            .with_title("rolling sine")
            .with_x_range(0.0, 10.0)
            .with_y_range(-1.5, 1.5)
            .with_overlap(0.5);
        let Ok(plot) = Plot::with_display(config, Display::new(service.clone())) else {
            service.shutdown();
            return;
        };
        for i in 0..4_000 {
            let x = i as f64 * 0.01;
            plot.line_add(x, x.sin(), 0);
            plot.line_add_colored(x, (x * 0.7).cos() * 0.8, 1, Color::RED);
            if i % 10 == 0 {
                thread::sleep(Duration::from_millis(5));
            }
        }
        // Returns once the window is closed.
        let _ = plot.finish();
        service.shutdown();
    });

    display.run()
}
