//! Adjusted Linescan Example
//!
//! This example wraps the analytic linescan camera in an adjusted camera model
//! and sweeps a grid of pixels through the adjusted geometry: each pixel is
//! resolved to a focal-plane time, cast to a world ray from the adjusted center,
//! intersected at a fixed range and forward-projected back to the focal plane.
//!
//! Usage:
//! ```bash
//! cargo run --example adjusted_linescan -- \
//!   --position samples/position_polynomial.yaml \
//!   --pose samples/pose_polynomial.yaml \
//!   --num-pixels 50
//! ```

use adjust_camera::camera::{AdjustedCameraModel, CameraModel, SyntheticLinescan};
use adjust_camera::equation::{
    PolynomialQuaternionEquation, PolynomialVectorEquation, SharedQuaternionEquation,
    SharedVectorEquation,
};
use adjust_camera::geometry::sample_pixels;
use clap::Parser;
use flexi_logger::{colored_detailed_format, Logger};
use log::{error, info, warn};
use nalgebra::Vector3;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

/// Adjusted linescan geometry sweep
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML file with the polynomial position correction (meters)
    #[arg(long)]
    position: Option<PathBuf>,

    /// YAML file with the polynomial orientation correction
    #[arg(long)]
    pose: Option<PathBuf>,

    /// Approximate number of pixels to sweep
    #[arg(short = 'n', long, default_value_t = 50)]
    num_pixels: usize,

    /// Distance along each ray to the synthetic ground point, in meters
    #[arg(short = 'r', long, default_value_t = 2000.0)]
    range: f64,

    /// Body spin rate in radians per second
    #[arg(long, default_value_t = 1e-3)]
    spin_rate: f64,
}

fn load_position(path: &Option<PathBuf>) -> Result<SharedVectorEquation, Box<dyn std::error::Error>> {
    let equation = match path {
        Some(path) => {
            let path = path.to_str().ok_or("position path is not valid UTF-8")?;
            info!("Loading position correction from {path}");
            PolynomialVectorEquation::load_from_yaml(path)?
        }
        None => PolynomialVectorEquation::zero(1),
    };
    Ok(Rc::new(RefCell::new(equation)))
}

fn load_pose(path: &Option<PathBuf>) -> Result<SharedQuaternionEquation, Box<dyn std::error::Error>> {
    let equation = match path {
        Some(path) => {
            let path = path.to_str().ok_or("pose path is not valid UTF-8")?;
            info!("Loading pose correction from {path}");
            PolynomialQuaternionEquation::load_from_yaml(path)?
        }
        None => PolynomialQuaternionEquation::zero(1),
    };
    Ok(Rc::new(RefCell::new(equation)))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    Logger::try_with_str("info")?
        .format_for_stdout(colored_detailed_format)
        .log_to_stdout()
        .start()?;

    let cli = Cli::parse();

    let camera = SyntheticLinescan::default().with_body_spin_rate(cli.spin_rate);
    let model = AdjustedCameraModel::new(camera, load_position(&cli.position)?, load_pose(&cli.pose)?)?;
    let interval = model.time_interval();
    info!(
        "Camera: {} samples x {} lines, time [{:.3}, {:.3}]",
        model.samples(),
        model.lines(),
        interval.min,
        interval.max
    );

    let mut max_residual: f64 = 0.0;
    let pixels = sample_pixels(model.samples() as f64, model.lines() as f64, cli.num_pixels);
    for pixel in &pixels {
        let focal_time = model.pixel_to_focal_time(pixel)?;
        let ray = model.focal_time_to_ray(&focal_time)?;
        let center = model.adjusted_center(focal_time.time)?;
        let ground = center + ray * cli.range;

        match model.project_point_at(&focal_time, &ground) {
            Ok(projected) => {
                let residual = (projected.focal_plane() - focal_time.focal_plane()).norm();
                max_residual = max_residual.max(residual);
            }
            Err(e) => error!("Forward projection failed for pixel {pixel:?}: {e}"),
        }
    }
    info!(
        "Swept {} pixels, max focal-plane round trip residual {:.3e} mm",
        pixels.len(),
        max_residual
    );

    if let Err(e) = model.point_to_pixel(&Vector3::zeros()) {
        warn!("point_to_pixel: {e}");
    }

    Ok(())
}
