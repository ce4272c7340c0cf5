//! An analytic pushbroom camera.
//!
//! [`SyntheticLinescan`] implements [`UnadjustedCamera`] with closed-form
//! geometry: lines are read out at a fixed period, the instrument moves on a
//! straight line and the body spins at a constant rate about its z axis. It
//! counts cursor moves so cache behaviour can be observed.

use nalgebra::{Matrix3, Rotation3, Vector2, Vector3};

use crate::camera::{CameraModelError, TimeInterval, UnadjustedCamera};

#[derive(Debug, Clone)]
pub struct SyntheticLinescan {
    samples: u32,
    lines: u32,
    start_time: f64,
    line_period: f64,
    focal_mm: f64,
    pixel_pitch_mm: f64,
    position_km: Vector3<f64>,
    velocity_km_s: Vector3<f64>,
    instrument_rotation: Matrix3<f64>,
    body_spin_rate: f64,
    time_quantum: Option<f64>,
    sample: f64,
    line: f64,
    time: f64,
    set_image_calls: usize,
    set_time_calls: usize,
}

impl Default for SyntheticLinescan {
    /// A 1024 x 2048 nadir-looking camera 3500 km from the body center,
    /// covering 1000 s to 1020.48 s of ephemeris time.
    fn default() -> Self {
        SyntheticLinescan::unchecked(1024, 2048, 1000.0, 0.01, 350.0, 0.0125)
    }
}

impl SyntheticLinescan {
    pub fn new(
        samples: u32,
        lines: u32,
        start_time: f64,
        line_period: f64,
        focal_mm: f64,
        pixel_pitch_mm: f64,
    ) -> Result<Self, CameraModelError> {
        if samples == 0 || lines == 0 {
            return Err(CameraModelError::InvalidParams(
                "synthetic camera needs a non-empty image".to_string(),
            ));
        }
        if line_period.is_nan() || line_period <= 0.0 || !start_time.is_finite() {
            return Err(CameraModelError::InvalidParams(format!(
                "invalid line clock: start {start_time}, period {line_period}"
            )));
        }
        if focal_mm == 0.0 || !focal_mm.is_finite() {
            return Err(CameraModelError::FocalLengthMustBeNonZero);
        }
        if pixel_pitch_mm.is_nan() || pixel_pitch_mm <= 0.0 {
            return Err(CameraModelError::InvalidParams(format!(
                "pixel pitch must be positive, got {pixel_pitch_mm}"
            )));
        }

        Ok(SyntheticLinescan::unchecked(
            samples,
            lines,
            start_time,
            line_period,
            focal_mm,
            pixel_pitch_mm,
        ))
    }

    fn unchecked(
        samples: u32,
        lines: u32,
        start_time: f64,
        line_period: f64,
        focal_mm: f64,
        pixel_pitch_mm: f64,
    ) -> Self {
        SyntheticLinescan {
            samples,
            lines,
            start_time,
            line_period,
            focal_mm,
            pixel_pitch_mm,
            position_km: Vector3::new(0.0, 0.0, 3500.0),
            velocity_km_s: Vector3::new(0.0, 1.5, 0.0),
            // Boresight along -z of the body frame.
            instrument_rotation: Matrix3::from_diagonal(&Vector3::new(1.0, -1.0, -1.0)),
            body_spin_rate: 0.0,
            time_quantum: None,
            sample: samples as f64 / 2.0,
            line: 0.0,
            time: start_time,
            set_image_calls: 0,
            set_time_calls: 0,
        }
    }

    /// Instrument position at the start time, in kilometers.
    pub fn with_position(mut self, position_km: Vector3<f64>) -> Self {
        self.position_km = position_km;
        self
    }

    pub fn with_velocity(mut self, velocity_km_s: Vector3<f64>) -> Self {
        self.velocity_km_s = velocity_km_s;
        self
    }

    pub fn with_instrument_rotation(mut self, rotation: Matrix3<f64>) -> Self {
        self.instrument_rotation = rotation;
        self
    }

    /// Body spin about z, radians per second.
    pub fn with_body_spin_rate(mut self, rate: f64) -> Self {
        self.body_spin_rate = rate;
        self
    }

    /// Snap every cursor move to the nearest multiple of `dt` after the start
    /// time, so the camera reports a different state than the one requested.
    pub fn with_time_quantum(mut self, dt: f64) -> Self {
        self.time_quantum = (dt.is_finite() && dt > 0.0).then_some(dt);
        self
    }

    pub fn set_image_calls(&self) -> usize {
        self.set_image_calls
    }

    pub fn set_time_calls(&self) -> usize {
        self.set_time_calls
    }

    fn elapsed(&self) -> f64 {
        self.time - self.start_time
    }

    fn move_to_time(&mut self, time: f64) {
        self.time = match self.time_quantum {
            Some(dt) => self.start_time + ((time - self.start_time) / dt).round() * dt,
            None => time,
        };
        self.line = (self.time - self.start_time) / self.line_period;
    }
}

impl UnadjustedCamera for SyntheticLinescan {
    fn set_image(&mut self, sample: f64, line: f64) -> Result<(), CameraModelError> {
        self.set_image_calls += 1;
        if !sample.is_finite() || !line.is_finite() {
            return Err(CameraModelError::Backend(format!(
                "cannot set image to ({sample}, {line})"
            )));
        }
        self.sample = sample;
        self.line = line;
        if self.time_quantum.is_some() {
            self.move_to_time(self.start_time + line * self.line_period);
        } else {
            self.time = self.start_time + line * self.line_period;
        }
        Ok(())
    }

    fn set_time(&mut self, time: f64) -> Result<(), CameraModelError> {
        self.set_time_calls += 1;
        if !time.is_finite() {
            return Err(CameraModelError::Backend(format!("cannot set time to {time}")));
        }
        self.move_to_time(time);
        Ok(())
    }

    fn sample(&self) -> f64 {
        self.sample
    }

    fn line(&self) -> f64 {
        self.line
    }

    fn time(&self) -> f64 {
        self.time
    }

    fn undistorted_focal_plane_xy(&self) -> Result<Vector2<f64>, CameraModelError> {
        let x = (self.sample - self.samples as f64 / 2.0) * self.pixel_pitch_mm;
        Ok(Vector2::new(x, 0.0))
    }

    fn undistorted_focal_plane_z(&self) -> Result<f64, CameraModelError> {
        Ok(self.focal_mm)
    }

    fn instrument_position(&self) -> Result<Vector3<f64>, CameraModelError> {
        Ok(self.position_km + self.velocity_km_s * self.elapsed())
    }

    fn instrument_rotation(&self) -> Result<Matrix3<f64>, CameraModelError> {
        Ok(self.instrument_rotation)
    }

    fn body_rotation(&self) -> Result<Matrix3<f64>, CameraModelError> {
        let angle = self.body_spin_rate * self.elapsed();
        Ok(*Rotation3::from_axis_angle(&Vector3::z_axis(), angle).matrix())
    }

    fn time_interval(&self) -> TimeInterval {
        TimeInterval {
            min: self.start_time,
            max: self.start_time + self.lines as f64 * self.line_period,
        }
    }

    fn samples(&self) -> u32 {
        self.samples
    }

    fn lines(&self) -> u32 {
        self.lines
    }
}
