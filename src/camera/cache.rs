//! Memoizes the cursor of a stateful [`UnadjustedCamera`].
//!
//! Moving the unadjusted camera to a pixel or a time is expensive (the camera
//! searches its time history), so [`TimeCache`] shadows the last reported
//! `(sample, line, time)` and only forwards a move when the requested state
//! differs from it.

use log::{trace, warn};

use crate::camera::{CameraModelError, TimeInterval, UnadjustedCamera};

/// Owns the unadjusted camera and the last state it reported.
#[derive(Debug)]
pub struct TimeCache<C> {
    camera: C,
    interval: TimeInterval,
    sample: f64,
    line: f64,
    time: f64,
}

impl<C: UnadjustedCamera> TimeCache<C> {
    /// Wraps a camera, seeding the cached state from the camera's own report.
    pub fn new(camera: C) -> Self {
        let interval = camera.time_interval();
        let (sample, line, time) = (camera.sample(), camera.line(), camera.time());
        TimeCache {
            camera,
            interval,
            sample,
            line,
            time,
        }
    }

    pub fn interval(&self) -> TimeInterval {
        self.interval
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    /// Cached `(sample, line, time)`.
    #[cfg(test)]
    pub fn state(&self) -> (f64, f64, f64) {
        (self.sample, self.line, self.time)
    }

    pub fn synchronize_by_pixel(&mut self, sample: f64, line: f64) -> Result<(), CameraModelError> {
        if self.line != line || self.sample != sample {
            trace!("cache miss: set_image({sample}, {line})");
            self.camera.set_image(sample, line)?;
            self.refresh();
        }
        Ok(())
    }

    /// Fails with [`CameraModelError::TimeOutOfRange`] before touching the
    /// camera when `time` lies outside the coverage interval.
    pub fn synchronize_by_time(&mut self, time: f64) -> Result<(), CameraModelError> {
        if !self.interval.contains(time) {
            warn!(
                "Time {} is outside the camera coverage [{}, {}]",
                time, self.interval.min, self.interval.max
            );
            return Err(CameraModelError::TimeOutOfRange {
                time,
                min: self.interval.min,
                max: self.interval.max,
            });
        }
        if self.time != time {
            trace!("cache miss: set_time({time})");
            self.camera.set_time(time)?;
            self.refresh();
        }
        Ok(())
    }

    // The camera's clock is authoritative: it may resolve the request to a
    // slightly different state than asked for.
    fn refresh(&mut self) {
        self.line = self.camera.line();
        self.sample = self.camera.sample();
        self.time = self.camera.time();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::SyntheticLinescan;

    fn sample_cache() -> TimeCache<SyntheticLinescan> {
        TimeCache::new(SyntheticLinescan::default())
    }

    #[test]
    fn test_pixel_hit_skips_camera() {
        let mut cache = sample_cache();
        cache.synchronize_by_pixel(100.0, 200.0).unwrap();
        cache.synchronize_by_pixel(100.0, 200.0).unwrap();
        assert_eq!(cache.camera().set_image_calls(), 1);

        cache.synchronize_by_pixel(101.0, 200.0).unwrap();
        assert_eq!(cache.camera().set_image_calls(), 2);
    }

    #[test]
    fn test_state_matches_camera_report() {
        let mut cache = sample_cache();
        cache.synchronize_by_pixel(12.0, 34.0).unwrap();
        let camera = cache.camera();
        assert_eq!(cache.state(), (camera.sample(), camera.line(), camera.time()));

        let t = cache.interval().midpoint();
        cache.synchronize_by_time(t).unwrap();
        let camera = cache.camera();
        assert_eq!(cache.state(), (camera.sample(), camera.line(), camera.time()));
        assert_eq!(cache.state().2, t);
    }

    #[test]
    fn test_time_hit_skips_camera() {
        let mut cache = sample_cache();
        let t = cache.interval().min + 1.0;
        cache.synchronize_by_time(t).unwrap();
        cache.synchronize_by_time(t).unwrap();
        assert_eq!(cache.camera().set_time_calls(), 1);
    }

    #[test]
    fn test_pixel_sync_then_time_sync_on_same_time_is_hit() {
        let mut cache = sample_cache();
        cache.synchronize_by_pixel(5.0, 60.0).unwrap();
        let (_, _, t) = cache.state();
        cache.synchronize_by_time(t).unwrap();
        assert_eq!(cache.camera().set_time_calls(), 0);
    }

    #[test]
    fn test_time_sync_stores_reported_time() {
        let mut cache = TimeCache::new(SyntheticLinescan::default().with_time_quantum(0.01));
        let requested = 1005.003;

        cache.synchronize_by_time(requested).unwrap();
        let (_, line, time) = cache.state();
        assert_eq!(time, cache.camera().time());
        assert_eq!(line, cache.camera().line());
        assert!((time - requested).abs() > 1e-4);
        assert_eq!(cache.camera().set_time_calls(), 1);

        cache.synchronize_by_time(time).unwrap();
        assert_eq!(cache.camera().set_time_calls(), 1);
    }

    #[test]
    fn test_pixel_sync_stores_reported_pixel() {
        let mut cache = TimeCache::new(SyntheticLinescan::default().with_time_quantum(0.01));

        cache.synchronize_by_pixel(20.0, 300.4).unwrap();
        let (sample, line, time) = cache.state();
        assert_eq!(sample, 20.0);
        assert_eq!(line, cache.camera().line());
        assert_eq!(time, cache.camera().time());
        assert!((line - 300.4).abs() > 1e-2);

        cache.synchronize_by_pixel(sample, line).unwrap();
        assert_eq!(cache.camera().set_image_calls(), 1);
    }

    #[test]
    fn test_out_of_range_time_leaves_camera_untouched() {
        let mut cache = sample_cache();
        let before = cache.state();
        let t = cache.interval().max + 1.0;

        let err = cache.synchronize_by_time(t).unwrap_err();
        assert!(matches!(err, CameraModelError::TimeOutOfRange { time, .. } if time == t));
        assert_eq!(cache.camera().set_time_calls(), 0);
        assert_eq!(cache.state(), before);
    }
}
