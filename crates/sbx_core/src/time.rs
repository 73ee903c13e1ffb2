use std::time::Instant;

const FPS_SAMPLE_COUNT: usize = 60;

/// Variable-timestep frame clock. The sandbox has no simulation to keep
/// deterministic, so the camera integrates the measured (capped) frame delta.
pub struct FrameClock {
    pub max_dt: f64,
    pub total_time: f64,
    pub frame_count: u64,
    pub dt: f64,
    last_instant: Instant,

    fps_samples: [f64; FPS_SAMPLE_COUNT],
    fps_sample_index: usize,
    pub smoothed_fps: f64,
    pub smoothed_frame_time_ms: f64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            max_dt: 0.25,
            total_time: 0.0,
            frame_count: 0,
            dt: 0.0,
            last_instant: Instant::now(),
            fps_samples: [1.0 / 60.0; FPS_SAMPLE_COUNT],
            fps_sample_index: 0,
            smoothed_fps: 60.0,
            smoothed_frame_time_ms: 16.667,
        }
    }

    pub fn begin_frame(&mut self) {
        let now = Instant::now();
        let real_dt = now.duration_since(self.last_instant).as_secs_f64();
        self.last_instant = now;
        self.advance(real_dt);
    }

    /// Feed one frame delta. Split from `begin_frame` so it can be driven
    /// without a wall clock.
    pub fn advance(&mut self, real_dt: f64) {
        self.dt = real_dt;

        // Stalls (window drag, breakpoint, long reload) must not fling the camera.
        if self.dt > self.max_dt {
            log::warn!(
                "Frame took {:.1}ms, capping dt to {}ms",
                self.dt * 1000.0,
                self.max_dt * 1000.0
            );
            self.dt = self.max_dt;
        }

        self.total_time += self.dt;
        self.frame_count += 1;

        self.fps_samples[self.fps_sample_index] = real_dt;
        self.fps_sample_index = (self.fps_sample_index + 1) % FPS_SAMPLE_COUNT;
        let avg_dt: f64 = self.fps_samples.iter().sum::<f64>() / FPS_SAMPLE_COUNT as f64;
        self.smoothed_frame_time_ms = avg_dt * 1000.0;
        self.smoothed_fps = if avg_dt > 0.0 { 1.0 / avg_dt } else { 0.0 };
    }

    pub fn dt_f32(&self) -> f32 {
        self.dt as f32
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_accumulates_time_and_frames() {
        let mut clock = FrameClock::new();
        clock.advance(0.01);
        clock.advance(0.02);
        assert_eq!(clock.frame_count, 2);
        assert!((clock.total_time - 0.03).abs() < 1e-9);
        assert!((clock.dt - 0.02).abs() < 1e-9);
    }

    #[test]
    fn advance_caps_long_frames() {
        let mut clock = FrameClock::new();
        clock.advance(3.0);
        assert_eq!(clock.dt, clock.max_dt);
        assert_eq!(clock.total_time, clock.max_dt);
    }

    #[test]
    fn smoothed_fps_converges_to_steady_rate() {
        let mut clock = FrameClock::new();
        for _ in 0..FPS_SAMPLE_COUNT {
            clock.advance(1.0 / 120.0);
        }
        assert!((clock.smoothed_fps - 120.0).abs() < 0.01);
        assert!((clock.smoothed_frame_time_ms - 1000.0 / 120.0).abs() < 0.01);
    }
}
