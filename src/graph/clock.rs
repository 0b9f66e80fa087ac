//! Frame pacing for the host loop.

use std::time::{Duration, Instant};

/// Paces ticks at a fixed maximum frame rate.
#[derive(Debug, Clone)]
pub struct FrameClock {
    interval: Duration,
    last_tick: Option<Instant>,
    frames: u64,
}

impl FrameClock {
    pub fn new(fps_max: u32) -> Self {
        Self {
            interval: Duration::from_nanos(1_000_000_000 / fps_max.max(1) as u64),
            last_tick: None,
            frames: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Frames started so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Block until the next frame is due, then start it.
    ///
    /// The first call returns immediately.
    pub fn wait(&mut self) -> Instant {
        if let Some(last) = self.last_tick {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                let remaining = self.interval - elapsed;
                // Spin for sub-millisecond accuracy, sleep for larger waits
                if remaining > Duration::from_millis(2) {
                    std::thread::sleep(remaining - Duration::from_millis(1));
                }
                while last.elapsed() < self.interval {
                    std::hint::spin_loop();
                }
            }
        }
        let now = Instant::now();
        self.last_tick = Some(now);
        self.frames += 1;
        now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_paces_frames() {
        let mut clock = FrameClock::new(200);
        let first = clock.wait();
        let second = clock.wait();
        assert!(second.duration_since(first) >= clock.interval());
        assert_eq!(clock.frames(), 2);
    }

    #[test]
    fn test_zero_fps_clamped() {
        assert_eq!(FrameClock::new(0).interval(), Duration::from_secs(1));
    }
}
