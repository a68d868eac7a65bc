/// Placement of one decoded buffer on the output clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledBuffer {
    pub start: f64,
    pub duration: f64,
}

impl ScheduledBuffer {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Gapless playback cursor
///
/// Each buffer starts at `max(now, next_start)` and pushes the cursor past
/// its own end, so consecutive buffers never overlap and, when they arrive
/// ahead of the clock, play back to back.
#[derive(Debug, Clone, Default)]
pub struct PlaybackSchedule {
    next_start: f64,
    scheduled: u64,
    total_duration: f64,
}

impl PlaybackSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, now: f64, duration: f64) -> ScheduledBuffer {
        let start = now.max(self.next_start);
        let duration = duration.max(0.0);
        self.next_start = start + duration;
        self.scheduled += 1;
        self.total_duration += duration;
        ScheduledBuffer { start, duration }
    }

    /// Schedule `samples` at `sample_rate`
    pub fn schedule_samples(&mut self, now: f64, samples: usize, sample_rate: u32) -> ScheduledBuffer {
        let duration = if sample_rate == 0 {
            0.0
        } else {
            samples as f64 / sample_rate as f64
        };
        self.schedule(now, duration)
    }

    pub fn next_start(&self) -> f64 {
        self.next_start
    }

    pub fn buffers_scheduled(&self) -> u64 {
        self.scheduled
    }

    pub fn scheduled_secs(&self) -> f64 {
        self.total_duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_back_to_back_when_ahead_of_clock() {
        let mut schedule = PlaybackSchedule::new();
        let a = schedule.schedule(0.0, 0.5);
        let b = schedule.schedule(0.1, 0.5);
        let c = schedule.schedule(0.2, 0.25);

        assert_eq!(a.start, 0.0);
        assert_eq!(b.start, a.end());
        assert_eq!(c.start, b.end());
        assert_eq!(schedule.next_start(), 1.25);
        assert_eq!(schedule.buffers_scheduled(), 3);
    }

    #[test]
    fn test_starts_at_clock_after_underrun() {
        let mut schedule = PlaybackSchedule::new();
        schedule.schedule(0.0, 0.5);
        let late = schedule.schedule(2.0, 0.5);
        assert_eq!(late.start, 2.0);
        assert_eq!(schedule.next_start(), 2.5);
    }

    #[test]
    fn test_schedule_samples_duration() {
        let mut schedule = PlaybackSchedule::new();
        let buffer = schedule.schedule_samples(1.0, 12000, 24000);
        assert_eq!(buffer.duration, 0.5);
        assert_eq!(schedule.scheduled_secs(), 0.5);
    }

    #[test]
    fn test_cursor_never_moves_backwards() {
        let mut schedule = PlaybackSchedule::new();
        let a = schedule.schedule(1.0, 1.0);
        let b = schedule.schedule(1.0, 1.0);
        let c = schedule.schedule(0.5, 0.25);

        assert_eq!(b.start, a.end());
        assert!(c.start >= b.end());
        assert_eq!(schedule.next_start(), 3.25);
    }
}
