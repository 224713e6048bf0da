use std::time::Instant;

/// Monotonic frame timer with pause support.
///
/// `start` is the rebase point. Time spent paused is folded into `start` on
/// resume, so every reading is plain `now - start` while running.
#[derive(Debug, Clone, Copy)]
pub struct FrameTimer {
    start: Instant,
    paused_at: Option<Instant>,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self::new_at(Instant::now(), false)
    }

    pub(crate) fn new_at(now: Instant, paused: bool) -> Self {
        Self {
            start: now,
            paused_at: paused.then_some(now),
        }
    }

    /// Seconds since the previous reset, then rebases to now.
    pub fn reset(&mut self) -> f32 {
        self.reset_at(Instant::now())
    }

    /// Seconds since the last rebase, excluding paused time.
    pub fn elapsed(&self) -> f32 {
        self.elapsed_at(Instant::now())
    }

    pub fn toggle_pause(&mut self) {
        self.toggle_pause_at(Instant::now());
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub(crate) fn reset_at(&mut self, now: Instant) -> f32 {
        let t = self.elapsed_at(now);
        self.start = now;
        if self.paused_at.is_some() {
            self.paused_at = Some(now);
        }
        t
    }

    pub(crate) fn elapsed_at(&self, now: Instant) -> f32 {
        // A paused timer reads as if the clock stopped when pause began.
        let end = self.paused_at.unwrap_or(now);
        end.saturating_duration_since(self.start).as_secs_f32()
    }

    pub(crate) fn toggle_pause_at(&mut self, now: Instant) {
        match self.paused_at.take() {
            Some(paused_at) => {
                self.start += now.saturating_duration_since(paused_at);
            }
            None => self.paused_at = Some(now),
        }
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const EPS: f32 = 1e-5;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn reset_returns_time_since_previous_reset() {
        let t0 = Instant::now();
        let mut timer = FrameTimer::new_at(t0, false);

        assert!((timer.reset_at(t0 + ms(16)) - 0.016).abs() < EPS);
        assert!((timer.reset_at(t0 + ms(50)) - 0.034).abs() < EPS);
    }

    #[test]
    fn elapsed_does_not_rebase() {
        let t0 = Instant::now();
        let timer = FrameTimer::new_at(t0, false);

        assert!((timer.elapsed_at(t0 + ms(100)) - 0.1).abs() < EPS);
        assert!((timer.elapsed_at(t0 + ms(200)) - 0.2).abs() < EPS);
    }

    #[test]
    fn paused_time_is_excluded() {
        let t0 = Instant::now();
        let mut timer = FrameTimer::new_at(t0, false);

        timer.toggle_pause_at(t0 + ms(100));
        assert!(timer.is_paused());
        // Frozen while paused.
        assert!((timer.elapsed_at(t0 + ms(400)) - 0.1).abs() < EPS);

        timer.toggle_pause_at(t0 + ms(500));
        assert!(!timer.is_paused());
        assert!((timer.elapsed_at(t0 + ms(600)) - 0.2).abs() < EPS);
        assert!((timer.reset_at(t0 + ms(600)) - 0.2).abs() < EPS);
    }

    #[test]
    fn reset_while_paused_yields_zero_afterwards() {
        let t0 = Instant::now();
        let mut timer = FrameTimer::new_at(t0, true);

        assert_eq!(timer.reset_at(t0 + ms(30)), 0.0);
        assert_eq!(timer.reset_at(t0 + ms(60)), 0.0);

        timer.toggle_pause_at(t0 + ms(100));
        assert!((timer.reset_at(t0 + ms(116)) - 0.016).abs() < EPS);
    }

    #[test]
    fn output_is_never_negative() {
        let t0 = Instant::now();
        let timer = FrameTimer::new_at(t0 + ms(10), false);
        assert_eq!(timer.elapsed_at(t0), 0.0);
    }
}
