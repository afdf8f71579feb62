//! Turns absolute head counts into entry/exit flow.
//!
//! Detection reports how many people are in frame right now; the counter
//! consumes entered/exited deltas. The translator holds the previous count
//! and emits the difference, clamped at zero in each direction.

/// People movement derived from two consecutive head counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flow {
    pub entered: u32,
    pub exited: u32,
}

#[derive(Debug, Default)]
pub struct OccupancyTranslator {
    previous: u32,
}

impl OccupancyTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `count` against the previous observation and record it as the
    /// new baseline. A rising count is entries, a falling count is exits, an
    /// unchanged count is no flow.
    pub fn observe(&mut self, count: u32) -> Flow {
        let flow = Flow {
            entered: count.saturating_sub(self.previous),
            exited: self.previous.saturating_sub(count),
        };
        self.previous = count;
        flow
    }

    /// Forget the baseline, as if no frame had been seen yet.
    pub fn reset(&mut self) {
        self.previous = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rising_count_is_entries() {
        let mut translator = OccupancyTranslator::new();
        translator.observe(2);
        assert_eq!(translator.observe(5), Flow { entered: 3, exited: 0 });
    }

    #[test]
    fn falling_count_is_exits() {
        let mut translator = OccupancyTranslator::new();
        translator.observe(5);
        assert_eq!(translator.observe(3), Flow { entered: 0, exited: 2 });
    }

    #[test]
    fn steady_count_is_no_flow() {
        let mut translator = OccupancyTranslator::new();
        translator.observe(5);
        assert_eq!(translator.observe(5), Flow::default());
    }

    #[test]
    fn first_observation_counts_from_zero() {
        let mut translator = OccupancyTranslator::new();
        assert_eq!(translator.observe(4), Flow { entered: 4, exited: 0 });
    }

    #[test]
    fn reset_drops_the_baseline() {
        let mut translator = OccupancyTranslator::new();
        translator.observe(7);
        translator.reset();
        assert_eq!(translator.observe(2), Flow { entered: 2, exited: 0 });
    }
}
