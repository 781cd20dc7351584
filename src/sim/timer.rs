//! Tick-counted suspensions
//!
//! Both the spawn loop and the hand settle wait are expressed in whole
//! simulation ticks so that timing is exact and independent of frame rate.

use serde::{Deserialize, Serialize};

use crate::secs_to_ticks;

/// Cancellable repeating task
///
/// Once started, fires on the tick that completes each full period. The
/// first firing happens one period after `start`, so advancing `n` ticks
/// fires exactly `n / period` times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepeatingTask {
    period_ticks: u32,
    elapsed_ticks: u32,
    active: bool,
}

impl RepeatingTask {
    pub fn new(period_secs: f32) -> Self {
        Self::with_period_ticks(secs_to_ticks(period_secs))
    }

    pub fn with_period_ticks(period_ticks: u32) -> Self {
        Self {
            period_ticks: period_ticks.max(1),
            elapsed_ticks: 0,
            active: false,
        }
    }

    /// Start (or restart) counting from zero
    pub fn start(&mut self) {
        self.active = true;
        self.elapsed_ticks = 0;
    }

    /// Cancel any pending firing
    pub fn stop(&mut self) {
        self.active = false;
        self.elapsed_ticks = 0;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn period_ticks(&self) -> u32 {
        self.period_ticks
    }

    /// Advance one tick. Returns true if the task fires on this tick.
    pub fn advance(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.elapsed_ticks += 1;
        if self.elapsed_ticks >= self.period_ticks {
            self.elapsed_ticks = 0;
            true
        } else {
            false
        }
    }
}

/// One-shot delay that fires exactly once
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delay {
    remaining_ticks: u32,
    fired: bool,
}

impl Delay {
    pub fn new(secs: f32) -> Self {
        Self {
            remaining_ticks: secs_to_ticks(secs),
            fired: false,
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Advance one tick. Returns true only on the tick the delay elapses.
    pub fn advance(&mut self) -> bool {
        if self.fired {
            return false;
        }
        self.remaining_ticks = self.remaining_ticks.saturating_sub(1);
        if self.remaining_ticks == 0 {
            self.fired = true;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeating_fires_each_period() {
        let mut task = RepeatingTask::with_period_ticks(3);
        task.start();
        let fired: Vec<bool> = (0..7).map(|_| task.advance()).collect();
        assert_eq!(fired, vec![false, false, true, false, false, true, false]);
    }

    #[test]
    fn test_repeating_inactive_never_fires() {
        let mut task = RepeatingTask::with_period_ticks(1);
        assert!(!task.advance());
        task.start();
        assert!(task.advance());
        task.stop();
        assert!(!task.advance());
        assert!(!task.is_active());
    }

    #[test]
    fn test_restart_resets_phase() {
        let mut task = RepeatingTask::with_period_ticks(4);
        task.start();
        task.advance();
        task.advance();
        task.start();
        assert!(!task.advance());
        assert!(!task.advance());
        assert!(!task.advance());
        assert!(task.advance());
    }

    #[test]
    fn test_delay_fires_once() {
        let mut delay = Delay::new(0.5);
        let fires = (0..200).filter(|_| delay.advance()).count();
        assert_eq!(fires, 1);
        assert!(delay.has_fired());
    }

    #[test]
    fn test_delay_fires_on_settle_tick() {
        let mut delay = Delay::new(0.5);
        for _ in 0..59 {
            assert!(!delay.advance());
        }
        assert!(delay.advance());
    }
}
