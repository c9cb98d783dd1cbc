use std::time::Duration;

use tokio::time::{Interval, MissedTickBehavior};

use crate::pause::PauseToken;

/// Decides when a driver gets its next emission turn.
#[derive(Debug)]
pub struct Pacer {
    interval: Option<Interval>,
}

impl Pacer {
    /// A zero `period` yields on every free scheduler turn instead of sleeping.
    pub fn new(period: Duration) -> Self {
        let interval = (!period.is_zero()).then(|| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        Self { interval }
    }

    #[cfg(test)]
    fn is_unpaced(&self) -> bool {
        self.interval.is_none()
    }

    pub async fn tick(&mut self) {
        match &mut self.interval {
            Some(interval) => {
                interval.tick().await;
            }
            None => tokio::task::yield_now().await,
        }
    }

    /// Waits for the next turn. While `paused` the turn comes one full period after resume;
    /// ticks missed during the pause are dropped.
    pub async fn next_turn(&mut self, paused: bool, pause: &PauseToken) {
        if paused {
            pause.wait_resumed().await;
            if let Some(interval) = &mut self.interval {
                interval.reset();
            }
        }
        self.tick().await;
    }
}
