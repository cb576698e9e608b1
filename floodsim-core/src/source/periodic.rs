use super::{ActiveWindow, Firing};
use crate::{error::ConfigError, time::SimTime};
use std::time::Duration;

/// Sends one packet of a fixed size every `interval`, starting at the
/// beginning of its window, until the window closes or the packet budget
/// is spent.
///
/// This is the game client: small, regular state updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodicSource {
    packet_size: u64,
    interval: Duration,
    budget: Option<u64>,
    window: ActiveWindow,

    sent: u64,
}

impl PeriodicSource {
    /// # Errors
    ///
    /// [`ConfigError::ZeroPacketSize`] or [`ConfigError::ZeroInterval`].
    pub fn new(
        packet_size: u64,
        interval: Duration,
        window: ActiveWindow,
    ) -> Result<Self, ConfigError> {
        if packet_size == 0 {
            return Err(ConfigError::ZeroPacketSize);
        }
        if interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }

        Ok(Self {
            packet_size,
            interval,
            budget: None,
            window,
            sent: 0,
        })
    }

    /// stop after `max_packets` packets
    pub fn with_budget(mut self, max_packets: u64) -> Self {
        self.budget = Some(max_packets);
        self
    }

    pub fn packet_size(&self) -> u64 {
        self.packet_size
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn budget(&self) -> Option<u64> {
        self.budget
    }

    pub fn window(&self) -> ActiveWindow {
        self.window
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    fn exhausted(&self) -> bool {
        self.budget.is_some_and(|budget| self.sent >= budget)
    }

    pub(super) fn fire(&mut self, now: SimTime) -> Firing {
        if now < self.window.start() {
            return Firing::idle(Some(self.window.start()));
        }
        if !self.window.contains(now) || self.exhausted() {
            return Firing::idle(None);
        }

        self.sent += 1;

        let next = now + self.interval;
        let next = (!self.exhausted() && self.window.contains(next)).then_some(next);

        Firing {
            packets: 1,
            packet_size: self.packet_size,
            next,
        }
    }
}
