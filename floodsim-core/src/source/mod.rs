//! Traffic generators.
//!
//! A [`TrafficSource`] is bound to a node and a destination endpoint when
//! it is added to a [`SimulationBuilder`]. During the run the simulation
//! fires it at the start of its [`ActiveWindow`] and then at every time it
//! asks for; each firing tells how many packets to send right now and when
//! to fire again.
//!
//! [`SimulationBuilder`]: crate::simulation::SimulationBuilder

mod on_off;
mod periodic;

pub use self::{
    on_off::{OnOffSource, Timing},
    periodic::PeriodicSource,
};
use crate::{error::ConfigError, time::SimTime};
use rand_core::Rng;
use std::{fmt, time::Duration};

/// The half-open interval `[start, stop)` during which something is
/// active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActiveWindow {
    start: SimTime,
    stop: SimTime,
}

/// Identifier of a source within a simulation, in the order the sources
/// were added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(pub(crate) u32);

/// The traffic patterns a node can generate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrafficSource {
    Periodic(PeriodicSource),
    OnOff(OnOffSource),
}

/// What a source does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Firing {
    /// number of packets to send now, back to back
    pub packets: u64,
    pub packet_size: u64,
    /// when to fire again, [`None`] once the source is done
    pub next: Option<SimTime>,
}

impl ActiveWindow {
    /// # Errors
    ///
    /// [`ConfigError::InvalidWindow`] if `start` is not strictly before
    /// `stop`.
    pub fn new(start: SimTime, stop: SimTime) -> Result<Self, ConfigError> {
        if start >= stop {
            return Err(ConfigError::InvalidWindow { start, stop });
        }
        Ok(Self { start, stop })
    }

    /// a window that never closes
    pub fn starting_at(start: SimTime) -> Self {
        Self {
            start,
            stop: SimTime::MAX,
        }
    }

    pub fn start(&self) -> SimTime {
        self.start
    }

    pub fn stop(&self) -> SimTime {
        self.stop
    }

    pub fn contains(&self, time: SimTime) -> bool {
        self.start <= time && time < self.stop
    }

    pub fn duration(&self) -> Duration {
        self.stop.saturating_duration_since(self.start)
    }
}

impl fmt::Display for ActiveWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.stop == SimTime::MAX {
            write!(f, "[{}, ..)", self.start)
        } else {
            write!(f, "[{}, {})", self.start, self.stop)
        }
    }
}

impl SourceId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

impl Firing {
    fn idle(next: Option<SimTime>) -> Self {
        Self {
            packets: 0,
            packet_size: 0,
            next,
        }
    }
}

impl TrafficSource {
    pub fn window(&self) -> ActiveWindow {
        match self {
            Self::Periodic(source) => source.window(),
            Self::OnOff(source) => source.window(),
        }
    }

    /// packets emitted so far
    pub fn sent(&self) -> u64 {
        match self {
            Self::Periodic(source) => source.sent(),
            Self::OnOff(source) => source.sent(),
        }
    }

    /// Fire the source at `now`.
    ///
    /// Whatever the variant, no packet is ever emitted outside the
    /// source's window or beyond its packet budget.
    pub fn fire<R: Rng>(&mut self, now: SimTime, rng: &mut R) -> Firing {
        match self {
            Self::Periodic(source) => source.fire(now),
            Self::OnOff(source) => source.fire(now, rng),
        }
    }
}

impl From<PeriodicSource> for TrafficSource {
    fn from(source: PeriodicSource) -> Self {
        Self::Periodic(source)
    }
}

impl From<OnOffSource> for TrafficSource {
    fn from(source: OnOffSource) -> Self {
        Self::OnOff(source)
    }
}
