use super::{ActiveWindow, Firing};
use crate::{error::ConfigError, measure::Bandwidth, time::SimTime};
use rand_core::Rng;
use std::time::Duration;

/// How long an on or off period lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timing {
    /// always the same duration
    Constant(Duration),
    /// exponentially distributed around `mean`, drawn for every period
    Exponential { mean: Duration },
}

/// Alternates between sending at a fixed data `rate` ("on") and staying
/// silent ("off"), for as long as its window is open.
///
/// At the start of every on period the byte budget of the period,
/// `rate` times its duration, is converted into a number of packets. The
/// bytes that do not make a full packet are carried over to the next on
/// period so the long run rate is exact. The packets are emitted in bursts
/// of `burst` packets, each burst spaced by the time it takes to send it
/// at `rate`: with the default burst of `1` the source is paced at `rate`.
///
/// Like any other period, the first on period follows an off period: the
/// source stays silent for one off time after its window opens.
///
/// This is the flood attacker. With an off time of zero it is
/// continuously on for its whole window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnOffSource {
    rate: Bandwidth,
    packet_size: u64,
    on: Timing,
    off: Timing,
    burst: u64,
    budget: Option<u64>,
    window: ActiveWindow,

    phase: Phase,
    /// bytes carried over from the previous on periods
    residual: u64,
    sent: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// before the first off period
    Idle,
    Off,
    On { ends: SimTime, remaining: u64 },
}

impl Timing {
    pub fn constant(duration: Duration) -> Self {
        Self::Constant(duration)
    }

    pub fn exponential(mean: Duration) -> Self {
        Self::Exponential { mean }
    }

    fn is_zero(&self) -> bool {
        match self {
            Self::Constant(d) | Self::Exponential { mean: d } => d.is_zero(),
        }
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        match *self {
            Self::Constant(duration) => duration,
            Self::Exponential { mean } => {
                // 1 - u is in (0, 1], the log is finite
                let u = 1.0 - crate::measure::unit_sample(rng);
                Duration::try_from_secs_f64(-mean.as_secs_f64() * u.ln()).unwrap_or(Duration::MAX)
            }
        }
    }
}

impl OnOffSource {
    /// A source sending `packet_size` bytes packets at `rate` while on.
    ///
    /// It is always on (1 second on periods, no off period) with a burst
    /// of `1`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ZeroRate`] or [`ConfigError::ZeroPacketSize`].
    pub fn new(
        rate: Bandwidth,
        packet_size: u64,
        window: ActiveWindow,
    ) -> Result<Self, ConfigError> {
        if rate.is_zero() {
            return Err(ConfigError::ZeroRate);
        }
        if packet_size == 0 {
            return Err(ConfigError::ZeroPacketSize);
        }

        Ok(Self {
            rate,
            packet_size,
            on: Timing::Constant(Duration::from_secs(1)),
            off: Timing::Constant(Duration::ZERO),
            burst: 1,
            budget: None,
            window,
            phase: Phase::Idle,
            residual: 0,
            sent: 0,
        })
    }

    /// # Errors
    ///
    /// [`ConfigError::ZeroOnDuration`] if `on` is always zero: the source
    /// would never send anything.
    pub fn with_timing(mut self, on: Timing, off: Timing) -> Result<Self, ConfigError> {
        if on.is_zero() {
            return Err(ConfigError::ZeroOnDuration);
        }
        self.on = on;
        self.off = off;
        Ok(self)
    }

    /// # Errors
    ///
    /// [`ConfigError::ZeroBurst`]
    pub fn with_burst(mut self, burst: u64) -> Result<Self, ConfigError> {
        if burst == 0 {
            return Err(ConfigError::ZeroBurst);
        }
        self.burst = burst;
        Ok(self)
    }

    /// stop after `max_packets` packets
    pub fn with_budget(mut self, max_packets: u64) -> Self {
        self.budget = Some(max_packets);
        self
    }

    pub fn rate(&self) -> Bandwidth {
        self.rate
    }

    pub fn packet_size(&self) -> u64 {
        self.packet_size
    }

    pub fn on_time(&self) -> Timing {
        self.on
    }

    pub fn off_time(&self) -> Timing {
        self.off
    }

    pub fn burst(&self) -> u64 {
        self.burst
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

    fn budget_left(&self) -> u64 {
        self.budget
            .map_or(u64::MAX, |budget| budget.saturating_sub(self.sent))
    }

    /// Open a new on period at `now`.
    fn switch_on<R: Rng>(&mut self, now: SimTime, rng: &mut R) -> (SimTime, u64) {
        let duration = self.on.sample(rng).max(Duration::from_nanos(1));
        let bytes = self.rate.bytes_in(duration).saturating_add(self.residual);

        self.residual = bytes % self.packet_size;
        (now + duration, bytes / self.packet_size)
    }

    pub(super) fn fire<R: Rng>(&mut self, now: SimTime, rng: &mut R) -> Firing {
        if now < self.window.start() {
            return Firing::idle(Some(self.window.start()));
        }
        if !self.window.contains(now) || self.budget_left() == 0 {
            return Firing::idle(None);
        }

        if self.phase == Phase::Idle {
            self.phase = Phase::Off;
            let wait = self.off.sample(rng);
            if !wait.is_zero() {
                let next = now + wait;
                return Firing::idle(self.window.contains(next).then_some(next));
            }
        }

        let (ends, remaining) = match self.phase {
            Phase::On { ends, remaining } => (ends, remaining),
            Phase::Idle | Phase::Off => self.switch_on(now, rng),
        };

        let packets = self.burst.min(remaining).min(self.budget_left());
        let remaining = remaining - packets;
        self.sent += packets;

        let next = if remaining > 0 {
            self.phase = Phase::On { ends, remaining };
            let gap = self.rate.serialization_time(packets * self.packet_size);
            now + gap
        } else {
            self.phase = Phase::Off;
            ends.max(now) + self.off.sample(rng)
        };

        let next = (self.budget_left() > 0 && self.window.contains(next)).then_some(next);

        Firing {
            packets,
            packet_size: self.packet_size,
            next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaChaRng;
    use rand_core::SeedableRng as _;

    fn rng() -> ChaChaRng {
        ChaChaRng::seed_from_u64(7)
    }

    /// every emission as `(time, packets)`
    fn run(mut source: OnOffSource) -> Vec<(SimTime, u64)> {
        let mut rng = rng();
        let mut emitted = Vec::new();
        let mut next = Some(source.window().start());

        while let Some(now) = next {
            let firing = source.fire(now, &mut rng);
            if firing.packets > 0 {
                emitted.push((now, firing.packets));
            }
            next = firing.next;
        }

        emitted
    }

    fn total(emitted: &[(SimTime, u64)]) -> u64 {
        emitted.iter().map(|(_, n)| n).sum()
    }

    #[test]
    fn always_on_matches_the_rate() {
        let window = ActiveWindow::new(SimTime::from_secs(5), SimTime::from_secs(7)).unwrap();
        let source = OnOffSource::new(Bandwidth::from_mbps(50), 1_024, window).unwrap();

        let emitted = run(source);

        // 6_250_000 bytes per second: 6_103 packets and 528 bytes carried
        // over, enough for one more packet in the second period
        assert_eq!(total(&emitted), 6_103 + 6_104);
        assert_eq!(emitted[0].0, SimTime::from_secs(5));
        assert!(emitted.iter().all(|(t, _)| window.contains(*t)));

        // paced: 1024 bytes at 50Mbps is 163.84µs
        assert_eq!(
            emitted[1].0,
            SimTime::from_secs(5) + Duration::from_nanos(163_840)
        );
    }

    #[test]
    fn single_burst_per_period() {
        let window = ActiveWindow::new(SimTime::ZERO, SimTime::from_secs(3)).unwrap();
        let source = OnOffSource::new(Bandwidth::from_kbps(8), 100, window)
            .unwrap()
            .with_burst(u64::MAX)
            .unwrap();

        let emitted = run(source);

        // 1_000 bytes per second, 10 packets, all at the start of the period
        assert_eq!(
            emitted,
            vec![
                (SimTime::from_secs(0), 10),
                (SimTime::from_secs(1), 10),
                (SimTime::from_secs(2), 10),
            ]
        );
    }

    #[test]
    fn off_periods_are_silent() {
        let window = ActiveWindow::new(SimTime::ZERO, SimTime::from_secs(4)).unwrap();
        let source = OnOffSource::new(Bandwidth::from_kbps(8), 100, window)
            .unwrap()
            .with_timing(
                Timing::constant(Duration::from_secs(1)),
                Timing::constant(Duration::from_secs(1)),
            )
            .unwrap();

        let emitted = run(source);

        // off [0, 1), on [1, 2), off [2, 3), on [3, 4)
        assert_eq!(total(&emitted), 20);
        assert_eq!(emitted[0].0, SimTime::from_secs(1));
        let in_off = |(t, _): &&(SimTime, u64)| {
            *t < SimTime::from_secs(1)
                || (*t >= SimTime::from_secs(2) && *t < SimTime::from_secs(3))
        };
        assert_eq!(emitted.iter().filter(in_off).count(), 0);
    }

    #[test]
    fn first_on_period_waits_for_an_off_time() {
        let window = ActiveWindow::new(SimTime::ZERO, SimTime::from_secs(10)).unwrap();
        let off = Timing::exponential(Duration::from_millis(500));
        let source = OnOffSource::new(Bandwidth::from_kbps(8), 100, window)
            .unwrap()
            .with_timing(Timing::constant(Duration::from_secs(1)), off)
            .unwrap();

        // the off time is the first value drawn from the generator
        let wait = off.sample(&mut rng());
        assert!(wait > Duration::ZERO);

        let emitted = run(source);
        assert_eq!(emitted[0].0, SimTime::ZERO + wait);
    }

    #[test]
    fn off_time_past_the_window_never_sends() {
        let window = ActiveWindow::new(SimTime::ZERO, SimTime::from_secs(1)).unwrap();
        let source = OnOffSource::new(Bandwidth::from_kbps(8), 100, window)
            .unwrap()
            .with_timing(
                Timing::constant(Duration::from_secs(1)),
                Timing::constant(Duration::from_secs(2)),
            )
            .unwrap();

        assert!(run(source).is_empty());
    }

    #[test]
    fn budget() {
        let window = ActiveWindow::starting_at(SimTime::ZERO);
        let source = OnOffSource::new(Bandwidth::from_mbps(50), 1_024, window)
            .unwrap()
            .with_burst(3)
            .unwrap()
            .with_budget(10);

        let emitted = run(source);

        assert_eq!(total(&emitted), 10);
        assert_eq!(emitted.last().map(|(_, n)| *n), Some(1));
    }

    #[test]
    fn exponential_timing() {
        let timing = Timing::exponential(Duration::from_millis(100));
        let mut rng = rng();

        let samples: Vec<_> = (0..10_000).map(|_| timing.sample(&mut rng)).collect();
        let mean = samples.iter().sum::<Duration>() / samples.len() as u32;

        assert!(
            mean > Duration::from_millis(90) && mean < Duration::from_millis(110),
            "mean was {mean:?}"
        );
    }

    #[test]
    fn invalid() {
        let window = ActiveWindow::starting_at(SimTime::ZERO);

        assert_eq!(
            OnOffSource::new(Bandwidth::ZERO, 1_024, window),
            Err(ConfigError::ZeroRate)
        );
        assert_eq!(
            OnOffSource::new(Bandwidth::from_mbps(1), 0, window),
            Err(ConfigError::ZeroPacketSize)
        );

        let source = OnOffSource::new(Bandwidth::from_mbps(1), 1_024, window).unwrap();
        assert_eq!(
            source.clone().with_timing(
                Timing::constant(Duration::ZERO),
                Timing::constant(Duration::ZERO)
            ),
            Err(ConfigError::ZeroOnDuration)
        );
        assert_eq!(source.with_burst(0), Err(ConfigError::ZeroBurst));
    }
}
