use anyhow::{Result, anyhow, bail, ensure};
use core::fmt;
use logos::{Lexer, Logos};
use std::{
    ops::{Add, AddAssign},
    str::FromStr,
    time,
};

/// A point on the simulated timeline.
///
/// Simulation time starts at [`SimTime::ZERO`] when the [`Scheduler`] is
/// created and only ever moves forward as events are executed. It has
/// nothing to do with the wall clock: a 60 seconds scenario completes as
/// fast as the host can process the events.
///
/// The resolution is the nanosecond, which is enough to represent the
/// serialization time of a single byte on a 1 Gbps link exactly.
///
/// [`Scheduler`]: crate::scheduler::Scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimTime(time::Duration);

impl SimTime {
    /// the origin of the simulated timeline
    pub const ZERO: Self = Self(time::Duration::ZERO);

    /// the furthest representable point in time
    pub const MAX: Self = Self(time::Duration::MAX);

    /// create a [`SimTime`] located `elapsed` after the origin.
    ///
    /// ```
    /// # use floodsim_core::time::SimTime;
    /// # use std::time::Duration;
    /// let t = SimTime::from_duration(Duration::from_secs(2));
    /// assert_eq!(t.as_secs_f64(), 2.0);
    /// ```
    #[inline]
    pub const fn from_duration(elapsed: time::Duration) -> Self {
        Self(elapsed)
    }

    /// create a [`SimTime`] located `secs` seconds after the origin.
    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        Self(time::Duration::from_secs(secs))
    }

    /// create a [`SimTime`] located `millis` milliseconds after the origin.
    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Self(time::Duration::from_millis(millis))
    }

    /// the time elapsed since the origin of the simulation.
    #[inline]
    pub const fn elapsed(self) -> time::Duration {
        self.0
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0.as_secs_f64()
    }

    /// Returns the amount of time elapsed from `earlier` to `self`, or
    /// [`None`] if `earlier` is later than `self`.
    #[inline]
    pub fn checked_duration_since(self, earlier: Self) -> Option<time::Duration> {
        self.0.checked_sub(earlier.0)
    }

    /// Returns the amount of time elapsed from `earlier` to `self`, or
    /// zero if `earlier` is later than `self`.
    #[inline]
    pub fn saturating_duration_since(self, earlier: Self) -> time::Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<time::Duration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: time::Duration) -> Self::Output {
        Self(self.0.saturating_add(rhs))
    }
}

impl AddAssign<time::Duration> for SimTime {
    fn add_assign(&mut self, rhs: time::Duration) {
        *self = *self + rhs;
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Duration::new(self.0), f)
    }
}

impl FromStr for SimTime {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Duration>().map(|d| Self(d.into_duration()))
    }
}

/// Human readable [`std::time::Duration`]: `"2ms"`, `"1s 500ms"`, ...
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub(crate) struct Duration(time::Duration);

impl Duration {
    pub(crate) fn new(dur: time::Duration) -> Self {
        Self(dur)
    }

    #[inline]
    pub fn into_duration(self) -> time::Duration {
        self.0
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <time::Duration as fmt::Debug>::fmt(&self.0, f)
    }
}

impl FromStr for Duration {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lex = Lexer::new(s);

        let mut durations = Vec::new();

        while let Some(next) = lex.next() {
            let number: Token = next.map_err(|()| anyhow!("Failed to parse: {s}"))?;

            ensure!(
                number == Token::Value,
                "Expecting duration to starts with number. Cannot parse {s}"
            );
            let number: u64 = lex.slice().parse()?;

            let Some(Ok(measure)) = lex.next() else {
                bail!("Expecting a measure, failed to parse: {s}")
            };
            let duration = match measure {
                Token::NanoSeconds => time::Duration::from_nanos(number),
                Token::MicroSeconds => time::Duration::from_micros(number),
                Token::MilliSeconds => time::Duration::from_millis(number),
                Token::Seconds => time::Duration::from_secs(number),
                Token::Minutes => time::Duration::from_secs(number * 60),
                Token::Value => bail!("Failed to parse `{s}', expecting a measure."),
            };
            durations.push(duration);
        }

        ensure!(!durations.is_empty(), "Empty duration");

        Ok(Self(durations.into_iter().sum()))
    }
}

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\n\f]+")]
enum Token {
    #[token("ns")]
    NanoSeconds,
    #[regex("us|µs|μs")]
    MicroSeconds,
    #[token("ms")]
    MilliSeconds,
    #[token("s")]
    Seconds,
    #[token("m")]
    Minutes,

    #[regex("[0-9]+")]
    Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logos_lexer() {
        let mut lex = Token::lexer("1ns");

        assert_eq!(lex.next(), Some(Ok(Token::Value)));
        assert_eq!(lex.span(), 0..1);
        assert_eq!(lex.slice(), "1");

        assert_eq!(lex.next(), Some(Ok(Token::NanoSeconds)));
        assert_eq!(lex.span(), 1..3);
        assert_eq!(lex.slice(), "ns");
    }

    #[test]
    fn parse() {
        let Duration(duration) = "123ms".parse().unwrap();
        assert_eq!(duration.as_millis(), 123);

        let Duration(duration) = "1s 2000ms 3000000us".parse().unwrap();
        assert_eq!(duration.as_secs(), 6);
    }

    #[test]
    fn parse_empty() {
        assert!("".parse::<Duration>().is_err());
        assert!("12".parse::<Duration>().is_err());
    }

    #[test]
    fn sim_time_arithmetic() {
        let t = SimTime::from_millis(20) + time::Duration::from_millis(5);
        assert_eq!(t, SimTime::from_millis(25));

        assert_eq!(
            t.checked_duration_since(SimTime::from_millis(5)),
            Some(time::Duration::from_millis(20))
        );
        assert_eq!(t.checked_duration_since(SimTime::from_secs(1)), None);
        assert_eq!(
            t.saturating_duration_since(SimTime::from_secs(1)),
            time::Duration::ZERO
        );
    }

    #[test]
    fn sim_time_saturates() {
        assert_eq!(SimTime::MAX + time::Duration::from_secs(1), SimTime::MAX);
    }

    #[test]
    fn sim_time_display() {
        assert_eq!(SimTime::from_millis(1_500).to_string(), "1.5s");
        assert_eq!("2s".parse::<SimTime>().unwrap(), SimTime::from_secs(2));
    }
}
