use rand_core::Rng;
use std::{fmt, str::FromStr};

/// Random, congestion-independent loss applied to every packet put on a
/// link (bit errors, a flaky radio hop, ...).
///
/// Congestion losses are not configured here: they are the natural
/// outcome of a link's [`QueueLimit`]. By default links are loss free.
///
/// ```
/// use floodsim_core::measure::PacketLoss;
///
/// let lossy = PacketLoss::rate(0.05).unwrap();
/// assert_eq!(lossy.to_string(), "5%");
///
/// let parsed: PacketLoss = "5%".parse().unwrap();
/// assert_eq!(parsed, lossy);
/// ```
///
/// [`QueueLimit`]: crate::measure::QueueLimit
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub enum PacketLoss {
    #[default]
    None,
    /// Each packet is independently dropped with the given probability.
    Rate(PacketLossRate),
}

/// A loss probability, guaranteed to be in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacketLossRate(f64);

impl PacketLoss {
    /// # Errors
    ///
    /// Returns an error if `rate` is not in `[0.0, 1.0]` (including NaN).
    pub fn rate(rate: f64) -> Result<Self, PacketLossRateError> {
        Ok(PacketLoss::Rate(PacketLossRate::new(rate)?))
    }

    /// Draw whether the next packet is lost.
    ///
    /// The randomness comes from the caller so that every loss decision of
    /// a run is taken from the single seeded generator of the
    /// [`Simulation`](crate::simulation::Simulation).
    pub fn should_drop<R: Rng>(&self, rng: &mut R) -> bool {
        match self {
            PacketLoss::None => false,
            PacketLoss::Rate(rate) => crate::measure::unit_sample(rng) < rate.0,
        }
    }
}

impl fmt::Display for PacketLoss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketLoss::None => write!(f, "0%"),
            PacketLoss::Rate(rate) => write!(f, "{rate}"),
        }
    }
}

impl FromStr for PacketLoss {
    type Err = PacketLossParseError;

    /// Parses a percentage such as `"0%"`, `"5%"` or `"12.5%"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some(num) = s.strip_suffix('%') else {
            return Err(PacketLossParseError::MissingSuffix);
        };
        let pct: f64 = num
            .trim()
            .parse()
            .map_err(|_| PacketLossParseError::InvalidNumber)?;
        let rate = pct / 100.0;
        if rate == 0.0 {
            return Ok(PacketLoss::None);
        }
        PacketLoss::rate(rate).map_err(PacketLossParseError::OutOfRange)
    }
}

impl fmt::Display for PacketLossRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pct = self.0 * 100.0;
        if pct.fract() == 0.0 {
            write!(f, "{}%", pct as u64)
        } else {
            write!(f, "{:.2}%", pct)
        }
    }
}

impl PacketLossRate {
    pub fn new(rate: f64) -> Result<Self, PacketLossRateError> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(PacketLossRateError(rate));
        }
        Ok(Self(rate))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("packet loss rate must be in [0.0, 1.0], got {0}")]
pub struct PacketLossRateError(f64);

#[derive(Debug, Clone, thiserror::Error)]
pub enum PacketLossParseError {
    #[error("expected '%' suffix")]
    MissingSuffix,
    #[error("invalid number before '%'")]
    InvalidNumber,
    #[error("{0}")]
    OutOfRange(#[from] PacketLossRateError),
}
