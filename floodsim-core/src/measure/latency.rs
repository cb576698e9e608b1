use std::{fmt, str::FromStr, time::Duration};

/// The one-way propagation delay of a link: how long the last bit of a
/// packet takes to reach the other end once it has been put on the wire.
///
/// # Default [`Latency`]
///
/// ```
/// # use floodsim_core::measure::Latency;
/// assert_eq!(
///     Latency::default().to_string(),
///     "2ms"
/// )
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Latency(Duration);

impl Latency {
    /// The `0` latency. I.e. no latency.
    pub const ZERO: Self = Self::new(Duration::ZERO);

    /// create a new latency with the given [`Duration`].
    #[inline(always)]
    pub const fn new(duration: Duration) -> Self {
        Self(duration)
    }

    #[inline(always)]
    pub const fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    /// get the inner duration
    #[inline(always)]
    pub fn into_duration(self) -> Duration {
        self.0
    }
}

impl From<Latency> for Duration {
    fn from(value: Latency) -> Self {
        value.into_duration()
    }
}
impl From<Duration> for Latency {
    fn from(value: Duration) -> Self {
        Self::new(value)
    }
}

impl Default for Latency {
    fn default() -> Self {
        crate::defaults::DEFAULT_ACCESS_LATENCY
    }
}

impl fmt::Display for Latency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&crate::time::Duration::new(self.0), f)
    }
}

impl FromStr for Latency {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let duration = crate::time::Duration::from_str(s)?;

        Ok(Self::new(duration.into_duration()))
    }
}
