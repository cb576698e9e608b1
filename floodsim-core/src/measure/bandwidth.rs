use anyhow::{bail, ensure};
use logos::{Lexer, Logos};
use std::{fmt, str::FromStr, time::Duration};

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// The rate at which a link serializes bits onto the wire, or at which a
/// traffic source offers data to the network.
///
/// Stored as a number of bits per second. Units follow the usual network
/// convention of decimal multiples: `1Mbps` is `1_000_000` bits per second.
///
/// # Example
///
/// ```
/// # use floodsim_core::measure::Bandwidth;
/// # use std::time::Duration;
/// let bw: Bandwidth = "10Mbps".parse().unwrap();
/// assert_eq!(bw, Bandwidth::from_mbps(10));
///
/// // 1024 bytes take 819.2µs to go through a 10Mbps link
/// assert_eq!(
///     bw.serialization_time(1_024),
///     Duration::from_nanos(819_200),
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bandwidth(u64);

impl Bandwidth {
    /// the `0` bandwidth, nothing can go through
    pub const ZERO: Self = Self(0);

    /// the maximum bandwidth available
    pub const MAX: Self = Self(u64::MAX);

    /// create a new [`Bandwidth`] of `bits_per_sec` bits per second
    pub const fn new(bits_per_sec: u64) -> Self {
        Self(bits_per_sec)
    }

    pub const fn from_kbps(kbps: u64) -> Self {
        Self(kbps * 1_000)
    }

    pub const fn from_mbps(mbps: u64) -> Self {
        Self(mbps * 1_000_000)
    }

    pub const fn from_gbps(gbps: u64) -> Self {
        Self(gbps * 1_000_000_000)
    }

    #[inline]
    pub const fn bits_per_sec(&self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Returns how long it takes to push `bytes` onto the wire.
    ///
    /// The result is rounded up to the next nanosecond so that a non-empty
    /// packet never takes zero time. A [`Bandwidth::ZERO`] never completes
    /// and returns [`Duration::MAX`].
    pub fn serialization_time(&self, bytes: u64) -> Duration {
        if self.0 == 0 {
            return Duration::MAX;
        }
        let bits = (bytes as u128).saturating_mul(8);
        let bps = self.0 as u128;
        let nanos = (bits.saturating_mul(NANOS_PER_SEC) + (bps - 1)) / bps;

        Duration::from_nanos(nanos.min(u64::MAX as u128) as u64)
    }

    /// Returns how many bytes this bandwidth delivers during `elapsed`.
    ///
    /// ```
    /// # use floodsim_core::measure::Bandwidth;
    /// # use std::time::Duration;
    /// let bw = Bandwidth::from_mbps(50);
    /// assert_eq!(bw.bytes_in(Duration::from_secs(1)), 6_250_000);
    /// ```
    pub fn bytes_in(&self, elapsed: Duration) -> u64 {
        let bits = (self.0 as u128).saturating_mul(elapsed.as_nanos()) / NANOS_PER_SEC;
        (bits / 8).min(u64::MAX as u128) as u64
    }
}

impl Default for Bandwidth {
    fn default() -> Self {
        crate::defaults::DEFAULT_ACCESS_BANDWIDTH
    }
}

const K: u64 = 1_000;
const M: u64 = 1_000_000;
const G: u64 = 1_000_000_000;

impl fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;

        if v >= G && v % G == 0 {
            write!(f, "{}Gbps", v / G)
        } else if v >= M && v % M == 0 {
            write!(f, "{}Mbps", v / M)
        } else if v >= K && v % K == 0 {
            write!(f, "{}Kbps", v / K)
        } else {
            write!(f, "{v}bps")
        }
    }
}

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\n\f]+")]
enum BandwidthToken {
    #[regex("bps")]
    Bps,
    #[regex("[kK]bps")]
    Kbps,
    #[regex("[mM]bps")]
    Mbps,
    #[regex("[gG]bps")]
    Gbps,

    #[regex("[0-9]+")]
    Value,
}

impl FromStr for Bandwidth {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lex = Lexer::<'_, BandwidthToken>::new(s);

        let Some(Ok(BandwidthToken::Value)) = lex.next() else {
            bail!("Expecting to parse a number")
        };
        let number: u64 = lex.slice().parse()?;
        let Some(Ok(token)) = lex.next() else {
            bail!("Expecting to parse a unit")
        };
        let bps = match token {
            BandwidthToken::Bps => Some(number),
            BandwidthToken::Kbps => number.checked_mul(K),
            BandwidthToken::Mbps => number.checked_mul(M),
            BandwidthToken::Gbps => number.checked_mul(G),
            BandwidthToken::Value => bail!("Expecting to parse a unit (bps, Kbps, Mbps, Gbps)"),
        };
        let Some(bps) = bps else {
            bail!("Bandwidth `{s}' is too large")
        };

        ensure!(
            lex.next().is_none(),
            "Not expecting any other tokens to parse a bandwidth"
        );

        Ok(Self::new(bps))
    }
}
