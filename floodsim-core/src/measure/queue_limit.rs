use anyhow::{bail, ensure};
use logos::{Lexer, Logos};
use std::{fmt, str::FromStr};

/// Maximum occupancy of a link's transmission queue.
///
/// The limit applies to the packets waiting for the transmitter, the one
/// currently on the wire has left the queue. A packet that would push the
/// occupancy above the limit is dropped on arrival: this is a drop-tail
/// queue.
///
/// ```
/// # use floodsim_core::measure::QueueLimit;
/// let limit: QueueLimit = "100p".parse().unwrap();
/// assert_eq!(limit, QueueLimit::Packets(100));
///
/// // a packet is admitted while the queue is below the limit
/// assert!(limit.admits(99, 99 * 1_024, 1_024));
/// assert!(!limit.admits(100, 100 * 1_024, 1_024));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueLimit {
    /// at most this many packets
    Packets(u64),
    /// at most this many bytes
    Bytes(u64),
}

impl QueueLimit {
    /// check that a packet of `packet_size` bytes fits in a queue that
    /// already holds `packets` packets totalling `bytes` bytes.
    pub fn admits(&self, packets: u64, bytes: u64, packet_size: u64) -> bool {
        match *self {
            Self::Packets(max) => packets.saturating_add(1) <= max,
            Self::Bytes(max) => bytes.saturating_add(packet_size) <= max,
        }
    }

    /// a limit of `0` cannot hold anything
    pub fn is_zero(&self) -> bool {
        matches!(self, Self::Packets(0) | Self::Bytes(0))
    }
}

impl Default for QueueLimit {
    fn default() -> Self {
        crate::defaults::DEFAULT_QUEUE_LIMIT
    }
}

impl fmt::Display for QueueLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Packets(n) => write!(f, "{n}p"),
            Self::Bytes(n) => write!(f, "{n}B"),
        }
    }
}

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\n\f]+")]
enum QueueLimitToken {
    #[regex("p|packets?")]
    Packets,
    #[token("B")]
    Bytes,
    #[token("KB")]
    KiloBytes,
    #[token("MB")]
    MegaBytes,

    #[regex("[0-9]+")]
    Value,
}

impl FromStr for QueueLimit {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lex = Lexer::<'_, QueueLimitToken>::new(s);

        let Some(Ok(QueueLimitToken::Value)) = lex.next() else {
            bail!("Expecting to parse a number")
        };
        let number: u64 = lex.slice().parse()?;
        let Some(Ok(token)) = lex.next() else {
            bail!("Expecting to parse a unit (p, B, KB, MB)")
        };
        let limit = match token {
            QueueLimitToken::Packets => Self::Packets(number),
            QueueLimitToken::Bytes => Self::Bytes(number),
            QueueLimitToken::KiloBytes => Self::Bytes(number.saturating_mul(1_000)),
            QueueLimitToken::MegaBytes => Self::Bytes(number.saturating_mul(1_000_000)),
            QueueLimitToken::Value => bail!("Expecting to parse a unit (p, B, KB, MB)"),
        };

        ensure!(
            lex.next().is_none(),
            "Not expecting any other tokens to parse a queue limit"
        );

        Ok(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        assert_eq!("100p".parse::<QueueLimit>().unwrap(), QueueLimit::Packets(100));
        assert_eq!(
            "1 packet".parse::<QueueLimit>().unwrap(),
            QueueLimit::Packets(1)
        );
        assert_eq!("1500B".parse::<QueueLimit>().unwrap(), QueueLimit::Bytes(1_500));
        assert_eq!("64KB".parse::<QueueLimit>().unwrap(), QueueLimit::Bytes(64_000));
        assert!("64".parse::<QueueLimit>().is_err());
        assert!("p".parse::<QueueLimit>().is_err());
    }

    #[test]
    fn display() {
        assert_eq!(QueueLimit::Packets(100).to_string(), "100p");
        assert_eq!(QueueLimit::Bytes(64_000).to_string(), "64000B");
    }

    #[test]
    fn admits_bytes() {
        let limit = QueueLimit::Bytes(1_000);
        assert!(limit.admits(0, 0, 1_000));
        assert!(!limit.admits(0, 0, 1_001));
        assert!(limit.admits(5, 500, 500));
        assert!(!limit.admits(5, 501, 500));
    }

    #[test]
    fn zero_limit() {
        assert!(QueueLimit::Packets(0).is_zero());
        assert!(QueueLimit::Bytes(0).is_zero());
        assert!(!QueueLimit::Packets(1).is_zero());
        assert!(!QueueLimit::Packets(0).admits(0, 0, 1));
    }
}
