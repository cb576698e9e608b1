use crate::measure::{Bandwidth, Latency, QueueLimit};
use std::time::Duration;

/// Default [`Bandwidth`] of an access link (client or attacker to router).
///
/// ```
/// # use floodsim_core::defaults::*;
/// assert_eq!(DEFAULT_ACCESS_BANDWIDTH.to_string(), "100Mbps");
/// ```
pub const DEFAULT_ACCESS_BANDWIDTH: Bandwidth = Bandwidth::from_mbps(100);

/// Default [`Latency`] of an access link.
///
/// ```
/// # use floodsim_core::defaults::*;
/// assert_eq!(DEFAULT_ACCESS_LATENCY.to_string(), "2ms");
/// ```
pub const DEFAULT_ACCESS_LATENCY: Latency = Latency::from_millis(2);

/// Default [`Bandwidth`] of the router to server link, the bottleneck.
pub const DEFAULT_BOTTLENECK_BANDWIDTH: Bandwidth = Bandwidth::from_mbps(10);

/// Default [`Latency`] of the router to server link.
pub const DEFAULT_BOTTLENECK_LATENCY: Latency = Latency::from_millis(10);

/// Default transmission queue of every link: a 100 packets drop-tail queue.
pub const DEFAULT_QUEUE_LIMIT: QueueLimit = QueueLimit::Packets(100);

/// Port the game server listens on.
pub const DEFAULT_SERVER_PORT: u16 = 4_000;

/// Size of a game client update.
pub const DEFAULT_CLIENT_PACKET_SIZE: u64 = 128;

/// Interval between two game client updates.
pub const DEFAULT_CLIENT_INTERVAL: Duration = Duration::from_millis(20);

/// Maximum number of updates a game client sends.
pub const DEFAULT_CLIENT_MAX_PACKETS: u64 = 1_000_000;

/// Rate at which every attacker floods the server while "on".
pub const DEFAULT_ATTACK_RATE: Bandwidth = Bandwidth::from_mbps(50);

/// Size of a flood packet.
pub const DEFAULT_ATTACK_PACKET_SIZE: u64 = 1_024;

/// Seed of the simulation random number generator.
pub const DEFAULT_SEED: u64 = 0;
