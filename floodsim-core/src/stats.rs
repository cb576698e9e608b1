//! Link statistics.
//!
//! [`LinkStats`] is a point-in-time snapshot of one directed link.
//! Obtain them via [`Simulation::link_stats`](crate::simulation::Simulation::link_stats).

use crate::{
    link::{Link, LinkId},
    measure::{Bandwidth, Latency, PacketLoss, QueueLimit},
    node::NodeId,
};

/// Snapshot of statistics for a single directed link.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkStats {
    pub id: LinkId,
    pub from: NodeId,
    pub to: NodeId,
    /// Configured bandwidth of this direction.
    pub bandwidth: Bandwidth,
    /// Configured propagation delay.
    pub latency: Latency,
    /// Configured random loss.
    pub packet_loss: PacketLoss,
    /// Configured transmission queue limit.
    pub queue_limit: QueueLimit,
    /// Packets put on the wire and not lost on it.
    pub forwarded_packets: u64,
    pub forwarded_bytes: u64,
    /// Packets refused because the queue was full.
    pub overflow_drops: u64,
    /// Packets lost to [`PacketLoss`].
    pub random_drops: u64,
    /// Highest number of packets ever waiting at once, the one on the
    /// wire excluded.
    pub peak_packets: u64,
    /// Highest number of bytes ever waiting at once.
    pub peak_bytes: u64,
}

impl LinkStats {
    pub(crate) fn new(link: &Link) -> Self {
        let config = link.config();
        let counters = link.counters();

        Self {
            id: link.id(),
            from: link.from(),
            to: link.to(),
            bandwidth: config.bandwidth(),
            latency: config.latency(),
            packet_loss: config.packet_loss(),
            queue_limit: config.queue_limit(),
            forwarded_packets: counters.forwarded_packets,
            forwarded_bytes: counters.forwarded_bytes,
            overflow_drops: counters.overflow_drops,
            random_drops: counters.random_drops,
            peak_packets: counters.peak_packets,
            peak_bytes: counters.peak_bytes,
        }
    }

    /// every packet the link refused or lost
    pub fn dropped_packets(&self) -> u64 {
        self.overflow_drops + self.random_drops
    }

    /// check the peak occupancy never went over the queue limit
    pub fn peak_within_limit(&self) -> bool {
        match self.queue_limit {
            QueueLimit::Packets(max) => self.peak_packets <= max,
            QueueLimit::Bytes(max) => self.peak_bytes <= max,
        }
    }
}
