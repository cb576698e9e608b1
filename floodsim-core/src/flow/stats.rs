use crate::{link::DropReason, network::Packet, time::SimTime};
use std::time::Duration;

/// Running counters of a single flow.
///
/// Only raw sums are kept here. Averages, loss ratio and throughput are
/// derived on demand by [`FlowMetrics`].
///
/// [`FlowMetrics`]: crate::qos::FlowMetrics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowStats {
    pub tx_packets: u64,
    pub tx_bytes: u64,
    pub rx_packets: u64,
    pub rx_bytes: u64,
    pub drops: DropCounters,

    /// sum of the one-way delay of every received packet
    pub delay_sum: Duration,
    /// sum of the delay variation between consecutive received packets
    pub jitter_sum: Duration,
    /// one-way delay of the last received packet
    pub last_delay: Option<Duration>,

    pub first_tx: Option<SimTime>,
    pub last_tx: Option<SimTime>,
    pub first_rx: Option<SimTime>,
    pub last_rx: Option<SimTime>,
}

/// Number of dropped packets, per [`DropReason`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropCounters {
    pub queue_overflow: u64,
    pub random_loss: u64,
    pub no_listener: u64,
    pub in_flight_at_end: u64,
}

impl DropCounters {
    pub fn get(&self, reason: DropReason) -> u64 {
        match reason {
            DropReason::QueueOverflow => self.queue_overflow,
            DropReason::RandomLoss => self.random_loss,
            DropReason::NoListener => self.no_listener,
            DropReason::InFlightAtEnd => self.in_flight_at_end,
        }
    }

    fn add(&mut self, reason: DropReason) {
        let counter = match reason {
            DropReason::QueueOverflow => &mut self.queue_overflow,
            DropReason::RandomLoss => &mut self.random_loss,
            DropReason::NoListener => &mut self.no_listener,
            DropReason::InFlightAtEnd => &mut self.in_flight_at_end,
        };
        *counter += 1;
    }

    pub fn total(&self) -> u64 {
        self.queue_overflow + self.random_loss + self.no_listener + self.in_flight_at_end
    }
}

impl FlowStats {
    pub fn dropped_packets(&self) -> u64 {
        self.drops.total()
    }

    /// packets sent and neither received nor dropped yet
    pub fn in_flight(&self) -> u64 {
        self.tx_packets
            .saturating_sub(self.rx_packets + self.dropped_packets())
    }

    pub(crate) fn on_send(&mut self, packet: &Packet) {
        let at = packet.sent_at();

        self.tx_packets += 1;
        self.tx_bytes += packet.size();
        self.first_tx.get_or_insert(at);
        self.last_tx = Some(at);
    }

    pub(crate) fn on_arrival(&mut self, packet: &Packet, at: SimTime) {
        let delay = at.saturating_duration_since(packet.sent_at());

        self.rx_packets += 1;
        self.rx_bytes += packet.size();
        self.delay_sum += delay;
        if let Some(previous) = self.last_delay {
            self.jitter_sum += delay.abs_diff(previous);
        }
        self.last_delay = Some(delay);

        self.first_rx.get_or_insert(at);
        self.last_rx = Some(at);
    }

    pub(crate) fn on_drop(&mut self, reason: DropReason) {
        self.drops.add(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::PacketIdGenerator;

    fn packet(generator: &mut PacketIdGenerator, sent_at: SimTime) -> Packet {
        Packet::builder(generator)
            .src("10.1.1.1:49153".parse().unwrap())
            .dst("10.3.0.2:4000".parse().unwrap())
            .size(128)
            .sent_at(sent_at)
            .build()
            .unwrap()
    }

    #[test]
    fn delay_and_jitter() {
        let mut generator = PacketIdGenerator::new();
        let mut stats = FlowStats::default();

        // delays: 12ms, 15ms, 13ms
        for (sent, received) in [(0, 12), (20, 35), (40, 53)] {
            let p = packet(&mut generator, SimTime::from_millis(sent));
            stats.on_send(&p);
            stats.on_arrival(&p, SimTime::from_millis(received));
        }

        assert_eq!(stats.tx_packets, 3);
        assert_eq!(stats.rx_packets, 3);
        assert_eq!(stats.rx_bytes, 384);
        assert_eq!(stats.delay_sum, Duration::from_millis(40));
        assert_eq!(stats.jitter_sum, Duration::from_millis(3 + 2));
        assert_eq!(stats.first_rx, Some(SimTime::from_millis(12)));
        assert_eq!(stats.last_rx, Some(SimTime::from_millis(53)));
        assert_eq!(stats.first_tx, Some(SimTime::ZERO));
        assert_eq!(stats.last_tx, Some(SimTime::from_millis(40)));
    }

    #[test]
    fn drops_per_reason() {
        let mut generator = PacketIdGenerator::new();
        let mut stats = FlowStats::default();

        for _ in 0..4 {
            stats.on_send(&packet(&mut generator, SimTime::ZERO));
        }
        stats.on_drop(DropReason::QueueOverflow);
        stats.on_drop(DropReason::QueueOverflow);
        stats.on_drop(DropReason::InFlightAtEnd);

        assert_eq!(stats.drops.get(DropReason::QueueOverflow), 2);
        assert_eq!(stats.drops.get(DropReason::RandomLoss), 0);
        assert_eq!(stats.dropped_packets(), 3);
        assert_eq!(stats.in_flight(), 1);
    }
}
