mod id;

pub use self::id::{DuplexLink, LinkId};
use crate::{
    error::ConfigError,
    measure::{Bandwidth, Latency, PacketLoss, QueueLimit},
    node::NodeId,
    time::SimTime,
};
use rand_core::Rng;
use std::{collections::VecDeque, time::Duration};

/// Parameters shared by both directions of a link.
///
/// ```
/// # use floodsim_core::{link::LinkConfig, measure::QueueLimit};
/// let bottleneck = LinkConfig::default()
///     .set_bandwidth("10Mbps".parse().unwrap())
///     .set_latency("10ms".parse().unwrap())
///     .set_queue_limit(QueueLimit::Packets(100));
/// # assert_eq!(bottleneck.bandwidth().to_string(), "10Mbps");
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkConfig {
    bandwidth: Bandwidth,
    latency: Latency,
    queue_limit: QueueLimit,
    packet_loss: PacketLoss,
}

/// Why a packet never made it to its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// the transmission queue of a link along the route was full
    QueueOverflow,
    /// the link's random [`PacketLoss`] picked this packet
    RandomLoss,
    /// the destination endpoint was not listening when the packet arrived
    NoListener,
    /// the packet was still travelling when the run ended
    InFlightAtEnd,
}

/// One direction of a point to point link: a single FIFO transmission
/// queue draining at `bandwidth`, followed by `latency` of propagation.
///
/// The link only keeps track of when its transmitter becomes idle again
/// (`busy_until`) and of the packets it has accepted but not finished
/// serializing. The first of them is on the wire, the others wait in the
/// queue bounded by the [`QueueLimit`]. Nothing is stored per packet
/// propagating on the wire, the arrival is an event scheduled by the
/// caller.
#[derive(Debug, Clone)]
pub struct Link {
    id: LinkId,
    from: NodeId,
    to: NodeId,
    config: LinkConfig,

    busy_until: SimTime,

    /// `(end of serialization, size)` of every accepted packet not fully
    /// serialized yet, in FIFO order. The front one is on the wire.
    backlog: VecDeque<(SimTime, u64)>,
    /// bytes of the packets waiting behind the one on the wire
    waiting_bytes: u64,

    counters: LinkCounters,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkCounters {
    pub forwarded_packets: u64,
    pub forwarded_bytes: u64,
    pub overflow_drops: u64,
    pub random_drops: u64,
    pub peak_packets: u64,
    pub peak_bytes: u64,
}

/// Outcome of a successful [`Link::transmit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transmission {
    /// time spent waiting behind previously queued packets
    pub queueing: Duration,
    /// time spent putting the packet on the wire
    pub serialization: Duration,
    /// time the last bit reaches the far end of the link
    pub arrival: SimTime,
}

impl LinkConfig {
    pub fn new(bandwidth: Bandwidth, latency: Latency, queue_limit: QueueLimit) -> Self {
        Self {
            bandwidth,
            latency,
            queue_limit,
            packet_loss: PacketLoss::None,
        }
    }

    pub fn set_bandwidth(mut self, bandwidth: Bandwidth) -> Self {
        self.bandwidth = bandwidth;
        self
    }

    pub fn set_latency(mut self, latency: Latency) -> Self {
        self.latency = latency;
        self
    }

    pub fn set_queue_limit(mut self, queue_limit: QueueLimit) -> Self {
        self.queue_limit = queue_limit;
        self
    }

    pub fn set_packet_loss(mut self, packet_loss: PacketLoss) -> Self {
        self.packet_loss = packet_loss;
        self
    }

    pub fn bandwidth(&self) -> Bandwidth {
        self.bandwidth
    }

    pub fn latency(&self) -> Latency {
        self.latency
    }

    pub fn queue_limit(&self) -> QueueLimit {
        self.queue_limit
    }

    pub fn packet_loss(&self) -> PacketLoss {
        self.packet_loss
    }

    /// Reject links that could never carry a packet, or would deliver it
    /// in zero time.
    pub(crate) fn validate(&self, a: NodeId, b: NodeId) -> Result<(), ConfigError> {
        if a == b {
            return Err(ConfigError::SelfLink { node: a });
        }
        if self.bandwidth.is_zero() {
            return Err(ConfigError::ZeroBandwidth { a, b });
        }
        if self.latency == Latency::ZERO {
            return Err(ConfigError::ZeroLatency { a, b });
        }
        if self.queue_limit.is_zero() {
            return Err(ConfigError::ZeroQueueLimit { a, b });
        }
        Ok(())
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::new(
            Bandwidth::default(),
            Latency::default(),
            QueueLimit::default(),
        )
    }
}

impl Link {
    pub(crate) fn new(id: LinkId, from: NodeId, to: NodeId, config: LinkConfig) -> Self {
        Self {
            id,
            from,
            to,
            config,
            busy_until: SimTime::ZERO,
            backlog: VecDeque::new(),
            waiting_bytes: 0,
            counters: LinkCounters::default(),
        }
    }

    #[inline]
    pub fn id(&self) -> LinkId {
        self.id
    }

    #[inline]
    pub fn from(&self) -> NodeId {
        self.from
    }

    #[inline]
    pub fn to(&self) -> NodeId {
        self.to
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn counters(&self) -> &LinkCounters {
        &self.counters
    }

    /// time at which the transmitter is done with everything queued so far
    pub fn busy_until(&self) -> SimTime {
        self.busy_until
    }

    /// number of packets waiting for the transmitter, as of the last
    /// [`Link::transmit`]. The packet on the wire is not counted.
    pub fn queued_packets(&self) -> u64 {
        self.backlog.len().saturating_sub(1) as u64
    }

    /// bytes waiting for the transmitter, as of the last [`Link::transmit`]
    pub fn queued_bytes(&self) -> u64 {
        self.waiting_bytes
    }

    /// Forget the packets whose serialization completed at or before `now`.
    ///
    /// The next packet in line then starts its serialization and leaves
    /// the queue.
    fn drain(&mut self, now: SimTime) {
        while let Some(&(done, _)) = self.backlog.front() {
            if done > now {
                break;
            }
            self.backlog.pop_front();
            if let Some(&(_, bytes)) = self.backlog.front() {
                self.waiting_bytes -= bytes;
            }
        }
    }

    /// Hand a packet of `bytes` to the link at `now`.
    ///
    /// The packet waits for the transmitter to be idle (`queueing`), is put
    /// on the wire (`serialization`) and reaches the other end
    /// `latency` later. If the queue cannot take the packet it is dropped
    /// and the link state is left untouched. An idle transmitter still
    /// needs room in the queue, the packet goes through it.
    ///
    /// A packet picked by the random [`PacketLoss`] still occupies the
    /// queue and the wire: it is lost in transit.
    ///
    /// # Errors
    ///
    /// [`DropReason::QueueOverflow`] or [`DropReason::RandomLoss`].
    pub fn transmit<R: Rng>(
        &mut self,
        bytes: u64,
        now: SimTime,
        rng: &mut R,
    ) -> Result<Transmission, DropReason> {
        self.drain(now);

        if !self
            .config
            .queue_limit
            .admits(self.queued_packets(), self.waiting_bytes, bytes)
        {
            self.counters.overflow_drops += 1;
            return Err(DropReason::QueueOverflow);
        }

        let queueing = self.busy_until.saturating_duration_since(now);
        let serialization = self.config.bandwidth.serialization_time(bytes);
        let done = now + queueing + serialization;

        self.busy_until = done;
        if !self.backlog.is_empty() {
            self.waiting_bytes += bytes;
        }
        self.backlog.push_back((done, bytes));

        self.counters.peak_packets = self.counters.peak_packets.max(self.queued_packets());
        self.counters.peak_bytes = self.counters.peak_bytes.max(self.waiting_bytes);

        if self.config.packet_loss.should_drop(rng) {
            self.counters.random_drops += 1;
            return Err(DropReason::RandomLoss);
        }

        self.counters.forwarded_packets += 1;
        self.counters.forwarded_bytes += bytes;

        Ok(Transmission {
            queueing,
            serialization,
            arrival: done + self.config.latency.into_duration(),
        })
    }
}
