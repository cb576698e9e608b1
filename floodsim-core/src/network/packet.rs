use crate::time::SimTime;
use anyhow::{Result, bail, ensure};
use std::{fmt, net::SocketAddrV4};

/// a generator for monotonicaly increasing **unique** [`PacketId`]
///
/// The generator is owned by the simulation run, there is one per run.
#[derive(Debug, Clone)]
pub struct PacketIdGenerator(u64);

/// # [`Packet`] Identifier
///
/// During the lifetime of the packet, this identifier can uniquely
/// identify the packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PacketId(u64);

/// Transport protocol tag of a [`Packet`], part of the flow identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Protocol {
    #[default]
    Udp,
    Tcp,
}

/// # A simulated packet
///
/// Only the headers matter to the simulation: the endpoints, the
/// protocol, the size on the wire and the time it was handed to the
/// network. There is no payload.
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    id: PacketId,
    seq: u64,
    src: SocketAddrV4,
    dst: SocketAddrV4,
    protocol: Protocol,
    size: u64,
    sent_at: SimTime,
}

pub struct PacketBuilder<'a> {
    generator: &'a mut PacketIdGenerator,
    seq: u64,
    src: Option<SocketAddrV4>,
    dst: Option<SocketAddrV4>,
    protocol: Protocol,
    size: u64,
    sent_at: Option<SimTime>,
}

impl PacketIdGenerator {
    pub fn new() -> Self {
        Self(1)
    }

    /// generate a new unique identifier
    pub fn generate(&mut self) -> PacketId {
        let id = self.0;
        self.0 = self.0.wrapping_add(1);

        debug_assert!(
            id != 0,
            "the generator wrapped around, more than `u64::MAX` packets were generated"
        );

        PacketId(id)
    }
}

impl Default for PacketIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Udp => f.write_str("UDP"),
            Self::Tcp => f.write_str("TCP"),
        }
    }
}

impl<'a> PacketBuilder<'a> {
    pub fn new(generator: &'a mut PacketIdGenerator) -> Self {
        Self {
            generator,
            seq: 0,
            src: None,
            dst: None,
            protocol: Protocol::default(),
            size: 0,
            sent_at: None,
        }
    }

    pub fn src(mut self, src: SocketAddrV4) -> Self {
        self.src = Some(src);
        self
    }

    pub fn dst(mut self, dst: SocketAddrV4) -> Self {
        self.dst = Some(dst);
        self
    }

    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// sequence number of the packet within its source
    pub fn seq(mut self, seq: u64) -> Self {
        self.seq = seq;
        self
    }

    pub fn size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn sent_at(mut self, sent_at: SimTime) -> Self {
        self.sent_at = Some(sent_at);
        self
    }

    pub fn build(self) -> Result<Packet> {
        let Some(src) = self.src else {
            bail!("Missing sender information (`src')")
        };
        let Some(dst) = self.dst else {
            bail!("Missing recipient information (`dst')")
        };
        let Some(sent_at) = self.sent_at else {
            bail!("Missing send time (`sent_at')")
        };
        ensure!(self.size > 0, "A packet cannot be empty (`size' is 0)");

        let id = self.generator.generate();

        Ok(Packet {
            id,
            seq: self.seq,
            src,
            dst,
            protocol: self.protocol,
            size: self.size,
            sent_at,
        })
    }
}

impl Packet {
    pub fn builder(generator: &mut PacketIdGenerator) -> PacketBuilder<'_> {
        PacketBuilder::new(generator)
    }

    pub fn id(&self) -> PacketId {
        self.id
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn src(&self) -> SocketAddrV4 {
        self.src
    }

    pub fn dst(&self) -> SocketAddrV4 {
        self.dst
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// size of the packet on the wire, in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// time the packet was handed to the first link of its route
    pub fn sent_at(&self) -> SimTime {
        self.sent_at
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("id", &self.id)
            .field("seq", &self.seq)
            .field("src", &self.src.to_string())
            .field("dst", &self.dst.to_string())
            .field("protocol", &self.protocol)
            .field("size", &self.size)
            .field("sent_at", &self.sent_at.to_string())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const SRC: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(10, 1, 1, 1), 49153);
    const DST: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(10, 3, 0, 2), 4000);

    #[test]
    fn generator_is_monotonic() {
        let mut generator = PacketIdGenerator::new();
        let a = generator.generate();
        let b = generator.generate();
        assert!(a < b);
        assert_eq!(a.to_string(), "p1");
    }

    #[test]
    fn build() {
        let mut generator = PacketIdGenerator::new();
        let packet = Packet::builder(&mut generator)
            .src(SRC)
            .dst(DST)
            .seq(7)
            .size(128)
            .sent_at(SimTime::from_secs(2))
            .build()
            .unwrap();

        assert_eq!(packet.src(), SRC);
        assert_eq!(packet.dst(), DST);
        assert_eq!(packet.protocol(), Protocol::Udp);
        assert_eq!(packet.seq(), 7);
        assert_eq!(packet.size(), 128);
        assert_eq!(packet.sent_at(), SimTime::from_secs(2));
    }

    #[test]
    fn missing_fields() {
        let mut generator = PacketIdGenerator::new();

        assert!(Packet::builder(&mut generator).dst(DST).size(1).build().is_err());
        assert!(Packet::builder(&mut generator).src(SRC).size(1).build().is_err());
        assert!(
            Packet::builder(&mut generator)
                .src(SRC)
                .dst(DST)
                .sent_at(SimTime::ZERO)
                .build()
                .is_err()
        );

        // failed builds do not consume identifiers
        assert_eq!(generator.generate(), PacketId(1));
    }

    #[test]
    fn protocol_display() {
        assert_eq!(Protocol::Udp.to_string(), "UDP");
        assert_eq!(Protocol::Tcp.to_string(), "TCP");
    }
}
