//! Flow identification, classification and per-flow counters.
//!
//! A flow is the set of packets sharing the same source endpoint,
//! destination endpoint and [`Protocol`]. Flows are discovered from the
//! traffic itself: the [`FlowRegistry`] creates a [`Flow`] the first time
//! a packet with a new [`FlowKey`] is sent, asks the [`FlowClassifier`]
//! what kind of traffic it is, and keeps its [`FlowStats`] up to date for
//! the rest of the run.

mod classifier;
mod stats;

pub use self::{
    classifier::{ClientServerClassifier, FlowClass, FlowClassifier},
    stats::{DropCounters, FlowStats},
};
pub use crate::link::DropReason;
use crate::{
    network::{Packet, Protocol},
    time::SimTime,
};
use std::{collections::HashMap, fmt, net::SocketAddrV4};
use thiserror::Error;
use tracing::trace;

/// The identity of a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlowKey {
    pub src: SocketAddrV4,
    pub dst: SocketAddrV4,
    pub protocol: Protocol,
}

/// Identifier of a [`Flow`], handed out sequentially from `1` in order of
/// first observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlowId(u32);

#[derive(Debug, Clone)]
pub struct Flow {
    id: FlowId,
    key: FlowKey,
    class: FlowClass,
    stats: FlowStats,
}

/// A [`FlowId`] that the registry never handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Flow ({flow}) Not Found, {known} flows are registered")]
pub struct UnknownFlow {
    pub flow: FlowId,
    pub known: usize,
}

/// Every flow observed during a run.
pub struct FlowRegistry {
    classifier: Box<dyn FlowClassifier>,
    flows: Vec<Flow>,
    index: HashMap<FlowKey, FlowId>,
}

impl FlowKey {
    pub fn new(src: SocketAddrV4, dst: SocketAddrV4, protocol: Protocol) -> Self {
        Self { src, dst, protocol }
    }

    pub fn udp(src: SocketAddrV4, dst: SocketAddrV4) -> Self {
        Self::new(src, dst, Protocol::Udp)
    }

    /// the key of the flow `packet` belongs to
    pub fn of(packet: &Packet) -> Self {
        Self::new(packet.src(), packet.dst(), packet.protocol())
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}", self.protocol, self.src, self.dst)
    }
}

impl FlowId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize - 1
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Flow {
    pub fn id(&self) -> FlowId {
        self.id
    }

    pub fn key(&self) -> &FlowKey {
        &self.key
    }

    pub fn class(&self) -> FlowClass {
        self.class
    }

    pub fn stats(&self) -> &FlowStats {
        &self.stats
    }

    pub fn is_legitimate(&self) -> bool {
        self.class == FlowClass::Legitimate
    }
}

impl FlowRegistry {
    pub fn new<C>(classifier: C) -> Self
    where
        C: FlowClassifier + 'static,
    {
        Self {
            classifier: Box::new(classifier),
            flows: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Count `packet` as sent on the flow `key`, creating and classifying
    /// the flow if this is its first packet.
    pub fn record_send(&mut self, key: FlowKey, packet: &Packet) -> FlowId {
        let id = match self.index.get(&key) {
            Some(&id) => id,
            None => {
                let id = FlowId(self.flows.len() as u32 + 1);
                let class = self.classifier.classify(&key);
                trace!(flow = %id, %key, %class, "new flow");

                self.flows.push(Flow {
                    id,
                    key,
                    class,
                    stats: FlowStats::default(),
                });
                self.index.insert(key, id);
                id
            }
        };

        self.flows[id.index()].stats.on_send(packet);
        id
    }

    /// Count `packet` as received at `at`.
    ///
    /// # Errors
    ///
    /// [`UnknownFlow`] if `id` was not returned by
    /// [`FlowRegistry::record_send`] on this registry.
    pub fn record_arrival(
        &mut self,
        id: FlowId,
        packet: &Packet,
        at: SimTime,
    ) -> Result<(), UnknownFlow> {
        self.flow_mut(id)?.stats.on_arrival(packet, at);
        Ok(())
    }

    /// Count `packet` as lost for `reason`.
    ///
    /// # Errors
    ///
    /// [`UnknownFlow`], as [`FlowRegistry::record_arrival`].
    pub fn record_drop(
        &mut self,
        id: FlowId,
        packet: &Packet,
        reason: DropReason,
    ) -> Result<(), UnknownFlow> {
        let flow = self.flow_mut(id)?;
        trace!(flow = %id, packet = %packet.id(), ?reason, "drop");
        flow.stats.on_drop(reason);
        Ok(())
    }

    fn flow_mut(&mut self, id: FlowId) -> Result<&mut Flow, UnknownFlow> {
        let known = self.flows.len();
        self.flows
            .get_mut(id.index())
            .ok_or(UnknownFlow { flow: id, known })
    }

    pub fn lookup(&self, key: &FlowKey) -> Option<&Flow> {
        self.index.get(key).and_then(|id| self.get(*id))
    }

    pub fn get(&self, id: FlowId) -> Option<&Flow> {
        self.flows.get(id.index())
    }

    /// every flow, in [`FlowId`] order
    pub fn flows(&self) -> impl Iterator<Item = &Flow> {
        self.flows.iter()
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}

impl fmt::Debug for FlowRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowRegistry")
            .field("flows", &self.flows)
            .finish_non_exhaustive()
    }
}
