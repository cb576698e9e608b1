//! Assembling and running a simulation.
//!
//! A [`SimulationBuilder`] accumulates a [`Topology`], the traffic sources
//! bound to its nodes and the sinks listening on its endpoints. Once
//! [built](SimulationBuilder::build) this yields an immutable
//! [`SimulationConfig`], from which any number of independent
//! [`Simulation`] runs can be started.

use crate::{
    error::{ConfigError, SimulationError},
    flow::{DropReason, FlowClassifier, FlowId, FlowKey, FlowRegistry},
    network::{Packet, PacketIdGenerator, Route, Topology},
    node::NodeId,
    qos::{QosPolicy, QosReport},
    scheduler::Scheduler,
    source::{ActiveWindow, SourceId, TrafficSource},
    stats::LinkStats,
    time::SimTime,
};
use anyhow::anyhow;
use rand_chacha::ChaChaRng;
use rand_core::SeedableRng as _;
use std::{
    collections::{BTreeMap, HashMap},
    net::SocketAddrV4,
};
use tracing::{debug, trace};

/// First local port handed to the sources of a node.
const EPHEMERAL_PORT_START: u16 = 49_153;

pub struct SimulationBuilder {
    topology: Topology,
    sources: Vec<(NodeId, SocketAddrV4, TrafficSource)>,
    sinks: BTreeMap<SocketAddrV4, ActiveWindow>,
    seed: u64,
}

/// A fully validated simulation: routes are computed and every source
/// knows its endpoints and its route.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    topology: Topology,
    sources: Vec<BoundSource>,
    sinks: BTreeMap<SocketAddrV4, ActiveWindow>,
    seed: u64,
}

/// A [`TrafficSource`] attached to its node.
#[derive(Debug, Clone)]
pub struct BoundSource {
    id: SourceId,
    node: NodeId,
    local: SocketAddrV4,
    destination: SocketAddrV4,
    route: Route,
    source: TrafficSource,
    next_seq: u64,
}

/// One run of a [`SimulationConfig`].
///
/// ```
/// use floodsim_core::{
///     flow::{FlowClass, FlowKey},
///     link::LinkConfig,
///     network::Topology,
///     qos::{Aggregate, QosPolicy},
///     simulation::{Simulation, SimulationBuilder},
///     source::{ActiveWindow, PeriodicSource},
///     time::SimTime,
/// };
/// use std::time::Duration;
///
/// let mut topology = Topology::new();
/// let client = topology.add_node("client");
/// let server = topology.add_node("server");
/// let link = topology.add_link(client, server, LinkConfig::default()).unwrap();
/// topology.assign_address(client, link.forward, "10.1.1.1".parse().unwrap()).unwrap();
/// topology.assign_address(server, link.reverse, "10.1.1.2".parse().unwrap()).unwrap();
///
/// let window = ActiveWindow::new(SimTime::ZERO, SimTime::from_secs(1)).unwrap();
/// let updates = PeriodicSource::new(128, Duration::from_millis(20), window).unwrap();
///
/// let mut builder = SimulationBuilder::new(topology);
/// builder.add_source(client, "10.1.1.2:4000".parse().unwrap(), updates).unwrap();
/// let config = builder.build().unwrap();
///
/// let mut simulation = Simulation::new(&config, |_: &FlowKey| FlowClass::Legitimate).unwrap();
/// simulation.run_until(SimTime::from_secs(2)).unwrap();
///
/// let report = simulation.report(&QosPolicy::default());
/// let Aggregate::Mean(mean) = report.aggregate else { unreachable!() };
/// assert_eq!(mean.loss_ratio, 0.0);
/// ```
pub struct Simulation {
    scheduler: Scheduler<Event>,
    state: State,
}

/// Totals since the [`Simulation`] was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// simulation time at the end of the run
    pub now: SimTime,
    pub events: u64,
    pub packets_sent: u64,
    pub packets_delivered: u64,
    pub packets_dropped: u64,
    /// packets still travelling when the run ended, included in
    /// `packets_dropped`
    pub packets_in_flight_at_end: u64,
}

#[derive(Debug)]
enum Event {
    /// a source is due
    Fire(SourceId),
    /// `packet` reached the end of the link `route.links()[hop - 1]`
    Deliver {
        packet: Packet,
        flow: FlowId,
        route: Route,
        hop: usize,
    },
}

struct State {
    topology: Topology,
    sources: Vec<BoundSource>,
    sinks: BTreeMap<SocketAddrV4, ActiveWindow>,
    flows: FlowRegistry,
    packet_ids: PacketIdGenerator,
    rng: ChaChaRng,
    summary: RunSummary,
}

impl SimulationBuilder {
    pub fn new(topology: Topology) -> Self {
        Self {
            topology,
            sources: Vec::new(),
            sinks: BTreeMap::new(),
            seed: crate::defaults::DEFAULT_SEED,
        }
    }

    /// Seed of the random number generator of the runs, used by random
    /// link losses and random on/off durations.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Have `node` run `source`, sending to `destination`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownNode`]. The destination is checked by
    /// [`SimulationBuilder::build`].
    pub fn add_source(
        &mut self,
        node: NodeId,
        destination: SocketAddrV4,
        source: impl Into<TrafficSource>,
    ) -> Result<SourceId, ConfigError> {
        self.topology.node(node)?;

        let id = SourceId(self.sources.len() as u32);
        self.sources.push((node, destination, source.into()));
        Ok(id)
    }

    /// Listen on `endpoint` during `window`. Packets reaching the endpoint
    /// outside the window are dropped.
    ///
    /// # Errors
    ///
    /// [`ConfigError::DuplicateSink`] if something already listens there.
    pub fn add_sink(
        &mut self,
        endpoint: SocketAddrV4,
        window: ActiveWindow,
    ) -> Result<(), ConfigError> {
        if self.sinks.contains_key(&endpoint) {
            return Err(ConfigError::DuplicateSink { endpoint });
        }
        self.sinks.insert(endpoint, window);
        Ok(())
    }

    /// Finalize the routes and bind every source to its endpoints.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NoAddress`] if a source runs on a node without
    ///   address.
    /// - [`ConfigError::UnknownDestination`] if no node owns the address
    ///   of a source's destination or of a sink.
    /// - [`ConfigError::Unreachable`] if a destination is not connected
    ///   to its source.
    pub fn build(mut self) -> Result<SimulationConfig, ConfigError> {
        self.topology.finalize_routes();

        for endpoint in self.sinks.keys() {
            if self.topology.node_by_address(*endpoint.ip()).is_none() {
                return Err(ConfigError::UnknownDestination {
                    endpoint: *endpoint,
                });
            }
        }

        let mut next_port: HashMap<NodeId, u16> = HashMap::new();
        let mut sources = Vec::with_capacity(self.sources.len());

        for (index, (node, destination, source)) in self.sources.into_iter().enumerate() {
            let address = self
                .topology
                .node(node)?
                .primary_address()
                .ok_or(ConfigError::NoAddress { node })?;
            let port = next_port.entry(node).or_insert(EPHEMERAL_PORT_START);
            let local = SocketAddrV4::new(address, *port);
            *port = port.wrapping_add(1);

            let target = self
                .topology
                .node_by_address(*destination.ip())
                .ok_or(ConfigError::UnknownDestination {
                    endpoint: destination,
                })?;
            let route = self
                .topology
                .route(node, target)
                .map_err(|source| ConfigError::Unreachable {
                    node,
                    endpoint: destination,
                    source,
                })?
                .clone();

            sources.push(BoundSource {
                id: SourceId(index as u32),
                node,
                local,
                destination,
                route,
                source,
                next_seq: 0,
            });
        }

        debug!(
            nodes = self.topology.nodes().count(),
            sources = sources.len(),
            sinks = self.sinks.len(),
            seed = self.seed,
            "simulation configured"
        );

        Ok(SimulationConfig {
            topology: self.topology,
            sources,
            sinks: self.sinks,
            seed: self.seed,
        })
    }
}

impl SimulationConfig {
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn sources(&self) -> &[BoundSource] {
        &self.sources
    }

    pub fn sinks(&self) -> impl Iterator<Item = (&SocketAddrV4, &ActiveWindow)> {
        self.sinks.iter()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl BoundSource {
    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// the endpoint the packets are sent from
    pub fn local(&self) -> SocketAddrV4 {
        self.local
    }

    pub fn destination(&self) -> SocketAddrV4 {
        self.destination
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn source(&self) -> &TrafficSource {
        &self.source
    }
}

impl Simulation {
    /// Start a run of `config`. Every source is scheduled to fire at the
    /// start of its window.
    pub fn new<C>(config: &SimulationConfig, classifier: C) -> Result<Self, SimulationError>
    where
        C: FlowClassifier + 'static,
    {
        let mut scheduler = Scheduler::new();
        for source in &config.sources {
            scheduler.schedule_at(source.source.window().start(), Event::Fire(source.id))?;
        }

        Ok(Self {
            scheduler,
            state: State {
                topology: config.topology.clone(),
                sources: config.sources.clone(),
                sinks: config.sinks.clone(),
                flows: FlowRegistry::new(classifier),
                packet_ids: PacketIdGenerator::new(),
                rng: ChaChaRng::seed_from_u64(config.seed),
                summary: RunSummary::default(),
            },
        })
    }

    pub fn now(&self) -> SimTime {
        self.scheduler.now()
    }

    /// Execute every event up to `end` included.
    ///
    /// Events due after `end` are discarded: the packets still in flight
    /// are counted as [`DropReason::InFlightAtEnd`] drops and the sources
    /// stop. A later call has nothing left to execute.
    ///
    /// # Errors
    ///
    /// A broken runtime invariant. The flows are left as they were when
    /// the error happened.
    pub fn run_until(&mut self, end: SimTime) -> Result<RunSummary, SimulationError> {
        debug!(from = %self.scheduler.now(), to = %end, "run started");

        let outcome = self
            .scheduler
            .run_until(end, |scheduler, event| self.state.handle(scheduler, event))?;

        for event in outcome.discarded {
            if let Event::Deliver { packet, flow, .. } = event {
                self.state
                    .flows
                    .record_drop(flow, &packet, DropReason::InFlightAtEnd)?;
                self.state.summary.packets_dropped += 1;
                self.state.summary.packets_in_flight_at_end += 1;
            }
        }

        let summary = &mut self.state.summary;
        summary.events += outcome.executed;
        summary.now = self.scheduler.now();

        debug!(
            now = %summary.now,
            events = summary.events,
            sent = summary.packets_sent,
            delivered = summary.packets_delivered,
            dropped = summary.packets_dropped,
            in_flight = summary.packets_in_flight_at_end,
            flows = self.state.flows.len(),
            "run ended"
        );

        Ok(*summary)
    }

    pub fn flows(&self) -> &FlowRegistry {
        &self.state.flows
    }

    pub fn topology(&self) -> &Topology {
        &self.state.topology
    }

    /// the sources and how far they got
    pub fn sources(&self) -> &[BoundSource] {
        &self.state.sources
    }

    pub fn link_stats(&self) -> Vec<LinkStats> {
        self.state.topology.links().map(LinkStats::new).collect()
    }

    pub fn report(&self, policy: &QosPolicy) -> QosReport {
        QosReport::new(self.state.flows.flows(), policy)
    }
}

impl State {
    fn handle(
        &mut self,
        scheduler: &mut Scheduler<Event>,
        event: Event,
    ) -> Result<(), SimulationError> {
        match event {
            Event::Fire(id) => self.fire(scheduler, id),
            Event::Deliver {
                packet,
                flow,
                route,
                hop,
            } => self.forward(scheduler, packet, flow, route, hop),
        }
    }

    fn fire(&mut self, scheduler: &mut Scheduler<Event>, id: SourceId) -> Result<(), SimulationError> {
        let now = scheduler.now();
        let bound = self
            .sources
            .get_mut(id.index())
            .ok_or_else(|| anyhow!("source {id} does not exist"))?;

        let firing = bound.source.fire(now, &mut self.rng);
        let (local, destination, route) = (bound.local, bound.destination, bound.route.clone());
        let first_seq = bound.next_seq;
        bound.next_seq += firing.packets;

        match firing.next {
            Some(next) => scheduler.schedule_at(next, Event::Fire(id))?,
            None => debug!(source = %id, %now, sent = bound.source.sent(), "source stopped"),
        }

        for seq in first_seq..first_seq + firing.packets {
            let packet = Packet::builder(&mut self.packet_ids)
                .src(local)
                .dst(destination)
                .seq(seq)
                .size(firing.packet_size)
                .sent_at(now)
                .build()?;
            let flow = self.flows.record_send(FlowKey::of(&packet), &packet);
            self.summary.packets_sent += 1;

            trace!(packet = %packet.id(), %flow, %now, "send");
            self.forward(scheduler, packet, flow, route.clone(), 0)?;
        }

        Ok(())
    }

    /// Hand `packet` to the `hop`-th link of its route, or to its
    /// destination if the route is complete.
    fn forward(
        &mut self,
        scheduler: &mut Scheduler<Event>,
        packet: Packet,
        flow: FlowId,
        route: Route,
        hop: usize,
    ) -> Result<(), SimulationError> {
        let now = scheduler.now();

        let Some(&link_id) = route.links().get(hop) else {
            return self.deliver(now, packet, flow);
        };
        let link = self
            .topology
            .link_mut(link_id)
            .ok_or_else(|| anyhow!("flow {flow} routed through unknown link {link_id}"))?;

        match link.transmit(packet.size(), now, &mut self.rng) {
            Ok(transmission) => {
                trace!(
                    packet = %packet.id(),
                    link = %link_id,
                    queueing = ?transmission.queueing,
                    arrival = %transmission.arrival,
                    "transmit"
                );
                scheduler.schedule_at(
                    transmission.arrival,
                    Event::Deliver {
                        packet,
                        flow,
                        route,
                        hop: hop + 1,
                    },
                )?;
            }
            Err(reason) => {
                self.flows.record_drop(flow, &packet, reason)?;
                self.summary.packets_dropped += 1;
            }
        }

        Ok(())
    }

    fn deliver(
        &mut self,
        now: SimTime,
        packet: Packet,
        flow: FlowId,
    ) -> Result<(), SimulationError> {
        let listening = self
            .sinks
            .get(&packet.dst())
            .is_none_or(|window| window.contains(now));

        if listening {
            trace!(packet = %packet.id(), %flow, %now, "arrival");
            self.flows.record_arrival(flow, &packet, now)?;
            self.summary.packets_delivered += 1;
        } else {
            self.flows
                .record_drop(flow, &packet, DropReason::NoListener)?;
            self.summary.packets_dropped += 1;
        }
        Ok(())
    }
}
