//! The game server under flood experiment.
//!
//! A star of stub networks around a single router: every game client and
//! every attacker sits behind its own access link, and the router reaches
//! the game server through the bottleneck link.
//!
//! ```text
//!  client 0 ──┐
//!  client 1 ──┤   access links            bottleneck
//!     ...     ├──────────────── router ─────────────── server
//! attacker 0 ─┤
//!     ...   ──┘
//! ```
//!
//! Clients send small periodic updates to the server port from
//! `client_start`. Attackers flood the same port from `attack_start`.
//! Both stop at the end of the run.

use crate::{
    defaults::*,
    error::{ConfigError, SimulationError},
    flow::ClientServerClassifier,
    link::LinkConfig,
    measure::Bandwidth,
    network::Topology,
    node::NodeId,
    qos::{DurationFallback, QosPolicy, QosReport},
    simulation::{RunSummary, Simulation, SimulationBuilder, SimulationConfig},
    source::{ActiveWindow, OnOffSource, PeriodicSource, Timing},
    stats::LinkStats,
    time::SimTime,
};
use std::{
    net::{Ipv4Addr, SocketAddrV4},
    time::Duration,
};
use tracing::info;

/// Parameters of the experiment. [`Default`] is the reference setup.
///
/// ```
/// # use floodsim_core::scenario::GameDdosScenario;
/// let scenario = GameDdosScenario::default();
/// assert_eq!(scenario.num_clients, 5);
/// assert_eq!(scenario.num_attackers, 10);
/// assert_eq!(scenario.bottleneck.bandwidth().to_string(), "10Mbps");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GameDdosScenario {
    pub num_clients: usize,
    pub num_attackers: usize,
    /// the run stops at this time, every source and the server stop
    /// with it
    pub sim_time: SimTime,

    /// client or attacker to router
    pub access: LinkConfig,
    /// router to server
    pub bottleneck: LinkConfig,

    pub server_port: u16,
    pub server_start: SimTime,

    pub client_packet_size: u64,
    pub client_interval: Duration,
    pub client_max_packets: u64,
    pub client_start: SimTime,

    pub attack_rate: Bandwidth,
    pub attack_packet_size: u64,
    pub attack_on: Timing,
    pub attack_off: Timing,
    /// packets an attacker sends back to back, `1` paces them at
    /// `attack_rate`
    pub attack_burst: u64,
    pub attack_start: SimTime,

    pub seed: u64,
}

/// A [`GameDdosScenario`] ready to run.
#[derive(Debug, Clone)]
pub struct ScenarioSetup {
    pub config: SimulationConfig,
    pub classifier: ClientServerClassifier,
    pub policy: QosPolicy,
    pub end: SimTime,
    pub clients: Vec<Ipv4Addr>,
    pub attackers: Vec<Ipv4Addr>,
    pub server: SocketAddrV4,
}

/// Everything a run of the scenario produced.
#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    pub summary: RunSummary,
    pub report: QosReport,
    pub links: Vec<LinkStats>,
}

const ROUTER_TO_SERVER: Ipv4Addr = Ipv4Addr::new(10, 3, 0, 1);
const SERVER: Ipv4Addr = Ipv4Addr::new(10, 3, 0, 2);

impl Default for GameDdosScenario {
    fn default() -> Self {
        Self {
            num_clients: 5,
            num_attackers: 10,
            sim_time: SimTime::from_secs(60),

            access: LinkConfig::new(
                DEFAULT_ACCESS_BANDWIDTH,
                DEFAULT_ACCESS_LATENCY,
                DEFAULT_QUEUE_LIMIT,
            ),
            bottleneck: LinkConfig::new(
                DEFAULT_BOTTLENECK_BANDWIDTH,
                DEFAULT_BOTTLENECK_LATENCY,
                DEFAULT_QUEUE_LIMIT,
            ),

            server_port: DEFAULT_SERVER_PORT,
            server_start: SimTime::from_secs(1),

            client_packet_size: DEFAULT_CLIENT_PACKET_SIZE,
            client_interval: DEFAULT_CLIENT_INTERVAL,
            client_max_packets: DEFAULT_CLIENT_MAX_PACKETS,
            client_start: SimTime::from_secs(2),

            attack_rate: DEFAULT_ATTACK_RATE,
            attack_packet_size: DEFAULT_ATTACK_PACKET_SIZE,
            attack_on: Timing::Constant(Duration::from_secs(1)),
            attack_off: Timing::Constant(Duration::ZERO),
            attack_burst: 1,
            attack_start: SimTime::from_secs(5),

            seed: DEFAULT_SEED,
        }
    }
}

/// `10.{subnet}.{host + 1}.{last}`
fn stub_address(subnet: u8, host: usize, last: u8) -> Ipv4Addr {
    Ipv4Addr::new(10, subnet, host as u8 + 1, last)
}

impl GameDdosScenario {
    /// Build the topology, the sources and the classifier.
    ///
    /// # Errors
    ///
    /// Any invalid parameter, in particular a source window that would
    /// not open before the end of the run.
    pub fn build(&self) -> Result<ScenarioSetup, ConfigError> {
        for (role, count) in [("clients", self.num_clients), ("attackers", self.num_attackers)] {
            if count > 254 {
                return Err(ConfigError::AddressSpaceExhausted { role, count });
            }
        }

        let mut topology = Topology::new();
        let router = topology.add_node("router");
        let server = topology.add_node("server");

        let bottleneck = topology.add_link(router, server, self.bottleneck)?;
        topology.assign_address(router, bottleneck.forward, ROUTER_TO_SERVER)?;
        topology.assign_address(server, bottleneck.reverse, SERVER)?;

        let mut stub = |name: String,
                        address: Ipv4Addr,
                        gateway: Ipv4Addr|
         -> Result<NodeId, ConfigError> {
            let node = topology.add_node(name);
            let access = topology.add_link(node, router, self.access)?;
            topology.assign_address(node, access.forward, address)?;
            topology.assign_address(router, access.reverse, gateway)?;
            Ok(node)
        };

        let mut clients = Vec::with_capacity(self.num_clients);
        let mut client_nodes = Vec::with_capacity(self.num_clients);
        for i in 0..self.num_clients {
            let address = stub_address(1, i, 1);
            client_nodes.push(stub(format!("client-{i}"), address, stub_address(1, i, 2))?);
            clients.push(address);
        }

        let mut attackers = Vec::with_capacity(self.num_attackers);
        let mut attacker_nodes = Vec::with_capacity(self.num_attackers);
        for i in 0..self.num_attackers {
            let address = stub_address(2, i, 1);
            attacker_nodes.push(stub(format!("attacker-{i}"), address, stub_address(2, i, 2))?);
            attackers.push(address);
        }

        let server_endpoint = SocketAddrV4::new(SERVER, self.server_port);

        let mut builder = SimulationBuilder::new(topology).with_seed(self.seed);
        builder.add_sink(
            server_endpoint,
            ActiveWindow::new(self.server_start, self.sim_time)?,
        )?;

        for node in client_nodes {
            let window = ActiveWindow::new(self.client_start, self.sim_time)?;
            let source =
                PeriodicSource::new(self.client_packet_size, self.client_interval, window)?
                    .with_budget(self.client_max_packets);
            builder.add_source(node, server_endpoint, source)?;
        }

        for node in attacker_nodes {
            let window = ActiveWindow::new(self.attack_start, self.sim_time)?;
            let source = OnOffSource::new(self.attack_rate, self.attack_packet_size, window)?
                .with_timing(self.attack_on, self.attack_off)?
                .with_burst(self.attack_burst)?;
            builder.add_source(node, server_endpoint, source)?;
        }

        let config = builder.build()?;

        let classifier = ClientServerClassifier::new(SERVER)
            .with_clients(clients.iter().copied())
            .with_attackers(attackers.iter().copied());

        // a client with a single arrival is credited with the whole time
        // it was supposed to be sending
        let policy = QosPolicy::new(DurationFallback::Fixed(
            self.sim_time.saturating_duration_since(self.client_start),
        ));

        Ok(ScenarioSetup {
            config,
            classifier,
            policy,
            end: self.sim_time,
            clients,
            attackers,
            server: server_endpoint,
        })
    }

    /// Build and run the scenario to its end.
    pub fn run(&self) -> Result<ScenarioOutcome, SimulationError> {
        let setup = self.build()?;
        setup.run()
    }
}

impl ScenarioSetup {
    pub fn run(self) -> Result<ScenarioOutcome, SimulationError> {
        info!(
            clients = self.clients.len(),
            attackers = self.attackers.len(),
            end = %self.end,
            "starting game flood scenario"
        );

        let mut simulation = Simulation::new(&self.config, self.classifier)?;
        let summary = simulation.run_until(self.end)?;

        Ok(ScenarioOutcome {
            summary,
            report: simulation.report(&self.policy),
            links: simulation.link_stats(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qos::{Aggregate, MeanMetrics};

    fn mean(outcome: &ScenarioOutcome) -> MeanMetrics {
        match outcome.report.aggregate {
            Aggregate::Mean(mean) => mean,
            other => panic!("expected legitimate flows, got {other:?}"),
        }
    }

    fn assert_sound(outcome: &ScenarioOutcome) {
        for flow in &outcome.report.flows {
            assert_eq!(
                flow.tx_packets,
                flow.rx_packets + flow.dropped_packets,
                "{flow:?}"
            );
            let m = &flow.metrics;
            assert!(m.throughput_bps >= 0.0);
            assert!((0.0..=1.0).contains(&m.loss_ratio));
        }
        assert!(outcome.links.iter().all(LinkStats::peak_within_limit));
        assert_eq!(
            outcome.summary.packets_sent,
            outcome.summary.packets_delivered + outcome.summary.packets_dropped
        );
    }

    #[test]
    fn topology() {
        let setup = GameDdosScenario {
            num_clients: 2,
            num_attackers: 3,
            ..GameDdosScenario::default()
        }
        .build()
        .unwrap();

        let topology = setup.config.topology();
        // router, server, 2 clients, 3 attackers
        assert_eq!(topology.nodes().count(), 7);
        assert_eq!(topology.links().count(), 12);
        assert_eq!(setup.clients, vec![
            Ipv4Addr::new(10, 1, 1, 1),
            Ipv4Addr::new(10, 1, 2, 1),
        ]);
        assert_eq!(setup.attackers[2], Ipv4Addr::new(10, 2, 3, 1));
        assert_eq!(setup.server, "10.3.0.2:4000".parse().unwrap());

        assert_eq!(setup.config.sources().len(), 5);
        assert!(setup.config.sources().iter().all(|s| s.route().hops() == 2));
        assert_eq!(
            setup.policy,
            QosPolicy::new(DurationFallback::Fixed(Duration::from_secs(58)))
        );
    }

    #[test]
    fn without_load_only_propagation_delay() {
        let scenario = GameDdosScenario {
            num_clients: 1,
            num_attackers: 0,
            sim_time: SimTime::from_secs(5),
            client_max_packets: 10,
            ..GameDdosScenario::default()
        };

        let outcome = scenario.run().unwrap();
        assert_sound(&outcome);

        let flow = &outcome.report.flows[0];
        assert_eq!(flow.tx_packets, 10);
        assert_eq!(flow.rx_packets, 10);

        // 2ms + 10ms of propagation, 128 bytes at 100Mbps then 10Mbps
        let propagation = Duration::from_millis(12);
        let serialization = Duration::from_nanos(10_240 + 102_400);
        assert_eq!(flow.metrics.avg_delay, propagation + serialization);
        assert_eq!(flow.metrics.avg_jitter, Duration::ZERO);
        assert_eq!(flow.metrics.loss_ratio, 0.0);

        let mean = mean(&outcome);
        assert_eq!(mean.flows, 1);
        assert_eq!(mean.loss_ratio, 0.0);
    }

    #[test]
    fn flood_degrades_legitimate_traffic() {
        let quiet = GameDdosScenario {
            num_clients: 1,
            num_attackers: 0,
            sim_time: SimTime::from_secs(7),
            ..GameDdosScenario::default()
        };
        let flooded = GameDdosScenario {
            num_attackers: 10,
            ..quiet.clone()
        };

        // the same flooded configuration, stopped just before the attack
        let mut cut = flooded.build().unwrap();
        cut.end = SimTime::from_duration(
            flooded.attack_start.elapsed() - Duration::from_nanos(1),
        );

        let quiet = quiet.run().unwrap();
        let cut = cut.run().unwrap();
        let flooded = flooded.run().unwrap();
        assert_sound(&quiet);
        assert_sound(&cut);
        assert_sound(&flooded);

        let before = mean(&quiet);
        let until_attack = mean(&cut);
        let after = mean(&flooded);

        // at least one full attack packet queued ahead of every client
        // packet on average: 1024 bytes at 10Mbps
        let one_packet =
            DEFAULT_BOTTLENECK_BANDWIDTH.serialization_time(DEFAULT_ATTACK_PACKET_SIZE);
        assert_eq!(one_packet, Duration::from_nanos(819_200));

        assert_eq!(before.loss_ratio, 0.0);
        assert!(after.loss_ratio > 0.1, "{after:?}");
        assert!(after.avg_delay > before.avg_delay + one_packet, "{after:?}");

        assert_eq!(until_attack.loss_ratio, 0.0);
        assert_eq!(until_attack.avg_delay, before.avg_delay);
        assert!(after.loss_ratio > until_attack.loss_ratio, "{after:?}");
        assert!(after.avg_delay > until_attack.avg_delay + one_packet, "{after:?}");
        assert_eq!(cut.summary.packets_dropped, 0);

        // the client flow still exists, only degraded
        let flow = &flooded.report.flows[0];
        assert!(flow.rx_packets > 0);

        // the losses happen at the bottleneck
        let bottleneck = flooded
            .links
            .iter()
            .max_by_key(|link| link.overflow_drops)
            .unwrap();
        assert_eq!(bottleneck.bandwidth, DEFAULT_BOTTLENECK_BANDWIDTH);
        assert_eq!(bottleneck.random_drops, 0);
        assert!(flooded.report.observed_flows >= 11);
    }

    #[test]
    fn overload_builds_up_queueing_delay() {
        let quiet = GameDdosScenario {
            num_clients: 1,
            num_attackers: 0,
            sim_time: SimTime::from_secs(7),
            ..GameDdosScenario::default()
        };
        // slightly above the bottleneck: the queue fills up slowly
        let loaded = GameDdosScenario {
            num_attackers: 1,
            attack_rate: Bandwidth::from_mbps(12),
            ..quiet.clone()
        };

        let quiet = quiet.run().unwrap();
        let loaded = loaded.run().unwrap();
        assert_sound(&loaded);

        let before = mean(&quiet);
        let after = mean(&loaded);

        assert_eq!(before.avg_jitter, Duration::ZERO);
        assert!(after.avg_delay > before.avg_delay, "{after:?}");
        assert!(after.avg_jitter > Duration::ZERO, "{after:?}");

        let peak = loaded.links.iter().map(|link| link.peak_packets).max();
        assert!(peak > Some(1));
    }

    #[test]
    fn only_attackers_is_not_a_crash() {
        let outcome = GameDdosScenario {
            num_clients: 0,
            num_attackers: 1,
            sim_time: SimTime::from_secs(6),
            ..GameDdosScenario::default()
        }
        .run()
        .unwrap();

        assert_eq!(outcome.report.observed_flows, 1);
        assert!(outcome.report.flows.is_empty());
        assert_eq!(outcome.report.aggregate, Aggregate::NoLegitimateFlows);
    }

    #[test]
    fn nobody_at_all() {
        let outcome = GameDdosScenario {
            num_clients: 0,
            num_attackers: 0,
            sim_time: SimTime::from_secs(3),
            ..GameDdosScenario::default()
        }
        .run()
        .unwrap();

        assert_eq!(outcome.summary.packets_sent, 0);
        assert_eq!(outcome.report.aggregate, Aggregate::NoFlowsObserved);
    }

    #[test]
    fn flood_that_never_starts_is_rejected() {
        for attack_start in [5, 8] {
            let scenario = GameDdosScenario {
                num_clients: 1,
                num_attackers: 1,
                sim_time: SimTime::from_secs(5),
                attack_start: SimTime::from_secs(attack_start),
                ..GameDdosScenario::default()
            };

            assert_eq!(
                scenario.build().unwrap_err(),
                ConfigError::InvalidWindow {
                    start: SimTime::from_secs(attack_start),
                    stop: SimTime::from_secs(5),
                }
            );
            assert!(matches!(
                scenario.run(),
                Err(SimulationError::Config(ConfigError::InvalidWindow { .. }))
            ));
        }
    }

    #[test]
    fn too_many_hosts() {
        let scenario = GameDdosScenario {
            num_attackers: 300,
            ..GameDdosScenario::default()
        };
        assert!(matches!(
            scenario.build(),
            Err(ConfigError::AddressSpaceExhausted { count: 300, .. })
        ));
    }

    #[test]
    fn in_flight_packets_at_the_end_are_losses() {
        let outcome = GameDdosScenario {
            num_clients: 1,
            num_attackers: 0,
            sim_time: SimTime::from_millis(2_050),
            ..GameDdosScenario::default()
        }
        .run()
        .unwrap();

        // sent at 2.000, 2.020 and 2.040s, the last one is still travelling
        let flow = &outcome.report.flows[0];
        assert_eq!(flow.tx_packets, 3);
        assert_eq!(flow.rx_packets, 2);
        assert_eq!(outcome.summary.packets_in_flight_at_end, 1);
        assert_eq!(flow.dropped_packets, 1);
    }
}
