//! # floodsim core
//!
//! A deterministic, single threaded, discrete-event simulation of a packet
//! network, built to measure how much the quality of service of real-time
//! traffic degrades when the bottleneck it shares is flooded.
//!
//! The moving parts, from the bottom up:
//!
//! - the [`Scheduler`] owns the timeline. Events fire in time order, and
//!   in insertion order when they share the same time;
//! - a [`Link`] is a single FIFO transmission queue with a
//!   [`Bandwidth`], a propagation [`Latency`] and a [`QueueLimit`];
//! - the [`Topology`] holds the nodes, their links and addresses, and
//!   the static shortest routes between them;
//! - [`TrafficSource`]s generate packets: periodic game updates or on/off
//!   floods;
//! - the [`FlowRegistry`] groups packets into flows, classifies them with
//!   a [`FlowClassifier`] and keeps their counters;
//! - [`QosReport`] derives throughput, delay, jitter and loss from those
//!   counters.
//!
//! A [`SimulationBuilder`] ties a topology to its sources and produces an
//! immutable [`SimulationConfig`] that a [`Simulation`] runs.
//!
//! [`GameDdosScenario`] builds the whole game server under flood
//! experiment out of these pieces.
//!
//! ```
//! use floodsim_core::{Aggregate, GameDdosScenario, SimTime};
//!
//! let scenario = GameDdosScenario {
//!     num_clients: 2,
//!     num_attackers: 0,
//!     sim_time: SimTime::from_secs(3),
//!     ..GameDdosScenario::default()
//! };
//!
//! let outcome = scenario.run().unwrap();
//! let Aggregate::Mean(mean) = outcome.report.aggregate else {
//!     panic!("no legitimate flows")
//! };
//! assert_eq!(mean.flows, 2);
//! assert_eq!(mean.loss_ratio, 0.0);
//! ```
//!
//! [`Link`]: crate::link::Link

pub mod defaults;
pub mod error;
pub mod flow;
pub mod link;
pub mod measure;
pub mod network;
pub mod node;
pub mod qos;
pub mod scenario;
pub mod scheduler;
pub mod simulation;
pub mod source;
pub mod stats;
pub mod time;

pub use self::{
    error::{ConfigError, SimulationError},
    flow::{ClientServerClassifier, FlowClass, FlowClassifier, FlowKey, FlowRegistry},
    measure::{Bandwidth, Latency, PacketLoss, QueueLimit},
    network::{Protocol, Topology},
    qos::{Aggregate, QosPolicy, QosReport},
    scenario::GameDdosScenario,
    scheduler::Scheduler,
    simulation::{Simulation, SimulationBuilder, SimulationConfig},
    source::TrafficSource,
    time::SimTime,
};
