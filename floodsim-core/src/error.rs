use crate::{
    flow::UnknownFlow, link::LinkId, network::RouteError, node::NodeId,
    scheduler::ScheduleError, time::SimTime,
};
use std::net::{Ipv4Addr, SocketAddrV4};
use thiserror::Error;

/// A simulation that cannot be built.
///
/// These are detected while assembling the [`SimulationConfig`], before
/// any event is scheduled: a configuration that fails here never runs.
///
/// [`SimulationConfig`]: crate::simulation::SimulationConfig
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid active window: start ({start}) must be before stop ({stop})")]
    InvalidWindow { start: SimTime, stop: SimTime },

    #[error("Node ({node}) Not Found")]
    UnknownNode { node: NodeId },
    #[error("Link ({link}) Not Found")]
    UnknownLink { link: LinkId },
    #[error("Cannot link node ({node}) to itself")]
    SelfLink { node: NodeId },
    #[error("Link between {a} and {b} has no bandwidth")]
    ZeroBandwidth { a: NodeId, b: NodeId },
    #[error("Link between {a} and {b} has no propagation delay")]
    ZeroLatency { a: NodeId, b: NodeId },
    #[error("Link between {a} and {b} cannot queue any packet")]
    ZeroQueueLimit { a: NodeId, b: NodeId },

    #[error("Address {address} is already assigned to {owner}")]
    AddressInUse { address: Ipv4Addr, owner: NodeId },
    #[error("Link ({link}) is not attached to node ({node})")]
    LinkNotAttached { link: LinkId, node: NodeId },
    #[error("Node ({node}) has no address to send from")]
    NoAddress { node: NodeId },
    #[error("No node owns the address of {endpoint}")]
    UnknownDestination { endpoint: SocketAddrV4 },
    #[error("{endpoint} cannot be reached from {node}: {source}")]
    Unreachable {
        node: NodeId,
        endpoint: SocketAddrV4,
        source: RouteError,
    },
    #[error("Cannot address {count} {role}, at most 254 are supported")]
    AddressSpaceExhausted { role: &'static str, count: usize },
    #[error("A sink is already listening on {endpoint}")]
    DuplicateSink { endpoint: SocketAddrV4 },

    #[error("Traffic source packets cannot be empty")]
    ZeroPacketSize,
    #[error("Traffic source interval cannot be zero")]
    ZeroInterval,
    #[error("Traffic source data rate cannot be zero")]
    ZeroRate,
    #[error("Traffic source on-time cannot be zero")]
    ZeroOnDuration,
    #[error("Traffic source burst size cannot be zero")]
    ZeroBurst,
}

/// Reasons a [`Simulation`] run aborts.
///
/// Configuration errors can only come out of the construction. The other
/// variants are broken runtime invariants: a bug in the simulation, not in
/// its input.
///
/// [`Simulation`]: crate::simulation::Simulation
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Route(#[from] RouteError),
    #[error("{0}")]
    Schedule(#[from] ScheduleError),
    #[error("{0}")]
    Flow(#[from] UnknownFlow),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
