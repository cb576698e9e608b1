mod id;

pub use self::id::NodeId;
use crate::link::LinkId;
use std::net::Ipv4Addr;

/// An addressable endpoint of the simulated network: a host (game client,
/// attacker, server) or a router.
///
/// Nodes are created with [`Topology::add_node`] and never removed. A node
/// gets one [`Interface`] per address assigned to it with
/// [`Topology::assign_address`].
///
/// [`Topology::add_node`]: crate::network::Topology::add_node
/// [`Topology::assign_address`]: crate::network::Topology::assign_address
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    name: String,
    interfaces: Vec<Interface>,
}

/// An address bound to the node's end of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interface {
    pub link: LinkId,
    pub address: Ipv4Addr,
}

impl Node {
    pub(crate) fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            interfaces: Vec::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// a human readable label, used in logs and reports
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    /// The address of the first interface, used as the source address of
    /// the traffic generated on this node.
    pub fn primary_address(&self) -> Option<Ipv4Addr> {
        self.interfaces.first().map(|interface| interface.address)
    }

    pub(crate) fn add_interface(&mut self, interface: Interface) {
        self.interfaces.push(interface);
    }
}
