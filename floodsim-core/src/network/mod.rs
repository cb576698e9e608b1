mod packet;
mod route;

use crate::{
    error::ConfigError,
    link::{DuplexLink, Link, LinkConfig, LinkId},
    node::{Interface, Node, NodeId},
};
use std::{
    collections::{BTreeMap, HashMap},
    net::Ipv4Addr,
};
use tracing::debug;

pub use self::{
    packet::{Packet, PacketBuilder, PacketId, PacketIdGenerator, Protocol},
    route::{Route, RouteError},
};

/// The static shape of the simulated network: nodes, the directed links
/// between them, the addresses bound to each node's link ends, and once
/// finalized, the route between every pair of connected nodes.
///
/// Any change to the set of links invalidates the routes: they must be
/// computed again with [`Topology::finalize_routes`] before they can be
/// looked up.
///
/// ```
/// use floodsim_core::{link::LinkConfig, network::Topology};
///
/// let mut topology = Topology::new();
/// let client = topology.add_node("client");
/// let router = topology.add_node("router");
/// let server = topology.add_node("server");
///
/// let access = topology.add_link(client, router, LinkConfig::default()).unwrap();
/// let bottleneck = topology.add_link(router, server, LinkConfig::default()).unwrap();
///
/// topology.assign_address(client, access.forward, "10.1.1.1".parse().unwrap()).unwrap();
/// topology.assign_address(server, bottleneck.forward, "10.3.0.2".parse().unwrap()).unwrap();
///
/// topology.finalize_routes();
///
/// let route = topology.route(client, server).unwrap();
/// assert_eq!(route.links(), &[access.forward, bottleneck.forward]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Topology {
    nodes: Vec<Node>,
    links: Vec<Link>,
    addresses: BTreeMap<Ipv4Addr, NodeId>,
    routes: Option<HashMap<(NodeId, NodeId), Route>>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Node::new(id, name));
        id
    }

    /// Connect `a` and `b` with a pair of directed links sharing the same
    /// `config`. Each direction has its own transmission queue.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownNode`] if either node does not exist, or the
    /// error reported by the validation of `config`.
    pub fn add_link(
        &mut self,
        a: NodeId,
        b: NodeId,
        config: LinkConfig,
    ) -> Result<DuplexLink, ConfigError> {
        self.node(a)?;
        self.node(b)?;
        config.validate(a, b)?;

        let forward = LinkId::new(self.links.len());
        self.links.push(Link::new(forward, a, b, config));
        let reverse = LinkId::new(self.links.len());
        self.links.push(Link::new(reverse, b, a, config));

        self.routes = None;

        Ok(DuplexLink { forward, reverse })
    }

    /// Bind `address` to `node`'s end of `link`.
    ///
    /// Either direction of a duplex link may be given. The first address
    /// assigned to a node is the source address of the traffic it
    /// generates.
    ///
    /// # Errors
    ///
    /// The node or link does not exist, the link does not touch the node,
    /// or the address is already bound.
    pub fn assign_address(
        &mut self,
        node: NodeId,
        link: LinkId,
        address: Ipv4Addr,
    ) -> Result<(), ConfigError> {
        self.node(node)?;
        let l = self.link(link).ok_or(ConfigError::UnknownLink { link })?;
        if l.from() != node && l.to() != node {
            return Err(ConfigError::LinkNotAttached { link, node });
        }
        if let Some(&owner) = self.addresses.get(&address) {
            return Err(ConfigError::AddressInUse { address, owner });
        }

        self.addresses.insert(address, node);
        self.nodes[node.index()].add_interface(Interface { link, address });

        Ok(())
    }

    /// Compute the route between every pair of connected nodes.
    ///
    /// Calling it again without changing the links yields the exact same
    /// routes.
    pub fn finalize_routes(&mut self) {
        let routes = route::shortest_paths(self.nodes.len(), &self.links);

        debug!(
            nodes = self.nodes.len(),
            links = self.links.len(),
            routes = routes.len(),
            "routes finalized"
        );

        self.routes = Some(routes);
    }

    pub fn is_finalized(&self) -> bool {
        self.routes.is_some()
    }

    /// The links to traverse to go from `from` to `to`.
    ///
    /// # Errors
    ///
    /// - [`RouteError::NotFinalized`] if the routes are not computed.
    /// - [`RouteError::UnknownNode`] if either node does not exist.
    /// - [`RouteError::NoRoute`] if the nodes are not connected.
    pub fn route(&self, from: NodeId, to: NodeId) -> Result<&Route, RouteError> {
        let routes = self.routes.as_ref().ok_or(RouteError::NotFinalized)?;

        for node in [from, to] {
            if node.index() >= self.nodes.len() {
                return Err(RouteError::UnknownNode { node });
            }
        }

        routes
            .get(&(from, to))
            .ok_or(RouteError::NoRoute { from, to })
    }

    /// the node `address` is bound to
    pub fn node_by_address(&self, address: Ipv4Addr) -> Option<NodeId> {
        self.addresses.get(&address).copied()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, ConfigError> {
        self.nodes
            .get(id.index())
            .ok_or(ConfigError::UnknownNode { node: id })
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.index())
    }

    pub(crate) fn link_mut(&mut self, id: LinkId) -> Option<&mut Link> {
        self.links.get_mut(id.index())
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }
}
