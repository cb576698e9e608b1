use crate::{
    link::{Link, LinkId},
    node::NodeId,
};
use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};
use thiserror::Error;

/// The ordered sequence of directed links a packet traverses from its
/// source node to its destination node.
///
/// Routes are computed once by [`Topology::finalize_routes`] and shared
/// with every packet that follows them, cloning a route is cheap.
///
/// [`Topology::finalize_routes`]: crate::network::Topology::finalize_routes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
    from: NodeId,
    to: NodeId,
    links: Arc<[LinkId]>,
}

/// Error returned when a route between two nodes cannot be looked up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The topology changed, or never had its routes computed.
    #[error("Routes are not finalized, call finalize_routes first")]
    NotFinalized,
    #[error("Node ({node}) Not Found")]
    UnknownNode { node: NodeId },
    /// The two nodes are not connected, not even through other nodes.
    #[error("No route from {from} to {to}")]
    NoRoute { from: NodeId, to: NodeId },
}

impl Route {
    pub fn from(&self) -> NodeId {
        self.from
    }

    pub fn to(&self) -> NodeId {
        self.to
    }

    pub fn links(&self) -> &[LinkId] {
        &self.links
    }

    /// number of links traversed
    pub fn hops(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Shortest path (in hops) between every pair of connected nodes.
///
/// Each node is explored breadth first, following its outgoing links in
/// the order they were added to the topology: the result only depends on
/// the order of the `add_link` calls.
pub(super) fn shortest_paths(node_count: usize, links: &[Link]) -> HashMap<(NodeId, NodeId), Route> {
    let mut outgoing = vec![Vec::new(); node_count];
    for link in links {
        outgoing[link.from().index()].push(link.id());
    }

    let mut routes = HashMap::new();

    for source in (0..node_count).map(NodeId::new) {
        // the link used to reach each node for the first time
        let mut via: Vec<Option<LinkId>> = vec![None; node_count];
        let mut visited = vec![false; node_count];
        let mut queue = VecDeque::from([source]);
        visited[source.index()] = true;

        while let Some(node) = queue.pop_front() {
            for &link_id in &outgoing[node.index()] {
                let next = links[link_id.index()].to();
                if visited[next.index()] {
                    continue;
                }
                visited[next.index()] = true;
                via[next.index()] = Some(link_id);
                queue.push_back(next);
            }
        }

        for destination in (0..node_count).map(NodeId::new) {
            if !visited[destination.index()] {
                continue;
            }

            let mut path = Vec::new();
            let mut cursor = destination;
            while let Some(link_id) = via[cursor.index()] {
                path.push(link_id);
                cursor = links[link_id.index()].from();
            }
            path.reverse();

            routes.insert(
                (source, destination),
                Route {
                    from: source,
                    to: destination,
                    links: path.into(),
                },
            );
        }
    }

    routes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::LinkConfig;

    fn duplex(links: &mut Vec<Link>, a: usize, b: usize) {
        let forward = LinkId::new(links.len());
        links.push(Link::new(
            forward,
            NodeId::new(a),
            NodeId::new(b),
            LinkConfig::default(),
        ));
        let reverse = LinkId::new(links.len());
        links.push(Link::new(
            reverse,
            NodeId::new(b),
            NodeId::new(a),
            LinkConfig::default(),
        ));
    }

    #[test]
    fn star_through_router() {
        // 0 and 1 are stubs, 2 is the router, 3 is the server
        let mut links = Vec::new();
        duplex(&mut links, 0, 2);
        duplex(&mut links, 1, 2);
        duplex(&mut links, 2, 3);

        let routes = shortest_paths(4, &links);

        let route = &routes[&(NodeId::new(0), NodeId::new(3))];
        assert_eq!(route.links(), &[LinkId::new(0), LinkId::new(4)]);
        assert_eq!(route.hops(), 2);

        let back = &routes[&(NodeId::new(3), NodeId::new(1))];
        assert_eq!(back.links(), &[LinkId::new(5), LinkId::new(3)]);

        let own = &routes[&(NodeId::new(2), NodeId::new(2))];
        assert!(own.is_empty());
    }

    #[test]
    fn disconnected_nodes_have_no_route() {
        let mut links = Vec::new();
        duplex(&mut links, 0, 1);

        let routes = shortest_paths(3, &links);

        assert!(routes.contains_key(&(NodeId::new(0), NodeId::new(1))));
        assert!(!routes.contains_key(&(NodeId::new(0), NodeId::new(2))));
        assert!(!routes.contains_key(&(NodeId::new(2), NodeId::new(0))));
    }

    #[test]
    fn shortest_in_hops_first_added_wins_ties() {
        // square 0-1-3 and 0-2-3 plus a long detour
        let mut links = Vec::new();
        duplex(&mut links, 0, 1);
        duplex(&mut links, 0, 2);
        duplex(&mut links, 1, 3);
        duplex(&mut links, 2, 3);

        let routes = shortest_paths(4, &links);
        let route = &routes[&(NodeId::new(0), NodeId::new(3))];

        assert_eq!(route.links(), &[LinkId::new(0), LinkId::new(4)]);
    }
}
