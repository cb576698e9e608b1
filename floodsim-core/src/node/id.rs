use std::fmt;

/// Identifier of a [`Node`] in the [`Topology`].
///
/// Identifiers are handed out sequentially by [`Topology::add_node`],
/// starting at `0`.
///
/// [`Node`]: crate::node::Node
/// [`Topology`]: crate::network::Topology
/// [`Topology::add_node`]: crate::network::Topology::add_node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index as u32)
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}
