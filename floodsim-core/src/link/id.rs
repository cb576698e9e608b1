use std::fmt;

/// Identifier of a directed [`Link`].
///
/// [`Topology::add_link`] always creates a pair of links, one per
/// direction, with consecutive identifiers.
///
/// [`Link`]: crate::link::Link
/// [`Topology::add_link`]: crate::network::Topology::add_link
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkId(u32);

impl LinkId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index as u32)
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "l{}", self.0)
    }
}

/// The two directed links created by a single call to
/// [`Topology::add_link`].
///
/// [`Topology::add_link`]: crate::network::Topology::add_link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DuplexLink {
    /// from the first node to the second
    pub forward: LinkId,
    /// from the second node back to the first
    pub reverse: LinkId,
}
