//! Quadtree paths: the sequence of child indices leading from a face root to a node.

use std::fmt;

/// One of the four children of a quadtree node.
///
/// ```text
/// 3   2
///   +
/// 0   1
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Quadrant {
    /// Child index 0.
    BottomLeft = 0,
    /// Child index 1.
    BottomRight = 1,
    /// Child index 2.
    TopRight = 2,
    /// Child index 3.
    TopLeft = 3,
}

impl Quadrant {
    /// All four quadrants in child-index order.
    pub const ALL: [Quadrant; 4] = [
        Quadrant::BottomLeft,
        Quadrant::BottomRight,
        Quadrant::TopRight,
        Quadrant::TopLeft,
    ];

    /// Quadrant for a raw child index, if it is in `0..4`.
    #[must_use]
    pub fn from_index(index: u8) -> Option<Quadrant> {
        Self::ALL.get(index as usize).copied()
    }

    /// Raw child index.
    #[must_use]
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Sign of the offset from the parent's center along the face x and y axes.
    #[must_use]
    pub fn offset_sign(self) -> (f64, f64) {
        match self {
            Quadrant::BottomLeft => (-1.0, -1.0),
            Quadrant::BottomRight => (1.0, -1.0),
            Quadrant::TopRight => (1.0, 1.0),
            Quadrant::TopLeft => (-1.0, 1.0),
        }
    }
}

/// Path from the root of a face quadtree to one node.
///
/// The empty path is the root; its length is the node depth.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPath(Vec<Quadrant>);

impl ChunkPath {
    /// The root path (depth 0).
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from raw child indices.
    ///
    /// # Panics
    ///
    /// Panics if any index is outside `0..4`.
    #[must_use]
    pub fn from_indices(indices: &[u8]) -> Self {
        Self(
            indices
                .iter()
                .map(|&i| {
                    Quadrant::from_index(i)
                        .unwrap_or_else(|| panic!("child index {i} out of range 0..4"))
                })
                .collect(),
        )
    }

    /// The path of one child of this node.
    #[must_use]
    pub fn child(&self, quadrant: Quadrant) -> Self {
        let mut quadrants = Vec::with_capacity(self.0.len() + 1);
        quadrants.extend_from_slice(&self.0);
        quadrants.push(quadrant);
        Self(quadrants)
    }

    /// Paths of all four children, in child-index order.
    #[must_use]
    pub fn children(&self) -> [Self; 4] {
        Quadrant::ALL.map(|q| self.child(q))
    }

    /// The parent path, or `None` at the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.0.split_last()?;
        Some(Self(rest.to_vec()))
    }

    /// Depth of the node this path leads to.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Returns true for the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The quadrants along the path, root first.
    #[must_use]
    pub fn quadrants(&self) -> &[Quadrant] {
        &self.0
    }

    /// Returns true if `other` lies inside the subtree rooted at this path.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &ChunkPath) -> bool {
        other.0.starts_with(&self.0)
    }
}

impl fmt::Display for ChunkPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for q in &self.0 {
            write!(f, "{}", q.index())?;
        }
        Ok(())
    }
}
