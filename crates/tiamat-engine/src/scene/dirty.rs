use core::ops::BitOr;

/// Per-node staleness bitmask.
///
/// Each bit names a category of derived state that must be recomputed before
/// the next draw:
/// - [`VERTEX`](DirtyMask::VERTEX): anything affecting geometry — position,
///   anchor, scale, rotation, size — so the world matrix and (for leaves)
///   the local vertex data
/// - [`COLOR`](DirtyMask::COLOR): the node color
/// - [`TEXCOORD`](DirtyMask::TEXCOORD): the texture-coordinate layout
///   (atlas window or animation frame)
///
/// Setters only OR bits in; nothing is recomputed eagerly. Consumers check
/// the mask at the start of the relevant operation. Inherited bits union in
/// from the parent during traversal, so a moved group re-derives every
/// descendant's world matrix without per-child bookkeeping.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct DirtyMask(u8);

impl DirtyMask {
    pub const CLEAN: DirtyMask = DirtyMask(0);
    pub const VERTEX: DirtyMask = DirtyMask(1 << 0);
    pub const COLOR: DirtyMask = DirtyMask(1 << 1);
    pub const TEXCOORD: DirtyMask = DirtyMask(1 << 2);
    pub const ALL: DirtyMask = DirtyMask(0b111);

    #[inline]
    pub fn insert(&mut self, other: DirtyMask) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn contains(self, other: DirtyMask) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub fn is_clean(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

impl BitOr for DirtyMask {
    type Output = DirtyMask;
    #[inline]
    fn bitor(self, rhs: DirtyMask) -> DirtyMask {
        DirtyMask(self.0 | rhs.0)
    }
}
