use crate::coords::Vec2;

use super::super::node::{Node, NodeRef};
use super::Shape;

/// Solid rectangle filling the node's local rect.
///
/// Geometry is the shared quad (4 vertices, 4 strip indices); everything
/// interesting — size, color, transform — lives on the node.
pub struct RectShape;

impl Node {
    /// Creates a solid rectangle node.
    pub fn new_rect(name: impl Into<String>, size: Vec2) -> NodeRef {
        let node = Node::with_shape(name, Shape::Rect(RectShape));
        node.borrow_mut().set_size(size);
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::DirtyMask;

    #[test]
    fn rect_node_generates_a_quad() {
        let node = Node::new_rect("panel", Vec2::new(20.0, 10.0));
        let mut n = node.borrow_mut();
        n.update_frame(0.0, None, DirtyMask::CLEAN);

        assert_eq!(n.mesh().vertices_num(), 4);
        assert_eq!(n.mesh().indices(), &[0, 1, 2, 3]);
        assert_eq!(n.mesh().positions()[3], [20.0, 10.0]);
    }
}
