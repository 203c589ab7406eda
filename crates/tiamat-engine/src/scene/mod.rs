//! Scene graph.
//!
//! Responsibilities:
//! - node lifecycle (ref-counted handles, weak parent back-links)
//! - dirty-flag bookkeeping and lazy world-transform recomputation
//! - deterministic child draw order (z-index + insertion order)
//! - per-frame update/draw traversal and the touch dispatch contract
//! - entity geometry kinds under `scene::shapes`, one file per kind

pub mod config;
pub mod shapes;

mod dirty;
mod group;
mod node;
mod order;
mod stage;
mod touch;
mod transform;
mod tween;

pub use dirty::DirtyMask;
pub use group::{ChildHook, Group};
pub use node::{Node, NodeRef, NodeWeak};
pub use order::{SortKey, ZIndex};
pub use stage::{EventBus, Scene, SubscriptionId};
pub use touch::{TAP_DISTANCE, TouchEvent, TouchListenerId, TouchPhase};
pub use transform::Transform;
pub use tween::{Easing, LoopMode, Tween, TweenId};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Vec2;
    use crate::render::Upload;

    fn rect(name: &str) -> NodeRef {
        Node::new_rect(name, Vec2::new(10.0, 10.0))
    }

    fn draw_order(group: &NodeRef) -> Vec<String> {
        let mut g = group.borrow_mut();
        g.sort_children_to_draw();
        g.shape()
            .as_group()
            .map(|g| g.sorted().iter().map(|c| c.borrow().name().to_string()).collect())
            .unwrap_or_default()
    }

    // ── dirty propagation ─────────────────────────────────────────────────

    #[test]
    fn update_frame_is_idempotent() {
        let node = rect("n");
        let mut n = node.borrow_mut();

        n.update_frame(0.016, None, DirtyMask::CLEAN);
        assert!(n.dirty().is_clean(), "mask reads 0 after the first update");

        // Drain the upload plan as the draw phase would.
        n.mesh_mut().clear_plan();

        n.update_frame(0.016, None, DirtyMask::CLEAN);
        assert!(n.dirty().is_clean());
        assert!(n.mesh().plan().is_empty(), "no redundant recomputation on the second pass");
    }

    #[test]
    fn parent_dirty_bits_propagate_to_children() {
        let parent = Node::new_group("p");
        let child = rect("c");
        parent.borrow_mut().add_child(&child);

        parent.borrow_mut().update_frame(0.0, None, DirtyMask::CLEAN);
        child.borrow_mut().mesh_mut().clear_plan();

        // Moving the parent must re-derive the child's world matrix.
        parent.borrow_mut().set_position(Vec2::new(50.0, 0.0));
        parent.borrow_mut().update_frame(0.0, None, DirtyMask::CLEAN);

        let c = child.borrow();
        assert!(c.mesh().plan().uniform, "child world buffer re-uploaded");
        assert_eq!(c.world_matrix().transform_point(Vec2::zero()), Vec2::new(50.0, 0.0));
    }

    #[test]
    fn position_only_change_is_a_sub_upload_without_realloc() {
        let node = rect("n");
        let mut n = node.borrow_mut();
        n.update_frame(0.0, None, DirtyMask::CLEAN);
        n.mesh_mut().clear_plan();
        let generation = n.mesh().generation();

        n.set_position(Vec2::new(3.0, 4.0));
        n.update_frame(0.0, None, DirtyMask::CLEAN);

        assert_eq!(n.mesh().generation(), generation, "same buffer identity");
        assert_eq!(n.mesh().plan().positions, Upload::Sub { offset: 0, len: 4 });
        assert!(n.mesh().plan().uniform);
    }

    #[test]
    fn size_change_with_stable_counts_keeps_buffer_identity() {
        let node = rect("n");
        let mut n = node.borrow_mut();
        n.update_frame(0.0, None, DirtyMask::CLEAN);
        let generation = n.mesh().generation();

        // A rect stays 4 vertices at any size: no reallocation.
        n.set_size(Vec2::new(99.0, 1.0));
        n.update_frame(0.0, None, DirtyMask::CLEAN);
        assert_eq!(n.mesh().generation(), generation);
    }

    #[test]
    fn vertex_count_change_reallocates() {
        let node = Node::new_circle_with_segments("c", 10.0, 12);
        {
            let mut n = node.borrow_mut();
            n.update_frame(0.0, None, DirtyMask::CLEAN);
        }
        let before = node.borrow().mesh().generation();

        // Swapping the shape's tessellation changes the declared counts.
        {
            let mut n = node.borrow_mut();
            *n.shape_mut() = shapes::Shape::Circle(shapes::CircleShape::new(24));
            n.mark_vertex_dirty();
            n.update_frame(0.0, None, DirtyMask::CLEAN);
        }
        assert!(node.borrow().mesh().generation() > before);
        assert_eq!(node.borrow().mesh().vertices_num(), 24);
    }

    // ── container ordering ────────────────────────────────────────────────

    #[test]
    fn equal_z_preserves_insertion_order() {
        let group = Node::new_group("g");
        for name in ["a", "b", "c", "d"] {
            group.borrow_mut().add_child(&rect(name));
        }
        assert_eq!(draw_order(&group), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn z_change_moves_only_that_child() {
        let group = Node::new_group("g");
        let a = rect("a");
        let b = rect("b");
        let c = rect("c");
        group.borrow_mut().add_child(&a);
        group.borrow_mut().add_child(&b);
        group.borrow_mut().add_child(&c);
        c.borrow_mut().set_z_index(ZIndex(1));

        // A(0), B(0), C(1) draw as A, B, C.
        assert_eq!(draw_order(&group), vec!["a", "b", "c"]);

        // Raising A above the rest moves only A.
        a.borrow_mut().set_z_index(ZIndex(2));
        assert_eq!(draw_order(&group), vec!["b", "c", "a"]);
    }

    #[test]
    fn sort_is_cached_until_marked_dirty() {
        let group = Node::new_group("g");
        group.borrow_mut().add_child(&rect("a"));
        assert_eq!(draw_order(&group), vec!["a"]);

        // Unchanged z-index: setter must not dirty the parent's sort order.
        // (The cache is observable through the sorted list staying valid.)
        assert_eq!(draw_order(&group), vec!["a"]);
    }

    #[test]
    fn double_insertion_is_rejected() {
        let group = Node::new_group("g");
        let child = rect("a");
        group.borrow_mut().add_child(&child);
        group.borrow_mut().add_child(&child);

        let g = group.borrow();
        assert_eq!(g.shape().as_group().unwrap().len(), 1);
    }

    #[test]
    fn insert_before_and_after_position_children() {
        let group = Node::new_group("g");
        let a = rect("a");
        let c = rect("c");
        group.borrow_mut().add_child(&a);
        group.borrow_mut().add_child(&c);

        let b = rect("b");
        group.borrow_mut().insert_child_before(&c, &b);
        let d = rect("d");
        group.borrow_mut().insert_child_after(&c, &d);

        assert_eq!(draw_order(&group), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn remove_clears_the_parent_link() {
        let group = Node::new_group("g");
        let child = rect("a");
        group.borrow_mut().add_child(&child);
        assert!(child.borrow().parent().is_some());

        child.borrow_mut().remove_from_parent();
        assert!(child.borrow().parent().is_none());
        assert_eq!(group.borrow().shape().as_group().unwrap().len(), 0);
    }

    #[test]
    fn reparenting_detaches_from_the_old_container() {
        let g1 = Node::new_group("g1");
        let g2 = Node::new_group("g2");
        let child = rect("a");

        g1.borrow_mut().add_child(&child);
        g2.borrow_mut().add_child(&child);

        assert_eq!(g1.borrow().shape().as_group().unwrap().len(), 0);
        assert_eq!(g2.borrow().shape().as_group().unwrap().len(), 1);
        assert!(std::rc::Rc::ptr_eq(&child.borrow().parent().unwrap(), &g2));
    }

    #[test]
    fn add_remove_hooks_fire() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let group = Node::new_group("g");
        {
            let mut g = group.borrow_mut();
            let sink = log.clone();
            g.shape_mut().as_group_mut().unwrap().set_on_child_added(Some(Box::new(
                move |child| sink.borrow_mut().push(format!("+{}", child.borrow().name())),
            )));
            let sink = log.clone();
            g.shape_mut().as_group_mut().unwrap().set_on_child_removed(Some(Box::new(
                move |child| sink.borrow_mut().push(format!("-{}", child.borrow().name())),
            )));
        }

        let child = rect("a");
        group.borrow_mut().add_child(&child);
        group.borrow_mut().remove_child(&child);

        assert_eq!(log.borrow().as_slice(), &["+a".to_string(), "-a".to_string()]);
    }

    // ── alignment query ───────────────────────────────────────────────────

    #[test]
    fn position_of_anchor_accounts_for_anchor_size_and_scale() {
        let node = rect("n");
        let mut n = node.borrow_mut();
        n.set_position(Vec2::new(100.0, 100.0));
        n.set_anchor(Vec2::new(0.5, 0.5));
        n.set_size(Vec2::new(20.0, 10.0));
        n.set_scale(Vec2::new(2.0, 1.0));

        // Bottom-right corner: half the scaled size away from the center.
        assert_eq!(n.position_of_anchor(Vec2::new(1.0, 1.0)), Vec2::new(120.0, 105.0));
        assert_eq!(n.position_of_anchor(Vec2::new(0.5, 0.5)), Vec2::new(100.0, 100.0));
    }

    // ── tween integration ─────────────────────────────────────────────────

    #[test]
    fn tweens_drive_the_transform_and_dirty_bits() {
        let node = rect("n");
        let mut n = node.borrow_mut();
        n.update_frame(0.0, None, DirtyMask::CLEAN);
        n.mesh_mut().clear_plan();

        n.run_tween(Tween::position(Vec2::zero(), Vec2::new(10.0, 0.0), 1.0));
        n.update_frame(0.5, None, DirtyMask::CLEAN);

        assert!((n.position().x - 5.0).abs() < 1e-4);
        assert!(n.mesh().plan().uniform, "position tween re-uploads the world buffer");
    }

    #[test]
    fn color_tween_marks_only_color() {
        let node = rect("n");
        let mut n = node.borrow_mut();
        n.update_frame(0.0, None, DirtyMask::CLEAN);
        n.mesh_mut().clear_plan();

        n.run_tween(Tween::color(
            crate::paint::Color::WHITE,
            crate::paint::Color::TRANSPARENT,
            1.0,
        ));
        n.update_frame(0.25, None, DirtyMask::CLEAN);

        assert_eq!(n.mesh().plan().positions, Upload::None);
        assert!(n.mesh().plan().uniform);
        assert!((n.color().a - 0.75).abs() < 1e-4);
    }

    // ── touch dispatch ────────────────────────────────────────────────────

    #[test]
    fn touch_begin_hits_topmost_and_swallows() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let hits: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
        let group = Node::new_group("g");

        let under = rect("under");
        let over = rect("over");
        over.borrow_mut().set_z_index(ZIndex(1));
        group.borrow_mut().add_child(&under);
        group.borrow_mut().add_child(&over);

        for (node, tag) in [(&under, "under"), (&over, "over")] {
            let sink = hits.clone();
            let mut n = node.borrow_mut();
            n.set_touch_enabled(true);
            n.add_touch_listener(move |_, phase| {
                if phase == TouchPhase::Began {
                    sink.borrow_mut().push(tag);
                }
            });
        }

        group.borrow_mut().update_frame(0.0, None, DirtyMask::CLEAN);

        let event = TouchEvent::begin(1, Vec2::new(5.0, 5.0), 0.0);
        let swallowed = group.borrow_mut().dispatch_touch_began(&event);

        assert!(swallowed);
        assert_eq!(hits.borrow().as_slice(), &["over"], "topmost node swallows the touch");
    }

    #[test]
    fn tap_requires_short_travel() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let phases: Rc<RefCell<Vec<TouchPhase>>> = Rc::new(RefCell::new(Vec::new()));
        let node = rect("btn");
        {
            let sink = phases.clone();
            let mut n = node.borrow_mut();
            n.set_touch_enabled(true);
            n.add_touch_listener(move |_, phase| sink.borrow_mut().push(phase));
            n.update_frame(0.0, None, DirtyMask::CLEAN);
        }

        let begin = TouchEvent::begin(1, Vec2::new(5.0, 5.0), 0.0);
        node.borrow_mut().dispatch_touch_began(&begin);

        // End within the node and the tap threshold.
        let end = TouchEvent {
            position: Vec2::new(7.0, 5.0),
            prev_position: Vec2::new(5.0, 5.0),
            ..begin
        };
        node.borrow_mut().dispatch_touch_ended(&end);

        assert_eq!(
            phases.borrow().as_slice(),
            &[TouchPhase::Began, TouchPhase::Ended, TouchPhase::Tapped]
        );
    }

    #[test]
    fn drag_fires_enter_and_exit() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let phases: Rc<RefCell<Vec<TouchPhase>>> = Rc::new(RefCell::new(Vec::new()));
        let node = rect("pad");
        {
            let sink = phases.clone();
            let mut n = node.borrow_mut();
            n.set_touch_enabled(true);
            n.add_touch_listener(move |_, phase| sink.borrow_mut().push(phase));
            n.update_frame(0.0, None, DirtyMask::CLEAN);
        }

        let begin = TouchEvent::begin(1, Vec2::new(5.0, 5.0), 0.0);
        node.borrow_mut().dispatch_touch_began(&begin);

        // Drag out of bounds, then back in.
        let out = TouchEvent { position: Vec2::new(50.0, 5.0), ..begin };
        node.borrow_mut().dispatch_touch_moved(&out);
        let back = TouchEvent { position: Vec2::new(5.0, 5.0), ..begin };
        node.borrow_mut().dispatch_touch_moved(&back);

        assert_eq!(
            phases.borrow().as_slice(),
            &[
                TouchPhase::Began,
                TouchPhase::Exited,
                TouchPhase::Moved,
                TouchPhase::Entered,
                TouchPhase::Moved,
            ]
        );
    }

    // ── collider lifecycle ────────────────────────────────────────────────

    #[test]
    fn collider_goes_stale_with_the_vertex_bit() {
        let node = rect("n");
        let mut n = node.borrow_mut();
        n.update_frame(0.0, None, DirtyMask::CLEAN);

        assert!(n.contains(Vec2::new(5.0, 5.0)));
        assert!(!n.contains(Vec2::new(50.0, 5.0)));

        n.set_position(Vec2::new(45.0, 0.0));
        n.update_frame(0.0, None, DirtyMask::CLEAN);

        // The cached collider was invalidated and rebuilt at the new spot.
        assert!(n.contains(Vec2::new(50.0, 5.0)));
        assert!(!n.contains(Vec2::new(5.0, 5.0)));
    }

    #[test]
    fn rotated_rect_hit_test_uses_the_obb() {
        let node = rect("n");
        let mut n = node.borrow_mut();
        n.set_anchor(Vec2::new(0.5, 0.5));
        n.set_position(Vec2::new(0.0, 0.0));
        n.set_rotation(45.0);
        n.update_frame(0.0, None, DirtyMask::CLEAN);

        // The rotated square's corner reaches sqrt(50) ≈ 7.07 along the
        // axes; the unrotated square would end at 5.
        assert!(n.contains(Vec2::new(6.5, 0.0)));
        assert!(!n.contains(Vec2::new(6.5, 6.5)));
    }

    // ── baked groups ──────────────────────────────────────────────────────

    #[test]
    fn baked_group_stitches_children_into_one_mesh() {
        let group = Node::new_baked_group("batch");
        let a = rect("a");
        let b = rect("b");
        b.borrow_mut().set_position(Vec2::new(100.0, 0.0));
        group.borrow_mut().add_child(&a);
        group.borrow_mut().add_child(&b);

        group.borrow_mut().update_frame(0.0, None, DirtyMask::CLEAN);
        group.borrow_mut().rebuild_baked();

        let g = group.borrow();
        let mesh = g.mesh();
        assert_eq!(mesh.vertices_num(), 8);
        // 4 + 4 strip indices plus one degenerate bridge pair.
        assert_eq!(mesh.indices_num(), 10);
        assert_eq!(mesh.indices(), &[0, 1, 2, 3, 3, 4, 4, 5, 6, 7]);
        // Second quad baked through its own translation.
        assert_eq!(mesh.positions()[4], [100.0, 0.0]);
        assert!(mesh.has_vertex_colors());
    }

    #[test]
    fn baked_group_rebakes_when_a_child_moves() {
        let group = Node::new_baked_group("batch");
        let a = rect("a");
        group.borrow_mut().add_child(&a);

        group.borrow_mut().update_frame(0.0, None, DirtyMask::CLEAN);
        group.borrow_mut().rebuild_baked();
        assert!(!group.borrow().shape().as_group().unwrap().bake_stale());

        a.borrow_mut().set_position(Vec2::new(7.0, 0.0));
        group.borrow_mut().update_frame(0.0, None, DirtyMask::CLEAN);
        assert!(group.borrow().shape().as_group().unwrap().bake_stale());

        group.borrow_mut().rebuild_baked();
        assert_eq!(group.borrow().mesh().positions()[0], [7.0, 0.0]);
    }
}
