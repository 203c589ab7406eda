use std::cell::RefCell;
use std::collections::HashSet;

use super::node::{Node, NodeRef};
use super::order::SortKey;
use super::shapes::Shape;

/// Hook invoked when a child enters or leaves a container. Higher layers
/// (scene pub/sub wiring) use these to react to graph changes.
pub type ChildHook = Box<dyn FnMut(&NodeRef)>;

/// Ordered child list of a container node.
///
/// Two orders coexist:
/// - the insertion list, walked by `update_frame` (update order is
///   structural, not visual)
/// - the cached sorted-for-draw list, keyed by `(z-index, insertion index)`
///   and rebuilt only when `sort_dirty` is set — add/remove/z-change mark
///   it, everything else reuses the cache across frames
///
/// A pointer-identity set guards against double-insertion of the same node.
pub struct Group {
    children: Vec<NodeRef>,
    identity: HashSet<*const RefCell<Node>>,

    sorted: Vec<NodeRef>,
    sort_dirty: bool,

    /// Baked groups upload their whole subtree into the group's own buffers
    /// and draw it with one call.
    baked: bool,
    bake_stale: bool,
    warned_mixed_textures: bool,

    on_added: Option<ChildHook>,
    on_removed: Option<ChildHook>,
}

impl Group {
    pub fn new() -> Group {
        Group {
            children: Vec::new(),
            identity: HashSet::new(),
            sorted: Vec::new(),
            sort_dirty: false,
            baked: false,
            bake_stale: false,
            warned_mixed_textures: false,
            on_added: None,
            on_removed: None,
        }
    }

    // ── list access ───────────────────────────────────────────────────────

    #[inline]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    #[inline]
    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }

    pub fn contains(&self, child: &NodeRef) -> bool {
        self.identity.contains(&std::rc::Rc::as_ptr(child))
    }

    pub fn position_of(&self, child: &NodeRef) -> Option<usize> {
        self.children.iter().position(|c| std::rc::Rc::ptr_eq(c, child))
    }

    // ── mutation ──────────────────────────────────────────────────────────
    //
    // Callers (the node wrappers) are responsible for parent back-links and
    // the double-insertion check; these methods maintain list, identity set,
    // sort-dirty flag, and hooks.

    pub(crate) fn insert(&mut self, index: Option<usize>, child: NodeRef) {
        self.identity.insert(std::rc::Rc::as_ptr(&child));
        match index {
            Some(i) if i <= self.children.len() => self.children.insert(i, child.clone()),
            _ => self.children.push(child.clone()),
        }
        self.sort_dirty = true;
        self.bake_stale = true;
        if let Some(hook) = self.on_added.as_mut() {
            hook(&child);
        }
    }

    /// Removes a child by pointer identity; returns the removed handle.
    pub(crate) fn remove_by_ptr(&mut self, ptr: *const RefCell<Node>) -> Option<NodeRef> {
        if !self.identity.remove(&ptr) {
            return None;
        }
        let index = self.children.iter().position(|c| std::rc::Rc::as_ptr(c) == ptr)?;
        let child = self.children.remove(index);
        self.sort_dirty = true;
        self.bake_stale = true;
        if let Some(hook) = self.on_removed.as_mut() {
            hook(&child);
        }
        Some(child)
    }

    pub(crate) fn drain_children(&mut self) -> Vec<NodeRef> {
        self.identity.clear();
        self.sorted.clear();
        self.sort_dirty = true;
        self.bake_stale = true;
        let drained: Vec<NodeRef> = self.children.drain(..).collect();
        if let Some(hook) = self.on_removed.as_mut() {
            for child in &drained {
                hook(child);
            }
        }
        drained
    }

    pub fn set_on_child_added(&mut self, hook: Option<ChildHook>) {
        self.on_added = hook;
    }

    pub fn set_on_child_removed(&mut self, hook: Option<ChildHook>) {
        self.on_removed = hook;
    }

    // ── draw order ────────────────────────────────────────────────────────

    #[inline]
    pub fn mark_sort_dirty(&mut self) {
        self.sort_dirty = true;
        self.bake_stale = true;
    }

    /// Rebuilds the sorted-for-draw list if dirty; otherwise a no-op.
    ///
    /// The sort key carries the insertion index explicitly, so the result is
    /// deterministic and reproducible regardless of the sort algorithm's own
    /// stability guarantees.
    pub fn sort_children_to_draw(&mut self) {
        if !self.sort_dirty {
            return;
        }

        let mut keyed: Vec<(SortKey, NodeRef)> = self
            .children
            .iter()
            .enumerate()
            .map(|(i, c)| (SortKey::new(c.borrow().z_index(), i as u32), c.clone()))
            .collect();
        keyed.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        self.sorted.clear();
        self.sorted.extend(keyed.into_iter().map(|(_, c)| c));
        self.sort_dirty = false;
    }

    /// The cached draw order. Valid after [`sort_children_to_draw`].
    #[inline]
    pub fn sorted(&self) -> &[NodeRef] {
        &self.sorted
    }

    // ── baking ────────────────────────────────────────────────────────────

    #[inline]
    pub fn baked(&self) -> bool {
        self.baked
    }

    pub(crate) fn set_baked(&mut self, baked: bool) {
        if self.baked != baked {
            self.baked = baked;
            self.bake_stale = baked;
        }
    }

    #[inline]
    pub(crate) fn bake_stale(&self) -> bool {
        self.bake_stale
    }

    #[inline]
    pub(crate) fn mark_bake_stale(&mut self) {
        self.bake_stale = true;
    }

    #[inline]
    pub(crate) fn clear_bake_stale(&mut self) {
        self.bake_stale = false;
    }

    pub(crate) fn warn_mixed_textures_once(&mut self, group_name: &str) {
        if !self.warned_mixed_textures {
            log::warn!("baked group '{group_name}' mixes textures; using the first one found");
            self.warned_mixed_textures = true;
        }
    }
}

impl Default for Group {
    fn default() -> Self {
        Self::new()
    }
}

impl Node {
    /// Creates an empty container node.
    pub fn new_group(name: impl Into<String>) -> NodeRef {
        Node::with_shape(name, Shape::Group(Group::new()))
    }

    /// Creates a container that bakes its subtree into one vertex buffer
    /// and draws it with a single call.
    pub fn new_baked_group(name: impl Into<String>) -> NodeRef {
        let node = Node::new_group(name);
        if let Some(g) = node.borrow_mut().shape_mut().as_group_mut() {
            g.set_baked(true);
        }
        node
    }
}
