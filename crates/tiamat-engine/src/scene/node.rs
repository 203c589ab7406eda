use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::collision::Collider;
use crate::coords::{Mat4, Vec2};
use crate::paint::Color;
use crate::render::{DrawEntry, MAX_TEXTURE_SETS, MeshBuffers, MeshRenderer, RenderCtx};
use crate::texture::TextureRef;

use super::dirty::DirtyMask;
use super::order::ZIndex;
use super::shapes::{Shape, write_strip_bridge};
use super::touch::{TAP_DISTANCE, TouchEvent, TouchListenerId, TouchPhase, TouchState};
use super::transform::Transform;
use super::tween::{Tween, TweenId, TweenSet, TweenValue};

/// Shared handle to a node. The graph edge (container → child) and any
/// application variable both count as owners; the node is destroyed when the
/// last one releases it.
pub type NodeRef = Rc<RefCell<Node>>;

/// Non-owning handle, used for parent back-references and caches.
pub type NodeWeak = Weak<RefCell<Node>>;

/// A drawable in the scene graph.
///
/// Every node owns exactly one [`Transform`] and one [`MeshBuffers`], a
/// dirty bitmask, a z-index (sort order only, never parenting), a tween set,
/// touch state, a lazily built collider, and its geometry kind. Containers
/// are nodes whose kind is [`Shape::Group`].
///
/// Nodes are created through the per-kind factories (`new_group`,
/// `new_rect`, `new_sprite`, …) which return a [`NodeRef`]. The node keeps a
/// weak self-reference so children it adopts can point back at it; the
/// parent link is weak and used only for removal and dirty bubbling.
///
/// Borrow discipline: the graph is single-threaded `Rc<RefCell<…>>`.
/// Callbacks (touch listeners, tween/animation completions) run while the
/// owning node is borrowed and must not re-borrow it.
pub struct Node {
    name: String,
    active: bool,

    transform: Transform,
    mesh: MeshBuffers,
    dirty: DirtyMask,
    z_index: ZIndex,

    parent: NodeWeak,
    self_ref: NodeWeak,

    tweens: TweenSet,
    touch: TouchState,
    collider: Option<Collider>,

    shape: Shape,
}

impl Node {
    /// Factory core shared by the per-kind constructors. New nodes start
    /// fully dirty so their first frame derives everything.
    pub(crate) fn with_shape(name: impl Into<String>, shape: Shape) -> NodeRef {
        Rc::new_cyclic(|weak| {
            RefCell::new(Node {
                name: name.into(),
                active: true,
                transform: Transform::new(),
                mesh: MeshBuffers::new(),
                dirty: DirtyMask::ALL,
                z_index: ZIndex::default(),
                parent: Weak::new(),
                self_ref: weak.clone(),
                tweens: TweenSet::default(),
                touch: TouchState::default(),
                collider: None,
                shape,
            })
        })
    }

    // ── identity / bookkeeping ────────────────────────────────────────────

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    #[inline]
    pub fn active(&self) -> bool {
        self.active
    }

    /// Inactive nodes (and their subtrees) neither update nor draw.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        if active {
            // Re-derive everything after a dormant period.
            self.dirty.insert(DirtyMask::ALL);
        }
    }

    #[inline]
    pub fn z_index(&self) -> ZIndex {
        self.z_index
    }

    /// Updates the sort key. Only an actual change marks the parent's sort
    /// order dirty — the sorting cost itself stays deferred to draw time.
    pub fn set_z_index(&mut self, z: ZIndex) {
        if self.z_index == z {
            return;
        }
        self.z_index = z;
        if let Some(parent) = self.parent.upgrade() {
            parent.borrow_mut().mark_sort_dirty();
        }
    }

    pub fn parent(&self) -> Option<NodeRef> {
        self.parent.upgrade()
    }

    #[inline]
    pub fn dirty(&self) -> DirtyMask {
        self.dirty
    }

    /// The node's composed world matrix as of the last `update_frame`.
    pub fn world_matrix(&self) -> Mat4 {
        self.transform.world_matrix()
    }

    #[inline]
    pub fn mesh(&self) -> &MeshBuffers {
        &self.mesh
    }

    pub(crate) fn mesh_mut(&mut self) -> &mut MeshBuffers {
        &mut self.mesh
    }

    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub(crate) fn shape_mut(&mut self) -> &mut Shape {
        &mut self.shape
    }

    pub(crate) fn mark_vertex_dirty(&mut self) {
        self.dirty.insert(DirtyMask::VERTEX);
    }

    pub(crate) fn mark_tex_coords_dirty(&mut self) {
        self.dirty.insert(DirtyMask::TEXCOORD);
    }

    fn mark_sort_dirty(&mut self) {
        if let Some(g) = self.shape.as_group_mut() {
            g.mark_sort_dirty();
        }
    }

    // ── transform setters (dirty-flag bookkeeping) ────────────────────────

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.transform.position()
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.transform.set_position(position);
        self.dirty.insert(DirtyMask::VERTEX);
    }

    pub fn set_position_x(&mut self, x: f32) {
        let p = self.transform.position();
        self.set_position(Vec2::new(x, p.y));
    }

    pub fn set_position_y(&mut self, y: f32) {
        let p = self.transform.position();
        self.set_position(Vec2::new(p.x, y));
    }

    #[inline]
    pub fn scale(&self) -> Vec2 {
        self.transform.scale()
    }

    pub fn set_scale(&mut self, scale: Vec2) {
        self.transform.set_scale(scale);
        self.dirty.insert(DirtyMask::VERTEX);
    }

    pub fn set_scale_x(&mut self, x: f32) {
        let s = self.transform.scale();
        self.set_scale(Vec2::new(x, s.y));
    }

    pub fn set_scale_y(&mut self, y: f32) {
        let s = self.transform.scale();
        self.set_scale(Vec2::new(s.x, y));
    }

    #[inline]
    pub fn rotation(&self) -> f32 {
        self.transform.rotation()
    }

    pub fn set_rotation(&mut self, degrees: f32) {
        self.transform.set_rotation(degrees);
        self.dirty.insert(DirtyMask::VERTEX);
    }

    #[inline]
    pub fn anchor(&self) -> Vec2 {
        self.transform.anchor()
    }

    pub fn set_anchor(&mut self, anchor: Vec2) {
        self.transform.set_anchor(anchor);
        self.dirty.insert(DirtyMask::VERTEX);
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        self.transform.size()
    }

    pub fn set_size(&mut self, size: Vec2) {
        self.transform.set_size(size);
        self.dirty.insert(DirtyMask::VERTEX);
    }

    pub fn set_size_x(&mut self, x: f32) {
        let s = self.transform.size();
        self.set_size(Vec2::new(x, s.y));
    }

    pub fn set_size_y(&mut self, y: f32) {
        let s = self.transform.size();
        self.set_size(Vec2::new(s.x, y));
    }

    #[inline]
    pub fn color(&self) -> Color {
        self.transform.color()
    }

    pub fn set_color(&mut self, color: Color) {
        self.transform.set_color(color);
        self.dirty.insert(DirtyMask::COLOR);
    }

    pub fn set_alpha(&mut self, alpha: f32) {
        let mut c = self.transform.color();
        c.a = alpha;
        self.set_color(c);
    }

    /// Position of an arbitrary anchor point of this node's bounding box in
    /// parent space, computed from the current anchor/position/size/scale.
    /// An alignment query; mutates nothing.
    pub fn position_of_anchor(&self, query: Vec2) -> Vec2 {
        let t = &self.transform;
        t.position() + ((query - t.anchor()) * t.size()) * t.scale()
    }

    /// Binds a texture to the given set and invalidates texcoords (flip
    /// orientation or window normalization may change with it).
    pub fn set_texture(&mut self, set: usize, texture: Option<TextureRef>) {
        self.mesh.set_texture(set, texture);
        self.dirty.insert(DirtyMask::TEXCOORD);
    }

    // ── tweens ────────────────────────────────────────────────────────────

    /// Attaches a tween; it is stepped every frame until it completes or is
    /// cancelled.
    pub fn run_tween(&mut self, tween: Tween) -> TweenId {
        self.tweens.run(tween)
    }

    pub fn cancel_tween(&mut self, id: TweenId) -> bool {
        self.tweens.cancel(id)
    }

    pub fn cancel_all_tweens(&mut self) {
        self.tweens.cancel_all();
    }

    // ── touch ─────────────────────────────────────────────────────────────

    pub fn set_touch_enabled(&mut self, enabled: bool) {
        self.touch.enabled = enabled;
    }

    /// Whether a handled touch stops propagating to nodes underneath.
    pub fn set_swallow_touches(&mut self, swallow: bool) {
        self.touch.swallow = swallow;
    }

    pub fn add_touch_listener(
        &mut self,
        listener: impl FnMut(&TouchEvent, TouchPhase) + 'static,
    ) -> TouchListenerId {
        self.touch.add_listener(Box::new(listener))
    }

    pub fn remove_touch_listener(&mut self, id: TouchListenerId) -> bool {
        self.touch.remove_listener(id)
    }

    /// Hit test against the current collider.
    ///
    /// The collider derives from the world transform, so this is meaningful
    /// after the frame's `update_frame` pass.
    pub fn contains(&mut self, point: Vec2) -> bool {
        if !self.active {
            return false;
        }
        crate::collision::contains(self.collider(), point)
    }

    /// The shape-specific collision geometry, built lazily from the current
    /// world matrix and cached until the next vertex-dirty update.
    pub fn collider(&mut self) -> &Collider {
        let Node { collider, shape, transform, .. } = self;
        collider.get_or_insert_with(|| {
            shape.build_collider(&transform.world_matrix(), transform.size())
        })
    }

    // ── children ──────────────────────────────────────────────────────────

    /// Appends a child. Double insertion of the same node and self-adoption
    /// are rejected no-ops. A child with another parent is reparented.
    pub fn add_child(&mut self, child: &NodeRef) {
        self.attach_child(None, child);
    }

    /// Inserts `child` just before `anchor` in the insertion list (and thus
    /// before it among equal z-indices). Unknown anchors append.
    pub fn insert_child_before(&mut self, anchor: &NodeRef, child: &NodeRef) {
        let index = self.shape.as_group().and_then(|g| g.position_of(anchor));
        if index.is_none() {
            log::debug!("insert_child_before: anchor not found; appending");
        }
        self.attach_child(index, child);
    }

    /// Inserts `child` just after `anchor`. Unknown anchors append.
    pub fn insert_child_after(&mut self, anchor: &NodeRef, child: &NodeRef) {
        let index = self.shape.as_group().and_then(|g| g.position_of(anchor)).map(|i| i + 1);
        if index.is_none() {
            log::debug!("insert_child_after: anchor not found; appending");
        }
        self.attach_child(index, child);
    }

    fn attach_child(&mut self, index: Option<usize>, child: &NodeRef) {
        if std::ptr::eq(Weak::as_ptr(&self.self_ref), Rc::as_ptr(child)) {
            log::warn!("node '{}' cannot adopt itself", self.name);
            return;
        }
        // Adopting an ancestor would create an ownership cycle (and an
        // unbounded traversal).
        let mut ancestor = self.parent.upgrade();
        while let Some(p) = ancestor {
            if Rc::ptr_eq(&p, child) {
                log::warn!("node '{}' cannot adopt one of its ancestors", self.name);
                return;
            }
            ancestor = p.borrow().parent();
        }
        let self_ref = self.self_ref.clone();
        let Some(group) = self.shape.as_group_mut() else {
            log::warn!("add_child on leaf node '{}'", self.name);
            return;
        };
        if group.contains(child) {
            return;
        }

        {
            let mut c = child.borrow_mut();
            if let Some(old_parent) = c.take_parent() {
                old_parent.borrow_mut().detach_child_ptr(Rc::as_ptr(child));
            }
            c.parent = self_ref;
            // The child enters a new parent space; re-derive everything.
            c.dirty.insert(DirtyMask::ALL);
        }

        group.insert(index, child.clone());
    }

    /// Removes a child. Unknown children are a no-op.
    pub fn remove_child(&mut self, child: &NodeRef) {
        let Some(group) = self.shape.as_group_mut() else { return };
        if !group.contains(child) {
            return;
        }
        child.borrow_mut().parent = Weak::new();
        group.remove_by_ptr(Rc::as_ptr(child));
    }

    pub fn remove_all_children(&mut self) {
        let Some(group) = self.shape.as_group_mut() else { return };
        for child in group.drain_children() {
            child.borrow_mut().parent = Weak::new();
        }
    }

    /// Detaches this node from its parent container, if any.
    pub fn remove_from_parent(&mut self) {
        let me = Weak::as_ptr(&self.self_ref);
        if let Some(parent) = self.take_parent() {
            parent.borrow_mut().detach_child_ptr(me);
        }
    }

    fn take_parent(&mut self) -> Option<NodeRef> {
        let parent = self.parent.upgrade();
        self.parent = Weak::new();
        parent
    }

    /// List maintenance only — never touches the child's `RefCell`, so it is
    /// safe while the child itself is borrowed.
    fn detach_child_ptr(&mut self, ptr: *const RefCell<Node>) {
        if let Some(g) = self.shape.as_group_mut() {
            g.remove_by_ptr(ptr);
        }
    }

    /// Rebuilds this container's sorted-for-draw list if its sort order is
    /// dirty.
    pub fn sort_children_to_draw(&mut self) {
        if let Some(g) = self.shape.as_group_mut() {
            g.sort_children_to_draw();
        }
    }

    // ── frame traversal ───────────────────────────────────────────────────

    /// Per-frame update: advances tweens and sheet animation, unions
    /// inherited dirty bits, recomputes the world buffer and leaf geometry
    /// where needed, then forwards to children in **insertion** order (sort
    /// order matters for drawing only).
    ///
    /// Returns the dirty union of the whole subtree (drives bake
    /// invalidation). The node's own mask reads clean afterwards; the upload
    /// plan on the mesh carries the re-bind decisions to the draw phase.
    pub fn update_frame(
        &mut self,
        dt: f32,
        parent_world: Option<&Mat4>,
        inherited: DirtyMask,
    ) -> DirtyMask {
        if !self.active {
            return DirtyMask::CLEAN;
        }

        self.step_animations(dt);
        self.dirty.insert(inherited);
        let dirty = self.dirty;

        if dirty.contains(DirtyMask::VERTEX) {
            self.transform.update_matrix(parent_world);
            self.collider = None;
            self.rebind_geometry();
            self.mesh.mark_uniform();
        }
        if dirty.contains(DirtyMask::COLOR) {
            self.transform.update_color();
            self.mesh.mark_uniform();
        }
        if dirty.contains(DirtyMask::TEXCOORD) {
            self.rebind_tex_coords();
        }

        let mut subtree = dirty;
        if self.shape.is_group() {
            let world = self.transform.world_matrix();
            let child_count = self.shape.as_group().map_or(0, |g| g.len());
            for i in 0..child_count {
                let Some(child) = self.shape.as_group().and_then(|g| g.children().get(i).cloned())
                else {
                    break;
                };
                subtree.insert(child.borrow_mut().update_frame(dt, Some(&world), dirty));
            }
            if let Some(g) = self.shape.as_group_mut() {
                if g.baked() && !subtree.is_clean() {
                    g.mark_bake_stale();
                }
            }
        }

        self.dirty.clear();
        subtree
    }

    fn step_animations(&mut self, dt: f32) {
        {
            let Node { tweens, transform, dirty, .. } = self;
            tweens.step(dt, |value| apply_tween_value(transform, dirty, value));
        }
        if let Shape::Sheet(sheet) = &mut self.shape {
            if sheet.step(dt) {
                self.dirty.insert(DirtyMask::TEXCOORD);
            }
        }
    }

    /// Regenerates leaf geometry into the mesh. Stable counts record a
    /// sub-range upload into the same buffers; a count change has already
    /// reallocated, so everything re-binds fully (texcoords included).
    fn rebind_geometry(&mut self) {
        if self.shape.is_group() {
            return;
        }

        let (vertex_count, index_count) = self.shape.counts();
        let size = self.transform.size();
        let realloc = self.mesh.set_vertices_num(vertex_count)
            | self.mesh.set_indices_num(index_count);
        if vertex_count == 0 || index_count == 0 {
            return;
        }

        let Node { shape, mesh, .. } = self;
        shape.write_vertices(mesh, 0, 0, size, None);
        if realloc {
            mesh.bind_vertices();
            shape.write_tex_coords(mesh, 0);
            for set in 0..MAX_TEXTURE_SETS {
                if mesh.has_tex_coords(set) {
                    mesh.bind_tex_coords(set);
                }
            }
        } else {
            mesh.bind_vertices_sub(0, vertex_count);
        }
    }

    fn rebind_tex_coords(&mut self) {
        let vertex_count = self.mesh.vertices_num();
        if vertex_count == 0 {
            return;
        }
        let Node { shape, mesh, .. } = self;
        shape.write_tex_coords(mesh, 0);
        for set in 0..MAX_TEXTURE_SETS {
            if mesh.has_tex_coords(set) {
                mesh.bind_tex_coords_sub(set, 0, vertex_count);
            }
        }
    }

    // ── draw traversal ────────────────────────────────────────────────────

    /// Collects draw entries in paint order: containers re-sort if needed
    /// and recurse through the sorted list; leaves (and baked groups) flush
    /// their upload plan and emit one entry.
    pub fn collect_draws(
        &mut self,
        ctx: &RenderCtx<'_>,
        renderer: &mut MeshRenderer,
        out: &mut Vec<DrawEntry>,
    ) {
        if !self.active {
            return;
        }

        if self.shape.is_group() {
            let baked = self.shape.as_group().is_some_and(|g| g.baked());
            if baked {
                if self.shape.as_group().is_some_and(|g| g.bake_stale()) {
                    self.rebuild_baked();
                }
                if let Some(entry) =
                    renderer.prepare(ctx, &mut self.mesh, self.transform.world_data())
                {
                    out.push(entry);
                }
            } else {
                self.sort_children_to_draw();
                let count = self.shape.as_group().map_or(0, |g| g.sorted().len());
                for i in 0..count {
                    let Some(child) =
                        self.shape.as_group().and_then(|g| g.sorted().get(i).cloned())
                    else {
                        break;
                    };
                    child.borrow_mut().collect_draws(ctx, renderer, out);
                }
            }
            return;
        }

        if let Some(entry) = renderer.prepare(ctx, &mut self.mesh, self.transform.world_data()) {
            out.push(entry);
        }
    }

    // ── baking ────────────────────────────────────────────────────────────

    /// Rebuilds a baked group's buffers: every leaf of the subtree, in draw
    /// order, baked through its accumulated group-local matrix and stitched
    /// into one strip via degenerate bridges. Per-leaf colors land in the
    /// vertex-color array so one draw call preserves per-node tints.
    pub(crate) fn rebuild_baked(&mut self) {
        // Draw order must be current through the whole subtree.
        self.sort_children_to_draw();
        {
            let Some(g) = self.shape.as_group() else { return };
            for i in 0..g.sorted().len() {
                sort_subtree(&g.sorted()[i].clone());
            }
        }

        let mut totals = BakeTotals::default();
        if let Some(g) = self.shape.as_group() {
            for child in g.sorted() {
                bake_counts(child, &mut totals);
            }
        }
        if totals.mixed {
            let name = self.name.clone();
            if let Some(g) = self.shape.as_group_mut() {
                g.warn_mixed_textures_once(&name);
            }
        }

        self.mesh.set_vertices_num(totals.vertices);
        self.mesh.set_indices_num(totals.indices);
        if totals.vertices > 0 {
            self.mesh.enable_vertex_colors();
            if let Some(texture) = totals.texture.clone() {
                self.mesh.enable_tex_coords(0);
                self.mesh.set_texture(0, Some(texture));
            }

            let mut cursor = BakeCursor::default();
            {
                let Node { shape, mesh, .. } = self;
                if let Some(g) = shape.as_group() {
                    for child in g.sorted() {
                        bake_into(mesh, child, &Mat4::IDENTITY, &mut cursor);
                    }
                }
            }

            self.mesh.bind_vertices();
            self.mesh.bind_vertex_colors();
            if self.mesh.has_tex_coords(0) {
                self.mesh.bind_tex_coords(0);
            }
            self.mesh.mark_uniform();
        }

        if let Some(g) = self.shape.as_group_mut() {
            g.clear_bake_stale();
        }
    }

    // ── touch dispatch ────────────────────────────────────────────────────

    /// Routes a touch-begin through the subtree, topmost first (reverse
    /// draw order). Returns whether a swallowing node consumed it.
    pub fn dispatch_touch_began(&mut self, event: &TouchEvent) -> bool {
        if !self.active {
            return false;
        }

        if self.shape.is_group() {
            self.sort_children_to_draw();
            let count = self.shape.as_group().map_or(0, |g| g.sorted().len());
            for i in (0..count).rev() {
                let Some(child) = self.shape.as_group().and_then(|g| g.sorted().get(i).cloned())
                else {
                    break;
                };
                if child.borrow_mut().dispatch_touch_began(event) {
                    return true;
                }
            }
        }

        if self.touch.enabled && self.contains(event.position) {
            self.touch.began.insert(event.id);
            self.touch.entered.insert(event.id);
            self.touch.emit(event, TouchPhase::Began);
            return self.touch.swallow;
        }
        false
    }

    /// Routes a touch-move: every node tracking this touch gets a `Moved`,
    /// plus `Entered`/`Exited` when the touch crosses its bounds.
    pub fn dispatch_touch_moved(&mut self, event: &TouchEvent) {
        if !self.active {
            return;
        }

        let child_count = self.shape.as_group().map_or(0, |g| g.len());
        for i in 0..child_count {
            let Some(child) = self.shape.as_group().and_then(|g| g.children().get(i).cloned())
            else {
                break;
            };
            child.borrow_mut().dispatch_touch_moved(event);
        }

        if self.touch.began.contains(&event.id) {
            let inside = self.contains(event.position);
            let was_inside = self.touch.entered.contains(&event.id);
            if inside && !was_inside {
                self.touch.entered.insert(event.id);
                self.touch.emit(event, TouchPhase::Entered);
            } else if !inside && was_inside {
                self.touch.entered.remove(&event.id);
                self.touch.emit(event, TouchPhase::Exited);
            }
            self.touch.emit(event, TouchPhase::Moved);
        }
    }

    /// Routes a touch-end: `Ended` for every tracking node, plus `Tapped`
    /// when the touch ends inside within the tap-distance threshold.
    pub fn dispatch_touch_ended(&mut self, event: &TouchEvent) {
        if !self.active {
            return;
        }

        let child_count = self.shape.as_group().map_or(0, |g| g.len());
        for i in 0..child_count {
            let Some(child) = self.shape.as_group().and_then(|g| g.children().get(i).cloned())
            else {
                break;
            };
            child.borrow_mut().dispatch_touch_ended(event);
        }

        if self.touch.began.contains(&event.id) {
            self.touch.emit(event, TouchPhase::Ended);
            if event.travel() <= TAP_DISTANCE && self.contains(event.position) {
                self.touch.emit(event, TouchPhase::Tapped);
            }
            self.touch.forget(event.id);
        }
    }
}

fn apply_tween_value(transform: &mut Transform, dirty: &mut DirtyMask, value: TweenValue) {
    match value {
        TweenValue::Position(v) => {
            transform.set_position(v);
            dirty.insert(DirtyMask::VERTEX);
        }
        TweenValue::Scale(v) => {
            transform.set_scale(v);
            dirty.insert(DirtyMask::VERTEX);
        }
        TweenValue::Size(v) => {
            transform.set_size(v);
            dirty.insert(DirtyMask::VERTEX);
        }
        TweenValue::Rotation(v) => {
            transform.set_rotation(v);
            dirty.insert(DirtyMask::VERTEX);
        }
        TweenValue::Color(v) => {
            transform.set_color(v);
            dirty.insert(DirtyMask::COLOR);
        }
    }
}

// ── bake helpers ──────────────────────────────────────────────────────────

#[derive(Default)]
struct BakeTotals {
    vertices: usize,
    indices: usize,
    leaves: usize,
    texture: Option<TextureRef>,
    mixed: bool,
}

#[derive(Default)]
struct BakeCursor {
    v: usize,
    i: usize,
    last: Option<u16>,
}

fn sort_subtree(node: &NodeRef) {
    let mut n = node.borrow_mut();
    if let Some(g) = n.shape.as_group_mut() {
        g.sort_children_to_draw();
        for i in 0..g.sorted().len() {
            let child = g.sorted()[i].clone();
            sort_subtree(&child);
        }
    }
}

fn bake_counts(node: &NodeRef, totals: &mut BakeTotals) {
    let n = node.borrow();
    if !n.active {
        return;
    }
    match &n.shape {
        Shape::Group(g) => {
            for child in g.sorted() {
                bake_counts(child, totals);
            }
        }
        shape => {
            let (vertices, indices) = shape.counts();
            if vertices == 0 || indices == 0 {
                return;
            }
            if totals.leaves > 0 {
                totals.indices += 2; // degenerate bridge
            }
            totals.vertices += vertices;
            totals.indices += indices;
            totals.leaves += 1;

            match (&totals.texture, n.mesh.texture(0)) {
                (None, Some(t)) => totals.texture = Some(t.clone()),
                (Some(have), Some(t)) if !Rc::ptr_eq(have, t) => totals.mixed = true,
                _ => {}
            }
        }
    }
}

fn bake_into(mesh: &mut MeshBuffers, node: &NodeRef, parent_rel: &Mat4, cursor: &mut BakeCursor) {
    let n = node.borrow();
    if !n.active {
        return;
    }
    let rel = parent_rel.mul(&n.transform.local_matrix());

    match &n.shape {
        Shape::Group(g) => {
            for child in g.sorted() {
                bake_into(mesh, child, &rel, cursor);
            }
        }
        shape => {
            let (vertices, indices) = shape.counts();
            if vertices == 0 || indices == 0 {
                return;
            }

            if let Some(last) = cursor.last {
                write_strip_bridge(mesh, &mut cursor.i, last, cursor.v as u16);
            }

            shape.write_vertices(mesh, cursor.v, cursor.i, n.transform.size(), Some(&rel));
            shape.write_tex_coords(mesh, cursor.v);

            let color = n.transform.color().to_premul_array();
            for k in 0..vertices {
                mesh.write_color(cursor.v + k, color);
            }

            cursor.last = Some((cursor.v + vertices - 1) as u16);
            cursor.v += vertices;
            cursor.i += indices;
        }
    }
}
