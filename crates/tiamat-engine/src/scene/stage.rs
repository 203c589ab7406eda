use std::collections::{BTreeMap, HashMap};

use crate::render::{DrawEntry, MeshRenderer, RenderCtx, RenderTarget};

use super::dirty::DirtyMask;
use super::node::{Node, NodeRef};
use super::touch::TouchEvent;

/// Subscriber callback; payloads are generic JSON documents so publishers
/// and subscribers stay decoupled.
pub type Subscriber = Box<dyn FnMut(&serde_json::Value)>;

/// Identifier of one subscription, scoped to its topic.
pub type SubscriptionId = u64;

/// Topic-keyed publish/subscribe bus.
///
/// Used by application layers to react to scene-level events (spawns,
/// despawns, game state) without holding node references across systems.
#[derive(Default)]
pub struct EventBus {
    topics: HashMap<String, BTreeMap<SubscriptionId, Subscriber>>,
    next_id: SubscriptionId,
}

impl EventBus {
    pub fn subscribe(
        &mut self,
        topic: impl Into<String>,
        subscriber: impl FnMut(&serde_json::Value) + 'static,
    ) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.topics
            .entry(topic.into())
            .or_default()
            .insert(id, Box::new(subscriber));
        id
    }

    pub fn unsubscribe(&mut self, topic: &str, id: SubscriptionId) -> bool {
        let Some(subs) = self.topics.get_mut(topic) else { return false };
        let removed = subs.remove(&id).is_some();
        if subs.is_empty() {
            self.topics.remove(topic);
        }
        removed
    }

    pub fn publish(&mut self, topic: &str, payload: &serde_json::Value) {
        if let Some(subs) = self.topics.get_mut(topic) {
            for subscriber in subs.values_mut() {
                subscriber(payload);
            }
        }
    }
}

/// The scene: a root container, the renderer that draws it, and the event
/// bus.
///
/// The external driver (windowing layer) calls [`advance`](Scene::advance)
/// then [`render`](Scene::render) once per display refresh. Both are
/// synchronous and CPU-bound; GPU work is queued through the context, never
/// awaited.
pub struct Scene {
    root: NodeRef,
    renderer: MeshRenderer,
    bus: EventBus,

    entries: Vec<DrawEntry>,
}

impl Scene {
    pub fn new() -> Scene {
        Scene {
            root: Node::new_group("root"),
            renderer: MeshRenderer::new(),
            bus: EventBus::default(),
            entries: Vec::new(),
        }
    }

    /// The root container. Application code adds its node trees here.
    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    pub fn bus(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// Update phase: steps tweens and animations, propagates dirty flags,
    /// recomputes world transforms. Children update in insertion order.
    pub fn advance(&mut self, dt: f32) {
        self.root.borrow_mut().update_frame(dt, None, DirtyMask::CLEAN);
    }

    /// Draw phase: walks the tree in sorted paint order, synchronizes GPU
    /// buffers per each node's upload plan, and encodes one render pass.
    pub fn render(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>) {
        self.entries.clear();
        self.root.borrow_mut().collect_draws(ctx, &mut self.renderer, &mut self.entries);
        self.renderer.encode(ctx, target, &self.entries);
    }

    // ── touch entry points ────────────────────────────────────────────────

    /// Routes a touch-begin to the topmost hit node; returns whether it was
    /// swallowed.
    pub fn dispatch_touch_began(&mut self, event: &TouchEvent) -> bool {
        self.root.borrow_mut().dispatch_touch_began(event)
    }

    pub fn dispatch_touch_moved(&mut self, event: &TouchEvent) {
        self.root.borrow_mut().dispatch_touch_moved(event);
    }

    pub fn dispatch_touch_ended(&mut self, event: &TouchEvent) {
        self.root.borrow_mut().dispatch_touch_ended(event);
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn subscribers_receive_published_payloads() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();

        let mut bus = EventBus::default();
        bus.subscribe("spawn", move |payload| {
            sink.borrow_mut().push(payload.clone());
        });

        bus.publish("spawn", &serde_json::json!({ "what": "enemy" }));
        bus.publish("other", &serde_json::json!(1));

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["what"], "enemy");
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let count = Rc::new(RefCell::new(0));
        let sink = count.clone();

        let mut bus = EventBus::default();
        let id = bus.subscribe("tick", move |_| *sink.borrow_mut() += 1);

        bus.publish("tick", &serde_json::Value::Null);
        assert!(bus.unsubscribe("tick", id));
        assert!(!bus.unsubscribe("tick", id));
        bus.publish("tick", &serde_json::Value::Null);

        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn scene_advance_drives_the_tree() {
        let mut scene = Scene::new();
        let rect = Node::new_rect("r", crate::coords::Vec2::new(4.0, 4.0));
        scene.root().borrow_mut().add_child(&rect);

        scene.advance(0.016);
        assert!(rect.borrow().dirty().is_clean());
        assert_eq!(rect.borrow().mesh().vertices_num(), 4);
    }
}
