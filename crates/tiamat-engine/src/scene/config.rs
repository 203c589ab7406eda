//! Scene serialization hook.
//!
//! Every node kind round-trips through a tagged [`NodeConfig`] document, so
//! scene data can be authored and stored externally. Only authored
//! configuration is serialized — the collider and the world matrix are
//! derived state and are rebuilt on the first frame after [`spawn`].
//!
//! Textures are referenced by logical key and resolved through the
//! process-wide cache at spawn time; a missing key is logged and the node
//! falls back to degenerate (placeholder) texturing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::coords::{Rect, Vec2};
use crate::paint::Color;
use crate::texture::{TextureRef, texture_cache};

use super::node::{Node, NodeRef};
use super::order::ZIndex;
use super::shapes::Shape;

/// Fields shared by every node kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeCommon {
    pub name: String,
    #[serde(default)]
    pub position: [f32; 2],
    #[serde(default)]
    pub size: [f32; 2],
    #[serde(default = "unit_pair")]
    pub scale: [f32; 2],
    #[serde(default)]
    pub rotation: f32,
    #[serde(default)]
    pub anchor: [f32; 2],
    #[serde(default = "white")]
    pub color: [f32; 4],
    #[serde(default)]
    pub z_index: i32,
    #[serde(default = "yes")]
    pub active: bool,
}

fn unit_pair() -> [f32; 2] {
    [1.0, 1.0]
}

fn white() -> [f32; 4] {
    [1.0, 1.0, 1.0, 1.0]
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    #[serde(flatten)]
    pub common: NodeCommon,
    #[serde(default)]
    pub baked: bool,
    #[serde(default)]
    pub children: Vec<NodeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RectConfig {
    #[serde(flatten)]
    pub common: NodeCommon,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolygonConfig {
    #[serde(flatten)]
    pub common: NodeCommon,
    pub points: Vec<[f32; 2]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircleConfig {
    #[serde(flatten)]
    pub common: NodeCommon,
    pub segments: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpriteConfig {
    #[serde(flatten)]
    pub common: NodeCommon,
    #[serde(default)]
    pub texture: Option<String>,
    /// Texel window `[x, y, w, h]` into the texture.
    #[serde(default)]
    pub window: Option<[f32; 4]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slice9Config {
    #[serde(flatten)]
    pub common: NodeCommon,
    #[serde(default)]
    pub texture: Option<String>,
    /// Center rect `[x, y, w, h]` in texels, relative to the window origin.
    pub center: [f32; 4],
    #[serde(default)]
    pub window: Option<[f32; 4]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetConfig {
    #[serde(flatten)]
    pub common: NodeCommon,
    #[serde(default)]
    pub texture: Option<String>,
    /// Frame windows `[x, y, w, h]` in texels.
    pub frames: Vec<[f32; 4]>,
    #[serde(default)]
    pub durations: Option<Vec<f32>>,
}

/// Self-describing node document, tagged by kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeConfig {
    Group(GroupConfig),
    Rect(RectConfig),
    Polygon(PolygonConfig),
    Circle(CircleConfig),
    Sprite(SpriteConfig),
    Slice9(Slice9Config),
    Sheet(SheetConfig),
}

impl NodeConfig {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize node config")
    }

    pub fn from_json(json: &str) -> Result<NodeConfig> {
        serde_json::from_str(json).context("failed to parse node config")
    }
}

// ── serialization ─────────────────────────────────────────────────────────

impl Node {
    /// Serializes this node's authored configuration (recursively for
    /// containers).
    pub fn to_config(&self) -> NodeConfig {
        let common = NodeCommon {
            name: self.name().to_string(),
            position: pair(self.position()),
            size: pair(self.size()),
            scale: pair(self.scale()),
            rotation: self.rotation(),
            anchor: pair(self.anchor()),
            color: self.color().to_array(),
            z_index: self.z_index().0,
            active: self.active(),
        };

        match self.shape() {
            Shape::Group(g) => NodeConfig::Group(GroupConfig {
                common,
                baked: g.baked(),
                children: g.children().iter().map(|c| c.borrow().to_config()).collect(),
            }),
            Shape::Rect(_) => NodeConfig::Rect(RectConfig { common }),
            Shape::Polygon(p) => NodeConfig::Polygon(PolygonConfig {
                common,
                points: p.points().iter().map(|v| pair(*v)).collect(),
            }),
            Shape::Circle(c) => NodeConfig::Circle(CircleConfig {
                common,
                segments: c.segments(),
            }),
            Shape::Sprite(s) => NodeConfig::Sprite(SpriteConfig {
                common,
                texture: self.mesh().texture(0).map(|t| t.key().to_string()),
                window: s.window().map(quad),
            }),
            Shape::Slice9(s) => NodeConfig::Slice9(Slice9Config {
                common,
                texture: self.mesh().texture(0).map(|t| t.key().to_string()),
                center: quad(s.center()),
                window: s.window().map(quad),
            }),
            Shape::Sheet(s) => NodeConfig::Sheet(SheetConfig {
                common,
                texture: self.mesh().texture(0).map(|t| t.key().to_string()),
                frames: s.frames().iter().map(|f| quad(*f)).collect(),
                durations: s.durations().map(|d| d.to_vec()),
            }),
        }
    }
}

/// Reconstructs a node (and, for containers, its subtree) from a config
/// document.
pub fn spawn(config: &NodeConfig) -> NodeRef {
    let node = match config {
        NodeConfig::Group(c) => {
            let node = Node::new_group(c.common.name.clone());
            {
                let mut n = node.borrow_mut();
                if let Some(g) = n.shape_mut().as_group_mut() {
                    g.set_baked(c.baked);
                }
            }
            for child_config in &c.children {
                let child = spawn(child_config);
                node.borrow_mut().add_child(&child);
            }
            node
        }
        NodeConfig::Rect(c) => Node::new_rect(c.common.name.clone(), unpair(c.common.size)),
        NodeConfig::Polygon(c) => Node::new_polygon(
            c.common.name.clone(),
            c.points.iter().map(|p| unpair(*p)).collect(),
        ),
        NodeConfig::Circle(c) => Node::new_circle_with_segments(
            c.common.name.clone(),
            c.common.size[0],
            c.segments,
        ),
        NodeConfig::Sprite(c) => {
            let node = Node::new_sprite(c.common.name.clone(), resolve_texture(c.texture.as_deref()));
            if let Some(w) = c.window {
                node.borrow_mut().set_sprite_window(Some(unquad(w)));
            }
            node
        }
        NodeConfig::Slice9(c) => {
            let node = Node::new_slice9(
                c.common.name.clone(),
                resolve_texture(c.texture.as_deref()),
                unquad(c.center),
            );
            if let Some(w) = c.window {
                node.borrow_mut().set_slice9_window(Some(unquad(w)));
            }
            node
        }
        NodeConfig::Sheet(c) => {
            let node = Node::new_sheet_with_frames(
                c.common.name.clone(),
                resolve_texture(c.texture.as_deref()),
                c.frames.iter().map(|f| unquad(*f)).collect(),
            );
            if let Some(durations) = c.durations.clone() {
                node.borrow_mut().set_frame_durations(durations);
            }
            node
        }
    };

    apply_common(&node, config.common());
    node
}

impl NodeConfig {
    fn common(&self) -> &NodeCommon {
        match self {
            NodeConfig::Group(c) => &c.common,
            NodeConfig::Rect(c) => &c.common,
            NodeConfig::Polygon(c) => &c.common,
            NodeConfig::Circle(c) => &c.common,
            NodeConfig::Sprite(c) => &c.common,
            NodeConfig::Slice9(c) => &c.common,
            NodeConfig::Sheet(c) => &c.common,
        }
    }
}

fn apply_common(node: &NodeRef, common: &NodeCommon) {
    let mut n = node.borrow_mut();
    n.set_position(unpair(common.position));
    n.set_size(unpair(common.size));
    n.set_scale(unpair(common.scale));
    n.set_rotation(common.rotation);
    n.set_anchor(unpair(common.anchor));
    n.set_color(Color::from_array(common.color));
    n.set_z_index(ZIndex(common.z_index));
    n.set_active(common.active);
}

fn resolve_texture(key: Option<&str>) -> Option<TextureRef> {
    let key = key?;
    let found = texture_cache().borrow_mut().lookup(key);
    if found.is_none() {
        log::error!("texture '{key}' not found while spawning scene config");
    }
    found
}

fn pair(v: Vec2) -> [f32; 2] {
    [v.x, v.y]
}

fn unpair(v: [f32; 2]) -> Vec2 {
    Vec2::new(v[0], v[1])
}

fn quad(r: Rect) -> [f32; 4] {
    [r.origin.x, r.origin.y, r.size.x, r.size.y]
}

fn unquad(v: [f32; 4]) -> Rect {
    Rect::new(v[0], v[1], v[2], v[3])
}
