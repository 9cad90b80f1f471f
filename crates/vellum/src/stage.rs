//! # Stage — the Retained Drawable Tree
//!
//! Every entity owns one *container* node on the stage and at most one
//! *payload* node (a rect, sprite, nine-slice, or text run) inside that
//! container. The render backend walks this tree each frame; nothing in here
//! talks to a GPU.
//!
//! ```text
//! root (Container)
//! └── scene container
//!     ├── payload (Rect)
//!     ├── child container
//!     │   └── payload (Sprite)
//!     └── child container
//! ```
//!
//! ## Bounds
//!
//! A node's *local bounds* are the union of its own drawable rectangle and the
//! bounds of its children, in the node's own coordinate space. A child's
//! rectangle in its parent's space is `position + scale * (p - pivot)`.
//! Rotation is ignored: bounds are always axis-aligned.
//!
//! `width()`/`height()` report local bounds times scale, and
//! `set_width()`/`set_height()` change the scale to hit a target size, the same
//! way retained 2D scene graphs usually expose sizes on containers.

use crate::ecs::EntityId;
use crate::math::{Aabb, Vec2};

/// Handle to a node on the [`Stage`]. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Raw index, for diagnostics.
    pub fn index(self) -> u32 {
        self.0
    }
}

/// An RGBA color with floating-point components in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    pub const TRANSPARENT: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);

    /// Create a color from RGB (alpha = 1).
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Create a color from RGBA.
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create a color from a packed `0xRRGGBB` value.
    pub fn from_hex(hex: u32) -> Self {
        Self::rgb(
            ((hex >> 16) & 0xff) as f32 / 255.0,
            ((hex >> 8) & 0xff) as f32 / 255.0,
            (hex & 0xff) as f32 / 255.0,
        )
    }

    /// Pack into `0xRRGGBB`, dropping alpha.
    pub fn to_hex(self) -> u32 {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
        (channel(self.r) << 16) | (channel(self.g) << 8) | channel(self.b)
    }

    /// Parse a CSS-style color: `#rgb`, `#rrggbb`, `#rrggbbaa`, `0xrrggbb`,
    /// `rgb(r, g, b)`, `rgba(r, g, b, a)`, or a common color name.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(hex) = value.strip_prefix('#') {
            return parse_hex_digits(hex);
        }
        if let Some(hex) = value.strip_prefix("0x") {
            return parse_hex_digits(hex);
        }

        let lower = value.to_ascii_lowercase();
        if let Some(args) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let parts: Vec<f32> = args
                .split(',')
                .map(|p| p.trim().parse::<f32>())
                .collect::<Result<_, _>>()
                .ok()?;
            return match parts.as_slice() {
                [r, g, b] => Some(Self::rgb(r / 255.0, g / 255.0, b / 255.0)),
                [r, g, b, a] => Some(Self::rgba(r / 255.0, g / 255.0, b / 255.0, *a)),
                _ => None,
            };
        }

        let hex = match lower.as_str() {
            "white" => 0xffffff,
            "black" => 0x000000,
            "red" => 0xff0000,
            "green" => 0x008000,
            "lime" => 0x00ff00,
            "blue" => 0x0000ff,
            "yellow" => 0xffff00,
            "cyan" | "aqua" => 0x00ffff,
            "magenta" | "fuchsia" => 0xff00ff,
            "gray" | "grey" => 0x808080,
            "silver" => 0xc0c0c0,
            "orange" => 0xffa500,
            "purple" => 0x800080,
            "pink" => 0xffc0cb,
            "brown" => 0xa52a2a,
            "navy" => 0x000080,
            "teal" => 0x008080,
            "transparent" => return Some(Self::TRANSPARENT),
            _ => return None,
        };
        Some(Self::from_hex(hex))
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

fn parse_hex_digits(hex: &str) -> Option<Color> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u32::from_str_radix(&hex[i..=i], 16).ok();
    let byte = |i: usize| u32::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => {
            let (r, g, b) = (nibble(0)?, nibble(1)?, nibble(2)?);
            Some(Color::from_hex((r * 17) << 16 | (g * 17) << 8 | (b * 17)))
        }
        6 => u32::from_str_radix(hex, 16).ok().map(Color::from_hex),
        8 => {
            let rgb = u32::from_str_radix(&hex[..6], 16).ok()?;
            let alpha = byte(6)? as f32 / 255.0;
            Some(Color {
                a: alpha,
                ..Color::from_hex(rgb)
            })
        }
        _ => None,
    }
}

/// A texture (or atlas frame) drawn by a sprite or nine-slice node.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureRef {
    /// Resource URL the texture was loaded from.
    pub src: String,
    /// Frame name inside an atlas, or `None` for the whole image.
    pub frame: Option<String>,
    /// Pixel size of the texture or frame.
    pub size: Vec2,
}

/// Fixed borders of a nine-slice plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Insets {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

/// Style of a text run. Keys without a dedicated field are kept in `extra`
/// for the render backend.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub fill: Color,
    pub font_size: f32,
    pub font_family: String,
    pub align: String,
    pub extra: Vec<(String, String)>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            fill: Color::BLACK,
            font_size: 26.0,
            font_family: "Arial".to_string(),
            align: "center".to_string(),
            extra: Vec::new(),
        }
    }
}

/// A run of text. Its size is an estimate; the render backend owns real glyph
/// metrics.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextRun {
    pub content: String,
    pub style: TextStyle,
}

impl TextRun {
    /// Approximate size: 0.6 em per character, 1.2 em per line.
    pub fn measure(&self) -> Vec2 {
        if self.content.is_empty() {
            return Vec2::ZERO;
        }
        let lines = self.content.lines().count().max(1);
        let longest = self
            .content
            .lines()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0);
        let em = self.style.font_size;
        Vec2::new(longest as f32 * em * 0.6, lines as f32 * em * 1.2)
    }
}

/// What a node draws.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A group with no drawable of its own.
    Container,
    /// A solid rectangle.
    Rect { size: Vec2, color: Color },
    /// A textured quad. `None` until a texture has been assigned.
    Sprite { texture: Option<TextureRef> },
    /// A texture stretched with fixed borders.
    NineSlice {
        texture: TextureRef,
        insets: Insets,
        size: Vec2,
    },
    /// A text run.
    Text(TextRun),
}

impl NodeKind {
    /// The drawable's own rectangle in local space, if it draws anything.
    fn own_bounds(&self) -> Option<Aabb> {
        let size = match self {
            NodeKind::Container => return None,
            NodeKind::Rect { size, .. } => *size,
            NodeKind::Sprite { texture } => texture.as_ref()?.size,
            NodeKind::NineSlice { size, .. } => *size,
            NodeKind::Text(run) => run.measure(),
        };
        Some(Aabb::new(0.0, 0.0, size.x, size.y))
    }

    fn label(&self) -> &'static str {
        match self {
            NodeKind::Container => "container",
            NodeKind::Rect { .. } => "rect",
            NodeKind::Sprite { .. } => "sprite",
            NodeKind::NineSlice { .. } => "nine_slice",
            NodeKind::Text(_) => "text",
        }
    }
}

/// One node of the stage.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub position: Vec2,
    pub scale: Vec2,
    /// Local point placed at `position`.
    pub pivot: Vec2,
    /// Radians.
    pub rotation: f32,
    pub alpha: f32,
    pub visible: bool,
    /// Whether pointer hit-testing considers this node.
    pub interactive: bool,
    pub cursor: Option<String>,
    /// Entity whose container this is, if any.
    pub owner: Option<EntityId>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            position: Vec2::ZERO,
            scale: Vec2::ONE,
            pivot: Vec2::ZERO,
            rotation: 0.0,
            alpha: 1.0,
            visible: true,
            interactive: false,
            cursor: None,
            owner: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Map a local-space box into the parent's space.
    fn to_parent(&self, local: Aabb) -> Aabb {
        let a = self.position + self.scale * (local.min() - self.pivot);
        let b = self.position + self.scale * (local.max() - self.pivot);
        Aabb::from_corners(a.min(b), a.max(b))
    }
}

/// The drawable tree.
#[derive(Debug, Clone)]
pub struct Stage {
    nodes: Vec<Option<Node>>,
    root: NodeId,
}

impl Stage {
    /// Create a stage holding only an empty root container.
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node::new(NodeKind::Container))],
            root: NodeId(0),
        }
    }

    /// The root container. The render backend starts here.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Create a detached node.
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(Node::new(kind)));
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(Node::children).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::parent)
    }

    /// Append `child` to `parent`, first detaching it from any previous parent.
    ///
    /// Returns `false` if either node is missing or the link would create a
    /// cycle.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if parent == child || !self.contains(parent) || !self.contains(child) {
            return false;
        }
        if self.is_ancestor(child, parent) {
            return false;
        }
        self.detach(child);
        if let Some(node) = self.get_mut(parent) {
            node.children.push(child);
        }
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        true
    }

    /// Unlink `child` from `parent`. Returns `false` if it wasn't a child.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let Some(node) = self.get_mut(parent) else {
            return false;
        };
        let Some(index) = node.children.iter().position(|&c| c == child) else {
            return false;
        };
        node.children.remove(index);
        if let Some(child_node) = self.get_mut(child) {
            child_node.parent = None;
        }
        true
    }

    /// Unlink a node from whatever parent it has.
    pub fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.parent(child) {
            self.remove_child(parent, child);
        }
    }

    /// Destroy a node and all of its descendants.
    pub fn destroy(&mut self, id: NodeId) {
        if id == self.root || !self.contains(id) {
            return;
        }
        self.detach(id);
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(node) = self.nodes.get_mut(current.0 as usize).and_then(Option::take) {
                pending.extend(node.children);
            }
        }
    }

    fn is_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        while let Some(parent) = self.parent(node) {
            if parent == ancestor {
                return true;
            }
            node = parent;
        }
        false
    }

    // ── Bounds ───────────────────────────────────────────────────────

    /// Content bounds in the node's own coordinate space, or `None` if the
    /// node and its subtree draw nothing.
    pub fn local_bounds(&self, id: NodeId) -> Option<Aabb> {
        let node = self.get(id)?;
        let mut bounds = node.kind.own_bounds();
        for &child in &node.children {
            if let Some(child_bounds) = self.bounds_in_parent(child) {
                bounds = Some(match bounds {
                    Some(b) => b.union(&child_bounds),
                    None => child_bounds,
                });
            }
        }
        bounds
    }

    /// The node's content bounds mapped into its parent's space.
    pub fn bounds_in_parent(&self, id: NodeId) -> Option<Aabb> {
        let node = self.get(id)?;
        self.local_bounds(id).map(|local| node.to_parent(local))
    }

    /// Content bounds in stage (root) space.
    pub fn world_bounds(&self, id: NodeId) -> Option<Aabb> {
        let mut bounds = self.bounds_in_parent(id)?;
        let mut current = self.parent(id);
        while let Some(ancestor) = current {
            if ancestor == self.root {
                break;
            }
            let node = self.get(ancestor)?;
            bounds = node.to_parent(bounds);
            current = node.parent;
        }
        Some(bounds)
    }

    /// Scaled width of the node's content.
    pub fn width(&self, id: NodeId) -> f32 {
        match (self.get(id), self.local_bounds(id)) {
            (Some(node), Some(bounds)) => bounds.width * node.scale.x.abs(),
            _ => 0.0,
        }
    }

    /// Scaled height of the node's content.
    pub fn height(&self, id: NodeId) -> f32 {
        match (self.get(id), self.local_bounds(id)) {
            (Some(node), Some(bounds)) => bounds.height * node.scale.y.abs(),
            _ => 0.0,
        }
    }

    /// Rescale horizontally so the content is `width` wide. No effect on a
    /// node without content.
    pub fn set_width(&mut self, id: NodeId, width: f32) {
        let Some(local) = self.local_bounds(id) else {
            return;
        };
        if local.width <= 0.0 {
            return;
        }
        if let Some(node) = self.get_mut(id) {
            let sign = if node.scale.x < 0.0 { -1.0 } else { 1.0 };
            node.scale.x = sign * width / local.width;
        }
    }

    /// Rescale vertically so the content is `height` tall.
    pub fn set_height(&mut self, id: NodeId, height: f32) {
        let Some(local) = self.local_bounds(id) else {
            return;
        };
        if local.height <= 0.0 {
            return;
        }
        if let Some(node) = self.get_mut(id) {
            let sign = if node.scale.y < 0.0 { -1.0 } else { 1.0 };
            node.scale.y = sign * height / local.height;
        }
    }

    /// The box used for collision tests: the node's position with its scaled
    /// content size.
    pub fn collision_box(&self, id: NodeId) -> Option<Aabb> {
        let node = self.get(id)?;
        Some(Aabb::new(
            node.position.x,
            node.position.y,
            self.width(id),
            self.height(id),
        ))
    }

    // ── Hit testing ──────────────────────────────────────────────────

    /// Topmost visible interactive node whose world bounds contain `point`.
    ///
    /// Later children are drawn on top, so they are tested first; descendants
    /// win over their ancestors.
    pub fn hit_test(&self, point: Vec2) -> Option<NodeId> {
        self.hit_test_from(self.root, point)
    }

    fn hit_test_from(&self, id: NodeId, point: Vec2) -> Option<NodeId> {
        let node = self.get(id)?;
        if !node.visible {
            return None;
        }
        for &child in node.children.iter().rev() {
            if let Some(hit) = self.hit_test_from(child, point) {
                return Some(hit);
            }
        }
        if node.interactive && self.world_bounds(id).is_some_and(|b| b.contains(point)) {
            return Some(id);
        }
        None
    }

    // ── Diagnostics ──────────────────────────────────────────────────

    /// A JSON description of the subtree at `id`, for debugging and
    /// headless inspection.
    #[cfg(feature = "diagnostics")]
    pub fn snapshot(&self, id: NodeId) -> serde_json::Value {
        let Some(node) = self.get(id) else {
            return serde_json::Value::Null;
        };
        let children: Vec<_> = node.children.iter().map(|&c| self.snapshot(c)).collect();
        serde_json::json!({
            "id": id.0,
            "kind": node.kind.label(),
            "owner": node.owner.map(|e| e.to_string()),
            "position": [node.position.x, node.position.y],
            "scale": [node.scale.x, node.scale.y],
            "rotation": node.rotation,
            "alpha": node.alpha,
            "visible": node.visible,
            "size": [self.width(id), self.height(id)],
            "children": children,
        })
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(stage: &mut Stage, w: f32, h: f32) -> NodeId {
        stage.create(NodeKind::Rect {
            size: Vec2::new(w, h),
            color: Color::WHITE,
        })
    }

    #[test]
    fn parse_colors() {
        assert_eq!(Color::parse("#fff"), Some(Color::WHITE));
        assert_eq!(Color::parse("#000000"), Some(Color::BLACK));
        assert_eq!(Color::parse("#ff0000").map(Color::to_hex), Some(0xff0000));
        assert_eq!(Color::parse("0x00ff00").map(Color::to_hex), Some(0x00ff00));
        assert_eq!(Color::parse("rgb(0, 0, 255)").map(Color::to_hex), Some(0x0000ff));
        assert_eq!(Color::parse("rgba(0, 0, 255, 0.5)").map(|c| c.a), Some(0.5));
        assert_eq!(Color::parse("Green").map(Color::to_hex), Some(0x008000));
        assert_eq!(Color::parse("#ff000080").map(|c| (c.a * 255.0).round()), Some(128.0));
        assert_eq!(Color::parse("#12"), None);
        assert_eq!(Color::parse("#ggg"), None);
        assert_eq!(Color::parse("chartreuse-ish"), None);
    }

    #[test]
    fn add_child_reparents() {
        let mut stage = Stage::new();
        let a = stage.create(NodeKind::Container);
        let b = stage.create(NodeKind::Container);
        let c = stage.create(NodeKind::Container);
        assert!(stage.add_child(a, c));
        assert!(stage.add_child(b, c));
        assert!(stage.children(a).is_empty());
        assert_eq!(stage.children(b), &[c]);
        assert_eq!(stage.parent(c), Some(b));
    }

    #[test]
    fn cycles_are_refused() {
        let mut stage = Stage::new();
        let a = stage.create(NodeKind::Container);
        let b = stage.create(NodeKind::Container);
        assert!(stage.add_child(a, b));
        assert!(!stage.add_child(b, a));
        assert!(!stage.add_child(a, a));
    }

    #[test]
    fn container_bounds_follow_children() {
        let mut stage = Stage::new();
        let container = stage.create(NodeKind::Container);
        let payload = rect(&mut stage, 10.0, 20.0);
        stage.get_mut(payload).unwrap().position = Vec2::new(-5.0, -10.0);
        stage.add_child(container, payload);

        assert_eq!(stage.width(container), 10.0);
        assert_eq!(stage.height(container), 20.0);
        assert_eq!(
            stage.local_bounds(container),
            Some(Aabb::new(-5.0, -10.0, 10.0, 20.0))
        );
    }

    #[test]
    fn set_size_rescales() {
        let mut stage = Stage::new();
        let container = stage.create(NodeKind::Container);
        let payload = rect(&mut stage, 10.0, 20.0);
        stage.add_child(container, payload);

        stage.set_width(container, 30.0);
        stage.set_height(container, 10.0);
        let node = stage.get(container).unwrap();
        assert_eq!(node.scale, Vec2::new(3.0, 0.5));
        assert_eq!(stage.width(container), 30.0);
        assert_eq!(stage.height(container), 10.0);
    }

    #[test]
    fn empty_container_has_no_size() {
        let mut stage = Stage::new();
        let container = stage.create(NodeKind::Container);
        assert_eq!(stage.width(container), 0.0);
        stage.set_width(container, 50.0);
        assert_eq!(stage.get(container).unwrap().scale, Vec2::ONE);
    }

    #[test]
    fn destroy_removes_subtree() {
        let mut stage = Stage::new();
        let a = stage.create(NodeKind::Container);
        let b = stage.create(NodeKind::Container);
        let c = rect(&mut stage, 1.0, 1.0);
        stage.add_child(stage.root(), a);
        stage.add_child(a, b);
        stage.add_child(b, c);

        stage.destroy(a);
        assert!(!stage.contains(a));
        assert!(!stage.contains(b));
        assert!(!stage.contains(c));
        assert!(stage.children(stage.root()).is_empty());
        assert_eq!(stage.len(), 1);
    }

    #[test]
    fn hit_test_prefers_topmost_interactive() {
        let mut stage = Stage::new();
        let root = stage.root();
        let below = stage.create(NodeKind::Container);
        let above = stage.create(NodeKind::Container);
        for &c in &[below, above] {
            let r = rect(&mut stage, 10.0, 10.0);
            stage.add_child(c, r);
            stage.add_child(root, c);
            stage.get_mut(c).unwrap().interactive = true;
        }
        stage.get_mut(above).unwrap().position = Vec2::new(5.0, 0.0);

        assert_eq!(stage.hit_test(Vec2::new(7.0, 5.0)), Some(above));
        assert_eq!(stage.hit_test(Vec2::new(2.0, 5.0)), Some(below));
        assert_eq!(stage.hit_test(Vec2::new(50.0, 50.0)), None);

        stage.get_mut(above).unwrap().visible = false;
        assert_eq!(stage.hit_test(Vec2::new(7.0, 5.0)), Some(below));
    }

    #[test]
    fn world_bounds_accumulate_parents() {
        let mut stage = Stage::new();
        let root = stage.root();
        let parent = stage.create(NodeKind::Container);
        let child = stage.create(NodeKind::Container);
        let r = rect(&mut stage, 4.0, 4.0);
        stage.add_child(root, parent);
        stage.add_child(parent, child);
        stage.add_child(child, r);
        stage.get_mut(parent).unwrap().position = Vec2::new(100.0, 0.0);
        stage.get_mut(parent).unwrap().scale = Vec2::splat(2.0);
        stage.get_mut(child).unwrap().position = Vec2::new(10.0, 10.0);

        assert_eq!(
            stage.world_bounds(child),
            Some(Aabb::new(120.0, 20.0, 8.0, 8.0))
        );
    }

    #[test]
    fn text_measure_estimates() {
        let run = TextRun {
            content: "ab\nabcd".to_string(),
            style: TextStyle {
                font_size: 10.0,
                ..TextStyle::default()
            },
        };
        let size = run.measure();
        assert!((size.x - 24.0).abs() < 1e-4);
        assert!((size.y - 24.0).abs() < 1e-4);
    }
}
