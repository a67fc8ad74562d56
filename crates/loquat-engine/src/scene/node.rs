//! Scene-graph leaf types.
//!
//! These are caller-managed data holders; the engine core gives them no
//! lifecycle beyond what the owning scene does with them.

use glam::Vec2;

/// Render hook for node types. The engine never calls this itself; scenes
/// drive their own nodes from `on_update`.
pub trait Node {
    fn on_render(&mut self) {}
}

/// Placement shared by node types.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct NodeProperties {
    pub position: Vec2,
    pub anchor: Vec2,
}

/// A positioned image reference.
#[derive(Debug, Clone, Default)]
pub struct Sprite {
    pub properties: NodeProperties,
    image: String,
}

impl Sprite {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            properties: NodeProperties::default(),
            image: image.into(),
        }
    }

    pub fn image(&self) -> &str {
        &self.image
    }
}

impl Node for Sprite {}
