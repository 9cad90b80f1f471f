//! Render configuration.
//!
//! [`RenderOptions`] can be built in code or loaded from JSON; every field is
//! optional.
//!
//! ```json
//! { "width": 640, "height": 360, "transparent": true }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Result, SceneError};
use crate::stage::Color;

/// Scene width used when neither the options nor the `<scene>` element set one.
pub const DEFAULT_SCENE_WIDTH: f32 = 1080.0;
/// Scene height used when neither the options nor the `<scene>` element set one.
pub const DEFAULT_SCENE_HEIGHT: f32 = 1920.0;
/// Clear color of a dynamically sized surface.
pub const DYNAMIC_BACKGROUND: &str = "#111111";

/// Options for [`render`](crate::render::render).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Fixed surface width. Setting either dimension fixes the surface size.
    pub width: Option<f32>,
    /// Fixed surface height.
    pub height: Option<f32>,
    /// Clear to transparent instead of the background color.
    pub transparent: bool,
    /// Background color, overriding the default.
    pub background: Option<String>,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SceneError::invalid("options", e.to_string()))
    }

    /// Fix the surface size.
    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn transparent(mut self) -> Self {
        self.transparent = true;
        self
    }

    pub fn with_background(mut self, color: impl Into<String>) -> Self {
        self.background = Some(color.into());
        self
    }

    /// Whether the surface has a fixed size.
    pub fn is_fixed(&self) -> bool {
        self.width.is_some() || self.height.is_some()
    }

    /// The clear color to use. Fixed surfaces default to black, dynamic ones
    /// to [`DYNAMIC_BACKGROUND`].
    pub fn clear_color(&self) -> Result<Color> {
        if self.transparent {
            return Ok(Color::TRANSPARENT);
        }
        let value = match &self.background {
            Some(v) => v.as_str(),
            None if self.is_fixed() => "#000000",
            None => DYNAMIC_BACKGROUND,
        };
        Color::parse(value).ok_or_else(|| SceneError::invalid("options", value))
    }
}
