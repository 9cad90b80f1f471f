//! Error types shared across the runtime.
//!
//! Nothing here is isolated per component: an `Err` returned from a lifecycle
//! call or an event handler aborts the remaining work of that dispatch and
//! propagates to whoever started it.

use crate::ecs::EntityId;

/// Errors raised while loading resources.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// Reading the file failed.
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The image data could not be decoded.
    #[cfg(feature = "file-assets")]
    #[error("failed to decode image '{path}': {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },

    /// A texture atlas description was malformed.
    #[error("invalid atlas '{path}': {source}")]
    Atlas {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The source has nothing under this URL.
    #[error("resource not found: {0}")]
    NotFound(String),
}

/// The crate-wide error type.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// The scene markup could not be parsed.
    #[error("markup {line}:{col}: {message}")]
    Markup {
        line: usize,
        col: usize,
        message: String,
    },

    /// The markup contained no `<scene>` element.
    #[error("no <scene> element found")]
    NoScene,

    /// An arithmetic attribute expression could not be evaluated.
    #[error("expression '{expr}': {message}")]
    Expression { expr: String, message: String },

    /// A component was declared without an attribute it requires.
    #[error("component '{component}' requires '{attribute}'")]
    MissingAttribute {
        component: &'static str,
        attribute: &'static str,
    },

    /// A component attribute could not be interpreted.
    #[error("component '{component}': invalid value '{value}'")]
    InvalidValue {
        component: &'static str,
        value: String,
    },

    /// An animation referenced a property path that does not exist.
    #[error("property ({0}) could not be found")]
    UnknownProperty(String),

    /// A `#id` shorthand referenced an asset that was never declared.
    #[error("no asset declared with id '{0}'")]
    UnknownAsset(String),

    /// A texture frame was requested that the resource does not contain.
    #[error("resource '{src}' has no texture '{frame}'")]
    UnknownFrame { src: String, frame: String },

    /// A resource was used before it had been loaded.
    #[error("resource '{0}' is not loaded")]
    NotLoaded(String),

    /// Two entities declared the same id.
    #[error("entity id '{0}' is already in use")]
    DuplicateId(String),

    /// Attaching would make an entity its own ancestor.
    #[error("entity {child} cannot be attached under {parent}")]
    InvalidParent { parent: EntityId, child: EntityId },

    /// An operation referenced an entity that no longer exists.
    #[error("entity {0} is not alive")]
    DeadEntity(EntityId),

    /// A resource failed to load.
    #[error(transparent)]
    Asset(#[from] AssetError),
}

impl SceneError {
    pub(crate) fn invalid(component: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            component,
            value: value.into(),
        }
    }
}

/// Shorthand result type used throughout the crate.
pub type Result<T, E = SceneError> = std::result::Result<T, E>;
