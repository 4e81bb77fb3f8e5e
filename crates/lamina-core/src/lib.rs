//! # Lamina Core
//!
//! Convex-polygon slicing editor core: exact half-plane geometry, the
//! polygon arena with its layers and textures, and the undo/redo action log
//! with a fixed binary-serializable layout (see `lamina-io`).
//!
//! This crate is the heart of the Lamina editor kernel.

pub mod actions;
pub mod dense;
pub mod document;
pub mod geometry;
pub mod halfplane;
pub mod layer;
pub mod polygon;
pub mod spatial;
pub mod texture;

pub use actions::{Action, ActionKind, ActionLog, Payload, ScaleFactor, WHOLE_LAYER};
pub use document::Document;
pub use geometry::{BBox, Point, Rect};
pub use halfplane::{GeometryError, HalfPlane};
pub use layer::{Layer, LayerColor};
pub use polygon::{ConvexPolygon, TextureRef};
pub use texture::TextureInfo;
