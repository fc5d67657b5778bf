//! Rendering Adapter: renderer-agnostic interface.
//!
//! # Invariants
//! - Renderers only read the object store; they never mutate it.
//! - Output derives from world state and view alone.

mod renderer;

pub use renderer::{RenderView, Renderer, TextRenderer, glyph};
