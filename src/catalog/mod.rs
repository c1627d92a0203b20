//! Catalog layer: icon slots + the render targets validated from them.
//!
//! This module is intentionally separate from rasterization and manifest
//! writing. It owns:
//! - Idiom / Scale (device class and density)
//! - The built-in icon set and custom catalogs loaded from JSON
//! - Filename checks

pub mod filename;
pub mod idiom;
pub mod slots;

pub use idiom::{Idiom, Scale};
pub use slots::{Catalog, RenderTarget};
