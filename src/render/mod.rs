//! Output writers: PNG rasters and the Contents.json descriptor.

pub mod contents;
pub mod png;

pub use contents::{ContentsOptions, write_contents};
pub use png::{AlphaMode, IconSource, SvgSource, parse_hex_color};
