//! Icon catalog: the slots of an `AppIcon.appiconset` and the render targets
//! derived from them.
//!
//! A custom catalog uses the same shape as Contents.json, so an existing
//! descriptor can be fed back in:
//! {
//!   "images": [
//!     {
//!       "filename": "Icon-20@2x.png",
//!       "idiom": "iphone",
//!       "scale": "2x",
//!       "size": "20x20"          // points, must be square
//!     },
//!     ...
//!   ]
//! }
//!
//! Several slots may share one file (e.g. Icon-20@2x.png serves both iphone
//! and ipad). Validation collapses them into one render target per filename
//! and refuses the catalog if the shared slots disagree on pixel size.

use crate::catalog::filename::validate_filename;
use crate::catalog::idiom::{Idiom, Scale};
use anyhow::{Context, bail};
use serde::Deserialize;
use std::collections::HashMap;

/// Largest edge length a catalog may ask for. App Store artwork is 1024px and
/// macOS tops out at 1024pt@2x.
pub const MAX_PIXELS: u32 = 2048;

const BUILTIN: &[(&str, Idiom, Scale, f32)] = &[
    // iPhone
    ("Icon-20@2x.png", Idiom::Iphone, Scale::X2, 20.0),
    ("Icon-20@3x.png", Idiom::Iphone, Scale::X3, 20.0),
    ("Icon-29@2x.png", Idiom::Iphone, Scale::X2, 29.0),
    ("Icon-29@3x.png", Idiom::Iphone, Scale::X3, 29.0),
    ("Icon-40@2x.png", Idiom::Iphone, Scale::X2, 40.0),
    ("Icon-40@3x.png", Idiom::Iphone, Scale::X3, 40.0),
    ("Icon-60@2x.png", Idiom::Iphone, Scale::X2, 60.0),
    ("Icon-60@3x.png", Idiom::Iphone, Scale::X3, 60.0),
    // iPad
    ("Icon-20.png", Idiom::Ipad, Scale::X1, 20.0),
    ("Icon-20@2x.png", Idiom::Ipad, Scale::X2, 20.0),
    ("Icon-29.png", Idiom::Ipad, Scale::X1, 29.0),
    ("Icon-29@2x.png", Idiom::Ipad, Scale::X2, 29.0),
    ("Icon-40.png", Idiom::Ipad, Scale::X1, 40.0),
    ("Icon-40@2x.png", Idiom::Ipad, Scale::X2, 40.0),
    ("Icon-76.png", Idiom::Ipad, Scale::X1, 76.0),
    ("Icon-76@2x.png", Idiom::Ipad, Scale::X2, 76.0),
    ("Icon-83.5@2x.png", Idiom::Ipad, Scale::X2, 83.5),
    // App Store
    ("Icon-1024.png", Idiom::IosMarketing, Scale::X1, 1024.0),
];

/// One role in the icon set: which file a device idiom uses at a given scale.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSlot {
    pub filename: String,
    pub idiom: Idiom,
    pub scale: Scale,
    /// Nominal size in points; 83.5 for the iPad Pro icon.
    pub points: f32,
}

impl CatalogSlot {
    pub fn new(filename: impl Into<String>, idiom: Idiom, scale: Scale, points: f32) -> Self {
        Self {
            filename: filename.into(),
            idiom,
            scale,
            points,
        }
    }

    /// Pixel edge length of the raster this slot needs.
    pub fn pixels(&self) -> u32 {
        (self.points * self.scale.factor() as f32).round() as u32
    }

    /// Size string as written to Contents.json, e.g. "83.5x83.5".
    pub fn size_label(&self) -> String {
        let p = format_points(self.points);
        format!("{}x{}", p, p)
    }
}

/// A (filename, pixel size) row of the size table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeSpec {
    pub filename: String,
    pub pixels: u32,
}

/// One output file and the slots it serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTarget {
    pub filename: String,
    pub pixels: u32,
    pub slots: Vec<(Idiom, Scale)>,
}

impl RenderTarget {
    pub fn new(filename: impl Into<String>, pixels: u32) -> Self {
        Self {
            filename: filename.into(),
            pixels,
            slots: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    slots: Vec<CatalogSlot>,
}

/// Raw catalog shape as it appears in JSON.
#[derive(Debug, Clone, Deserialize)]
struct RawCatalog {
    #[serde(default)]
    images: Vec<RawSlot>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawSlot {
    filename: String,
    idiom: Idiom,
    scale: Scale,
    size: String,
}

impl Catalog {
    pub fn new(slots: Vec<CatalogSlot>) -> Self {
        Self { slots }
    }

    /// The iOS 7-14 app icon set: iPhone, iPad and App Store marketing.
    pub fn builtin() -> Self {
        let slots = BUILTIN
            .iter()
            .map(|&(filename, idiom, scale, points)| CatalogSlot::new(filename, idiom, scale, points))
            .collect();
        Self::new(slots)
    }

    /// Parse a catalog in Contents.json shape. Extra keys (e.g. "info") are ignored.
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let raw: RawCatalog = serde_json::from_str(text).context("parse icon catalog JSON")?;

        let mut slots = Vec::with_capacity(raw.images.len());
        for (i, image) in raw.images.into_iter().enumerate() {
            let points = parse_size(&image.size)
                .with_context(|| format!("catalog entry {} ({})", i, image.filename))?;
            slots.push(CatalogSlot::new(image.filename, image.idiom, image.scale, points));
        }

        Ok(Self::new(slots))
    }

    pub fn slots(&self) -> &[CatalogSlot] {
        &self.slots
    }

    /// The size table in catalog order, one row per slot (filenames may repeat).
    pub fn size_table(&self) -> Vec<SizeSpec> {
        self.slots
            .iter()
            .map(|s| SizeSpec {
                filename: s.filename.clone(),
                pixels: s.pixels(),
            })
            .collect()
    }

    /// Check every slot and collapse shared filenames into render targets,
    /// kept in order of first appearance.
    pub fn validate_and_build(&self) -> anyhow::Result<Vec<RenderTarget>> {
        if self.slots.is_empty() {
            bail!("icon catalog contained no images");
        }

        let mut targets: Vec<RenderTarget> = Vec::new();
        let mut by_name: HashMap<&str, usize> = HashMap::new();

        for slot in &self.slots {
            validate_filename(&slot.filename)?;
            if !slot.points.is_finite() || slot.points <= 0.0 {
                bail!(
                    "{} has invalid point size {}",
                    slot.filename,
                    slot.points
                );
            }

            let pixels = slot.pixels();
            if pixels == 0 || pixels > MAX_PIXELS {
                bail!(
                    "{} needs {}px, outside 1..={}px",
                    slot.filename,
                    pixels,
                    MAX_PIXELS
                );
            }
            match by_name.get(slot.filename.as_str()) {
                Some(&idx) => {
                    let target = &mut targets[idx];
                    if target.pixels != pixels {
                        bail!(
                            "{} is used at {}px and at {}px ({} {})",
                            slot.filename,
                            target.pixels,
                            pixels,
                            slot.idiom,
                            slot.scale
                        );
                    }
                    target.slots.push((slot.idiom, slot.scale));
                }
                None => {
                    by_name.insert(slot.filename.as_str(), targets.len());
                    let mut target = RenderTarget::new(slot.filename.clone(), pixels);
                    target.slots.push((slot.idiom, slot.scale));
                    targets.push(target);
                }
            }
        }

        Ok(targets)
    }
}

/// Render a point size the way Contents.json spells it: "20", "83.5".
pub fn format_points(points: f32) -> String {
    format!("{}", points)
}

/// Parse "83.5x83.5" into 83.5. Icons are square, so both sides must agree.
fn parse_size(s: &str) -> anyhow::Result<f32> {
    let (w, h) = match s.trim().split_once('x') {
        Some(parts) => parts,
        None => bail!("size must look like WxH: {:?}", s),
    };
    let w: f32 = w
        .trim()
        .parse()
        .with_context(|| format!("bad size width {:?}", w))?;
    let h: f32 = h
        .trim()
        .parse()
        .with_context(|| format!("bad size height {:?}", h))?;
    if w != h {
        bail!("icon size must be square: {:?}", s);
    }
    Ok(w)
}
