use anyhow::{Context, anyhow, bail};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use resvg::usvg;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What happens to the alpha channel before an icon is saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaMode {
    /// Drop alpha and save RGB as-is; transparent areas keep whatever colour
    /// the rasterizer left under them (black for untouched pixels).
    #[default]
    Discard,
    /// Composite onto a solid background, then save RGB.
    Flatten([u8; 3]),
    /// Save RGBA untouched.
    Keep,
}

/// SVG text as read from disk, not yet parsed.
#[derive(Debug, Clone)]
pub struct SvgSource {
    pub path: PathBuf,
    pub text: String,
}

impl SvgSource {
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read SVG file {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            text,
        })
    }
}

/// A parsed SVG document, rasterized on demand at any square size.
#[derive(Debug)]
pub struct IconSource {
    tree: usvg::Tree,
}

impl IconSource {
    /// Parse `source`. Relative image references inside the document resolve
    /// against the file's directory.
    pub fn parse(source: &SvgSource) -> anyhow::Result<Self> {
        let mut opt = usvg::Options {
            resources_dir: fs::canonicalize(&source.path)
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf())),
            ..Default::default()
        };
        Arc::make_mut(&mut opt.fontdb).load_system_fonts();

        Self::parse_with(&source.text, &opt)
            .with_context(|| format!("parse SVG file {}", source.path.display()))
    }

    fn parse_with(text: &str, opt: &usvg::Options) -> anyhow::Result<Self> {
        let tree = usvg::Tree::from_str(text, opt)?;
        let size = tree.size();
        if size.width() <= 0.0 || size.height() <= 0.0 {
            bail!("SVG has empty dimensions");
        }
        Ok(Self { tree })
    }

    /// Rasterize into a `pixels` x `pixels` RGBA image (straight alpha).
    ///
    /// The document is stretched to fill the square; a non-square source is
    /// not letterboxed.
    pub fn render(&self, pixels: u32) -> anyhow::Result<RgbaImage> {
        let mut pixmap = tiny_skia::Pixmap::new(pixels, pixels)
            .ok_or_else(|| anyhow!("cannot allocate {}x{} pixmap", pixels, pixels))?;

        let size = self.tree.size();
        let transform = tiny_skia::Transform::from_scale(
            pixels as f32 / size.width(),
            pixels as f32 / size.height(),
        );
        resvg::render(&self.tree, transform, &mut pixmap.as_mut());

        // tiny-skia stores premultiplied colour; the PNG encoder wants straight alpha.
        let mut img = RgbaImage::new(pixels, pixels);
        for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
            let c = src.demultiply();
            *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
        }
        Ok(img)
    }

    /// Render, apply the alpha policy and write a PNG to `path`, replacing
    /// any existing file.
    pub fn write_icon(&self, pixels: u32, alpha: AlphaMode, path: &Path) -> anyhow::Result<()> {
        let rgba = self.render(pixels)?;
        let img = apply_alpha(rgba, alpha);
        img.save_with_format(path, ImageFormat::Png)
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }
}

pub fn apply_alpha(rgba: RgbaImage, alpha: AlphaMode) -> DynamicImage {
    match alpha {
        AlphaMode::Keep => DynamicImage::ImageRgba8(rgba),
        AlphaMode::Discard => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(rgba).to_rgb8()),
        AlphaMode::Flatten(bg) => {
            let mut out = RgbImage::new(rgba.width(), rgba.height());
            for (dst, src) in out.pixels_mut().zip(rgba.pixels()) {
                let a = src[3] as u32;
                let mix = |fg: u8, back: u8| {
                    ((fg as u32 * a + back as u32 * (255 - a) + 127) / 255) as u8
                };
                *dst = Rgb([mix(src[0], bg[0]), mix(src[1], bg[1]), mix(src[2], bg[2])]);
            }
            DynamicImage::ImageRgb8(out)
        }
    }
}

/// Parse "#RRGGBB" (leading '#' optional).
pub fn parse_hex_color(s: &str) -> anyhow::Result<[u8; 3]> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("colour must look like #RRGGBB: {:?}", s);
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16).with_context(|| format!("bad colour {:?}", s))
    };
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ColorType, GenericImageView};
    use pretty_assertions::assert_eq;

    fn inline_source(text: &str) -> SvgSource {
        SvgSource {
            path: PathBuf::from("inline.svg"),
            text: text.to_string(),
        }
    }

    fn parse_inline(text: &str) -> anyhow::Result<IconSource> {
        IconSource::parse(&inline_source(text))
    }

    /// Opaque red on the left half, fully transparent on the right.
    pub(crate) const HALF_RED_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100" viewBox="0 0 100 100">
  <rect x="0" y="0" width="50" height="100" fill="#ff0000"/>
</svg>"##;

    #[test]
    fn render_fills_requested_square() {
        let source = parse_inline(HALF_RED_SVG).unwrap();
        let img = source.render(20).unwrap();

        assert_eq!(img.dimensions(), (20, 20));
        assert_eq!(img.get_pixel(2, 10), &Rgba([255, 0, 0, 255]));
        assert_eq!(img.get_pixel(17, 10)[3], 0);
    }

    #[test]
    fn zero_size_render_fails() {
        let source = parse_inline(HALF_RED_SVG).unwrap();
        let err = source.render(0).unwrap_err();
        assert!(err.to_string().contains("0x0"), "{}", err);
    }

    #[test]
    fn invalid_svg_is_rejected() {
        let err = parse_inline("not an svg").unwrap_err();
        assert!(err.to_string().contains("inline.svg"), "{}", err);
    }

    #[test]
    fn discard_drops_alpha_channel() {
        let source = parse_inline(HALF_RED_SVG).unwrap();
        let img = apply_alpha(source.render(10).unwrap(), AlphaMode::Discard);

        assert_eq!(img.color(), ColorType::Rgb8);
        let rgb = img.to_rgb8();
        assert_eq!(rgb.get_pixel(1, 1), &Rgb([255, 0, 0]));
        assert_eq!(rgb.get_pixel(8, 1), &Rgb([0, 0, 0]));
    }

    #[test]
    fn flatten_composites_onto_background() {
        let source = parse_inline(HALF_RED_SVG).unwrap();
        let img = apply_alpha(source.render(10).unwrap(), AlphaMode::Flatten([255, 255, 255]));

        assert_eq!(img.color(), ColorType::Rgb8);
        let rgb = img.to_rgb8();
        assert_eq!(rgb.get_pixel(1, 1), &Rgb([255, 0, 0]));
        assert_eq!(rgb.get_pixel(8, 1), &Rgb([255, 255, 255]));
    }

    #[test]
    fn keep_preserves_transparency() {
        let source = parse_inline(HALF_RED_SVG).unwrap();
        let img = apply_alpha(source.render(10).unwrap(), AlphaMode::Keep);

        assert_eq!(img.color(), ColorType::Rgba8);
        assert_eq!(img.get_pixel(8, 1)[3], 0);
    }

    #[test]
    fn written_icon_decodes_at_requested_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Icon-29.png");
        let source = parse_inline(HALF_RED_SVG).unwrap();

        source.write_icon(29, AlphaMode::Discard, &path).unwrap();

        let decoded = image::open(&path).unwrap();
        assert_eq!(decoded.dimensions(), (29, 29));
        assert_eq!(decoded.color(), ColorType::Rgb8);
    }

    #[test]
    fn missing_file_fails_to_read() {
        let dir = tempfile::tempdir().unwrap();
        let err = SvgSource::read(&dir.path().join("gone.svg")).unwrap_err();
        assert!(err.to_string().contains("gone.svg"), "{}", err);
    }

    #[test]
    fn hex_colours_parse_with_or_without_hash() {
        assert_eq!(parse_hex_color("#1a2B3c").unwrap(), [0x1a, 0x2b, 0x3c]);
        assert_eq!(parse_hex_color("ffffff").unwrap(), [255, 255, 255]);
        assert!(parse_hex_color("#fff").is_err());
        assert!(parse_hex_color("#gggggg").is_err());
    }
}
