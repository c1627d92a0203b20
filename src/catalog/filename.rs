use crate::catalog::slots::{CatalogSlot, format_points};
use anyhow::bail;
use regex::Regex;

/// Reject anything that is not a bare `*.png` file name.
///
/// Output files are joined onto the output directory, so separators and
/// parent references are refused outright.
pub fn validate_filename(name: &str) -> anyhow::Result<()> {
    if name.trim().is_empty() {
        bail!("icon filename must not be empty");
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        bail!("icon filename must be a plain file name: {:?}", name);
    }
    let is_png = name
        .rsplit_once('.')
        .map(|(stem, ext)| !stem.is_empty() && ext.eq_ignore_ascii_case("png"))
        .unwrap_or(false);
    if !is_png {
        bail!("icon filename must end in .png: {:?}", name);
    }
    Ok(())
}

/// Compare filenames following the `Icon-<points>[@<n>x].png` convention
/// against the slot they are declared for.
///
/// Returns one message per disagreement. Names outside the convention are
/// not checked.
///
/// Example:
/// Icon-83.5@2x.png  =>  points 83.5, scale 2x
pub fn convention_mismatches(slots: &[CatalogSlot]) -> anyhow::Result<Vec<String>> {
    // Capture:
    // 1) points: integer or decimal
    // 2) scale factor: optional single digit before 'x'
    let re = Regex::new(r#"^Icon-([0-9]+(?:\.[0-9]+)?)(?:@([0-9])x)?\.png$"#)?;

    let mut out = Vec::new();
    for slot in slots {
        let caps = match re.captures(&slot.filename) {
            Some(c) => c,
            None => continue,
        };

        let named_points = &caps[1];
        let named_factor: u32 = match caps.get(2) {
            Some(m) => m.as_str().parse()?,
            None => 1,
        };

        let points = format_points(slot.points);
        if named_points != points || named_factor != slot.scale.factor() {
            out.push(format!(
                "{} is declared as {} {}pt@{} but its name says {}pt@{}x",
                slot.filename, slot.idiom, points, slot.scale, named_points, named_factor
            ));
        }
    }

    Ok(out)
}
